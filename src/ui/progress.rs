use crate::factory::models::{MessageKind, SessionMessage};
use crate::ui::icons::{CHECK, CROSS, LINK, ROBOT, SPARKLE};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Terminal view of one backend session, rendered via an `indicatif` spinner.
///
/// Status messages move the spinner and are echoed as lines; generated code
/// is printed in a gutter below them. With `show_code` off, only the last
/// code block (the one following the latest status) is printed on finish.
pub struct SessionUI {
    spinner: ProgressBar,
    show_code: bool,
    code_lines: usize,
    last_code: Vec<String>,
    after_status: bool,
}

impl SessionUI {
    pub fn new(show_code: bool) -> Self {
        let spinner_style = ProgressStyle::default_spinner()
            .template("{prefix:.bold.dim} {spinner} {msg}")
            .expect("progress bar template is a valid static string");

        let spinner = ProgressBar::new_spinner();
        spinner.set_style(spinner_style);
        spinner.set_prefix("MACC");
        spinner.set_message("waiting for backend...");
        spinner.enable_steady_tick(Duration::from_millis(100));

        Self {
            spinner,
            show_code,
            code_lines: 0,
            last_code: Vec::new(),
            after_status: true,
        }
    }

    fn print_line(&self, msg: impl AsRef<str>) {
        if self.spinner.is_hidden() {
            println!("{}", msg.as_ref());
        } else {
            self.spinner.println(msg.as_ref());
        }
    }

    /// Render one message from `/updates`.
    pub fn show(&mut self, message: &SessionMessage) {
        match message.kind {
            MessageKind::Status => {
                self.spinner.set_message(message.message.clone());
                self.print_line(format_status(&message.message));
                self.after_status = true;
            }
            MessageKind::Code => {
                if self.after_status {
                    self.last_code.clear();
                    self.after_status = false;
                }
                self.last_code.push(message.message.clone());
                self.code_lines += 1;
                if self.show_code {
                    self.print_line(format!("  {} {}", style("│").dim(), message.message));
                }
            }
        }
    }

    /// Most recent code block received.
    pub fn last_code(&self) -> &[String] {
        &self.last_code
    }

    /// Stop the spinner, print the final code unless it was streamed, then a summary.
    pub fn finish(&self, repo_url: Option<&str>) {
        self.spinner.finish_and_clear();
        if !self.show_code && !self.last_code.is_empty() {
            self.print_line(style("Generated code:").bold().to_string());
            for line in &self.last_code {
                self.print_line(format!("  {} {}", style("│").dim(), line));
            }
        }
        self.print_line(format!(
            "{}{} ({} code lines received)",
            CHECK,
            style("Session finished").green().bold(),
            self.code_lines
        ));
        if let Some(url) = repo_url {
            self.print_line(format!("{}{}", LINK, style(url).cyan().underlined()));
        }
    }

    pub fn abandon(&self, reason: &str) {
        self.spinner.abandon();
        eprintln!("{}{}", CROSS, style(reason).red());
    }
}

/// True for status lines that report something going wrong.
pub fn is_failure(status: &str) -> bool {
    status.starts_with("Error")
        || status.starts_with("Unhandled error")
        || status.contains(" failed")
}

fn format_status(status: &str) -> String {
    if is_failure(status) {
        format!("{}{}", CROSS, style(status).red())
    } else if status.starts_with("Project ready") || status.starts_with("Code committed") {
        format!("{}{}", SPARKLE, style(status).green())
    } else {
        format!("{}{}", ROBOT, status)
    }
}
