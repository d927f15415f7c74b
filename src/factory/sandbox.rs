use std::process::Stdio;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::process::Command;

/// Runs generated Python briefly and reports what it printed.
///
/// This is a smoke check, not isolation: the program runs as the server
/// user with a short timeout, so it is off unless `exec_check` is enabled.
#[derive(Debug, Clone)]
pub struct CodeExecTool {
    pub interpreter: String,
    pub timeout: Duration,
}

impl Default for CodeExecTool {
    fn default() -> Self {
        Self {
            interpreter: std::env::var("MACC_PYTHON").unwrap_or_else(|_| "python3".to_string()),
            timeout: Duration::from_secs(4),
        }
    }
}

/// Outcome of one execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecOutcome {
    Finished { success: bool, output: String },
    TimedOut,
}

impl ExecOutcome {
    /// One-line status suitable for the session log.
    pub fn summary(&self) -> String {
        match self {
            ExecOutcome::Finished { success, output } => {
                let first = output.lines().next().unwrap_or("").trim();
                let verdict = if *success { "ran OK" } else { "exited with error" };
                if first.is_empty() {
                    format!("Exec check: {}", verdict)
                } else {
                    format!("Exec check: {} ({})", verdict, truncate(first, 200))
                }
            }
            ExecOutcome::TimedOut => "Exec check: timed out".to_string(),
        }
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        format!("{}...", s.chars().take(max).collect::<String>())
    }
}

impl CodeExecTool {
    pub async fn run(&self, code: &str) -> Result<ExecOutcome> {
        let dir = tempfile::tempdir().context("Failed to create exec temp dir")?;
        let script = dir.path().join("main.py");
        tokio::fs::write(&script, code)
            .await
            .with_context(|| format!("Failed to write {}", script.display()))?;

        let child = Command::new(&self.interpreter)
            .arg(&script)
            .current_dir(dir.path())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("Failed to spawn {}", self.interpreter))?;

        match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(output) => {
                let output = output.context("Failed to collect exec output")?;
                let stdout = String::from_utf8_lossy(&output.stdout);
                let stderr = String::from_utf8_lossy(&output.stderr);
                let text = if stdout.trim().is_empty() { stderr } else { stdout };
                Ok(ExecOutcome::Finished {
                    success: output.status.success(),
                    output: text.to_string(),
                })
            }
            Err(_) => Ok(ExecOutcome::TimedOut),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let tool = CodeExecTool::default();
        assert_eq!(tool.timeout, Duration::from_secs(4));
    }

    #[test]
    fn test_summary_success_with_output() {
        let outcome = ExecOutcome::Finished {
            success: true,
            output: "Hello\nmore".to_string(),
        };
        assert_eq!(outcome.summary(), "Exec check: ran OK (Hello)");
    }

    #[test]
    fn test_summary_failure_without_output() {
        let outcome = ExecOutcome::Finished {
            success: false,
            output: String::new(),
        };
        assert_eq!(outcome.summary(), "Exec check: exited with error");
    }

    #[test]
    fn test_summary_timeout() {
        assert_eq!(ExecOutcome::TimedOut.summary(), "Exec check: timed out");
    }

    #[test]
    fn test_truncate_long_line() {
        let long = "x".repeat(300);
        let t = truncate(&long, 200);
        assert_eq!(t.chars().count(), 203);
        assert!(t.ends_with("..."));
    }

    #[tokio::test]
    async fn test_missing_interpreter_errors() {
        let tool = CodeExecTool {
            interpreter: "/definitely/not/a/python".to_string(),
            timeout: Duration::from_secs(1),
        };
        assert!(tool.run("print(1)").await.is_err());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_runs_with_sh_interpreter() {
        let tool = CodeExecTool {
            interpreter: "sh".to_string(),
            timeout: Duration::from_secs(4),
        };
        let outcome = tool.run("echo hello").await.unwrap();
        assert_eq!(
            outcome,
            ExecOutcome::Finished {
                success: true,
                output: "hello\n".to_string()
            }
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_timeout() {
        let tool = CodeExecTool {
            interpreter: "sh".to_string(),
            timeout: Duration::from_millis(200),
        };
        let outcome = tool.run("sleep 5").await.unwrap();
        assert_eq!(outcome, ExecOutcome::TimedOut);
    }
}
