//! Client commands talking to a running backend: `macc generate`,
//! `macc suggest`, `macc commit`, `macc updates`.

use anyhow::{Context, Result};
use console::style;
use dialoguer::{Confirm, Input, Select, theme::ColorfulTheme};

use macc::client::{ApiClient, POLL_INTERVAL, normalize_repo_arg};
use macc::factory::models::UpdatesResponse;
use macc::ui::SessionUI;
use macc::validation::{parse_repo, validate_spec, validate_suggestion};

pub struct GenerateOptions {
    pub spec: Option<String>,
    pub repo: Option<String>,
    pub show_code: bool,
    pub no_wait: bool,
    pub interactive: bool,
}

pub async fn cmd_generate(client: &ApiClient, opts: GenerateOptions) -> Result<()> {
    let prompted = opts.spec.is_none();
    let spec = match opts.spec {
        Some(spec) => spec,
        None => Input::<String>::with_theme(&ColorfulTheme::default())
            .with_prompt("Describe your project")
            .interact_text()
            .context("No spec given and no terminal to prompt on")?,
    };
    let spec = validate_spec(&spec)?.to_string();

    let repo = match opts.repo {
        Some(repo) => repo,
        None if prompted => Input::<String>::with_theme(&ColorfulTheme::default())
            .with_prompt("GitHub repo (owner/name, blank to auto-generate)")
            .allow_empty(true)
            .interact_text()?,
        None => String::new(),
    };
    let repo = normalize_repo_arg(&repo);
    // Reject malformed names before anything is sent.
    parse_repo(&repo)?;

    let session_id = client
        .start_generation(&spec, (!repo.is_empty()).then_some(repo.as_str()))
        .await?;
    println!("Session: {}", style(&session_id).cyan());
    if opts.no_wait {
        return Ok(());
    }

    follow(client, &session_id, opts.show_code).await?;

    if opts.interactive || prompted {
        interact(client, &session_id, opts.show_code).await?;
    }
    Ok(())
}

pub async fn cmd_suggest(
    client: &ApiClient,
    session_id: &str,
    suggestion: &str,
    show_code: bool,
) -> Result<()> {
    let suggestion = validate_suggestion(suggestion)?;
    client.start_refine(session_id, suggestion).await?;
    follow(client, session_id, show_code).await?;
    Ok(())
}

pub async fn cmd_commit(client: &ApiClient, session_id: &str, open: bool) -> Result<()> {
    let committed = client.commit(session_id).await?;
    announce_commit(&committed.repo_url);
    if open {
        open_in_browser(&committed.repo_url);
    }
    Ok(())
}

fn announce_commit(repo_url: &str) {
    println!(
        "{} {}",
        style("Committed:").green().bold(),
        style(repo_url).cyan()
    );
}

fn open_in_browser(url: &str) {
    if let Err(e) = open::that(url) {
        eprintln!("Failed to open browser: {}", e);
    }
}

pub async fn cmd_updates(
    client: &ApiClient,
    session_id: &str,
    follow_until_done: bool,
) -> Result<()> {
    if follow_until_done {
        follow(client, session_id, true).await?;
        return Ok(());
    }

    let updates = client.updates(session_id).await?;
    for m in &updates.messages {
        println!("[{}] {}", m.kind.as_str(), m.message);
    }
    println!("done: {}", updates.done);
    if let Some(url) = &updates.repo_url {
        println!("repo_url: {}", url);
    }
    Ok(())
}

/// Poll a session to completion, rendering its messages.
async fn follow(client: &ApiClient, session_id: &str, show_code: bool) -> Result<UpdatesResponse> {
    let mut ui = SessionUI::new(show_code);
    let result = client
        .poll_updates(session_id, POLL_INTERVAL, |m| ui.show(m))
        .await;
    match result {
        Ok(last) => {
            ui.finish(last.repo_url.as_deref());
            Ok(last)
        }
        Err(e) => {
            ui.abandon("Lost contact with backend");
            Err(e)
        }
    }
}

/// Suggest/commit loop offered after an interactive generation.
async fn interact(client: &ApiClient, session_id: &str, show_code: bool) -> Result<()> {
    let theme = ColorfulTheme::default();
    let actions = ["Suggest changes", "Commit to GitHub", "Quit"];
    loop {
        let choice = Select::with_theme(&theme)
            .with_prompt("What next?")
            .items(&actions)
            .default(0)
            .interact()?;

        match choice {
            0 => {
                let suggestion: String = Input::with_theme(&theme)
                    .with_prompt("Suggestion")
                    .interact_text()?;
                if let Err(e) = validate_suggestion(&suggestion) {
                    eprintln!("{}", style(e).red());
                    continue;
                }
                client.start_refine(session_id, &suggestion).await?;
                follow(client, session_id, show_code).await?;
            }
            1 => {
                match client.commit(session_id).await {
                    Ok(committed) => {
                        announce_commit(&committed.repo_url);
                        let open_it = Confirm::with_theme(&theme)
                            .with_prompt("Open it in your browser?")
                            .default(false)
                            .interact()?;
                        if open_it {
                            open_in_browser(&committed.repo_url);
                        }
                    }
                    Err(e) => eprintln!("{}", style(format!("{:#}", e)).red()),
                }
            }
            _ => return Ok(()),
        }
    }
}
