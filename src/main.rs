use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use macc::client::{ApiClient, DEFAULT_BASE_URL, Timeouts};

mod cmd;

#[derive(Parser)]
#[command(name = "macc")]
#[command(version, about = "Multi-Agent Code Collaborator: spec in, reviewed code out")]
pub struct Cli {
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Backend URL used by the client commands
    #[arg(long, global = true, env = "MACC_BASE_URL", default_value = DEFAULT_BASE_URL)]
    pub base_url: String,

    /// Per-request timeout in seconds for the client commands
    #[arg(long, global = true, env = "MACC_TIMEOUT_SECS")]
    pub timeout: Option<u64>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the HTTP backend
    Serve {
        /// Interface to bind (default 0.0.0.0)
        #[arg(long)]
        host: Option<String>,

        /// Port to serve on (default 8000, or $PORT)
        #[arg(short, long)]
        port: Option<u16>,

        /// OpenRouter model id
        #[arg(long)]
        model: Option<String>,

        /// Run generated code briefly and report the result
        #[arg(long)]
        exec_check: bool,

        /// Also write logs to this file
        #[arg(long)]
        log_file: Option<PathBuf>,

        /// Config file (defaults to $MACC_CONFIG or .macc/macc.toml)
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Generate a project from a natural-language spec
    Generate {
        /// Project spec; prompted for when omitted
        spec: Option<String>,

        /// Target repository as owner/name or a GitHub URL
        #[arg(short, long)]
        repo: Option<String>,

        /// Stream generated code as it arrives instead of printing it at the end
        #[arg(long)]
        code: bool,

        /// Return the session id without waiting for completion
        #[arg(long)]
        no_wait: bool,

        /// Offer suggest/commit actions once generation finishes
        #[arg(short, long)]
        interactive: bool,
    },
    /// Apply a change request to a finished session
    Suggest {
        session_id: String,
        suggestion: String,

        /// Stream refined code as it arrives instead of printing it at the end
        #[arg(long)]
        code: bool,
    },
    /// Commit a session's code to GitHub
    Commit {
        session_id: String,

        /// Open the committed file in a browser
        #[arg(long)]
        open: bool,
    },
    /// Print pending messages for a session
    Updates {
        session_id: String,

        /// Keep polling until the session is done
        #[arg(short, long)]
        follow: bool,
    },
    /// Show or manage backend configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,

        /// Config file (defaults to $MACC_CONFIG or .macc/macc.toml)
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

#[derive(Subcommand, Clone)]
pub enum ConfigCommands {
    /// Show the resolved configuration
    Show,
    /// Validate configuration and required secrets
    Validate,
    /// Write a default config file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env is normal; real environment variables still apply.
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    let mut client = ApiClient::new(&cli.base_url);
    if let Some(secs) = cli.timeout {
        client = client.with_timeouts(Timeouts::uniform(std::time::Duration::from_secs(secs)));
    }

    match &cli.command {
        Commands::Serve {
            host,
            port,
            model,
            exec_check,
            log_file,
            config,
        } => {
            let overrides = macc::config::CliOverrides {
                host: host.clone(),
                port: *port,
                model: model.clone(),
                exec_check: *exec_check,
                log_file: log_file.clone(),
            };
            cmd::cmd_serve(config.as_deref(), overrides, cli.verbose).await?;
        }
        Commands::Generate {
            spec,
            repo,
            code,
            no_wait,
            interactive,
        } => {
            let opts = cmd::GenerateOptions {
                spec: spec.clone(),
                repo: repo.clone(),
                show_code: *code,
                no_wait: *no_wait,
                interactive: *interactive,
            };
            cmd::cmd_generate(&client, opts).await?;
        }
        Commands::Suggest {
            session_id,
            suggestion,
            code,
        } => cmd::cmd_suggest(&client, session_id, suggestion, *code).await?,
        Commands::Commit { session_id, open } => {
            cmd::cmd_commit(&client, session_id, *open).await?
        }
        Commands::Updates { session_id, follow } => {
            cmd::cmd_updates(&client, session_id, *follow).await?
        }
        Commands::Config { command, config } => {
            cmd::cmd_config(config.as_deref(), command.clone())?
        }
    }

    Ok(())
}
