//! Configuration view and validation commands: `macc config`.

use std::path::Path;

use anyhow::{Context, Result};

use super::super::ConfigCommands;

pub fn cmd_config(config_path: Option<&Path>, command: Option<ConfigCommands>) -> Result<()> {
    use macc::config::{AppConfig, CliOverrides, Secrets};

    let path = AppConfig::config_path(config_path);

    match command {
        None | Some(ConfigCommands::Show) => {
            println!();
            println!("MACC Configuration");
            println!("==================");
            println!();
            if path.exists() {
                println!("Config file: {}", path.display());
            } else {
                println!("No config file at {} (using defaults)", path.display());
            }
            println!();

            println!("Effective values (with env overrides):");
            let config = AppConfig::resolve(Some(&path), CliOverrides::default())?;
            for line in config.to_toml()?.lines() {
                println!("  {}", line);
            }
            println!();
        }
        Some(ConfigCommands::Validate) => {
            println!();
            println!("Validating configuration...");
            println!();

            AppConfig::resolve(Some(&path), CliOverrides::default())?;
            println!("Configuration is valid.");

            match Secrets::from_env() {
                Ok(_) => println!("OPENROUTER_API_KEY and GITHUB_TOKEN are set."),
                Err(e) => println!("Warning: {}", e),
            }
            println!();
        }
        Some(ConfigCommands::Init { force }) => {
            if path.exists() && !force {
                println!("Config already exists at {}", path.display());
                println!("Pass --force to overwrite it.");
                return Ok(());
            }
            if let Some(parent) = path.parent()
                && !parent.as_os_str().is_empty()
            {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create {}", parent.display()))?;
            }
            std::fs::write(&path, AppConfig::default().to_toml()?)
                .with_context(|| format!("Failed to write {}", path.display()))?;

            println!("Created {}", path.display());
            println!();
            println!("You can now customize:");
            println!("  - [server] host, port, session_ttl_secs, log_file");
            println!("  - [agents] model, llm_base_url, max_concurrent_runs, exec_check, filename");
            println!();
        }
    }

    Ok(())
}
