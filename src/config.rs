//! Layered configuration for the MACC backend.
//!
//! Values are resolved in this order, later layers winning:
//!
//! 1. built-in defaults
//! 2. `[server]` / `[agents]` sections of `.macc/macc.toml` (or the file named by `MACC_CONFIG`)
//! 3. environment variables (a `.env` file is loaded first via `dotenvy`)
//! 4. CLI flags
//!
//! Secrets (`OPENROUTER_API_KEY`, `GITHUB_TOKEN`) are only ever read from the
//! environment.
//!
//! ```toml
//! [server]
//! host = "0.0.0.0"
//! port = 8000
//! session_ttl_secs = 86400
//! log_file = "agent_logs.txt"
//!
//! [agents]
//! model = "x-ai/grok-4-fast:free"
//! llm_base_url = "https://openrouter.ai/api/v1"
//! max_concurrent_runs = 3
//! exec_check = false
//! filename = "main.py"
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

pub const DEFAULT_MODEL: &str = "x-ai/grok-4-fast:free";
pub const DEFAULT_LLM_BASE_URL: &str = "https://openrouter.ai/api/v1";
pub const DEFAULT_CONFIG_PATH: &str = ".macc/macc.toml";

/// Secrets required to talk to the two external services.
#[derive(Clone)]
pub struct Secrets {
    pub openrouter_api_key: String,
    pub github_token: String,
}

impl std::fmt::Debug for Secrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Secrets")
            .field("openrouter_api_key", &"<redacted>")
            .field("github_token", &"<redacted>")
            .finish()
    }
}

impl Secrets {
    /// Read both secrets from the environment. Missing or blank values are an error.
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            openrouter_api_key: required_env("OPENROUTER_API_KEY")?,
            github_token: required_env("GITHUB_TOKEN")?,
        })
    }
}

fn required_env(key: &str) -> Result<String> {
    match std::env::var(key) {
        Ok(v) if !v.trim().is_empty() => Ok(v.trim().to_string()),
        _ => anyhow::bail!("{} missing in environment", key),
    }
}

/// Resolved, non-secret settings for the backend.
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub model: String,
    pub llm_base_url: String,
    pub max_concurrent_runs: usize,
    pub session_ttl_secs: u64,
    pub exec_check: bool,
    pub log_file: Option<PathBuf>,
    pub filename: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            model: DEFAULT_MODEL.to_string(),
            llm_base_url: DEFAULT_LLM_BASE_URL.to_string(),
            max_concurrent_runs: 3,
            session_ttl_secs: 24 * 60 * 60,
            exec_check: false,
            log_file: None,
            filename: "main.py".to_string(),
        }
    }
}

/// Raw TOML structure for `.macc/macc.toml`
#[derive(Debug, Default, Serialize, Deserialize)]
struct ConfigToml {
    #[serde(skip_serializing_if = "Option::is_none")]
    server: Option<ServerSection>,
    #[serde(skip_serializing_if = "Option::is_none")]
    agents: Option<AgentsSection>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ServerSection {
    host: Option<String>,
    port: Option<u16>,
    session_ttl_secs: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    log_file: Option<PathBuf>,
}

#[derive(Debug, Serialize, Deserialize)]
struct AgentsSection {
    model: Option<String>,
    llm_base_url: Option<String>,
    max_concurrent_runs: Option<usize>,
    exec_check: Option<bool>,
    filename: Option<String>,
}

/// CLI-level overrides; `None` leaves the lower layer untouched.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub model: Option<String>,
    pub exec_check: bool,
    pub log_file: Option<PathBuf>,
}

impl AppConfig {
    /// Load the config file at `path`. Returns defaults if the file doesn't exist.
    pub fn load_file(path: &Path) -> Result<Self> {
        let mut config = Self::default();
        if !path.exists() {
            return Ok(config);
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        config.merge_toml(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        Ok(config)
    }

    fn merge_toml(&mut self, content: &str) -> Result<()> {
        let raw: ConfigToml = toml::from_str(content)?;
        if let Some(server) = raw.server {
            if let Some(host) = server.host {
                self.host = host;
            }
            if let Some(port) = server.port {
                self.port = port;
            }
            if let Some(ttl) = server.session_ttl_secs {
                self.session_ttl_secs = ttl;
            }
            if let Some(log_file) = server.log_file {
                self.log_file = Some(log_file);
            }
        }
        if let Some(agents) = raw.agents {
            if let Some(model) = agents.model {
                self.model = model;
            }
            if let Some(url) = agents.llm_base_url {
                self.llm_base_url = url;
            }
            if let Some(max) = agents.max_concurrent_runs {
                self.max_concurrent_runs = max;
            }
            if let Some(exec_check) = agents.exec_check {
                self.exec_check = exec_check;
            }
            if let Some(filename) = agents.filename {
                self.filename = filename;
            }
        }
        Ok(())
    }

    /// Apply environment overrides through a lookup function so tests can
    /// inject values without touching the process environment.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(port) = lookup("PORT") {
            self.port = port
                .trim()
                .parse()
                .with_context(|| format!("Invalid PORT value '{}'", port))?;
        }
        if let Some(model) = lookup("MACC_MODEL") {
            self.model = model;
        }
        if let Some(url) = lookup("MACC_LLM_BASE_URL") {
            self.llm_base_url = url;
        }
        if let Some(max) = lookup("MACC_MAX_CONCURRENT_RUNS") {
            self.max_concurrent_runs = max
                .trim()
                .parse()
                .with_context(|| format!("Invalid MACC_MAX_CONCURRENT_RUNS value '{}'", max))?;
        }
        if let Some(flag) = lookup("MACC_EXEC_CHECK") {
            self.exec_check = matches!(flag.trim(), "1" | "true" | "yes");
        }
        if let Some(path) = lookup("MACC_LOG_FILE") {
            self.log_file = Some(PathBuf::from(path));
        }
        Ok(())
    }

    pub fn apply_cli(&mut self, cli: CliOverrides) {
        if let Some(host) = cli.host {
            self.host = host;
        }
        if let Some(port) = cli.port {
            self.port = port;
        }
        if let Some(model) = cli.model {
            self.model = model;
        }
        if cli.exec_check {
            self.exec_check = true;
        }
        if let Some(log_file) = cli.log_file {
            self.log_file = Some(log_file);
        }
    }

    /// Resolve the full layered configuration from the real process environment.
    pub fn resolve(config_path: Option<&Path>, cli: CliOverrides) -> Result<Self> {
        let path = Self::config_path(config_path);
        let mut config = Self::load_file(&path)?;
        config.apply_env(|key| std::env::var(key).ok())?;
        config.apply_cli(cli);
        config.validate()?;
        Ok(config)
    }

    /// Explicit path, else `$MACC_CONFIG`, else `.macc/macc.toml`.
    pub fn config_path(explicit: Option<&Path>) -> PathBuf {
        match explicit {
            Some(p) => p.to_path_buf(),
            None => std::env::var("MACC_CONFIG")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from(DEFAULT_CONFIG_PATH)),
        }
    }

    /// Render as a config file that `load_file` reads back unchanged.
    pub fn to_toml(&self) -> Result<String> {
        let raw = ConfigToml {
            server: Some(ServerSection {
                host: Some(self.host.clone()),
                port: Some(self.port),
                session_ttl_secs: Some(self.session_ttl_secs),
                log_file: self.log_file.clone(),
            }),
            agents: Some(AgentsSection {
                model: Some(self.model.clone()),
                llm_base_url: Some(self.llm_base_url.clone()),
                max_concurrent_runs: Some(self.max_concurrent_runs),
                exec_check: Some(self.exec_check),
                filename: Some(self.filename.clone()),
            }),
        };
        toml::to_string_pretty(&raw).context("Failed to serialize macc.toml")
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_concurrent_runs == 0 {
            anyhow::bail!("max_concurrent_runs must be at least 1");
        }
        if self.filename.trim().is_empty() || self.filename.contains("..") {
            anyhow::bail!("Invalid output filename '{}'", self.filename);
        }
        Ok(())
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::fs;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.port, 8000);
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.model, DEFAULT_MODEL);
        assert_eq!(config.llm_base_url, "https://openrouter.ai/api/v1");
        assert_eq!(config.max_concurrent_runs, 3);
        assert_eq!(config.filename, "main.py");
        assert!(!config.exec_check);
        assert!(config.log_file.is_none());
    }

    #[test]
    fn test_load_missing_file_returns_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig::load_file(&dir.path().join("nope.toml")).unwrap();
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn test_load_full_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("macc.toml");
        fs::write(
            &path,
            r#"
[server]
host = "127.0.0.1"
port = 9090
session_ttl_secs = 60
log_file = "agent_logs.txt"

[agents]
model = "openai/gpt-4o-mini"
llm_base_url = "http://localhost:11434/v1"
max_concurrent_runs = 5
exec_check = true
filename = "app.py"
"#,
        )
        .unwrap();

        let config = AppConfig::load_file(&path).unwrap();
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 9090);
        assert_eq!(config.session_ttl_secs, 60);
        assert_eq!(config.log_file, Some(PathBuf::from("agent_logs.txt")));
        assert_eq!(config.model, "openai/gpt-4o-mini");
        assert_eq!(config.llm_base_url, "http://localhost:11434/v1");
        assert_eq!(config.max_concurrent_runs, 5);
        assert!(config.exec_check);
        assert_eq!(config.filename, "app.py");
    }

    #[test]
    fn test_load_partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("macc.toml");
        fs::write(&path, "[agents]\nmodel = \"m\"\n").unwrap();
        let config = AppConfig::load_file(&path).unwrap();
        assert_eq!(config.model, "m");
        assert_eq!(config.port, 8000);
    }

    #[test]
    fn test_load_invalid_toml_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("macc.toml");
        fs::write(&path, "[server\nport = ").unwrap();
        let err = AppConfig::load_file(&path).unwrap_err();
        assert!(format!("{:#}", err).contains("Failed to parse"));
    }

    #[test]
    fn test_env_overrides_file() {
        let mut config = AppConfig::default();
        config
            .apply_env(env(&[
                ("PORT", "7000"),
                ("MACC_MODEL", "env-model"),
                ("MACC_EXEC_CHECK", "1"),
            ]))
            .unwrap();
        assert_eq!(config.port, 7000);
        assert_eq!(config.model, "env-model");
        assert!(config.exec_check);
    }

    #[test]
    fn test_env_invalid_port_errors() {
        let mut config = AppConfig::default();
        let err = config.apply_env(env(&[("PORT", "eighty")])).unwrap_err();
        assert!(err.to_string().contains("Invalid PORT"));
    }

    #[test]
    fn test_cli_overrides_env() {
        let mut config = AppConfig::default();
        config.apply_env(env(&[("PORT", "7000")])).unwrap();
        config.apply_cli(CliOverrides {
            port: Some(7100),
            ..Default::default()
        });
        assert_eq!(config.port, 7100);
        assert_eq!(config.bind_addr(), "0.0.0.0:7100");
    }

    #[test]
    fn test_validate_rejects_zero_concurrency() {
        let config = AppConfig {
            max_concurrent_runs: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_traversal_filename() {
        let config = AppConfig {
            filename: "../evil.py".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_secrets_debug_is_redacted() {
        let secrets = Secrets {
            openrouter_api_key: "sk-or-secret".to_string(),
            github_token: "ghp_secret".to_string(),
        };
        let dbg = format!("{:?}", secrets);
        assert!(!dbg.contains("sk-or-secret"));
        assert!(!dbg.contains("ghp_secret"));
    }

    #[test]
    fn test_to_toml_reads_back() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("macc.toml");
        let config = AppConfig {
            port: 9001,
            model: "openai/gpt-4o-mini".to_string(),
            exec_check: true,
            log_file: Some(PathBuf::from("logs/agent_logs.txt")),
            ..Default::default()
        };
        fs::write(&path, config.to_toml().unwrap()).unwrap();
        assert_eq!(AppConfig::load_file(&path).unwrap(), config);
    }

    #[test]
    fn test_to_toml_escapes_unicode_and_quotes() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("macc.toml");
        let config = AppConfig {
            model: "cafe\u{301}".to_string(),
            filename: "say \"hi\"\\main.py".to_string(),
            log_file: Some(PathBuf::from("journaux/é.txt")),
            ..Default::default()
        };
        fs::write(&path, config.to_toml().unwrap()).unwrap();
        assert_eq!(AppConfig::load_file(&path).unwrap(), config);
    }

    #[test]
    fn test_to_toml_omits_unset_log_file() {
        let rendered = AppConfig::default().to_toml().unwrap();
        assert!(rendered.contains("[server]"));
        assert!(rendered.contains("[agents]"));
        assert!(!rendered.contains("log_file"));
    }

    #[test]
    fn test_config_path_explicit_wins() {
        assert_eq!(
            AppConfig::config_path(Some(Path::new("custom.toml"))),
            PathBuf::from("custom.toml")
        );
    }
}
