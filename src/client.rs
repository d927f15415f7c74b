//! HTTP client for the MACC backend, used by the command-line frontend.

use std::time::Duration;

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;

use crate::factory::github::parse_owner_repo_from_url;
use crate::factory::models::{
    CommitRequest, CommitResponse, ProjectRequest, SessionMessage, SessionResponse,
    SuggestionRequest, UpdatesResponse,
};

pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";
pub const POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Per-call request timeouts.
#[derive(Debug, Clone, Copy)]
pub struct Timeouts {
    pub generate: Duration,
    pub updates: Duration,
    pub suggest: Duration,
    pub commit: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            generate: Duration::from_secs(15),
            updates: Duration::from_secs(30),
            suggest: Duration::from_secs(10),
            commit: Duration::from_secs(20),
        }
    }
}

impl Timeouts {
    /// The same limit for every call.
    pub fn uniform(limit: Duration) -> Self {
        Self {
            generate: limit,
            updates: limit,
            suggest: limit,
            commit: limit,
        }
    }
}

pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    timeouts: Timeouts,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            timeouts: Timeouts::default(),
        }
    }

    pub fn with_timeouts(mut self, timeouts: Timeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Start generation; returns the new session id.
    pub async fn start_generation(&self, spec: &str, github_repo: Option<&str>) -> Result<String> {
        let body = ProjectRequest {
            spec: spec.to_string(),
            github_repo: github_repo.map(str::to_string),
        };
        let resp: SessionResponse = self
            .post("/generate-project", &body, self.timeouts.generate)
            .await?;
        Ok(resp.session_id)
    }

    /// Fetch and drain pending messages for a session.
    pub async fn updates(&self, session_id: &str) -> Result<UpdatesResponse> {
        let path = format!("/updates/{}", session_id);
        let resp = self
            .http
            .get(self.url(&path))
            .timeout(self.timeouts.updates)
            .send()
            .await
            .with_context(|| format!("Failed to reach MACC backend at {}", self.base_url))?;
        decode(&path, resp).await
    }

    /// Poll until the session reports `done`, handing every message to
    /// `on_message` in order. Returns the final updates snapshot.
    pub async fn poll_updates<F>(
        &self,
        session_id: &str,
        interval: Duration,
        mut on_message: F,
    ) -> Result<UpdatesResponse>
    where
        F: FnMut(&SessionMessage),
    {
        loop {
            let updates = self.updates(session_id).await?;
            for message in &updates.messages {
                on_message(message);
            }
            if updates.done {
                return Ok(updates);
            }
            tokio::time::sleep(interval).await;
        }
    }

    /// Ask the reviewer to apply a suggestion to the session's current code.
    pub async fn start_refine(&self, session_id: &str, suggestion: &str) -> Result<String> {
        let body = SuggestionRequest {
            session_id: session_id.to_string(),
            suggestion: suggestion.to_string(),
        };
        let resp: SessionResponse = self
            .post("/suggest-changes", &body, self.timeouts.suggest)
            .await?;
        Ok(resp.session_id)
    }

    pub async fn commit(&self, session_id: &str) -> Result<CommitResponse> {
        let body = CommitRequest {
            session_id: session_id.to_string(),
        };
        self.post("/commit", &body, self.timeouts.commit).await
    }

    async fn post<B, T>(&self, path: &str, body: &B, timeout: Duration) -> Result<T>
    where
        B: serde::Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let resp = self
            .http
            .post(self.url(path))
            .timeout(timeout)
            .json(body)
            .send()
            .await
            .with_context(|| format!("Failed to reach MACC backend at {}", self.base_url))?;
        decode(path, resp).await
    }
}

async fn decode<T: DeserializeOwned>(path: &str, resp: reqwest::Response) -> Result<T> {
    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        anyhow::bail!("{} failed ({}): {}", path, status.as_u16(), error_message(&body));
    }
    resp.json::<T>()
        .await
        .with_context(|| format!("Failed to parse {} response", path))
}

/// Pull the human-readable message out of an error body.
///
/// The backend answers `{"error": ".."}`; anything else is shown verbatim.
pub fn error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            v.get("error")
                .or_else(|| v.get("detail"))
                .and_then(|m| m.as_str())
                .map(str::to_string)
        })
        .unwrap_or_else(|| body.trim().to_string())
}

/// Accept `owner/name` or a GitHub URL for the target repository.
pub fn normalize_repo_arg(input: &str) -> String {
    let trimmed = input.trim();
    if trimmed.starts_with("https://") {
        parse_owner_repo_from_url(trimmed).unwrap_or_else(|| trimmed.to_string())
    } else {
        trimmed.to_string()
    }
}
