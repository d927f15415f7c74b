//! Typed error hierarchy for MACC.
//!
//! One enum per seam where callers need to match on a cause:
//! - `ValidationError`: rejected user input (spec, suggestion, repo identifier)
//! - `LlmError`: chat-completion provider failures
//! - `GitHubError`: repository publishing failures
//! - `SessionError`: session lookups and state conflicts, mapped to HTTP statuses
//!
//! Glue code inside a single module keeps using `anyhow` with `.context(..)`.

use thiserror::Error;

/// Input rejected before any external call is made.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Project spec too short (minimum {min} characters)")]
    SpecTooShort { min: usize },

    #[error("Suggestion too short (minimum {min} characters)")]
    SuggestionTooShort { min: usize },

    #[error("Malformed repository '{input}': expected 'owner/name'")]
    MalformedRepo { input: String },
}

/// Errors from the LLM provider.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("LLM request failed: {0}")]
    Network(#[source] reqwest::Error),

    #[error("LLM API error {status}: {body}")]
    Api { status: u16, body: String },

    #[error("LLM response could not be parsed: {0}")]
    Parse(String),

    #[error("LLM response contained no choices")]
    EmptyResponse,
}

/// Errors from the GitHub publisher.
#[derive(Debug, Error)]
pub enum GitHubError {
    #[error("GitHub request failed: {0}")]
    Network(#[source] reqwest::Error),

    #[error("GitHub API error {status} on {endpoint}: {body}")]
    Api {
        endpoint: String,
        status: u16,
        body: String,
    },

    #[error("Repository name is empty")]
    EmptyRepoName,

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Errors surfaced by the session layer to the HTTP handlers.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Session not found")]
    NotFound,

    #[error("Session {0} is still running")]
    Busy(String),

    #[error("Session has no generated code yet")]
    NoCode,

    #[error("No repo name in session")]
    NoRepo,
}
