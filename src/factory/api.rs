use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};

use super::github::CodePublisher;
use super::models::{
    CommitRequest, CommitResponse, ProjectRequest, SessionResponse, SuggestionRequest,
};
use super::pipeline::PipelineRunner;
use super::sessions::SessionStore;
use crate::errors::{SessionError, ValidationError};
use crate::validation::{parse_repo, validate_spec, validate_suggestion};

// ── Shared application state ──────────────────────────────────────────

pub struct AppState {
    pub sessions: SessionStore,
    pub pipeline_runner: PipelineRunner,
    pub publisher: Arc<dyn CodePublisher>,
    /// File name the generated code is committed as.
    pub filename: String,
    pub session_ttl: chrono::Duration,
}

pub type SharedState = Arc<AppState>;

// ── Error handling ────────────────────────────────────────────────────

#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    BadRequest(String),
    Conflict(String),
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };
        (status, Json(serde_json::json!({"error": message}))).into_response()
    }
}

impl From<ValidationError> for ApiError {
    fn from(e: ValidationError) -> Self {
        ApiError::BadRequest(e.to_string())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(e: JsonRejection) -> Self {
        ApiError::BadRequest(e.body_text())
    }
}

impl From<SessionError> for ApiError {
    fn from(e: SessionError) -> Self {
        match e {
            SessionError::NotFound => ApiError::NotFound(e.to_string()),
            SessionError::Busy(_) => ApiError::Conflict(e.to_string()),
            SessionError::NoCode | SessionError::NoRepo => ApiError::BadRequest(e.to_string()),
        }
    }
}

// ── Router ────────────────────────────────────────────────────────────

pub fn api_router() -> Router<SharedState> {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .route("/generate-project", post(generate_project))
        .route("/updates/{session_id}", get(get_updates))
        .route("/suggest-changes", post(suggest_changes))
        .route("/commit", post(commit))
}

// ── Handlers ──────────────────────────────────────────────────────────

async fn root() -> impl IntoResponse {
    Json(serde_json::json!({"message": "MACC API running - all good"}))
}

async fn health_check() -> &'static str {
    "ok"
}

/// Validate, open a session and start generation in the background.
async fn generate_project(
    State(state): State<SharedState>,
    payload: Result<Json<ProjectRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = payload?;
    let spec = validate_spec(&req.spec)?.to_string();
    let repo = parse_repo(req.github_repo.as_deref().unwrap_or_default())?;

    let purged = state.sessions.purge_older_than(state.session_ttl);
    if purged > 0 {
        tracing::info!(purged, "Purged expired sessions");
    }

    let session_id = state.sessions.create();
    tracing::info!(session_id = %session_id, "Generation requested");
    state
        .pipeline_runner
        .start_generation(session_id.clone(), spec, repo.map(Into::into));
    Ok(Json(SessionResponse { session_id }))
}

/// Drain queued messages for a session.
async fn get_updates(
    State(state): State<SharedState>,
    Path(session_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let updates = state.sessions.drain(&session_id)?;
    Ok(Json(updates))
}

async fn suggest_changes(
    State(state): State<SharedState>,
    payload: Result<Json<SuggestionRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = payload?;
    if !state.sessions.contains(&req.session_id) {
        return Err(SessionError::NotFound.into());
    }
    let suggestion = validate_suggestion(&req.suggestion)?.to_string();
    let current_code = state.sessions.begin_refinement(&req.session_id)?;
    tracing::info!(session_id = %req.session_id, "Refinement requested");
    state
        .pipeline_runner
        .start_refinement(req.session_id.clone(), suggestion, current_code);
    Ok(Json(SessionResponse {
        session_id: req.session_id,
    }))
}

async fn commit(
    State(state): State<SharedState>,
    payload: Result<Json<CommitRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(req) = payload?;
    let sid = req.session_id;
    let ctx = state.sessions.context(&sid)?;
    let repo = ctx.repo.ok_or(SessionError::NoRepo)?;
    if ctx.code.trim().is_empty() {
        return Err(SessionError::NoCode.into());
    }

    let readme = (!ctx.readme.is_empty()).then_some(ctx.readme.as_str());
    let url = state
        .publisher
        .push(&repo, &ctx.code, &state.filename, readme)
        .await
        .map_err(|e| {
            tracing::error!(session_id = %sid, error = %e, "Commit failed");
            ApiError::Internal(format!("GitHub commit failed: {}", e))
        })?;

    let stored_url = url.clone();
    state
        .sessions
        .with(&sid, move |s| s.context.repo_url = Some(stored_url))?;
    state
        .sessions
        .status(&sid, format!("Code committed to GitHub: {}", url));

    Ok(Json(CommitResponse {
        status: "committed".to_string(),
        repo_url: url,
    }))
}

// ── Tests ─────────────────────────────────────────────────────────────
