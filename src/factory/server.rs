use std::sync::Arc;

use anyhow::{Context, Result};
use axum::Router;
use tower_http::cors::CorsLayer;

use super::agents::Crew;
use super::api::{self, AppState, SharedState};
use super::github::{CodePublisher, GitHubClient, is_valid_github_token};
use super::llm::{ChatModel, OpenRouterClient};
use super::pipeline::PipelineRunner;
use super::sandbox::CodeExecTool;
use super::sessions::SessionStore;
use crate::config::{AppConfig, Secrets};

/// Assemble shared state from a chat model and a publisher.
pub fn build_state(
    config: &AppConfig,
    model: Arc<dyn ChatModel>,
    publisher: Arc<dyn CodePublisher>,
) -> SharedState {
    let sessions = SessionStore::new();
    let crew = Arc::new(Crew::new(model, config.max_concurrent_runs));
    let mut pipeline_runner = PipelineRunner::new(crew, sessions.clone());
    if config.exec_check {
        pipeline_runner = pipeline_runner.with_exec_check(CodeExecTool::default());
    }

    Arc::new(AppState {
        sessions,
        pipeline_runner,
        publisher,
        filename: config.filename.clone(),
        session_ttl: chrono::Duration::seconds(config.session_ttl_secs.min(u32::MAX as u64) as i64),
    })
}

/// Build the full application router. CORS is open to any origin.
pub fn build_router(state: SharedState) -> Router {
    api::api_router()
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Start the backend and serve until Ctrl+C.
pub async fn start_server(config: AppConfig, secrets: Secrets) -> Result<()> {
    if !is_valid_github_token(&secrets.github_token) {
        tracing::warn!("GITHUB_TOKEN does not look like a GitHub token; commits will likely fail");
    }

    let model = OpenRouterClient::new(
        &config.llm_base_url,
        &secrets.openrouter_api_key,
        &config.model,
    );
    tracing::info!(
        model = %model.model(),
        max_concurrent_runs = config.max_concurrent_runs,
        exec_check = config.exec_check,
        "Agents configured"
    );
    let publisher = GitHubClient::new(&secrets.github_token);
    let state = build_state(&config, Arc::new(model), Arc::new(publisher));
    let app = build_router(state);

    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    let local_addr = listener.local_addr()?;
    tracing::info!("MACC API running at http://{}", local_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    tracing::info!("Server shut down gracefully.");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for Ctrl+C");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down...");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::{GitHubError, LlmError};
    use crate::factory::models::RepoTarget;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    struct SilentModel;

    #[async_trait]
    impl ChatModel for SilentModel {
        async fn complete(&self, _system: &str, _prompt: &str) -> Result<String, LlmError> {
            Err(LlmError::EmptyResponse)
        }
    }

    struct NullPublisher;

    #[async_trait]
    impl CodePublisher for NullPublisher {
        async fn push(
            &self,
            _target: &RepoTarget,
            _code: &str,
            _filename: &str,
            _readme: Option<&str>,
        ) -> Result<String, GitHubError> {
            Err(GitHubError::EmptyRepoName)
        }
    }

    fn test_router(config: &AppConfig) -> Router {
        build_router(build_state(
            config,
            Arc::new(SilentModel),
            Arc::new(NullPublisher),
        ))
    }

    #[test]
    fn test_build_state_uses_config() {
        let config = AppConfig {
            filename: "app.py".to_string(),
            session_ttl_secs: 60,
            max_concurrent_runs: 2,
            ..AppConfig::default()
        };
        let state = build_state(&config, Arc::new(SilentModel), Arc::new(NullPublisher));
        assert_eq!(state.filename, "app.py");
        assert_eq!(state.session_ttl, chrono::Duration::seconds(60));
        assert!(state.sessions.is_empty());
    }

    #[tokio::test]
    async fn test_health_through_full_router() {
        let app = test_router(&AppConfig::default());
        let resp = app
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body = resp.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], b"ok");
    }

    #[tokio::test]
    async fn test_cors_allows_any_origin() {
        let app = test_router(&AppConfig::default());
        let resp = app
            .oneshot(
                Request::builder()
                    .method("OPTIONS")
                    .uri("/generate-project")
                    .header("origin", "http://localhost:8501")
                    .header("access-control-request-method", "POST")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            resp.headers()
                .get("access-control-allow-origin")
                .and_then(|v| v.to_str().ok()),
            Some("*")
        );
    }

    #[tokio::test]
    async fn test_unknown_route_404() {
        let app = test_router(&AppConfig::default());
        let resp = app
            .oneshot(
                Request::builder()
                    .uri("/nope")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }
}
