//! OpenAI-compatible chat-completions client (OpenRouter by default).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::errors::LlmError;

/// Abstraction over a chat model for testability.
/// Real implementation: `OpenRouterClient`. Test doubles live next to the tests.
#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn complete(&self, system: &str, prompt: &str) -> Result<String, LlmError>;
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

pub struct OpenRouterClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl OpenRouterClient {
    pub fn new(base_url: &str, api_key: &str, model: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }
}

fn build_messages(system: &str, prompt: &str) -> Vec<ChatMessage> {
    vec![
        ChatMessage {
            role: "system".to_string(),
            content: system.to_string(),
        },
        ChatMessage {
            role: "user".to_string(),
            content: prompt.to_string(),
        },
    ]
}

fn first_choice_text(body: &str) -> Result<String, LlmError> {
    let parsed: ChatResponse =
        serde_json::from_str(body).map_err(|e| LlmError::Parse(e.to_string()))?;
    let choice = parsed.choices.into_iter().next().ok_or(LlmError::EmptyResponse)?;
    Ok(choice.message.content.unwrap_or_default())
}

#[async_trait]
impl ChatModel for OpenRouterClient {
    async fn complete(&self, system: &str, prompt: &str) -> Result<String, LlmError> {
        let request = ChatRequest {
            model: &self.model,
            messages: build_messages(system, prompt),
        };

        tracing::debug!(model = %self.model, prompt_len = prompt.len(), "Sending chat completion");
        let resp = self
            .http
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .header("X-Title", "MACC")
            .json(&request)
            .send()
            .await
            .map_err(LlmError::Network)?;

        let status = resp.status();
        let body = resp.text().await.map_err(LlmError::Network)?;
        if !status.is_success() {
            return Err(LlmError::Api {
                status: status.as_u16(),
                body,
            });
        }
        first_choice_text(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_trims_trailing_slash() {
        let client = OpenRouterClient::new("https://openrouter.ai/api/v1/", "k", "m");
        assert_eq!(client.endpoint(), "https://openrouter.ai/api/v1/chat/completions");
        assert_eq!(client.model(), "m");
    }

    #[test]
    fn test_request_shape() {
        let req = ChatRequest {
            model: "x-ai/grok-4-fast:free",
            messages: build_messages("You are a Coder.", "Write code"),
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["model"], "x-ai/grok-4-fast:free");
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][1]["role"], "user");
        assert_eq!(json["messages"][1]["content"], "Write code");
    }

    #[test]
    fn test_first_choice_text() {
        let body = r#"{"id":"gen-1","choices":[{"index":0,"message":{"role":"assistant","content":"print('hi')"}}]}"#;
        assert_eq!(first_choice_text(body).unwrap(), "print('hi')");
    }

    #[test]
    fn test_null_content_is_empty_string() {
        let body = r#"{"choices":[{"message":{"role":"assistant","content":null}}]}"#;
        assert_eq!(first_choice_text(body).unwrap(), "");
    }

    #[test]
    fn test_no_choices_is_error() {
        let err = first_choice_text(r#"{"choices":[]}"#).unwrap_err();
        assert!(matches!(err, LlmError::EmptyResponse));
    }

    #[test]
    fn test_garbage_body_is_parse_error() {
        let err = first_choice_text("<html>bad gateway</html>").unwrap_err();
        assert!(matches!(err, LlmError::Parse(_)));
    }

    async fn spawn_provider(status: u16, reply: &'static str) -> OpenRouterClient {
        use axum::{Router, http::HeaderMap, http::StatusCode, routing::post};

        let app = Router::new().route(
            "/chat/completions",
            post(move |headers: HeaderMap, body: String| async move {
                let auth = headers
                    .get("authorization")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or_default()
                    .to_string();
                if auth != "Bearer sk-or-test" {
                    return (StatusCode::UNAUTHORIZED, "no auth".to_string());
                }
                let req: serde_json::Value = serde_json::from_str(&body).unwrap();
                assert_eq!(req["model"], "test/model");
                (StatusCode::from_u16(status).unwrap(), reply.to_string())
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        OpenRouterClient::new(&format!("http://{}/", addr), "sk-or-test", "test/model")
    }

    #[tokio::test]
    async fn test_complete_returns_first_choice() {
        let client = spawn_provider(
            200,
            r#"{"choices":[{"message":{"role":"assistant","content":"print('ok')"}}]}"#,
        )
        .await;
        let text = client.complete("You are the Coder.", "hello").await.unwrap();
        assert_eq!(text, "print('ok')");
    }

    #[tokio::test]
    async fn test_complete_surfaces_api_error() {
        let client = spawn_provider(503, "upstream overloaded").await;
        match client.complete("sys", "hello").await.unwrap_err() {
            LlmError::Api { status, body } => {
                assert_eq!(status, 503);
                assert_eq!(body, "upstream overloaded");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_complete_unreachable_is_network_error() {
        let client = OpenRouterClient::new("http://127.0.0.1:9", "k", "m");
        let err = client.complete("sys", "hello").await.unwrap_err();
        assert!(matches!(err, LlmError::Network(_)));
    }
}
