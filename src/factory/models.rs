use serde::{Deserialize, Serialize};

// ── Request payloads ─────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectRequest {
    pub spec: String,
    #[serde(default)]
    pub github_repo: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuggestionRequest {
    pub session_id: String,
    pub suggestion: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommitRequest {
    pub session_id: String,
}

// ── Response payloads ────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionResponse {
    pub session_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdatesResponse {
    pub messages: Vec<SessionMessage>,
    pub done: bool,
    pub repo_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommitResponse {
    pub status: String,
    pub repo_url: String,
}

// ── Session messages ─────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    Status,
    Code,
}

impl MessageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Status => "status",
            Self::Code => "code",
        }
    }
}

/// One queued update, drained by `GET /updates/{session_id}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionMessage {
    #[serde(rename = "type")]
    pub kind: MessageKind,
    pub message: String,
}

impl SessionMessage {
    pub fn status(message: impl Into<String>) -> Self {
        Self {
            kind: MessageKind::Status,
            message: message.into(),
        }
    }

    pub fn code(message: impl Into<String>) -> Self {
        Self {
            kind: MessageKind::Code,
            message: message.into(),
        }
    }
}

// ── Project context ──────────────────────────────────────────────────

/// Where generated code should be published.
///
/// Auto-generated names carry no owner; the publisher resolves them to the
/// authenticated GitHub user at commit time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RepoTarget {
    pub owner: Option<String>,
    pub name: String,
}

impl RepoTarget {
    pub fn display_name(&self) -> String {
        match &self.owner {
            Some(owner) => format!("{}/{}", owner, self.name),
            None => self.name.clone(),
        }
    }
}

impl From<crate::validation::RepoRef> for RepoTarget {
    fn from(r: crate::validation::RepoRef) -> Self {
        Self {
            owner: Some(r.owner),
            name: r.name,
        }
    }
}

/// Final state of a generation, refined in place by suggestions.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectContext {
    pub spec: String,
    pub repo: Option<RepoTarget>,
    pub tasks: Vec<String>,
    pub code: String,
    pub readme: String,
    pub repo_url: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_serializes_with_type_field() {
        let msg = SessionMessage::status("Planner completed.");
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "status");
        assert_eq!(json["message"], "Planner completed.");

        let code = serde_json::to_value(SessionMessage::code("print(1)")).unwrap();
        assert_eq!(code["type"], "code");
    }

    #[test]
    fn test_project_request_repo_optional() {
        let req: ProjectRequest = serde_json::from_str(r#"{"spec": "a cli"}"#).unwrap();
        assert_eq!(req.spec, "a cli");
        assert!(req.github_repo.is_none());

        let req: ProjectRequest =
            serde_json::from_str(r#"{"spec": "a cli", "github_repo": ""}"#).unwrap();
        assert_eq!(req.github_repo.as_deref(), Some(""));
    }

    #[test]
    fn test_message_kind_wire_names() {
        assert_eq!(MessageKind::Status.as_str(), "status");
        assert_eq!(MessageKind::Code.as_str(), "code");
        let kind: MessageKind = serde_json::from_str(r#""code""#).unwrap();
        assert_eq!(kind, MessageKind::Code);
        assert!(serde_json::from_str::<MessageKind>(r#""other""#).is_err());
    }

    #[test]
    fn test_repo_target_display_name() {
        let auto = RepoTarget {
            owner: None,
            name: "weather-cli-a1b2c3".to_string(),
        };
        assert_eq!(auto.display_name(), "weather-cli-a1b2c3");

        let explicit = RepoTarget {
            owner: Some("octocat".to_string()),
            name: "hello".to_string(),
        };
        assert_eq!(explicit.display_name(), "octocat/hello");
    }

    #[test]
    fn test_updates_response_null_repo_url() {
        let resp = UpdatesResponse {
            messages: vec![],
            done: false,
            repo_url: None,
        };
        let json = serde_json::to_value(&resp).unwrap();
        assert!(json["repo_url"].is_null());
        assert_eq!(json["done"], false);
    }
}
