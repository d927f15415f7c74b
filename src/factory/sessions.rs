use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use super::models::{ProjectContext, SessionMessage, UpdatesResponse};
use crate::errors::SessionError;

/// One generation session: pending messages, completion flag and the last
/// generated project.
#[derive(Debug, Clone)]
pub struct Session {
    pub messages: Vec<SessionMessage>,
    pub done: bool,
    pub context: ProjectContext,
    pub created_at: DateTime<Utc>,
}

impl Session {
    fn new() -> Self {
        Self {
            messages: Vec::new(),
            done: false,
            context: ProjectContext::default(),
            created_at: Utc::now(),
        }
    }
}

/// Shared, in-process session table.
///
/// Every operation holds the lock only for in-memory bookkeeping, never
/// across an `.await`, so a std mutex is sufficient.
#[derive(Clone, Default)]
pub struct SessionStore {
    inner: Arc<Mutex<HashMap<String, Session>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Session>> {
        // Sessions hold plain data; a panic elsewhere cannot leave them half-written.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Run a closure against one session. Returns `NotFound` for unknown ids.
    pub fn with<F, R>(&self, id: &str, f: F) -> Result<R, SessionError>
    where
        F: FnOnce(&mut Session) -> R,
    {
        let mut sessions = self.lock();
        let session = sessions.get_mut(id).ok_or(SessionError::NotFound)?;
        Ok(f(session))
    }

    /// Create a fresh, running session and return its id.
    pub fn create(&self) -> String {
        let id = Uuid::new_v4().to_string();
        self.lock().insert(id.clone(), Session::new());
        id
    }

    pub fn contains(&self, id: &str) -> bool {
        self.lock().contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Queue a message. Messages for sessions that were purged are dropped.
    pub fn push(&self, id: &str, message: SessionMessage) {
        if self.with(id, |s| s.messages.push(message)).is_err() {
            tracing::debug!(session_id = %id, "Dropping message for unknown session");
        }
    }

    pub fn status(&self, id: &str, text: impl Into<String>) {
        let text = text.into();
        tracing::info!(session_id = %id, "{}", text);
        self.push(id, SessionMessage::status(text));
    }

    /// Queue every line of `code` as its own `code` message.
    pub fn code_lines(&self, id: &str, code: &str) {
        let _ = self.with(id, |s| {
            s.messages
                .extend(code.lines().map(SessionMessage::code));
        });
    }

    /// Take all queued messages along with the done flag and repo URL.
    pub fn drain(&self, id: &str) -> Result<UpdatesResponse, SessionError> {
        self.with(id, |s| UpdatesResponse {
            messages: std::mem::take(&mut s.messages),
            done: s.done,
            repo_url: s.context.repo_url.clone(),
        })
    }

    pub fn finish(&self, id: &str) {
        let _ = self.with(id, |s| s.done = true);
    }

    /// Mark a finished session as running again for a refinement.
    ///
    /// Fails with `Busy` while the previous run is still in progress and with
    /// `NoCode` when there is nothing to refine.
    pub fn begin_refinement(&self, id: &str) -> Result<String, SessionError> {
        self.with(id, |s| {
            if !s.done {
                return Err(SessionError::Busy(id.to_string()));
            }
            if s.context.code.trim().is_empty() {
                return Err(SessionError::NoCode);
            }
            s.done = false;
            Ok(s.context.code.clone())
        })?
    }

    pub fn context(&self, id: &str) -> Result<ProjectContext, SessionError> {
        self.with(id, |s| s.context.clone())
    }

    pub fn set_context(&self, id: &str, context: ProjectContext) -> Result<(), SessionError> {
        self.with(id, |s| s.context = context)
    }

    /// Remove sessions created more than `ttl` ago. Returns how many were removed.
    pub fn purge_older_than(&self, ttl: Duration) -> usize {
        let cutoff = Utc::now() - ttl;
        let mut sessions = self.lock();
        let before = sessions.len();
        sessions.retain(|_, s| s.created_at >= cutoff);
        before - sessions.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::factory::models::MessageKind;

    #[test]
    fn test_create_is_running_and_empty() {
        let store = SessionStore::new();
        let id = store.create();
        assert!(store.contains(&id));
        let updates = store.drain(&id).unwrap();
        assert!(updates.messages.is_empty());
        assert!(!updates.done);
        assert!(updates.repo_url.is_none());
    }

    #[test]
    fn test_ids_are_unique_uuids() {
        let store = SessionStore::new();
        let a = store.create();
        let b = store.create();
        assert_ne!(a, b);
        assert!(Uuid::parse_str(&a).is_ok());
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_drain_clears_queue() {
        let store = SessionStore::new();
        let id = store.create();
        store.status(&id, "one");
        store.code_lines(&id, "a = 1\nb = 2");

        let first = store.drain(&id).unwrap();
        assert_eq!(first.messages.len(), 3);
        assert_eq!(first.messages[0], SessionMessage::status("one"));
        assert_eq!(first.messages[1].kind, MessageKind::Code);
        assert_eq!(first.messages[2].message, "b = 2");

        let second = store.drain(&id).unwrap();
        assert!(second.messages.is_empty());
    }

    #[test]
    fn test_unknown_session() {
        let store = SessionStore::new();
        assert!(matches!(store.drain("nope"), Err(SessionError::NotFound)));
        // pushing to an unknown session is a no-op
        store.status("nope", "ignored");
        assert!(store.is_empty());
    }

    #[test]
    fn test_finish_sets_done() {
        let store = SessionStore::new();
        let id = store.create();
        store.finish(&id);
        assert!(store.drain(&id).unwrap().done);
    }

    #[test]
    fn test_begin_refinement_busy_while_running() {
        let store = SessionStore::new();
        let id = store.create();
        assert!(matches!(
            store.begin_refinement(&id),
            Err(SessionError::Busy(_))
        ));
    }

    #[test]
    fn test_begin_refinement_requires_code() {
        let store = SessionStore::new();
        let id = store.create();
        store.finish(&id);
        assert!(matches!(store.begin_refinement(&id), Err(SessionError::NoCode)));
    }

    #[test]
    fn test_begin_refinement_returns_code_and_reopens() {
        let store = SessionStore::new();
        let id = store.create();
        store.set_context(
            &id,
            ProjectContext {
                code: "print(1)".to_string(),
                ..Default::default()
            },
        )
        .unwrap();
        store.finish(&id);

        assert_eq!(store.begin_refinement(&id).unwrap(), "print(1)");
        assert!(!store.drain(&id).unwrap().done);
    }

    #[test]
    fn test_repo_url_reported_in_updates() {
        let store = SessionStore::new();
        let id = store.create();
        store.set_context(
            &id,
            ProjectContext {
                repo_url: Some("https://github.com/o/r/blob/main/main.py".to_string()),
                ..Default::default()
            },
        )
        .unwrap();
        assert_eq!(
            store.drain(&id).unwrap().repo_url.as_deref(),
            Some("https://github.com/o/r/blob/main/main.py")
        );
    }

    #[test]
    fn test_purge_older_than() {
        let store = SessionStore::new();
        let old = store.create();
        let fresh = store.create();
        store
            .with(&old, |s| s.created_at = Utc::now() - Duration::hours(48))
            .unwrap();

        assert_eq!(store.purge_older_than(Duration::hours(24)), 1);
        assert!(!store.contains(&old));
        assert!(store.contains(&fresh));
    }
}
