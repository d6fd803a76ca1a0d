use std::fmt;
use std::sync::{Arc, RwLock};
use tokio::sync::{Mutex, MutexGuard};

use crate::models::ConnectionStatus;

/// The org identity derived from the last authentication attempt.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Session {
    pub project_path: String,
    pub is_connected: bool,
    pub instance_url: String,
    pub username: String,
    pub current_user_id: String,
    pub(crate) auth_token: String,
}

impl Session {
    pub fn status(&self) -> ConnectionStatus {
        ConnectionStatus {
            is_connected: self.is_connected,
            project_path: self.project_path.clone(),
            instance_url: self.instance_url.clone(),
            username: self.username.clone(),
            current_user_id: self.current_user_id.clone(),
        }
    }

    pub fn same_project(&self, path: &str) -> bool {
        self.project_path.to_lowercase() == path.to_lowercase()
    }

    /// A session for `path` that has not authenticated.
    pub fn disconnected(path: &str) -> Self {
        Session {
            project_path: path.to_string(),
            ..Session::default()
        }
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("project_path", &self.project_path)
            .field("is_connected", &self.is_connected)
            .field("instance_url", &self.instance_url)
            .field("username", &self.username)
            .field("current_user_id", &self.current_user_id)
            .field("auth_token", &if self.auth_token.is_empty() { "" } else { "<redacted>" })
            .finish()
    }
}

/// Holds the committed session. Readers get a cheap snapshot; the broker
/// writes through a gate that admits one writer at a time.
#[derive(Debug, Default)]
pub struct SessionStore {
    current: RwLock<Arc<Session>>,
    write_gate: Mutex<()>,
}

impl SessionStore {
    pub fn new() -> Self {
        SessionStore::default()
    }

    pub fn snapshot(&self) -> Arc<Session> {
        match self.current.read() {
            Ok(guard) => Arc::clone(&*guard),
            Err(poisoned) => Arc::clone(&*poisoned.into_inner()),
        }
    }

    /// Wait for exclusive write access. Held across the whole
    /// authenticate-then-commit sequence.
    pub(crate) async fn writer(&self) -> SessionWriter<'_> {
        SessionWriter {
            store: self,
            _gate: self.write_gate.lock().await,
        }
    }

    fn replace(&self, session: Session) {
        let next = Arc::new(session);
        match self.current.write() {
            Ok(mut guard) => *guard = next,
            Err(poisoned) => *poisoned.into_inner() = next,
        }
    }
}

pub(crate) struct SessionWriter<'a> {
    store: &'a SessionStore,
    _gate: MutexGuard<'a, ()>,
}

impl SessionWriter<'_> {
    pub fn current(&self) -> Arc<Session> {
        self.store.snapshot()
    }

    /// Swap in a fully built session.
    pub fn commit(&self, session: Session) {
        self.store.replace(session);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn connected() -> Session {
        Session {
            project_path: "/work/Org".into(),
            is_connected: true,
            instance_url: "https://org.my.salesforce.com".into(),
            username: "a@b.com".into(),
            current_user_id: "005x".into(),
            auth_token: "secret-token".into(),
        }
    }

    #[test]
    fn project_identity_ignores_case() {
        let session = connected();
        assert!(session.same_project("/WORK/org"));
        assert!(!session.same_project("/work/other"));
    }

    #[test]
    fn debug_output_redacts_token() {
        let printed = format!("{:?}", connected());
        assert!(!printed.contains("secret-token"));
        assert!(printed.contains("<redacted>"));
    }

    #[tokio::test]
    async fn snapshot_taken_before_commit_is_stable() {
        let store = SessionStore::new();
        let before = store.snapshot();
        store.writer().await.commit(connected());
        assert!(!before.is_connected);
        assert!(store.snapshot().is_connected);
    }

    #[tokio::test]
    async fn writers_are_serialized() {
        let store = Arc::new(SessionStore::new());
        let first = store.writer().await;

        let contender = {
            let store = Arc::clone(&store);
            tokio::spawn(async move {
                let writer = store.writer().await;
                writer.commit(Session::disconnected("/second"));
            })
        };

        tokio::task::yield_now().await;
        first.commit(connected());
        // Reads are not blocked by the held gate.
        assert_eq!(store.snapshot().project_path, "/work/Org");
        drop(first);

        contender.await.unwrap();
        assert_eq!(store.snapshot().project_path, "/second");
    }
}
