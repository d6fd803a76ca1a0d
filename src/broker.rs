use once_cell::sync::Lazy;
use regex::Regex;
use std::path::Path;
use std::sync::Arc;

use crate::command::{CommandRunner, SfCli};
use crate::error::{Error, Outcome, Result};
use crate::models::{ConnectionStatus, Envelope, UserInfo};
use crate::session::{Session, SessionStore};

static SALESFORCE_ID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z0-9]{15}(?:[a-zA-Z0-9]{3})?$").expect("valid id pattern"));

pub fn is_salesforce_id(candidate: &str) -> bool {
    SALESFORCE_ID.is_match(candidate)
}

/// Owns every change to the session: project switches, disconnects, and the
/// listed user.
pub struct ConnectionBroker {
    runner: Arc<dyn CommandRunner>,
    cli: SfCli,
    session: Arc<SessionStore>,
}

impl ConnectionBroker {
    pub fn new(runner: Arc<dyn CommandRunner>, cli: SfCli, session: Arc<SessionStore>) -> Self {
        ConnectionBroker {
            runner,
            cli,
            session,
        }
    }

    /// Point the broker at `path`, authenticating only when the path differs
    /// (case-insensitively) from the current one.
    pub async fn set_project_path(&self, path: &str) -> Outcome<bool> {
        let writer = self.session.writer().await;
        let current = writer.current();
        if current.same_project(path) {
            tracing::debug!(path, connected = current.is_connected, "project unchanged");
            return Outcome::ok(current.is_connected);
        }

        tracing::info!(path, "project changed, authenticating");
        match self.authenticate(path).await {
            Ok(session) => {
                let connected = session.is_connected;
                if connected {
                    tracing::info!(
                        instance_url = %session.instance_url,
                        username = %session.username,
                        "connected to org"
                    );
                } else {
                    tracing::warn!(path, "org identity incomplete, not connected");
                }
                writer.commit(session);
                Outcome::ok(connected)
            }
            Err(cause) => {
                if cause.is_command_failure() {
                    tracing::warn!(path, error = %cause, "sf could not report an org user");
                } else {
                    tracing::warn!(path, error = %cause, "unreadable org user output");
                }
                writer.commit(Session::disconnected(path));
                Outcome::degraded(false, cause)
            }
        }
    }

    async fn authenticate(&self, path: &str) -> Result<Session> {
        let output = self
            .cli
            .invoke(self.runner.as_ref(), &SfCli::display_user_args(), Path::new(path))
            .await?;
        let envelope: Envelope<UserInfo> = serde_json::from_str(&output)?;
        let info = envelope.result.ok_or(Error::MissingResult)?;
        Ok(session_from_user_info(path, info))
    }

    /// Drop the org identity but remember the project.
    pub async fn destroy_connection(&self) {
        let writer = self.session.writer().await;
        let current = writer.current();
        writer.commit(Session {
            project_path: current.project_path.clone(),
            username: current.username.clone(),
            ..Session::default()
        });
        tracing::info!("connection destroyed");
    }

    /// List logs for another org user. Only accepted while connected.
    pub async fn set_user_id(&self, user_id: &str) -> bool {
        let user_id = user_id.trim();
        if !is_salesforce_id(user_id) {
            tracing::warn!(user_id, "rejected malformed user id");
            return false;
        }

        let writer = self.session.writer().await;
        let current = writer.current();
        if !current.is_connected {
            return false;
        }

        writer.commit(Session {
            current_user_id: user_id.to_string(),
            ..(*current).clone()
        });
        true
    }

    pub fn status(&self) -> ConnectionStatus {
        self.session.snapshot().status()
    }

    pub fn project_path(&self) -> String {
        self.session.snapshot().project_path.clone()
    }

    pub fn instance_url(&self) -> String {
        self.session.snapshot().instance_url.clone()
    }

    pub fn username(&self) -> String {
        self.session.snapshot().username.clone()
    }

    pub fn current_user_id(&self) -> String {
        self.session.snapshot().current_user_id.clone()
    }
}

fn session_from_user_info(path: &str, info: UserInfo) -> Session {
    let current_user_id = info.id.unwrap_or_default();
    let instance_url = info
        .instance_url
        .unwrap_or_default()
        .trim_end_matches('/')
        .to_string();
    let auth_token = info.access_token.unwrap_or_default();
    let is_connected =
        !current_user_id.is_empty() && !instance_url.is_empty() && !auth_token.is_empty();

    Session {
        project_path: path.to_string(),
        is_connected,
        instance_url,
        username: info.username.unwrap_or_default(),
        current_user_id,
        auth_token,
    }
}
