use serde::de::DeserializeOwned;
use std::path::Path;
use std::sync::Arc;

use crate::command::{CommandRunner, SfCli};
use crate::error::{Error, Outcome, Result};
use crate::models::{ApexLogRecord, Envelope, LogSummary, OrgUser, QueryResult, UserRecord};
use crate::session::SessionStore;

const USER_SEARCH_LIMIT: usize = 50;

pub fn apex_logs_query(user_id: &str) -> String {
    format!(
        "SELECT Id, LogUser.Name, LogLength, FORMAT(LastModifiedDate) FROM ApexLog \
         WHERE LogUserId='{}' ORDER BY LastModifiedDate DESC",
        escape_soql(user_id)
    )
}

pub fn user_search_query(term: &str) -> String {
    let term = escape_soql(term.trim());
    format!(
        "SELECT Id, Name, Username FROM User WHERE IsActive = true \
         AND (Name LIKE '%{term}%' OR Username LIKE '%{term}%') \
         ORDER BY Name LIMIT {USER_SEARCH_LIMIT}"
    )
}

/// Escape a value for use inside a single-quoted SOQL literal.
pub fn escape_soql(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '\'' => escaped.push_str("\\'"),
            '\n' => escaped.push_str("\\n"),
            '\r' => escaped.push_str("\\r"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Read-only queries against the org, run in the current project directory.
pub struct LogLister {
    runner: Arc<dyn CommandRunner>,
    cli: SfCli,
    session: Arc<SessionStore>,
}

impl LogLister {
    pub fn new(runner: Arc<dyn CommandRunner>, cli: SfCli, session: Arc<SessionStore>) -> Self {
        LogLister {
            runner,
            cli,
            session,
        }
    }

    /// Logs of the session's user, newest first. Empty when anything fails.
    pub async fn get_logs(&self) -> Outcome<Vec<LogSummary>> {
        let session = self.session.snapshot();
        let soql = apex_logs_query(&session.current_user_id);
        match self.query::<ApexLogRecord>(&soql, &session.project_path).await {
            Ok(records) => {
                tracing::debug!(count = records.len(), "listed apex logs");
                Outcome::ok(records.into_iter().map(LogSummary::from).collect())
            }
            Err(cause) => Outcome::degraded(Vec::new(), cause),
        }
    }

    /// Active org users whose name or username contains `term`.
    pub async fn search_users(&self, term: &str) -> Outcome<Vec<OrgUser>> {
        let session = self.session.snapshot();
        let soql = user_search_query(term);
        match self.query::<UserRecord>(&soql, &session.project_path).await {
            Ok(records) => Outcome::ok(records.into_iter().map(OrgUser::from).collect()),
            Err(cause) => Outcome::degraded(Vec::new(), cause),
        }
    }

    async fn query<T: DeserializeOwned>(&self, soql: &str, cwd: &str) -> Result<Vec<T>> {
        let output = self
            .cli
            .invoke(self.runner.as_ref(), &SfCli::query_args(soql), Path::new(cwd))
            .await?;
        let envelope: Envelope<QueryResult<T>> = serde_json::from_str(&output)?;
        envelope
            .result
            .map(|result| result.records)
            .ok_or(Error::MissingResult)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn logs_query_filters_and_orders() {
        let soql = apex_logs_query("005000000000001");
        assert!(soql.contains("FROM ApexLog WHERE LogUserId='005000000000001'"));
        assert!(soql.ends_with("ORDER BY LastModifiedDate DESC"));
        assert!(soql.contains("FORMAT(LastModifiedDate)"));
    }

    #[test]
    fn search_term_is_escaped() {
        let soql = user_search_query(" o'brien ");
        assert!(soql.contains("Name LIKE '%o\\'brien%'"));
        assert!(soql.contains("Username LIKE '%o\\'brien%'"));
        assert!(soql.ends_with("LIMIT 50"));
    }

    #[test]
    fn backslashes_are_doubled() {
        assert_eq!(escape_soql(r"a\b"), r"a\\b");
    }
}
