use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("`{program}` exited with {status}: {stderr}")]
    CommandFailed {
        program: String,
        status: String,
        stderr: String,
    },

    #[error("`{program}` did not finish within {timeout:?}")]
    CommandTimedOut { program: String, timeout: Duration },

    #[error("`{0}` produced no output")]
    EmptyOutput(String),

    #[error("Command output has no `result` payload")]
    MissingResult,

    #[error("No connected org session")]
    NotConnected,

    #[error("Working directory not found: {0}")]
    ProjectNotFound(PathBuf),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Whether the failure came from the external command rather than from
    /// parsing what it printed.
    pub fn is_command_failure(&self) -> bool {
        matches!(
            self,
            Error::CommandFailed { .. }
                | Error::CommandTimedOut { .. }
                | Error::ProjectNotFound(_)
                | Error::Io(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// A value that is always well-formed, plus the failure (if any) that forced
/// it to its default.
///
/// Authentication and listing never fail their caller; instead they degrade to
/// `false` or an empty list and keep the cause here so the boundary can log it.
#[derive(Debug)]
pub struct Outcome<T> {
    pub value: T,
    pub diagnostic: Option<Error>,
}

impl<T> Outcome<T> {
    pub fn ok(value: T) -> Self {
        Outcome {
            value,
            diagnostic: None,
        }
    }

    pub fn degraded(value: T, cause: Error) -> Self {
        Outcome {
            value,
            diagnostic: Some(cause),
        }
    }

    pub fn is_degraded(&self) -> bool {
        self.diagnostic.is_some()
    }

    pub fn into_value(self) -> T {
        self.value
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
        Outcome {
            value: f(self.value),
            diagnostic: self.diagnostic,
        }
    }

    /// Log the diagnostic at `warn` and return the value.
    pub fn logged(self, operation: &str) -> T {
        if let Some(cause) = &self.diagnostic {
            tracing::warn!(operation, error = %cause, "degraded to default result");
        }
        self.value
    }
}
