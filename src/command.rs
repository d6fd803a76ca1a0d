use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

use crate::ansi::strip_ansi;
use crate::error::{Error, Result};

/// Runs an external program in a working directory and hands back its stdout.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, program: &str, args: &[String], cwd: &Path) -> Result<String>;
}

/// Process-backed runner for the Salesforce CLI.
#[derive(Debug, Clone, Default)]
pub struct ProcessRunner {
    timeout: Option<Duration>,
}

impl ProcessRunner {
    pub fn new(timeout: Option<Duration>) -> Self {
        ProcessRunner { timeout }
    }
}

#[async_trait]
impl CommandRunner for ProcessRunner {
    async fn run(&self, program: &str, args: &[String], cwd: &Path) -> Result<String> {
        if !cwd.is_dir() {
            return Err(Error::ProjectNotFound(cwd.to_path_buf()));
        }

        tracing::debug!(program, ?args, cwd = %cwd.display(), "running command");

        let mut command = Command::new(program);
        command
            .current_dir(cwd)
            .args(args)
            .stdin(Stdio::null())
            .kill_on_drop(true);
        let child = command.output();

        let output = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, child)
                .await
                .map_err(|_| Error::CommandTimedOut {
                    program: program.to_string(),
                    timeout: limit,
                })??,
            None => child.await?,
        };

        let stderr = String::from_utf8_lossy(&output.stderr);
        if !stderr.trim().is_empty() {
            tracing::debug!(program, stderr = %stderr.trim(), "command wrote to stderr");
        }

        if !output.status.success() {
            return Err(Error::CommandFailed {
                program: program.to_string(),
                status: output.status.to_string(),
                stderr: strip_ansi(stderr.trim()),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// The `sf` invocations the core relies on.
#[derive(Debug, Clone)]
pub struct SfCli {
    program: String,
}

impl SfCli {
    pub fn new(program: impl Into<String>) -> Self {
        SfCli {
            program: program.into(),
        }
    }

    /// `sf org display user --json`
    pub fn display_user_args() -> Vec<String> {
        ["org", "display", "user", "--json"]
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    /// `sf data query --query <soql> --json`
    pub fn query_args(soql: &str) -> Vec<String> {
        vec![
            "data".to_string(),
            "query".to_string(),
            "--query".to_string(),
            soql.to_string(),
            "--json".to_string(),
        ]
    }

    /// Run `args` and return the output with terminal styling removed.
    pub async fn invoke(
        &self,
        runner: &dyn CommandRunner,
        args: &[String],
        cwd: &Path,
    ) -> Result<String> {
        let stdout = runner.run(&self.program, args, cwd).await?;
        let clean = strip_ansi(&stdout);
        if clean.trim().is_empty() {
            return Err(Error::EmptyOutput(self.program.clone()));
        }
        Ok(clean)
    }
}

impl Default for SfCli {
    fn default() -> Self {
        SfCli::new("sf")
    }
}
