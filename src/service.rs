use std::sync::Arc;

use crate::broker::ConnectionBroker;
use crate::command::{CommandRunner, ProcessRunner, SfCli};
use crate::config::Settings;
use crate::error::{Outcome, Result};
use crate::extract::extract_method_name;
use crate::fetch::{HttpsTransport, LogBodyFetcher, LogTransport};
use crate::logs::LogLister;
use crate::models::{ConnectionStatus, LogInfo, LogSummary, OrgUser};
use crate::session::SessionStore;

/// Everything a front end needs, sharing one session.
pub struct LogService {
    broker: ConnectionBroker,
    lister: LogLister,
    fetcher: LogBodyFetcher,
}

impl LogService {
    pub fn new(
        settings: &Settings,
        runner: Arc<dyn CommandRunner>,
        transport: Arc<dyn LogTransport>,
    ) -> Self {
        let session = Arc::new(SessionStore::new());
        let cli = SfCli::new(settings.sf_bin.clone());
        LogService {
            broker: ConnectionBroker::new(Arc::clone(&runner), cli.clone(), Arc::clone(&session)),
            lister: LogLister::new(runner, cli, Arc::clone(&session)),
            fetcher: LogBodyFetcher::new(transport, session, settings.api_version.clone()),
        }
    }

    /// Real `sf` processes and HTTPS.
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let runner = Arc::new(ProcessRunner::new(settings.command_timeout()));
        let transport = Arc::new(HttpsTransport::new()?);
        Ok(LogService::new(settings, runner, transport))
    }

    pub fn broker(&self) -> &ConnectionBroker {
        &self.broker
    }

    pub async fn set_project_path(&self, path: &str) -> ConnectionStatus {
        self.broker.set_project_path(path).await.logged("set_project_path");
        self.broker.status()
    }

    pub fn status(&self) -> ConnectionStatus {
        self.broker.status()
    }

    pub async fn destroy_connection(&self) {
        self.broker.destroy_connection().await;
    }

    pub async fn get_logs(&self) -> Outcome<Vec<LogSummary>> {
        self.lister.get_logs().await
    }

    pub async fn search_users(&self, term: &str) -> Outcome<Vec<OrgUser>> {
        self.lister.search_users(term).await
    }

    pub async fn set_user_id(&self, user_id: &str) -> bool {
        self.broker.set_user_id(user_id).await
    }

    pub async fn get_log_body(&self, log_id: &str) -> Result<String> {
        self.fetcher.get_log_body(log_id).await
    }

    /// Fetch the head of a log and name the method that started it.
    pub async fn get_log_info(&self, log_id: &str) -> Result<LogInfo> {
        let body = self.fetcher.get_log_body(log_id).await?;
        Ok(LogInfo {
            method_name: extract_method_name(&body),
            log_id: log_id.to_string(),
        })
    }

    /// Browser link that downloads the full log, while connected.
    pub fn log_download_url(&self, log_id: &str) -> Option<String> {
        let status = self.broker.status();
        status.is_connected.then(|| {
            format!(
                "{}/servlet/servlet.FileDownload?file={}",
                status.instance_url, log_id
            )
        })
    }
}
