//! Session broker and Apex log retrieval for a Salesforce project.
//!
//! The active project directory decides which org the `sf` CLI talks to.
//! [`LogService`] authenticates through `sf org display user`, lists the
//! user's Apex logs with `sf data query`, and pulls the head of a log body
//! over HTTPS to name the method that produced it.

pub mod ansi;
pub mod broker;
pub mod command;
pub mod config;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod logging;
pub mod logs;
pub mod models;
pub mod service;
pub mod session;

pub use broker::ConnectionBroker;
pub use command::{CommandRunner, ProcessRunner, SfCli};
pub use config::Settings;
pub use error::{Error, Outcome, Result};
pub use extract::extract_method_name;
pub use fetch::{BodyStream, HttpsTransport, LogTransport, BODY_LIMIT};
pub use models::{ConnectionStatus, LogInfo, LogSummary, OrgUser, NO_METHOD_NAME_FOUND};
pub use service::LogService;
pub use session::{Session, SessionStore};
