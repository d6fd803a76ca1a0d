use serde::{Deserialize, Serialize};

pub const NO_METHOD_NAME_FOUND: &str = "NO_METHOD_NAME_FOUND";

/// One row of the `ApexLog` listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogSummary {
    pub id: String,
    pub logged_by_user_name: String,
    pub length_bytes: u64,
    pub last_modified: String,
}

impl LogSummary {
    pub fn length_kb(&self) -> u64 {
        (self.length_bytes as f64 / 1024.0).round() as u64
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogInfo {
    pub method_name: String,
    pub log_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrgUser {
    pub id: String,
    pub name: String,
    pub username: String,
}

/// What callers may see of the session. Never carries the access token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionStatus {
    pub is_connected: bool,
    pub project_path: String,
    #[serde(rename = "instanceURL")]
    pub instance_url: String,
    pub username: String,
    pub current_user_id: String,
}

/// `{"status": 0, "result": {...}}` as printed by `sf ... --json`.
#[derive(Debug, Deserialize)]
pub struct Envelope<T> {
    pub result: Option<T>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserInfo {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub instance_url: Option<String>,
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct QueryResult<T> {
    #[serde(default = "Vec::new")]
    pub records: Vec<T>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ApexLogRecord {
    pub id: String,
    #[serde(default)]
    pub log_user: Option<NamedRef>,
    #[serde(default)]
    pub log_length: Option<u64>,
    #[serde(default)]
    pub last_modified_date: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct NamedRef {
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct UserRecord {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
}

impl From<ApexLogRecord> for LogSummary {
    fn from(record: ApexLogRecord) -> Self {
        LogSummary {
            id: record.id,
            logged_by_user_name: record.log_user.and_then(|u| u.name).unwrap_or_default(),
            length_bytes: record.log_length.unwrap_or(0),
            last_modified: record.last_modified_date.unwrap_or_default(),
        }
    }
}

impl From<UserRecord> for OrgUser {
    fn from(record: UserRecord) -> Self {
        OrgUser {
            id: record.id,
            name: record.name.unwrap_or_default(),
            username: record.username.unwrap_or_default(),
        }
    }
}
