use dirs::home_dir;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Error, Result};
use crate::fetch::DEFAULT_API_VERSION;

const CONFIG_FILE: &str = ".sflogs/config.json";

pub const ENV_SF_BIN: &str = "SFLOGS_SF_BIN";
pub const ENV_API_VERSION: &str = "SFLOGS_API_VERSION";
pub const ENV_COMMAND_TIMEOUT: &str = "SFLOGS_COMMAND_TIMEOUT";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Salesforce CLI executable.
    pub sf_bin: String,
    /// REST API version used for log bodies, without the leading `v`.
    pub api_version: String,
    /// Kill `sf` invocations that run longer than this. Unset means wait forever.
    pub command_timeout_secs: Option<u64>,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            sf_bin: "sf".to_string(),
            api_version: DEFAULT_API_VERSION.to_string(),
            command_timeout_secs: None,
        }
    }
}

impl Settings {
    pub fn command_timeout(&self) -> Option<Duration> {
        self.command_timeout_secs
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }

    /// Defaults, then the config file, then `.env` / process environment.
    pub fn load() -> Result<Self> {
        let mut settings = Self::load_from(&get_config_path())?;
        dotenv::dotenv().ok();
        settings.apply_env(|key| env::var(key).ok())?;
        Ok(settings)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Settings::default());
        }
        let content = fs::read_to_string(path)?;
        let settings: Settings = serde_json::from_str(&content)?;
        Ok(settings)
    }

    fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(bin) = lookup(ENV_SF_BIN).filter(|v| !v.trim().is_empty()) {
            self.sf_bin = bin;
        }
        if let Some(version) = lookup(ENV_API_VERSION).filter(|v| !v.trim().is_empty()) {
            self.api_version = version.trim().trim_start_matches('v').to_string();
        }
        if let Some(timeout) = lookup(ENV_COMMAND_TIMEOUT) {
            let secs = timeout.trim().parse::<u64>().map_err(|_| {
                Error::Config(format!("{ENV_COMMAND_TIMEOUT} must be whole seconds, got {timeout:?}"))
            })?;
            self.command_timeout_secs = Some(secs);
        }
        Ok(())
    }
}

pub fn save_settings(settings: &Settings) -> Result<PathBuf> {
    let config_path = get_config_path();
    save_settings_to(settings, &config_path)?;
    Ok(config_path)
}

pub fn save_settings_to(settings: &Settings, config_path: &Path) -> Result<()> {
    if let Some(parent) = config_path.parent() {
        fs::create_dir_all(parent)?;
    }

    let content = serde_json::to_string_pretty(settings)?;
    fs::write(config_path, content)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let metadata = fs::metadata(config_path)?;
        let mut perms = metadata.permissions();
        perms.set_mode(0o600);
        fs::set_permissions(config_path, perms)?;
    }

    tracing::info!(path = %config_path.display(), "settings saved");
    Ok(())
}

/// Remove the config file. Returns whether there was one.
pub fn delete_settings() -> Result<bool> {
    let config_path = get_config_path();
    if config_path.exists() {
        fs::remove_file(&config_path)?;
        Ok(true)
    } else {
        Ok(false)
    }
}

pub fn get_config_path() -> PathBuf {
    home_dir()
        .unwrap_or_else(|| PathBuf::from("/tmp"))
        .join(CONFIG_FILE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::load_from(&dir.path().join("config.json")).unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.api_version, "59.0");
        assert!(settings.command_timeout().is_none());
    }

    #[test]
    fn saved_file_round_trips_partial_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, r#"{"sf_bin": "/opt/sf/bin/sf"}"#).unwrap();

        let settings = Settings::load_from(&path).unwrap();
        assert_eq!(settings.sf_bin, "/opt/sf/bin/sf");
        assert_eq!(settings.api_version, "59.0");

        save_settings_to(&settings, &path).unwrap();
        assert_eq!(Settings::load_from(&path).unwrap(), settings);
    }

    #[cfg(unix)]
    #[test]
    fn saved_file_is_private() {
        use std::os::unix::fs::PermissionsExt;
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        save_settings_to(&Settings::default(), &path).unwrap();
        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn environment_overrides_file() {
        let env: HashMap<&str, &str> = [
            (ENV_SF_BIN, "sfdx"),
            (ENV_API_VERSION, "v60.0"),
            (ENV_COMMAND_TIMEOUT, "30"),
        ]
        .into_iter()
        .collect();
        let mut settings = Settings::default();
        settings
            .apply_env(|key| env.get(key).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(settings.sf_bin, "sfdx");
        assert_eq!(settings.api_version, "60.0");
        assert_eq!(settings.command_timeout(), Some(Duration::from_secs(30)));
    }

    #[test]
    fn bad_timeout_is_a_config_error() {
        let mut settings = Settings::default();
        let err = settings
            .apply_env(|key| (key == ENV_COMMAND_TIMEOUT).then(|| "soon".to_string()))
            .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
