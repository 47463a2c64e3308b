use std::env;
use std::path::PathBuf;

use crate::error::AtriumError;

/// Application configuration loaded from environment variables.
/// Roles, policies and the organisation tree live in the TOML workspace file.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Path to the workspace TOML file.
    pub workspace_path: PathBuf,
    /// Emit logs as JSON lines instead of the human formatter.
    pub log_json: bool,
    /// Keep the emitting actor in the notification set of its own event.
    pub notify_actor: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            workspace_path: PathBuf::from("./atrium.toml"),
            log_json: false,
            notify_actor: true,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, AtriumError> {
        dotenvy::dotenv().ok();

        let defaults = Self::default();
        let config = Self {
            workspace_path: env::var("ATRIUM_WORKSPACE")
                .map(PathBuf::from)
                .unwrap_or(defaults.workspace_path),
            log_json: bool_env("ATRIUM_LOG_JSON", defaults.log_json)?,
            notify_actor: bool_env("ATRIUM_NOTIFY_ACTOR", defaults.notify_actor)?,
        };
        Ok(config)
    }

    /// Log the effective settings. Call once the subscriber is installed.
    pub fn log_settings(&self) {
        tracing::info!(
            workspace = %self.workspace_path.display(),
            log_json = self.log_json,
            notify_actor = self.notify_actor,
            "Config loaded"
        );
    }
}

fn bool_env(key: &str, default: bool) -> Result<bool, AtriumError> {
    match env::var(key) {
        Ok(raw) => parse_bool(&raw)
            .ok_or_else(|| AtriumError::Config(format!("{key} must be true or false, got '{raw}'"))),
        Err(_) => Ok(default),
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_bool_accepts_common_spellings() {
        assert_eq!(parse_bool("TRUE"), Some(true));
        assert_eq!(parse_bool(" off "), Some(false));
        assert_eq!(parse_bool("maybe"), None);
    }

    #[test]
    fn defaults_notify_the_actor() {
        let config = AppConfig::default();
        assert!(config.notify_actor);
        assert!(!config.log_json);
    }
}
