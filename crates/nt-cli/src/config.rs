//! Configuration loading and management.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use nt_core::{AppMetadata, ForegroundFormula, UserId, ValidationError};
use serde::{Deserialize, Serialize};

/// Application configuration.
#[derive(Clone, Serialize, Deserialize)]
pub struct Config {
    /// Host application name reported in snapshots.
    pub app_name: String,

    /// Host application version reported in snapshots.
    pub app_version: String,

    /// End user the telemetry belongs to.
    #[serde(default)]
    pub user_id: Option<String>,

    /// How long to wait for the UI thread before giving up. Unset waits forever.
    #[serde(default)]
    pub ui_thread_timeout_ms: Option<u64>,

    /// Which totals the reported foreground percentage is derived from.
    #[serde(default)]
    pub foreground_formula: ForegroundFormula,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("app_name", &self.app_name)
            .field("app_version", &self.app_version)
            .field("user_id", &self.user_id.as_ref().map(|_| "[set]"))
            .field("ui_thread_timeout_ms", &self.ui_thread_timeout_ms)
            .field("foreground_formula", &self.foreground_formula)
            .finish()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            app_name: "nt".to_string(),
            app_version: env!("CARGO_PKG_VERSION").to_string(),
            user_id: None,
            ui_thread_timeout_ms: None,
            foreground_formula: ForegroundFormula::default(),
        }
    }
}

impl Config {
    /// Loads configuration, optionally from a specific file.
    #[expect(
        clippy::result_large_err,
        reason = "figment::Error is large but only returned at startup"
    )]
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, figment::Error> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        // Load from default config location
        if let Some(config_dir) = dirs_config_path() {
            figment = figment.merge(Toml::file(config_dir.join("config.toml")));
        }

        // Load from specified config file
        if let Some(path) = config_path {
            figment = figment.merge(Toml::file(path));
        }

        // Load from environment variables (NT_*)
        figment = figment.merge(Env::prefixed("NT_"));

        figment.extract()
    }

    /// UI-thread wait bound, if configured.
    pub fn ui_thread_timeout(&self) -> Option<Duration> {
        self.ui_thread_timeout_ms.map(Duration::from_millis)
    }

    /// App metadata for a new session.
    pub fn app_metadata(&self) -> Result<AppMetadata, ValidationError> {
        let user_id = self.user_id.clone().map(UserId::new).transpose()?;
        AppMetadata::new(self.app_name.clone(), self.app_version.clone(), user_id)
    }
}

/// Returns the platform-specific config directory for nt.
fn dirs_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("nt"))
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::Write;

    #[test]
    fn test_dirs_config_path_ends_with_nt() {
        let path = dirs_config_path().unwrap();
        assert_eq!(path.file_name().unwrap(), "nt");
    }

    #[test]
    fn test_default_config_waits_forever() {
        let config = Config::default();
        assert!(config.ui_thread_timeout().is_none());
        assert_eq!(config.foreground_formula, ForegroundFormula::Fixed);
    }

    #[test]
    fn test_config_file_overrides_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
app_name = "Navigator"
user_id = "user-7"
ui_thread_timeout_ms = 250
foreground_formula = "legacy"
"#
        )
        .unwrap();
        file.flush().unwrap();

        let config = Config::load_from(Some(file.path())).unwrap();
        assert_eq!(config.app_name, "Navigator");
        assert_eq!(config.ui_thread_timeout(), Some(Duration::from_millis(250)));
        assert_eq!(config.foreground_formula, ForegroundFormula::Legacy);

        let app = config.app_metadata().unwrap();
        assert_eq!(app.user_id.unwrap().as_str(), "user-7");
    }

    #[test]
    fn test_empty_user_id_is_rejected() {
        let config = Config {
            user_id: Some(String::new()),
            ..Config::default()
        };
        assert!(config.app_metadata().is_err());
    }

    #[test]
    fn test_debug_redacts_user_id() {
        let config = Config {
            user_id: Some("secret-user".to_string()),
            ..Config::default()
        };
        let debug = format!("{config:?}");
        assert!(!debug.contains("secret-user"));
    }
}
