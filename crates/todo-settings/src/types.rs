//! Settings type definitions.
//!
//! All types use `#[serde(rename_all = "camelCase", default)]`, so a partial
//! JSON file deserializes with defaults for everything it omits.

use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::{Result, SettingsError};
use crate::loader::todo_dir;

/// Root settings type.
///
/// ```json
/// {
///   "version": "0.1.0",
///   "database": { "path": "todo.db", "poolSize": 4 },
///   "logging": { "level": "warn" },
///   "preferences": { "theme": "dark" }
/// }
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TodoSettings {
    /// Settings schema version.
    pub version: String,
    /// Storage location and pool tuning.
    pub database: DatabaseSettings,
    /// Log verbosity.
    pub logging: LoggingSettings,
    /// User preferences surfaced by front-ends.
    pub preferences: PreferenceSettings,
}

impl Default for TodoSettings {
    fn default() -> Self {
        Self {
            version: "0.1.0".to_string(),
            database: DatabaseSettings::default(),
            logging: LoggingSettings::default(),
            preferences: PreferenceSettings::default(),
        }
    }
}

impl TodoSettings {
    /// Reject values that deserialize but cannot be used.
    pub fn validate(&self) -> Result<()> {
        if self.database.path.trim().is_empty() {
            return Err(SettingsError::InvalidValue(
                "database.path must not be empty".into(),
            ));
        }
        if !(1..=MAX_POOL_SIZE).contains(&self.database.pool_size) {
            return Err(SettingsError::InvalidValue(format!(
                "database.poolSize must be between 1 and {MAX_POOL_SIZE}, got {}",
                self.database.pool_size
            )));
        }
        if self.preferences.culture.trim().is_empty() {
            return Err(SettingsError::InvalidValue(
                "preferences.culture must not be empty".into(),
            ));
        }
        Ok(())
    }
}

/// Upper bound for `database.poolSize`.
pub const MAX_POOL_SIZE: u32 = 64;

/// Database location and connection pool tuning.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DatabaseSettings {
    /// Database file. Relative paths resolve against `~/.todo`.
    pub path: String,
    /// Maximum pooled connections.
    pub pool_size: u32,
    /// How long a writer waits on a locked database.
    pub busy_timeout_ms: u32,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            path: "todo.db".to_string(),
            pool_size: 4,
            busy_timeout_ms: 30_000,
        }
    }
}

impl DatabaseSettings {
    /// Absolute path of the database file.
    pub fn resolved_path(&self) -> PathBuf {
        let path = PathBuf::from(&self.path);
        if path.is_absolute() {
            path
        } else {
            todo_dir().join(path)
        }
    }
}

/// Log level names accepted in settings and `TODO_LOG_LEVEL`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Most verbose.
    Trace,
    /// Debugging detail.
    Debug,
    /// Normal operation.
    Info,
    /// Problems worth a look (default).
    #[default]
    Warn,
    /// Failures only.
    Error,
}

impl LogLevel {
    /// Convert to a tracing filter string.
    pub fn as_filter_str(self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

impl FromStr for LogLevel {
    type Err = SettingsError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "trace" => Ok(Self::Trace),
            "debug" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            "warn" | "warning" => Ok(Self::Warn),
            "error" => Ok(Self::Error),
            other => Err(SettingsError::InvalidValue(format!(
                "unknown log level '{other}'"
            ))),
        }
    }
}

/// Logging configuration.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingSettings {
    /// Minimum level written to stderr when `RUST_LOG` is unset.
    pub level: LogLevel,
}

/// Color scheme.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    /// Light background.
    #[default]
    Light,
    /// Dark background.
    Dark,
}

impl FromStr for Theme {
    type Err = SettingsError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "light" => Ok(Self::Light),
            "dark" => Ok(Self::Dark),
            other => Err(SettingsError::InvalidValue(format!("unknown theme '{other}'"))),
        }
    }
}

/// User-facing preferences.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PreferenceSettings {
    /// Color scheme.
    pub theme: Theme,
    /// UI culture tag, e.g. `ru-RU`.
    pub culture: String,
    /// Launch at login.
    pub auto_start: bool,
    /// Look for new releases on startup.
    pub check_for_updates: bool,
}

impl Default for PreferenceSettings {
    fn default() -> Self {
        Self {
            theme: Theme::Light,
            culture: "ru-RU".to_string(),
            auto_start: false,
            check_for_updates: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let settings = TodoSettings::default();
        assert_eq!(settings.version, "0.1.0");
        assert_eq!(settings.database.path, "todo.db");
        assert_eq!(settings.database.pool_size, 4);
        assert_eq!(settings.logging.level, LogLevel::Warn);
        assert_eq!(settings.preferences.theme, Theme::Light);
        assert_eq!(settings.preferences.culture, "ru-RU");
        assert!(!settings.preferences.auto_start);
        assert!(settings.preferences.check_for_updates);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn serializes_camel_case() {
        let json = serde_json::to_value(TodoSettings::default()).unwrap();
        assert_eq!(json["database"]["poolSize"], 4);
        assert_eq!(json["preferences"]["checkForUpdates"], true);
        assert_eq!(json["logging"]["level"], "warn");
    }

    #[test]
    fn partial_json_fills_defaults() {
        let settings: TodoSettings =
            serde_json::from_str(r#"{"preferences": {"theme": "dark"}}"#).unwrap();
        assert_eq!(settings.preferences.theme, Theme::Dark);
        assert_eq!(settings.preferences.culture, "ru-RU");
        assert_eq!(settings.database.pool_size, 4);
    }

    #[test]
    fn validate_rejects_bad_pool_size() {
        let mut settings = TodoSettings::default();
        settings.database.pool_size = 0;
        assert!(matches!(settings.validate(), Err(SettingsError::InvalidValue(_))));
        settings.database.pool_size = MAX_POOL_SIZE + 1;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn absolute_database_path_is_kept() {
        let db = DatabaseSettings {
            path: "/var/lib/todo/tasks.db".into(),
            ..DatabaseSettings::default()
        };
        assert_eq!(db.resolved_path(), PathBuf::from("/var/lib/todo/tasks.db"));
    }

    #[test]
    fn relative_database_path_resolves_under_todo_dir() {
        let resolved = DatabaseSettings::default().resolved_path();
        assert!(resolved.ends_with(".todo/todo.db"));
    }

    #[test]
    fn log_level_parsing() {
        assert_eq!("INFO".parse::<LogLevel>().unwrap(), LogLevel::Info);
        assert_eq!("warning".parse::<LogLevel>().unwrap(), LogLevel::Warn);
        assert!("loud".parse::<LogLevel>().is_err());
        assert_eq!(LogLevel::Debug.as_filter_str(), "debug");
    }

    #[test]
    fn theme_parsing() {
        assert_eq!("Dark".parse::<Theme>().unwrap(), Theme::Dark);
        assert!("neon".parse::<Theme>().is_err());
    }
}
