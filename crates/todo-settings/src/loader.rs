//! Settings loading, saving and partial updates.
//!
//! Loading flow:
//! 1. Start with compiled [`TodoSettings::default()`]
//! 2. If `~/.todo/settings.json` exists, deep-merge user values over defaults
//! 3. Apply `TODO_*` environment variable overrides (highest priority)
//!
//! Deep merge rules:
//! - Objects are merged recursively (source overrides target per-key)
//! - Arrays and primitives are replaced entirely by source
//! - Null values in source are skipped (preserving target)

use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::errors::{Result, SettingsError};
use crate::types::{LogLevel, MAX_POOL_SIZE, Theme, TodoSettings};

/// The per-user data directory (`~/.todo`).
pub fn todo_dir() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(home).join(".todo")
}

/// Resolve the path to the settings file (`~/.todo/settings.json`).
pub fn settings_path() -> PathBuf {
    todo_dir().join("settings.json")
}

/// Load settings from the default path with env var overrides.
pub fn load_settings() -> Result<TodoSettings> {
    load_settings_from_path(&settings_path())
}

/// Load settings from a specific path with env var overrides.
///
/// A missing file yields defaults. Invalid JSON or out-of-range values are
/// errors.
pub fn load_settings_from_path(path: &Path) -> Result<TodoSettings> {
    let mut settings = read_merged(path)?;
    apply_env_overrides(&mut settings);
    settings.validate()?;
    Ok(settings)
}

/// Write `settings` as pretty JSON, creating the parent directory.
pub fn save_settings_to_path(settings: &TodoSettings, path: &Path) -> Result<()> {
    settings.validate()?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let mut json = serde_json::to_string_pretty(settings)?;
    json.push('\n');
    std::fs::write(path, json)?;
    debug!(?path, "settings saved");
    Ok(())
}

/// Deep-merge a partial JSON object into the file at `path` and save it.
///
/// Env overrides are not applied, so the file only ever holds user values.
/// The file is left untouched when the merged result is invalid.
pub fn update_settings_at_path(path: &Path, patch: Value) -> Result<TodoSettings> {
    if !patch.is_object() {
        return Err(SettingsError::InvalidValue(
            "settings patch must be a JSON object".into(),
        ));
    }
    let current = serde_json::to_value(read_merged(path)?)?;
    let updated: TodoSettings = serde_json::from_value(deep_merge(current, patch))?;
    save_settings_to_path(&updated, path)?;
    info!(?path, "settings updated");
    Ok(updated)
}

/// Build a nested patch object from a dotted key.
///
/// `dotted_patch("preferences.theme", json!("dark"))` yields
/// `{"preferences": {"theme": "dark"}}`.
pub fn dotted_patch(key: &str, value: Value) -> Result<Value> {
    if key.split('.').any(str::is_empty) {
        return Err(SettingsError::InvalidValue(format!(
            "invalid settings key '{key}'"
        )));
    }
    Ok(key.rsplit('.').fold(value, |inner, segment| {
        let mut map = Map::new();
        let _ = map.insert(segment.to_string(), inner);
        Value::Object(map)
    }))
}

fn read_merged(path: &Path) -> Result<TodoSettings> {
    let defaults = serde_json::to_value(TodoSettings::default())?;

    let merged = if path.exists() {
        debug!(?path, "loading settings from file");
        let content = std::fs::read_to_string(path)?;
        let user: Value = serde_json::from_str(&content)?;
        deep_merge(defaults, user)
    } else {
        debug!(?path, "settings file not found, using defaults");
        defaults
    };

    Ok(serde_json::from_value(merged)?)
}

/// Recursive deep merge of two JSON values.
pub fn deep_merge(target: Value, source: Value) -> Value {
    match (target, source) {
        (Value::Object(mut target_map), Value::Object(source_map)) => {
            for (key, source_val) in source_map {
                if source_val.is_null() {
                    continue;
                }
                let merged = match target_map.remove(&key) {
                    Some(target_val) => deep_merge(target_val, source_val),
                    None => source_val,
                };
                let _ = target_map.insert(key, merged);
            }
            Value::Object(target_map)
        }
        (_, source) => source,
    }
}

/// Apply `TODO_*` environment variable overrides to loaded settings.
///
/// Invalid values are logged and ignored.
pub fn apply_env_overrides(settings: &mut TodoSettings) {
    apply_overrides_from(settings, |name| std::env::var(name).ok());
}

/// Apply overrides using `lookup` in place of the process environment.
pub fn apply_overrides_from<F>(settings: &mut TodoSettings, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let read = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

    // ── Database ────────────────────────────────────────────────────
    if let Some(v) = read("TODO_DB_PATH") {
        settings.database.path = v;
    }
    if let Some(v) = read("TODO_DB_POOL_SIZE") {
        match parse_u32_range(&v, 1, MAX_POOL_SIZE) {
            Some(size) => settings.database.pool_size = size,
            None => {
                warn!(key = "TODO_DB_POOL_SIZE", value = %v, "invalid pool size env var, ignoring");
            }
        }
    }

    // ── Logging ─────────────────────────────────────────────────────
    if let Some(v) = read("TODO_LOG_LEVEL") {
        match v.parse::<LogLevel>() {
            Ok(level) => settings.logging.level = level,
            Err(_) => {
                warn!(key = "TODO_LOG_LEVEL", value = %v, "invalid log level env var, ignoring");
            }
        }
    }

    // ── Preferences ─────────────────────────────────────────────────
    if let Some(v) = read("TODO_THEME") {
        match v.parse::<Theme>() {
            Ok(theme) => settings.preferences.theme = theme,
            Err(_) => warn!(key = "TODO_THEME", value = %v, "invalid theme env var, ignoring"),
        }
    }
    if let Some(v) = read("TODO_CULTURE") {
        settings.preferences.culture = v;
    }
    if let Some(v) = read("TODO_AUTO_START") {
        match parse_bool(&v) {
            Some(flag) => settings.preferences.auto_start = flag,
            None => warn!(key = "TODO_AUTO_START", value = %v, "invalid boolean env var, ignoring"),
        }
    }
}

/// Parse `true/1/yes/on` and `false/0/no/off`, case-insensitively.
pub fn parse_bool(val: &str) -> Option<bool> {
    match val.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Parse an integer within `min..=max`.
pub fn parse_u32_range(val: &str, min: u32, max: u32) -> Option<u32> {
    val.trim()
        .parse::<u32>()
        .ok()
        .filter(|v| (min..=max).contains(v))
}

#[cfg(test)]
#[allow(unused_results)]
mod tests {
    use std::collections::HashMap;

    use serde_json::json;

    use super::*;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    // ── deep_merge ──────────────────────────────────────────────────

    #[test]
    fn merge_nested_override() {
        let target = json!({"database": {"path": "todo.db", "poolSize": 4}});
        let source = json!({"database": {"poolSize": 8}});
        assert_eq!(
            deep_merge(target, source),
            json!({"database": {"path": "todo.db", "poolSize": 8}})
        );
    }

    #[test]
    fn merge_null_preserves_target() {
        let merged = deep_merge(json!({"a": 1}), json!({"a": null}));
        assert_eq!(merged, json!({"a": 1}));
    }

    #[test]
    fn merge_array_replaces() {
        let merged = deep_merge(json!({"a": [1, 2, 3]}), json!({"a": [4]}));
        assert_eq!(merged, json!({"a": [4]}));
    }

    #[test]
    fn merge_new_keys_added() {
        let merged = deep_merge(json!({"a": 1}), json!({"b": 2}));
        assert_eq!(merged, json!({"a": 1, "b": 2}));
    }

    // ── load ────────────────────────────────────────────────────────

    #[test]
    fn load_missing_file_returns_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = read_merged(&dir.path().join("settings.json")).unwrap();
        assert_eq!(settings, TodoSettings::default());
    }

    #[test]
    fn load_partial_json_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(
            &path,
            r#"{
                "preferences": {"theme": "dark", "culture": "en-US"},
                "logging": {"level": "debug"}
            }"#,
        )
        .unwrap();

        let settings = read_merged(&path).unwrap();
        assert_eq!(settings.preferences.theme, Theme::Dark);
        assert_eq!(settings.preferences.culture, "en-US");
        assert!(settings.preferences.check_for_updates);
        assert_eq!(settings.logging.level, LogLevel::Debug);
        assert_eq!(settings.database.pool_size, 4);
    }

    #[test]
    fn load_invalid_json_returns_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(matches!(read_merged(&path), Err(SettingsError::Json(_))));
    }

    #[test]
    fn load_rejects_out_of_range_file_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{"database": {"poolSize": 0}}"#).unwrap();
        assert!(matches!(
            load_settings_from_path(&path),
            Err(SettingsError::InvalidValue(_))
        ));
    }

    // ── save / update ───────────────────────────────────────────────

    #[test]
    fn save_creates_parent_and_reloads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("settings.json");
        let mut settings = TodoSettings::default();
        settings.preferences.auto_start = true;

        save_settings_to_path(&settings, &path).unwrap();
        assert_eq!(read_merged(&path).unwrap(), settings);
    }

    #[test]
    fn update_merges_into_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{"preferences": {"culture": "de-DE"}}"#).unwrap();

        let updated =
            update_settings_at_path(&path, json!({"preferences": {"theme": "dark"}})).unwrap();
        assert_eq!(updated.preferences.theme, Theme::Dark);
        assert_eq!(updated.preferences.culture, "de-DE");
        assert_eq!(read_merged(&path).unwrap(), updated);
    }

    #[test]
    fn update_with_invalid_value_leaves_file_alone() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{"preferences": {"culture": "de-DE"}}"#).unwrap();

        let result = update_settings_at_path(&path, json!({"preferences": {"theme": "neon"}}));
        assert!(matches!(result, Err(SettingsError::Json(_))));
        let result = update_settings_at_path(&path, json!({"database": {"poolSize": 0}}));
        assert!(matches!(result, Err(SettingsError::InvalidValue(_))));

        let on_disk = std::fs::read_to_string(&path).unwrap();
        assert_eq!(on_disk, r#"{"preferences": {"culture": "de-DE"}}"#);
    }

    #[test]
    fn update_rejects_non_object_patch() {
        let dir = tempfile::tempdir().unwrap();
        let result = update_settings_at_path(&dir.path().join("s.json"), json!(3));
        assert!(matches!(result, Err(SettingsError::InvalidValue(_))));
    }

    #[test]
    fn dotted_patch_nests_segments() {
        let patch = dotted_patch("preferences.theme", json!("dark")).unwrap();
        assert_eq!(patch, json!({"preferences": {"theme": "dark"}}));
        assert!(dotted_patch("preferences..theme", json!(1)).is_err());
        assert!(dotted_patch("", json!(1)).is_err());
    }

    // ── env overrides ───────────────────────────────────────────────

    #[test]
    fn env_overrides_apply() {
        let mut settings = TodoSettings::default();
        apply_overrides_from(
            &mut settings,
            env(&[
                ("TODO_DB_PATH", "/data/tasks.db"),
                ("TODO_DB_POOL_SIZE", "8"),
                ("TODO_LOG_LEVEL", "debug"),
                ("TODO_THEME", "dark"),
                ("TODO_CULTURE", "en-GB"),
                ("TODO_AUTO_START", "yes"),
            ]),
        );
        assert_eq!(settings.database.path, "/data/tasks.db");
        assert_eq!(settings.database.pool_size, 8);
        assert_eq!(settings.logging.level, LogLevel::Debug);
        assert_eq!(settings.preferences.theme, Theme::Dark);
        assert_eq!(settings.preferences.culture, "en-GB");
        assert!(settings.preferences.auto_start);
    }

    #[test]
    fn invalid_env_values_are_ignored() {
        let mut settings = TodoSettings::default();
        apply_overrides_from(
            &mut settings,
            env(&[
                ("TODO_DB_PATH", "  "),
                ("TODO_DB_POOL_SIZE", "0"),
                ("TODO_LOG_LEVEL", "chatty"),
                ("TODO_THEME", "neon"),
                ("TODO_AUTO_START", "maybe"),
            ]),
        );
        assert_eq!(settings, TodoSettings::default());
    }

    #[test]
    fn parse_helpers() {
        for val in ["true", "1", "yes", "ON"] {
            assert_eq!(parse_bool(val), Some(true), "failed for {val}");
        }
        for val in ["false", "0", "No", "off"] {
            assert_eq!(parse_bool(val), Some(false), "failed for {val}");
        }
        assert_eq!(parse_bool("2"), None);
        assert_eq!(parse_u32_range("16", 1, 64), Some(16));
        assert_eq!(parse_u32_range("65", 1, 64), None);
        assert_eq!(parse_u32_range("x", 1, 64), None);
    }
}
