//! # todo-settings
//!
//! Layered user settings for the todo manager.
//!
//! Settings are resolved from three layers (in priority order):
//! 1. **Compiled defaults** — [`TodoSettings::default()`]
//! 2. **User file** — `~/.todo/settings.json` (deep-merged over defaults)
//! 3. **Environment variables** — `TODO_*` overrides (highest priority)
//!
//! # Usage
//!
//! ```no_run
//! use todo_settings::load_settings;
//!
//! let settings = load_settings().unwrap_or_default();
//! println!("database: {}", settings.database.resolved_path().display());
//! ```

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{
    apply_env_overrides, deep_merge, dotted_patch, load_settings, load_settings_from_path,
    save_settings_to_path, settings_path, todo_dir, update_settings_at_path,
};
pub use types::*;
