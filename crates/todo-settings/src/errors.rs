//! Settings error types.

use thiserror::Error;

/// Errors that can occur when loading, validating, or saving settings.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// Failed to read or write the settings file.
    #[error("settings file I/O failed: {0}")]
    Io(#[from] std::io::Error),
    /// The settings file is not valid JSON or does not fit the schema.
    #[error("failed to parse settings JSON: {0}")]
    Json(#[from] serde_json::Error),
    /// A settings value is out of range or unknown.
    #[error("invalid settings value: {0}")]
    InvalidValue(String),
}

/// Result type for settings operations.
pub type Result<T> = std::result::Result<T, SettingsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_error_converts() {
        let err: SettingsError =
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied").into();
        assert!(matches!(err, SettingsError::Io(_)));
        assert!(err.to_string().contains("denied"));
    }

    #[test]
    fn json_error_display() {
        let json_err = serde_json::from_str::<serde_json::Value>("{bad}").unwrap_err();
        let err = SettingsError::from(json_err);
        assert!(err.to_string().starts_with("failed to parse settings JSON"));
    }

    #[test]
    fn invalid_value_display() {
        let err = SettingsError::InvalidValue("poolSize must be at least 1".into());
        assert_eq!(
            err.to_string(),
            "invalid settings value: poolSize must be at least 1"
        );
    }
}
