//! Errors raised while reading `settings.json` or checking its values.

use std::path::PathBuf;

use thiserror::Error;

/// Why settings could not be produced.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// The file exists but could not be read.
    #[error("cannot read {}: {source}", path.display())]
    Read {
        /// File that was being read.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },
    /// The file is not valid JSON, or does not fit the settings shape.
    #[error("malformed settings in {}: {source}", path.display())]
    Parse {
        /// File that was being parsed. Empty for the compiled defaults.
        path: PathBuf,
        /// Underlying decode failure.
        #[source]
        source: serde_json::Error,
    },
    /// A field parsed but holds an unusable value.
    #[error("setting `{field}` {reason}")]
    Invalid {
        /// camelCase field name as written in the file.
        field: &'static str,
        /// What is wrong with it.
        reason: String,
    },
}

impl SettingsError {
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            field,
            reason: reason.into(),
        }
    }
}

/// Settings result alias.
pub type Result<T> = std::result::Result<T, SettingsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_error_names_the_file() {
        let err = SettingsError::Read {
            path: PathBuf::from("/etc/animatch/settings.json"),
            source: std::io::Error::from(std::io::ErrorKind::PermissionDenied),
        };
        let text = err.to_string();
        assert!(text.starts_with("cannot read /etc/animatch/settings.json"));
    }

    #[test]
    fn parse_error_keeps_source() {
        let source = serde_json::from_str::<serde_json::Value>("[1,").unwrap_err();
        let err = SettingsError::Parse {
            path: PathBuf::from("s.json"),
            source,
        };
        assert!(std::error::Error::source(&err).is_some());
        assert!(err.to_string().contains("malformed settings in s.json"));
    }

    #[test]
    fn invalid_names_the_field() {
        let err = SettingsError::invalid("concurrency", "must be at least 1");
        assert_eq!(err.to_string(), "setting `concurrency` must be at least 1");
    }
}
