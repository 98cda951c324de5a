//! Errors raised while locating, reading or writing the player config

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Debug, Error)]
pub enum ConfigError {
    /// `config.toml` exists but could not be read, or is empty
    #[error("Cannot read player config {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Writing or renaming the temporary file failed
    #[error("Cannot write player config {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Player config {path} is not valid TOML: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Cannot serialize player config: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// Refused to save; every offending field is listed
    #[error("Player config rejected: {}", join_problems(.problems))]
    Invalid { problems: Vec<ValidationError> },

    #[error("Cannot create directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },

    /// No home directory, or the config path has no parent
    #[error("No usable directory for storyplayer: {reason}")]
    NoDirectory { reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ConfigError {
    /// Field problems behind an [`ConfigError::Invalid`], empty otherwise
    pub fn problems(&self) -> &[ValidationError] {
        match self {
            Self::Invalid { problems } => problems,
            _ => &[],
        }
    }
}

fn join_problems(problems: &[ValidationError]) -> String {
    problems
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// One config field that is out of range or malformed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted `section.field` path, e.g. `player.save_throttle_ms`
    pub field: String,
    pub message: String,
    /// Offending value as written in the file, when known
    pub value: Option<String>,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
            value: None,
        }
    }

    pub fn with_value(
        field: impl Into<String>,
        message: impl Into<String>,
        value: impl ToString,
    ) -> Self {
        Self {
            value: Some(value.to_string()),
            ..Self::new(field, message)
        }
    }

    /// Section the field belongs to (`player` for `player.default_speed`)
    pub fn section(&self) -> &str {
        self.field
            .split_once('.')
            .map_or(self.field.as_str(), |(section, _)| section)
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.value {
            Some(value) => write!(f, "{} {} (got {})", self.field, self.message, value),
            None => write!(f, "{} {}", self.field, self.message),
        }
    }
}

impl std::error::Error for ValidationError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_problem_display() {
        let err = ValidationError::new("player.status_interval_ms", "must not be zero");
        assert_eq!(err.to_string(), "player.status_interval_ms must not be zero");
        assert_eq!(err.section(), "player");
    }

    #[test]
    fn test_field_problem_with_value() {
        let err = ValidationError::with_value(
            "player.default_speed",
            "must be one of: 0.75, 1, 1.25, 1.5, 1.75, 2",
            "3",
        );
        assert_eq!(
            err.to_string(),
            "player.default_speed must be one of: 0.75, 1, 1.25, 1.5, 1.75, 2 (got 3)"
        );
    }

    #[test]
    fn test_invalid_lists_every_field() {
        let err = ConfigError::Invalid {
            problems: vec![
                ValidationError::new("player.jump_back_secs", "must be between 1 and 300"),
                ValidationError::new("app.state_file", "must not be empty"),
            ],
        };

        assert_eq!(err.problems().len(), 2);
        assert_eq!(
            err.to_string(),
            "Player config rejected: player.jump_back_secs must be between 1 and 300; \
             app.state_file must not be empty"
        );
    }

    #[test]
    fn test_no_directory_has_no_problems() {
        let err = ConfigError::NoDirectory {
            reason: "no home directory".to_string(),
        };
        assert!(err.to_string().contains("no home directory"));
        assert!(err.problems().is_empty());
    }
}
