// FILE: crates/playback/src/error.rs

use storyplayer_core::PlayerError;
use thiserror::Error;

/// Failures reported by an audio engine
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    #[error("Could not open {uri}: {reason}")]
    OpenFailed { uri: String, reason: String },

    #[error("Could not determine the duration of {uri}")]
    UnknownDuration { uri: String },

    #[error("Engine rejected {operation}: {reason}")]
    Rejected {
        operation: &'static str,
        reason: String,
    },

    #[error("Engine handle is no longer valid: {0}")]
    HandleInvalid(String),

    #[error("{operation} did not complete within {timeout_ms}ms")]
    Timeout {
        operation: &'static str,
        timeout_ms: u64,
    },
}

impl EngineError {
    /// True when the engine resource behind the session is gone
    pub fn is_handle_lost(&self) -> bool {
        matches!(self, Self::HandleInvalid(_))
    }
}

pub type EngineResult<T> = Result<T, EngineError>;

/// Failures of a durable key-value backend
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Store I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Store serialization error: {0}")]
    Serialization(String),

    #[error("Store backend error: {0}")]
    Backend(String),
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl StoreError {
    /// Classifies this failure for the controller's error model
    pub fn into_player_error(self, operation: &str) -> PlayerError {
        PlayerError::storage(operation, self.to_string())
    }
}

pub type StoreResult<T> = Result<T, StoreError>;
