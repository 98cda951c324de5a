//! Error types and recovery strategies for storyplayer
//!
//! The player distinguishes four kinds of failure, each with its own
//! propagation rule:
//! - **LoadFailure**: the session is dead; the user must retry the load
//! - **StorageFailure**: recovered locally; playback continues without the
//!   durability guarantee for that write
//! - **InvalidSpeed**: rejected at the call boundary, state untouched
//! - **EngineCallFailure**: reported to the caller; only a lost engine handle
//!   forces the session down
//!
//! Each error carries a severity and a recovery action to guide the host UI.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Recovery actions that can be taken when an error occurs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryAction {
    /// The command can be issued again as-is
    RetryImmediate,
    /// Nothing to do; playback carries on
    ContinuePlayback,
    /// The book has to be loaded again
    ReloadBook,
    /// The input has to change before retrying
    UserIntervention,
}

impl fmt::Display for RecoveryAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RetryImmediate => write!(f, "Retrying immediately"),
            Self::ContinuePlayback => write!(f, "Continuing playback"),
            Self::ReloadBook => write!(f, "Reloading book"),
            Self::UserIntervention => write!(f, "User intervention required"),
        }
    }
}

/// Error severity classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    /// Error can be automatically recovered from
    Recoverable,
    /// Feature degraded but playback can continue
    Degraded,
    /// The session is unusable until the book is loaded again
    Fatal,
}

impl fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Recoverable => write!(f, "Recoverable"),
            Self::Degraded => write!(f, "Degraded"),
            Self::Fatal => write!(f, "Fatal"),
        }
    }
}

/// Classification of a [`PlayerError`], exposed to the UI through `lastError`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    LoadFailure,
    StorageFailure,
    InvalidSpeed,
    EngineCallFailure,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LoadFailure => write!(f, "load failure"),
            Self::StorageFailure => write!(f, "storage failure"),
            Self::InvalidSpeed => write!(f, "invalid speed"),
            Self::EngineCallFailure => write!(f, "engine call failure"),
        }
    }
}

/// Error record kept on the playback session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDescriptor {
    pub kind: ErrorKind,
    pub message: String,
}

impl ErrorDescriptor {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for ErrorDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

/// Main error type for storyplayer
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PlayerError {
    /// The engine could not open or decode the audio reference
    #[error("Load failed: {message}")]
    LoadFailure { message: String },

    /// Reading or writing the persisted playback state failed
    #[error("Storage {operation} failed: {message}")]
    StorageFailure { operation: String, message: String },

    /// Requested multiplier is not one of the allowed speeds
    #[error("Invalid speed: {value}")]
    InvalidSpeed { value: f64 },

    /// The engine rejected a transport command
    #[error("Engine rejected {operation}: {message}")]
    EngineCallFailure {
        operation: String,
        message: String,
        /// The engine handle is gone and the session was torn down
        handle_lost: bool,
    },
}

impl PlayerError {
    pub fn load(message: impl Into<String>) -> Self {
        Self::LoadFailure {
            message: message.into(),
        }
    }

    pub fn storage(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::StorageFailure {
            operation: operation.into(),
            message: message.into(),
        }
    }

    pub fn engine_call(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::EngineCallFailure {
            operation: operation.into(),
            message: message.into(),
            handle_lost: false,
        }
    }

    pub fn handle_lost(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::EngineCallFailure {
            operation: operation.into(),
            message: message.into(),
            handle_lost: true,
        }
    }

    /// Returns the kind of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::LoadFailure { .. } => ErrorKind::LoadFailure,
            Self::StorageFailure { .. } => ErrorKind::StorageFailure,
            Self::InvalidSpeed { .. } => ErrorKind::InvalidSpeed,
            Self::EngineCallFailure { .. } => ErrorKind::EngineCallFailure,
        }
    }

    /// Returns the severity level of this error
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            Self::LoadFailure { .. } => ErrorSeverity::Fatal,
            Self::EngineCallFailure {
                handle_lost: true, ..
            } => ErrorSeverity::Fatal,
            Self::EngineCallFailure { .. } => ErrorSeverity::Degraded,
            Self::StorageFailure { .. } | Self::InvalidSpeed { .. } => ErrorSeverity::Recoverable,
        }
    }

    /// Returns the recommended recovery action for this error
    pub fn recovery_action(&self) -> RecoveryAction {
        match self {
            Self::LoadFailure { .. } => RecoveryAction::ReloadBook,
            Self::EngineCallFailure {
                handle_lost: true, ..
            } => RecoveryAction::ReloadBook,
            Self::EngineCallFailure { .. } => RecoveryAction::RetryImmediate,
            Self::StorageFailure { .. } => RecoveryAction::ContinuePlayback,
            Self::InvalidSpeed { .. } => RecoveryAction::UserIntervention,
        }
    }

    /// Returns a user-friendly error message suitable for display in the UI
    pub fn user_message(&self) -> String {
        match self {
            Self::LoadFailure { .. } => {
                "Cannot play this audiobook. The file may be missing or in an unsupported format."
                    .to_string()
            }
            Self::StorageFailure { .. } => {
                "Your listening position could not be saved. Playback will continue.".to_string()
            }
            Self::InvalidSpeed { value } => {
                format!("{}x is not an available playback speed.", value)
            }
            Self::EngineCallFailure {
                handle_lost: true, ..
            } => "Playback stopped unexpectedly. Open the book again to continue.".to_string(),
            Self::EngineCallFailure { .. } => {
                "The player did not respond. Please try again.".to_string()
            }
        }
    }

    /// Returns true if the UI should replace the transport controls with this error
    pub fn is_blocking(&self) -> bool {
        self.severity() == ErrorSeverity::Fatal
    }

    /// Returns true if this error can be automatically retried
    pub fn is_retryable(&self) -> bool {
        self.recovery_action() == RecoveryAction::RetryImmediate
    }

    /// Record of this error for the session's `lastError`
    pub fn descriptor(&self) -> ErrorDescriptor {
        let message = match self {
            Self::LoadFailure { message }
            | Self::StorageFailure { message, .. }
            | Self::EngineCallFailure { message, .. } => message.clone(),
            Self::InvalidSpeed { value } => value.to_string(),
        };
        ErrorDescriptor::new(self.kind(), message)
    }
}

/// Convenience type alias for Results using PlayerError
pub type PlayerResult<T> = std::result::Result<T, PlayerError>;
