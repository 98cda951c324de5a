pub mod error;
pub mod types;

// Re-export commonly used types
pub use error::{ErrorDescriptor, ErrorKind, ErrorSeverity, PlayerError, PlayerResult, RecoveryAction};
pub use types::{
    format_clock, format_hms, BookDescriptor, PlaybackSpeed, RemainingTime, Validator,
};
