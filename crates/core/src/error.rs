// Error handling for the audio player adapters

use thiserror::Error;

/// Audio player error types
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AudioError {
    /// A native engine call failed (invalid source, codec, decode error)
    #[error("Native error: {0}")]
    Native(String),

    /// The audio source could not be assigned to the engine
    #[error("Load error: {0}")]
    SourceLoad(String),

    /// The engine reported a failure while preparing the source
    #[error("Prepare failed (what={what}, extra={extra})")]
    PrepareFailed { what: i32, extra: i32 },

    /// Preparation did not finish within the configured timeout
    #[error("Prepare timed out after {0} ms")]
    PrepareTimeout(u64),

    /// Command requires the current source to be ready
    #[error("Player is not ready")]
    NotReady,

    /// Operation is gated behind a newer OS version
    #[error("Platform version {actual} is below required {required}")]
    UnsupportedPlatformVersion { required: u32, actual: u32 },

    /// Invalid state transition or argument
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// The OS refused audio focus
    #[error("Audio focus request was denied")]
    FocusDenied,

    /// Audio session category or route could not be configured
    #[error("Audio session configuration failed: {0}")]
    SessionConfiguration(String),

    /// A pending load was abandoned because the player was disposed
    #[error("Load cancelled")]
    Cancelled,

    /// IO error
    #[error("IO error: {0}")]
    Io(String),
}

/// Result type alias for audio operations
pub type Result<T> = std::result::Result<T, AudioError>;

impl From<std::io::Error> for AudioError {
    fn from(err: std::io::Error) -> Self {
        AudioError::Io(err.to_string())
    }
}
