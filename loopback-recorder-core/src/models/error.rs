use thiserror::Error;

/// Errors that can occur during a recording session.
///
/// Device and sink failures are never retried: real-time capture cannot
/// usefully retry a missed deadline. Queue overflow is deliberately absent
/// here; a dropped block is logged and counted, not surfaced as an error.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RecorderError {
    #[error("no loopback-capable output device")]
    DeviceNotAvailable,

    #[error("audio device failure: {0}")]
    DeviceFailed(String),

    #[error("sink error: {0}")]
    Sink(String),

    #[error("a recording session is already active")]
    AlreadyActive,

    #[error("invalid session options: {0}")]
    InvalidOptions(String),
}
