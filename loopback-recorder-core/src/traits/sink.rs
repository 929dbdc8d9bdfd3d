use crate::models::block::AudioBlock;
use crate::models::error::RecorderError;

/// Summary returned by a sink when it is finalized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SinkReport {
    /// Total bytes in the finalized output, container header included.
    pub bytes_written: u64,
    /// SHA-256 hex digest of the finalized file, when the sink is file-backed.
    pub checksum: Option<String>,
}

/// Write-only, append-oriented audio output.
///
/// Created with the session's rate/channels/subtype fixed; every appended
/// block must carry that same format (no re-negotiation mid-stream). Appends
/// fail only on unrecoverable I/O errors. `close` finalizes the container
/// header and is a defensive no-op when called again.
pub trait AudioSink: Send {
    fn append(&mut self, block: &AudioBlock) -> Result<(), RecorderError>;

    fn close(&mut self) -> Result<SinkReport, RecorderError>;
}
