use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::options::{SampleFormat, SessionOptions};
use super::stats::StatsSnapshot;

/// Result returned when a recording session completes.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordingResult {
    pub file_path: PathBuf,
    /// Recorded duration in seconds, excluding time spent paused.
    pub duration_secs: f64,
    pub stats: StatsSnapshot,
    pub checksum: String,
    pub metadata: RecordingMetadata,
}

/// Metadata stored as a JSON sidecar next to the recording.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordingMetadata {
    pub id: String,
    pub file_path: String,
    pub created_at: String,
    pub duration_secs: f64,
    pub sample_rate: u32,
    pub channels: u16,
    pub sample_format: SampleFormat,
    pub blocks_written: u64,
    pub blocks_dropped: u64,
    pub checksum: String,
}

impl RecordingMetadata {
    pub fn new(
        file_path: &str,
        options: &SessionOptions,
        duration_secs: f64,
        stats: StatsSnapshot,
        checksum: &str,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            file_path: file_path.to_string(),
            created_at: chrono::Utc::now().to_rfc3339(),
            duration_secs,
            sample_rate: options.sample_rate,
            channels: options.channels,
            sample_format: options.sample_format,
            blocks_written: stats.blocks_written,
            blocks_dropped: stats.blocks_dropped,
            checksum: checksum.to_string(),
        }
    }
}
