use std::fs;
use std::path::Path;

use crate::models::error::RecorderError;
use crate::models::recording_result::RecordingMetadata;

/// Write session metadata as a JSON sidecar, `{recording_path}.metadata.json`.
pub fn write_sidecar(metadata: &RecordingMetadata, recording_path: &Path) -> Result<(), RecorderError> {
    let sidecar_path = recording_path.with_extension("metadata.json");
    let json = serde_json::to_string_pretty(metadata)
        .map_err(|e| RecorderError::Sink(format!("failed to serialize metadata: {}", e)))?;
    fs::write(&sidecar_path, json)
        .map_err(|e| RecorderError::Sink(format!("failed to write metadata: {}", e)))?;
    Ok(())
}

/// Read session metadata back from its JSON sidecar.
pub fn read_sidecar(recording_path: &Path) -> Result<RecordingMetadata, RecorderError> {
    let sidecar_path = recording_path.with_extension("metadata.json");
    let json = fs::read_to_string(&sidecar_path)
        .map_err(|e| RecorderError::Sink(format!("failed to read metadata: {}", e)))?;
    serde_json::from_str(&json)
        .map_err(|e| RecorderError::Sink(format!("failed to parse metadata: {}", e)))
}
