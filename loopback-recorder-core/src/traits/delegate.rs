use crate::models::error::RecorderError;
use crate::models::recording_result::RecordingResult;
use crate::models::state::RecorderState;

/// Event callback consumed by the shell driving the recorder.
///
/// Methods fire from whichever thread observed the event (the capture loop,
/// the writer thread, or a controller caller), never from a UI thread.
/// Implementations should marshal to the UI thread if needed, and must not
/// call back into the recorder's operations from inside a callback. All
/// methods default to no-ops so a shell can implement only what it presents.
pub trait RecorderDelegate: Send + Sync {
    /// Human-readable status line: device init, pause/resume, overflow
    /// warnings, writer errors, final saved-path confirmation.
    fn on_status(&self, _message: &str) {}

    fn on_state_changed(&self, _state: RecorderState) {}

    fn on_error(&self, _error: &RecorderError) {}

    fn on_finished(&self, _result: &RecordingResult) {}
}
