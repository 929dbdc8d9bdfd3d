/// Observable recorder state.
///
/// State transitions:
/// ```text
/// idle → recording ↔ paused
///           ↓          ↓
///        stopping → idle
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecorderState {
    Idle,
    Recording,
    Paused,
    Stopping,
}

impl RecorderState {
    pub fn is_idle(self) -> bool {
        matches!(self, Self::Idle)
    }

    pub fn is_recording(self) -> bool {
        matches!(self, Self::Recording)
    }

    pub fn is_paused(self) -> bool {
        matches!(self, Self::Paused)
    }

    pub fn is_stopping(self) -> bool {
        matches!(self, Self::Stopping)
    }
}
