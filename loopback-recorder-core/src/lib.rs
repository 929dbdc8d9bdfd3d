//! # loopback-recorder-core
//!
//! Platform-agnostic system audio recorder core.
//!
//! Captures the system's audio output (loopback, not microphone input) and
//! persists it losslessly to a WAV file, with pause/resume and a shutdown
//! protocol that flushes all buffered audio before the file is closed.
//! Platform backends (Windows WASAPI) implement the `FrameSource` /
//! `LoopbackProvider` traits and plug into the generic
//! `SystemAudioRecorder`.
//!
//! ## Architecture
//!
//! ```text
//! loopback-recorder-core (this crate)
//! ├── traits/       ← FrameSource, LoopbackProvider, AudioSink, RecorderDelegate
//! ├── models/       ← RecorderError, RecorderState, SessionOptions, AudioBlock, stats
//! ├── processing/   ← HandoffQueue, PauseGate, StopSignal, SampleRing, WAV encoding
//! ├── session/      ← CaptureLoop, WriterLoop, SystemAudioRecorder (controller)
//! └── storage/      ← WavFileWriter, metadata sidecar
//! ```
//!
//! ## Data flow
//!
//! ```text
//! [FrameSource] → [CaptureLoop] → [HandoffQueue] → [WriterLoop] → [WavFileWriter]
//!                      ↑ pause gate      ↑ sentinel on stop
//! ```
//!
//! The capture loop must never block on writer speed: the handoff queue is
//! bounded and a push that cannot complete within its timeout drops that
//! block (logged and counted) rather than stalling real-time capture.

pub mod models;
pub mod processing;
pub mod session;
pub mod storage;
pub mod traits;

// Re-export key types at crate root for convenience.
pub use models::block::{AudioBlock, BlockMessage};
pub use models::error::RecorderError;
pub use models::options::{SampleFormat, SessionOptions};
pub use models::recording_result::{RecordingMetadata, RecordingResult};
pub use models::state::RecorderState;
pub use models::stats::{SessionStats, StatsSnapshot};
pub use processing::handoff_queue::{HandoffQueue, PushTimedOut, DEFAULT_QUEUE_CAPACITY};
pub use processing::pause_gate::PauseGate;
pub use processing::sample_ring::SampleRing;
pub use processing::stop_signal::StopSignal;
pub use session::recorder::{SystemAudioRecorder, WRITER_JOIN_TIMEOUT};
pub use storage::wav_writer::WavFileWriter;
pub use traits::delegate::RecorderDelegate;
pub use traits::frame_source::{FrameSource, LoopbackProvider};
pub use traits::sink::{AudioSink, SinkReport};
