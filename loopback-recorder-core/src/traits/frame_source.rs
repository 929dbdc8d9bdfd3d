use crate::models::block::AudioBlock;
use crate::models::error::RecorderError;

/// A capturable stream matching the system's current audio output.
///
/// Implemented by platform backends (Windows WASAPI loopback). The handle is
/// owned and driven by exactly one thread, the capture loop.
pub trait FrameSource: Send {
    /// Read one block of `frames` frames of interleaved samples.
    ///
    /// Blocks only for the real time needed to accumulate the requested
    /// frames; never waits on downstream queue state. Fails with a device
    /// error if the underlying stream becomes invalid. Implementations must
    /// validate the block (length = frames x channels) before returning it;
    /// callers rely on that and never re-check after handing a block off.
    fn read_block(&mut self, frames: usize) -> Result<AudioBlock, RecorderError>;

    /// The rate the stream was opened with, in Hz.
    fn sample_rate(&self) -> u32;

    /// The channel count the stream was opened with.
    fn channels(&self) -> u16;
}

/// Factory boundary for the OS loopback capture capability.
///
/// `open` resolves the system's default output device and attaches a
/// loopback capture stream to it. Fails with `DeviceNotAvailable` when no
/// loopback-capable output device exists or the OS denies access.
pub trait LoopbackProvider {
    type Source: FrameSource;

    fn open(&self, sample_rate: u32, channels: u16) -> Result<Self::Source, RecorderError>;
}
