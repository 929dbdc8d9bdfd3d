/// One capture period of interleaved `f32` samples.
///
/// Produced by the capture loop, moved into the handoff queue, and owned by
/// exactly one side at any time. Sample rate and channel count are fixed for
/// the lifetime of a session; PCM encoding to the configured subtype happens
/// at the sink.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBlock {
    samples: Vec<f32>,
    channels: u16,
    sample_rate: u32,
}

impl AudioBlock {
    /// Wrap interleaved samples. `samples.len()` must be a whole number of
    /// frames for `channels`.
    pub fn new(samples: Vec<f32>, channels: u16, sample_rate: u32) -> Self {
        debug_assert!(channels > 0);
        debug_assert_eq!(samples.len() % channels as usize, 0);
        Self {
            samples,
            channels,
            sample_rate,
        }
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn frames(&self) -> usize {
        self.samples.len() / self.channels as usize
    }
}

/// Message passed from the capture loop to the writer loop.
///
/// End-of-stream is a distinguished variant rather than a nullable block so
/// the writer handles it exhaustively.
#[derive(Debug, Clone, PartialEq)]
pub enum BlockMessage {
    Data(AudioBlock),
    EndOfStream,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_count_is_per_channel() {
        let block = AudioBlock::new(vec![0.0; 2048], 2, 48000);
        assert_eq!(block.frames(), 1024);
        assert_eq!(block.channels(), 2);
        assert_eq!(block.sample_rate(), 48000);
    }

    #[test]
    fn mono_frames_match_sample_count() {
        let block = AudioBlock::new(vec![0.5; 512], 1, 16000);
        assert_eq!(block.frames(), 512);
    }
}
