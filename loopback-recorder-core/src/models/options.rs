use serde::{Deserialize, Serialize};

/// PCM sample subtype for the output file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SampleFormat {
    Pcm16,
    Pcm24,
    Pcm32,
}

impl SampleFormat {
    pub fn bit_depth(self) -> u16 {
        match self {
            Self::Pcm16 => 16,
            Self::Pcm24 => 24,
            Self::Pcm32 => 32,
        }
    }

    pub fn bytes_per_sample(self) -> usize {
        self.bit_depth() as usize / 8
    }
}

/// Options for a recording session, fixed for its whole lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionOptions {
    /// Capture/output rate in Hz (default: 48000).
    pub sample_rate: u32,

    /// Number of interleaved channels (default: 2 for stereo).
    pub channels: u16,

    /// Frames per capture block (default: 1024).
    pub block_size: usize,

    /// PCM subtype written to the output file (default: 16-bit signed).
    pub sample_format: SampleFormat,
}

impl SessionOptions {
    pub fn validate(&self) -> Result<(), String> {
        if self.sample_rate == 0 {
            return Err("sample rate must be positive".into());
        }
        if ![1, 2].contains(&self.channels) {
            return Err(format!("unsupported channel count: {}", self.channels));
        }
        if self.block_size == 0 {
            return Err("block size must be positive".into());
        }
        Ok(())
    }

    /// Bytes one encoded frame occupies in the output file.
    pub fn frame_bytes(&self) -> usize {
        self.channels as usize * self.sample_format.bytes_per_sample()
    }
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            sample_rate: 48000,
            channels: 2,
            block_size: 1024,
            sample_format: SampleFormat::Pcm16,
        }
    }
}
