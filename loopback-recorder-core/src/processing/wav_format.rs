//! RIFF WAV header generation and PCM sample encoding.
//!
//! The writer opens the file with a placeholder header and patches the size
//! fields on close, so a crash mid-recording leaves the PCM data intact
//! even though the declared sizes are stale.

use crate::models::options::SampleFormat;

/// Size of the standard WAV RIFF header in bytes.
pub const WAV_HEADER_LEN: usize = 44;

/// Offset of the RIFF chunk size field (file size - 8).
pub const RIFF_SIZE_OFFSET: u64 = 4;

/// Offset of the data chunk size field.
pub const DATA_SIZE_OFFSET: u64 = 40;

/// Generate a 44-byte WAV header for integer PCM (format code 1),
/// little-endian.
///
/// Layout:
/// ```text
/// [0-3]    "RIFF"
/// [4-7]    file size - 8 (36 + data_len)
/// [8-11]   "WAVE"
/// [12-15]  "fmt "
/// [16-19]  16 (PCM format chunk size)
/// [20-21]  1 (PCM format code)
/// [22-23]  channels
/// [24-27]  sample_rate
/// [28-31]  byte_rate = sample_rate * channels * bit_depth / 8
/// [32-33]  block_align = channels * bit_depth / 8
/// [34-35]  bit_depth
/// [36-39]  "data"
/// [40-43]  data_len
/// ```
pub fn header(
    sample_rate: u32,
    channels: u16,
    format: SampleFormat,
    data_len: u32,
) -> [u8; WAV_HEADER_LEN] {
    let bit_depth = format.bit_depth();
    let block_align = channels * bit_depth / 8;
    let byte_rate = sample_rate * block_align as u32;

    let mut header = [0u8; WAV_HEADER_LEN];

    header[0..4].copy_from_slice(b"RIFF");
    header[4..8].copy_from_slice(&(36 + data_len).to_le_bytes());
    header[8..12].copy_from_slice(b"WAVE");

    header[12..16].copy_from_slice(b"fmt ");
    header[16..20].copy_from_slice(&16u32.to_le_bytes());
    header[20..22].copy_from_slice(&1u16.to_le_bytes());
    header[22..24].copy_from_slice(&channels.to_le_bytes());
    header[24..28].copy_from_slice(&sample_rate.to_le_bytes());
    header[28..32].copy_from_slice(&byte_rate.to_le_bytes());
    header[32..34].copy_from_slice(&block_align.to_le_bytes());
    header[34..36].copy_from_slice(&bit_depth.to_le_bytes());

    header[36..40].copy_from_slice(b"data");
    header[40..44].copy_from_slice(&data_len.to_le_bytes());

    header
}

/// Encode `f32` samples in `[-1.0, 1.0]` to little-endian PCM of the given
/// subtype. Out-of-range values are clamped.
pub fn encode_samples(samples: &[f32], format: SampleFormat) -> Vec<u8> {
    let mut data = Vec::with_capacity(samples.len() * format.bytes_per_sample());
    match format {
        SampleFormat::Pcm16 => {
            for &sample in samples {
                let value = (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16;
                data.extend_from_slice(&value.to_le_bytes());
            }
        }
        SampleFormat::Pcm24 => {
            for &sample in samples {
                let value = (sample.clamp(-1.0, 1.0) as f64 * 8_388_607.0) as i32;
                data.extend_from_slice(&value.to_le_bytes()[..3]);
            }
        }
        SampleFormat::Pcm32 => {
            for &sample in samples {
                let value = (sample.clamp(-1.0, 1.0) as f64 * i32::MAX as f64) as i32;
                data.extend_from_slice(&value.to_le_bytes());
            }
        }
    }
    data
}
