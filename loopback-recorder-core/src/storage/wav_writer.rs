use std::fs::{self, File};
use std::io::{Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

use crate::models::block::AudioBlock;
use crate::models::error::RecorderError;
use crate::models::options::{SampleFormat, SessionOptions};
use crate::processing::wav_format;
use crate::traits::sink::{AudioSink, SinkReport};

/// Streaming WAV file sink.
///
/// Created with the session format fixed; writes a placeholder 44-byte
/// header up front, encodes each appended block to the configured PCM
/// subtype, and patches the RIFF and data sizes on close. Touched by
/// exactly one thread, the writer loop.
pub struct WavFileWriter {
    path: PathBuf,
    sample_rate: u32,
    channels: u16,
    format: SampleFormat,
    file: Option<File>,
    data_bytes: u64,
    report: Option<SinkReport>,
}

impl WavFileWriter {
    /// Create the output file (and any missing parent directories) and
    /// write the initial header.
    pub fn create(path: PathBuf, options: &SessionOptions) -> Result<Self, RecorderError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| {
                    RecorderError::Sink(format!("failed to create directory: {}", e))
                })?;
            }
        }

        let mut file = File::create(&path)
            .map_err(|e| RecorderError::Sink(format!("failed to create file: {}", e)))?;

        let header = wav_format::header(options.sample_rate, options.channels, options.sample_format, 0);
        file.write_all(&header)
            .map_err(|e| RecorderError::Sink(format!("failed to write header: {}", e)))?;

        Ok(Self {
            path,
            sample_rate: options.sample_rate,
            channels: options.channels,
            format: options.sample_format,
            file: Some(file),
            data_bytes: 0,
            report: None,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Bytes of PCM data appended so far, header excluded.
    pub fn data_bytes(&self) -> u64 {
        self.data_bytes
    }
}

impl AudioSink for WavFileWriter {
    fn append(&mut self, block: &AudioBlock) -> Result<(), RecorderError> {
        let file = self
            .file
            .as_mut()
            .ok_or_else(|| RecorderError::Sink("sink is closed".into()))?;

        // All blocks in one session share one format; a mismatch means the
        // source violated its contract.
        if block.channels() != self.channels || block.sample_rate() != self.sample_rate {
            return Err(RecorderError::Sink(format!(
                "block format {} Hz/{} ch does not match sink {} Hz/{} ch",
                block.sample_rate(),
                block.channels(),
                self.sample_rate,
                self.channels
            )));
        }

        let pcm = wav_format::encode_samples(block.samples(), self.format);
        file.write_all(&pcm)
            .map_err(|e| RecorderError::Sink(format!("write failed: {}", e)))?;
        self.data_bytes += pcm.len() as u64;
        Ok(())
    }

    fn close(&mut self) -> Result<SinkReport, RecorderError> {
        let Some(mut file) = self.file.take() else {
            // Already closed; hand back the report from the first close.
            return self
                .report
                .clone()
                .ok_or_else(|| RecorderError::Sink("sink was never opened".into()));
        };

        let map_io = |e: std::io::Error| RecorderError::Sink(e.to_string());

        file.seek(SeekFrom::Start(wav_format::RIFF_SIZE_OFFSET))
            .map_err(map_io)?;
        let riff_len = (wav_format::WAV_HEADER_LEN as u64 + self.data_bytes - 8) as u32;
        file.write_all(&riff_len.to_le_bytes()).map_err(map_io)?;

        file.seek(SeekFrom::Start(wav_format::DATA_SIZE_OFFSET))
            .map_err(map_io)?;
        file.write_all(&(self.data_bytes as u32).to_le_bytes())
            .map_err(map_io)?;

        file.flush().map_err(map_io)?;
        drop(file);

        let report = SinkReport {
            bytes_written: wav_format::WAV_HEADER_LEN as u64 + self.data_bytes,
            checksum: Some(sha256_file(&self.path)?),
        };
        self.report = Some(report.clone());
        Ok(report)
    }
}

/// SHA-256 hex digest of a file.
fn sha256_file(path: &Path) -> Result<String, RecorderError> {
    let data = fs::read(path)
        .map_err(|e| RecorderError::Sink(format!("failed to read file for checksum: {}", e)))?;
    let digest = Sha256::digest(&data);
    Ok(digest.iter().map(|b| format!("{:02x}", b)).collect())
}
