//! WASAPI loopback frame source for system audio.
//!
//! Captures the audio mix going to the default render endpoint using
//! `AUDCLNT_STREAMFLAGS_LOOPBACK`. No special permissions needed on
//! Windows; DRM-protected audio is silenced in loopback.
//!
//! A dedicated poll thread owns all COM objects and feeds a shared sample
//! ring in the session format; `read_block` assembles fixed-size blocks
//! from the ring. When no render session is active WASAPI delivers no
//! packets at all, so the poll thread synthesizes silence against the wall
//! clock. That keeps the recording timeline real-time and bounds every
//! `read_block` call.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{bounded, Sender};
use parking_lot::{Condvar, Mutex};
use windows::core::PCWSTR;
use windows::Win32::Media::Audio::*;
use windows::Win32::System::Com::*;
use windows::Win32::System::Threading::*;

use loopback_recorder_core::traits::frame_source::{FrameSource, LoopbackProvider};
use loopback_recorder_core::{AudioBlock, RecorderError, SampleRing};

use crate::convert;
use crate::device::ComGuard;

/// Ring capacity in seconds of buffered audio.
const RING_SECONDS: usize = 5;

/// Poll interval for the capture thread.
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// A quiet stretch longer than this is backfilled with silence.
const SILENCE_GAP: Duration = Duration::from_millis(200);

struct StreamShared {
    ring: Mutex<SampleRing>,
    filled: Condvar,
    running: AtomicBool,
    failure: Mutex<Option<String>>,
}

/// Loopback capture provider for the default render endpoint.
pub struct WasapiLoopback;

impl WasapiLoopback {
    pub fn new() -> Self {
        Self
    }
}

impl Default for WasapiLoopback {
    fn default() -> Self {
        Self::new()
    }
}

impl LoopbackProvider for WasapiLoopback {
    type Source = WasapiLoopbackSource;

    fn open(&self, sample_rate: u32, channels: u16) -> Result<WasapiLoopbackSource, RecorderError> {
        WasapiLoopbackSource::open(sample_rate, channels)
    }
}

/// Pull-model frame source over a WASAPI loopback stream.
pub struct WasapiLoopbackSource {
    shared: Arc<StreamShared>,
    poll_thread: Option<thread::JoinHandle<()>>,
    sample_rate: u32,
    channels: u16,
}

impl WasapiLoopbackSource {
    /// Attach a loopback stream to the default render endpoint.
    ///
    /// The poll thread is spawned here and must confirm stream
    /// initialization before this returns, so a missing device or denied
    /// access fails at open time.
    pub fn open(sample_rate: u32, channels: u16) -> Result<Self, RecorderError> {
        let shared = Arc::new(StreamShared {
            ring: Mutex::new(SampleRing::with_capacity(
                sample_rate as usize * channels as usize * RING_SECONDS,
            )),
            filled: Condvar::new(),
            running: AtomicBool::new(true),
            failure: Mutex::new(None),
        });

        let (init_tx, init_rx) = bounded(1);
        let thread_shared = Arc::clone(&shared);
        let handle = thread::Builder::new()
            .name("wasapi-loopback".into())
            .spawn(move || {
                if let Err(message) = poll_loop(&thread_shared, init_tx, sample_rate, channels) {
                    log::error!("loopback capture failed: {}", message);
                    *thread_shared.failure.lock() = Some(message);
                }
                thread_shared.running.store(false, Ordering::SeqCst);
                thread_shared.filled.notify_all();
            })
            .map_err(|e| {
                RecorderError::DeviceFailed(format!("failed to spawn capture thread: {}", e))
            })?;

        let source = Self {
            shared,
            poll_thread: Some(handle),
            sample_rate,
            channels,
        };

        match init_rx.recv() {
            Ok(Ok(())) => Ok(source),
            Ok(Err(err)) => Err(err),
            Err(_) => Err(RecorderError::DeviceFailed(
                "capture thread terminated during initialization".into(),
            )),
        }
    }
}

impl FrameSource for WasapiLoopbackSource {
    fn read_block(&mut self, frames: usize) -> Result<AudioBlock, RecorderError> {
        let needed = frames * self.channels as usize;
        let mut samples = vec![0.0f32; needed];
        let mut filled = 0;

        let mut ring = self.shared.ring.lock();
        loop {
            filled += ring.pop_into(&mut samples[filled..]);
            if filled == needed {
                break;
            }
            if !self.shared.running.load(Ordering::SeqCst) {
                let reason = self
                    .shared
                    .failure
                    .lock()
                    .clone()
                    .unwrap_or_else(|| "capture stream closed".into());
                return Err(RecorderError::DeviceFailed(reason));
            }
            self.shared
                .filled
                .wait_for(&mut ring, Duration::from_millis(250));
        }
        drop(ring);

        Ok(AudioBlock::new(samples, self.channels, self.sample_rate))
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn channels(&self) -> u16 {
        self.channels
    }
}

impl Drop for WasapiLoopbackSource {
    fn drop(&mut self) {
        self.shared.running.store(false, Ordering::SeqCst);
        self.shared.filled.notify_all();
        if let Some(handle) = self.poll_thread.take() {
            let _ = handle.join();
        }
    }
}

/// Capture thread body.
///
/// Sequence:
/// 1. CoInitializeEx (MTA)
/// 2. Get default render endpoint
/// 3. Activate IAudioClient, initialize with the LOOPBACK flag (shared mode)
/// 4. Get IAudioCaptureClient, register with MMCSS, start
/// 5. Confirm initialization to `open`, then poll for buffers
fn poll_loop(
    shared: &StreamShared,
    init_tx: Sender<Result<(), RecorderError>>,
    target_rate: u32,
    target_channels: u16,
) -> Result<(), String> {
    // Failures before the handshake completes go to `open`; failures after
    // it surface through `read_block`.
    let report_init = |result: Result<(), RecorderError>| {
        let _ = init_tx.send(result);
    };

    unsafe {
        let com = ComGuard::init().map_err(|e| e.to_string());
        if let Err(message) = &com {
            report_init(Err(RecorderError::DeviceFailed(message.clone())));
            return Err(message.clone());
        }
        let _com = com;

        let enumerator: Result<IMMDeviceEnumerator, _> =
            CoCreateInstance(&MMDeviceEnumerator, None, CLSCTX_ALL);
        let enumerator = match enumerator {
            Ok(e) => e,
            Err(e) => {
                report_init(Err(RecorderError::DeviceNotAvailable));
                return Err(format!("failed to create enumerator: {}", e));
            }
        };

        // Loopback reads from a RENDER endpoint, not a capture endpoint.
        let device = match enumerator.GetDefaultAudioEndpoint(eRender, eConsole) {
            Ok(d) => d,
            Err(e) => {
                report_init(Err(RecorderError::DeviceNotAvailable));
                return Err(format!("no default render endpoint: {}", e));
            }
        };

        let audio_client: IAudioClient = match device.Activate(CLSCTX_ALL, None) {
            Ok(c) => c,
            Err(e) => {
                report_init(Err(RecorderError::DeviceFailed(format!(
                    "Activate failed: {}",
                    e
                ))));
                return Err(format!("Activate failed: {}", e));
            }
        };

        let mix_format_ptr = match audio_client.GetMixFormat() {
            Ok(p) => p,
            Err(e) => {
                report_init(Err(RecorderError::DeviceFailed(format!(
                    "GetMixFormat failed: {}",
                    e
                ))));
                return Err(format!("GetMixFormat failed: {}", e));
            }
        };
        let mix_format = &*mix_format_ptr;
        let device_rate = mix_format.nSamplesPerSec;
        let device_channels = mix_format.nChannels;

        // 100ms buffer, shared mode only (loopback requires it).
        let buffer_duration = 1_000_000;
        if let Err(e) = audio_client.Initialize(
            AUDCLNT_SHAREMODE_SHARED,
            AUDCLNT_STREAMFLAGS_LOOPBACK | AUDCLNT_STREAMFLAGS_NOPERSIST,
            buffer_duration,
            0,
            mix_format,
            None,
        ) {
            report_init(Err(RecorderError::DeviceFailed(format!(
                "IAudioClient::Initialize (loopback) failed: {}",
                e
            ))));
            CoTaskMemFree(Some(mix_format_ptr as *const _ as *const _));
            return Err(format!("Initialize failed: {}", e));
        }

        let capture_client: IAudioCaptureClient = match audio_client.GetService() {
            Ok(c) => c,
            Err(e) => {
                report_init(Err(RecorderError::DeviceFailed(format!(
                    "GetService failed: {}",
                    e
                ))));
                CoTaskMemFree(Some(mix_format_ptr as *const _ as *const _));
                return Err(format!("GetService failed: {}", e));
            }
        };

        // MMCSS registration for real-time priority.
        let mut task_index: u32 = 0;
        let task_name: Vec<u16> = "Pro Audio\0".encode_utf16().collect();
        let _mmcss_handle = AvSetMmThreadCharacteristicsW(PCWSTR(task_name.as_ptr()), &mut task_index);

        if let Err(e) = audio_client.Start() {
            report_init(Err(RecorderError::DeviceFailed(format!(
                "IAudioClient::Start failed: {}",
                e
            ))));
            CoTaskMemFree(Some(mix_format_ptr as *const _ as *const _));
            return Err(format!("Start failed: {}", e));
        }

        report_init(Ok(()));
        log::info!(
            "loopback capture started: device {} Hz/{} ch, session {} Hz/{} ch",
            device_rate,
            device_channels,
            target_rate,
            target_channels
        );

        let outcome = pump_packets(
            shared,
            &capture_client,
            device_rate,
            device_channels,
            target_rate,
            target_channels,
        );

        let _ = audio_client.Stop();
        CoTaskMemFree(Some(mix_format_ptr as *const _ as *const _));
        outcome
    }
}

/// Poll for packets, convert to the session format, and feed the ring.
///
/// Tracks delivered frames against the wall clock and backfills silence
/// when the render engine goes quiet, so the stream stays real-time.
unsafe fn pump_packets(
    shared: &StreamShared,
    capture_client: &IAudioCaptureClient,
    device_rate: u32,
    device_channels: u16,
    target_rate: u32,
    target_channels: u16,
) -> Result<(), String> {
    let started = Instant::now();
    let mut delivered_frames: u64 = 0;
    let mut last_packet = Instant::now();

    while shared.running.load(Ordering::SeqCst) {
        thread::sleep(POLL_INTERVAL);

        let mut packet_length = capture_client
            .GetNextPacketSize()
            .map_err(|e| format!("GetNextPacketSize failed: {}", e))?;
        let mut got_packet = false;

        while packet_length > 0 {
            let mut buffer_ptr: *mut u8 = std::ptr::null_mut();
            let mut num_frames: u32 = 0;
            let mut flags: u32 = 0;

            capture_client
                .GetBuffer(&mut buffer_ptr, &mut num_frames, &mut flags, None, None)
                .map_err(|e| format!("GetBuffer failed: {}", e))?;

            if num_frames > 0 && !buffer_ptr.is_null() {
                let total_samples = num_frames as usize * device_channels as usize;
                let float_ptr = buffer_ptr as *const f32;
                let raw = std::slice::from_raw_parts(float_ptr, total_samples);

                let silent = flags & (AUDCLNT_BUFFERFLAGS_SILENT.0 as u32) != 0;
                let silence;
                let device_samples: &[f32] = if silent {
                    silence = vec![0.0f32; total_samples];
                    &silence
                } else {
                    raw
                };

                delivered_frames += feed_ring(
                    shared,
                    device_samples,
                    device_rate,
                    device_channels,
                    target_rate,
                    target_channels,
                );
                got_packet = true;
                last_packet = Instant::now();
            }

            capture_client
                .ReleaseBuffer(num_frames)
                .map_err(|e| format!("ReleaseBuffer failed: {}", e))?;

            packet_length = capture_client
                .GetNextPacketSize()
                .map_err(|e| format!("GetNextPacketSize failed: {}", e))?;
        }

        // No render session active: WASAPI stops delivering packets
        // entirely. Backfill the gap with silence to keep the timeline
        // real-time.
        if !got_packet && last_packet.elapsed() > SILENCE_GAP {
            let expected =
                (started.elapsed().as_secs_f64() * target_rate as f64) as u64;
            let deficit = expected.saturating_sub(delivered_frames) as usize;
            if deficit > 0 {
                let zeros = vec![0.0f32; deficit * target_channels as usize];
                let mut ring = shared.ring.lock();
                ring.push_slice(&zeros);
                drop(ring);
                shared.filled.notify_all();
                delivered_frames += deficit as u64;
                log::debug!("render engine quiet, backfilled {} frames of silence", deficit);
            }
        }
    }

    Ok(())
}

/// Convert one device-format packet to the session format and push it.
///
/// Returns the number of session-rate frames pushed.
fn feed_ring(
    shared: &StreamShared,
    device_samples: &[f32],
    device_rate: u32,
    device_channels: u16,
    target_rate: u32,
    target_channels: u16,
) -> u64 {
    let remapped = convert::remap_channels(device_samples, device_channels, target_channels);
    let resampled = convert::resample_linear(&remapped, target_channels, device_rate, target_rate);
    let frames = resampled.len() / target_channels as usize;

    let mut ring = shared.ring.lock();
    let dropped = ring.push_slice(&resampled);
    drop(ring);
    shared.filled.notify_all();

    if dropped > 0 {
        log::warn!("loopback ring overrun, dropped {} samples", dropped);
    }
    frames as u64
}
