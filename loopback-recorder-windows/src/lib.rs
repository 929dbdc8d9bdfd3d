//! # loopback-recorder-windows
//!
//! Windows WASAPI backend for loopback-recorder.
//!
//! Provides:
//! - `WasapiLoopback` / `WasapiLoopbackSource`: system audio capture via
//!   WASAPI loopback on the default render endpoint
//! - `device`: render-endpoint enumeration via the MMDevice API
//! - `convert`: channel remapping and resampling between the device mix
//!   format and the session format
//!
//! ## Platform Requirements
//! - Windows 10 1703+ (build 15063)
//! - Visual Studio Build Tools 2022 + Windows SDK for linking
//!
//! ## Usage
//! ```ignore
//! use loopback_recorder_core::{SessionOptions, SystemAudioRecorder};
//! use loopback_recorder_windows::WasapiLoopback;
//!
//! let recorder = SystemAudioRecorder::new(WasapiLoopback::new());
//! let result = recorder.start("session.wav", SessionOptions::default())?;
//! ```

pub mod convert;
#[cfg(target_os = "windows")]
pub mod device;
#[cfg(target_os = "windows")]
pub mod loopback;

#[cfg(target_os = "windows")]
pub use device::{default_render_device, list_render_devices, DeviceInfo};
#[cfg(target_os = "windows")]
pub use loopback::{WasapiLoopback, WasapiLoopbackSource};
