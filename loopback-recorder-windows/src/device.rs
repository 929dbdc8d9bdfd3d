//! Windows render-endpoint enumeration via the MMDevice API.
//!
//! Loopback capture attaches to a render (speaker/headphone) endpoint, so
//! only render devices are listed here.

use windows::Win32::Devices::FunctionDiscovery::*;
use windows::Win32::Media::Audio::*;
use windows::Win32::System::Com::StructuredStorage::PropVariantClear;
use windows::Win32::System::Com::*;
use windows::Win32::System::Variant::*;

use loopback_recorder_core::RecorderError;

/// A render endpoint loopback capture can attach to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    pub id: String,
    pub name: String,
    pub is_default: bool,
}

/// The system's default output device.
pub fn default_render_device() -> Result<DeviceInfo, RecorderError> {
    unsafe {
        let _com = ComGuard::init()?;
        let enumerator = create_enumerator()?;

        let device = enumerator
            .GetDefaultAudioEndpoint(eRender, eConsole)
            .map_err(|_| RecorderError::DeviceNotAvailable)?;

        let id = device
            .GetId()
            .ok()
            .and_then(|id| id.to_string().ok())
            .unwrap_or_default();
        let name = friendly_name(&device).unwrap_or_else(|| "Default output".into());

        Ok(DeviceInfo {
            id,
            name,
            is_default: true,
        })
    }
}

/// All active render endpoints.
pub fn list_render_devices() -> Result<Vec<DeviceInfo>, RecorderError> {
    unsafe {
        let _com = ComGuard::init()?;
        let enumerator = create_enumerator()?;

        let collection = enumerator
            .EnumAudioEndpoints(eRender, DEVICE_STATE_ACTIVE)
            .map_err(|e| RecorderError::DeviceFailed(format!("EnumAudioEndpoints failed: {}", e)))?;
        let count = collection
            .GetCount()
            .map_err(|e| RecorderError::DeviceFailed(format!("GetCount failed: {}", e)))?;

        let default_id = enumerator
            .GetDefaultAudioEndpoint(eRender, eConsole)
            .ok()
            .and_then(|d| d.GetId().ok())
            .and_then(|id| id.to_string().ok());

        let mut devices = Vec::new();
        for i in 0..count {
            let device = match collection.Item(i) {
                Ok(d) => d,
                Err(_) => continue,
            };
            let id = match device.GetId() {
                Ok(id) => id.to_string().unwrap_or_default(),
                Err(_) => continue,
            };
            let name = friendly_name(&device).unwrap_or_else(|| format!("Output {}", i));
            let is_default = default_id.as_deref() == Some(&id);

            devices.push(DeviceInfo {
                id,
                name,
                is_default,
            });
        }

        if devices.is_empty() {
            return Err(RecorderError::DeviceNotAvailable);
        }
        Ok(devices)
    }
}

fn create_enumerator() -> Result<IMMDeviceEnumerator, RecorderError> {
    unsafe {
        CoCreateInstance(&MMDeviceEnumerator, None, CLSCTX_ALL)
            .map_err(|e| RecorderError::DeviceFailed(format!("failed to create enumerator: {}", e)))
    }
}

/// Read the PKEY_Device_FriendlyName property from a device.
fn friendly_name(device: &IMMDevice) -> Option<String> {
    unsafe {
        let store = device.OpenPropertyStore(STGM_READ).ok()?;

        let mut prop_variant = std::mem::zeroed::<PROPVARIANT>();
        store
            .GetValue(&PKEY_Device_FriendlyName, &mut prop_variant)
            .ok()?;

        let name = if prop_variant.Anonymous.Anonymous.vt == VT_LPWSTR {
            let pwsz = prop_variant.Anonymous.Anonymous.Anonymous.pwszVal;
            if !pwsz.is_null() {
                let len = (0..)
                    .take_while(|&i| *pwsz.offset(i) != 0)
                    .count();
                Some(String::from_utf16_lossy(std::slice::from_raw_parts(
                    pwsz, len,
                )))
            } else {
                None
            }
        } else {
            None
        };

        PropVariantClear(&mut prop_variant).ok();
        name
    }
}

/// Per-call COM initialization with balanced teardown.
pub(crate) struct ComGuard;

impl ComGuard {
    pub(crate) fn init() -> Result<Self, RecorderError> {
        unsafe {
            CoInitializeEx(None, COINIT_MULTITHREADED)
                .ok()
                .map_err(|e| RecorderError::DeviceFailed(format!("CoInitializeEx failed: {}", e)))?;
        }
        Ok(Self)
    }
}

impl Drop for ComGuard {
    fn drop(&mut self) {
        unsafe {
            CoUninitialize();
        }
    }
}
