//! Windows audio endpoint enumeration via the MMDevice API.
//!
//! Wraps `IMMDeviceEnumerator` to list active capture and render
//! endpoints with friendly names. The returned `EndpointInfo::id` is the
//! MMDevice ID accepted by `WasapiEndpointDevice::open`.

use windows::core::PWSTR;
use windows::Win32::Devices::FunctionDiscovery::PKEY_Device_FriendlyName;
use windows::Win32::Media::Audio::*;
use windows::Win32::System::Com::StructuredStorage::PropVariantClear;
use windows::Win32::System::Com::*;
use windows::Win32::System::Variant::*;

use audio_suppress_core::models::endpoint::{EndpointDirection, EndpointInfo};
use audio_suppress_core::models::error::AudioError;

/// Audio endpoint enumerator.
pub struct DeviceEnumerator {
    enumerator: IMMDeviceEnumerator,
}

impl DeviceEnumerator {
    /// Create a new enumerator.
    ///
    /// Requires COM to be initialized on the calling thread.
    pub fn new() -> Result<Self, AudioError> {
        unsafe {
            let enumerator: IMMDeviceEnumerator =
                CoCreateInstance(&MMDeviceEnumerator, None, CLSCTX_ALL).map_err(|e| {
                    AudioError::EndpointResolution(format!("failed to create enumerator: {}", e))
                })?;
            Ok(Self { enumerator })
        }
    }

    /// List active capture (microphone) endpoints.
    pub fn list_capture_endpoints(&self) -> Result<Vec<EndpointInfo>, AudioError> {
        self.list_endpoints(eCapture, EndpointDirection::Capture)
    }

    /// List active render (speaker/headphone) endpoints.
    pub fn list_render_endpoints(&self) -> Result<Vec<EndpointInfo>, AudioError> {
        self.list_endpoints(eRender, EndpointDirection::Render)
    }

    /// ID of the default capture endpoint.
    pub fn default_capture_endpoint_id(&self) -> Result<String, AudioError> {
        self.default_endpoint_id(eCapture)
    }

    /// ID of the default render endpoint.
    pub fn default_render_endpoint_id(&self) -> Result<String, AudioError> {
        self.default_endpoint_id(eRender)
    }

    fn default_endpoint_id(&self, data_flow: EDataFlow) -> Result<String, AudioError> {
        unsafe {
            let device = self
                .enumerator
                .GetDefaultAudioEndpoint(data_flow, eConsole)
                .map_err(|_| AudioError::EndpointResolution("no default endpoint".into()))?;

            let id = device
                .GetId()
                .map_err(|e| AudioError::EndpointResolution(format!("GetId failed: {}", e)))?;

            Ok(id.to_string().unwrap_or_default())
        }
    }

    fn list_endpoints(
        &self,
        data_flow: EDataFlow,
        direction: EndpointDirection,
    ) -> Result<Vec<EndpointInfo>, AudioError> {
        unsafe {
            let collection = self
                .enumerator
                .EnumAudioEndpoints(data_flow, DEVICE_STATE_ACTIVE)
                .map_err(|e| {
                    AudioError::EndpointResolution(format!("EnumAudioEndpoints failed: {}", e))
                })?;

            let count = collection
                .GetCount()
                .map_err(|e| AudioError::EndpointResolution(format!("GetCount failed: {}", e)))?;

            let default_id = self
                .enumerator
                .GetDefaultAudioEndpoint(data_flow, eConsole)
                .ok()
                .and_then(|d| d.GetId().ok())
                .and_then(|id| id.to_string().ok());

            let mut endpoints = Vec::new();

            for i in 0..count {
                let device = match collection.Item(i) {
                    Ok(d) => d,
                    Err(_) => continue,
                };

                let id = match device.GetId() {
                    Ok(id) => id.to_string().unwrap_or_default(),
                    Err(_) => continue,
                };

                let name =
                    Self::friendly_name(&device).unwrap_or_else(|| format!("Endpoint {}", i));
                let is_default = default_id.as_deref() == Some(&id);

                endpoints.push(EndpointInfo {
                    id,
                    name,
                    direction,
                    is_default,
                });
            }

            Ok(endpoints)
        }
    }

    /// Read PKEY_Device_FriendlyName from the endpoint's property store.
    fn friendly_name(device: &IMMDevice) -> Option<String> {
        unsafe {
            let store = device.OpenPropertyStore(STGM_READ).ok()?;

            let mut prop = std::mem::zeroed::<PROPVARIANT>();
            store.GetValue(&PKEY_Device_FriendlyName, &mut prop).ok()?;

            let name = if prop.Anonymous.Anonymous.vt == VT_LPWSTR {
                wide_to_string(prop.Anonymous.Anonymous.Anonymous.pwszVal)
            } else {
                None
            };

            PropVariantClear(&mut prop).ok();
            name
        }
    }
}

unsafe fn wide_to_string(pwsz: PWSTR) -> Option<String> {
    if pwsz.is_null() {
        return None;
    }
    let len = (0..).take_while(|&i| *pwsz.0.offset(i) != 0).count();
    Some(String::from_utf16_lossy(std::slice::from_raw_parts(
        pwsz.0, len,
    )))
}
