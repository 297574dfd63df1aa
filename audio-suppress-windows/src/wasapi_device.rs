//! WASAPI endpoint device.
//!
//! Binds one MMDevice endpoint to a shared-mode `IAudioClient` and holds
//! its render and capture service interfaces for the life of the value.
//! The acquisition sequence is enumerator → device → client → mix format
//! → stream init → render service → capture service; release happens in
//! strict reverse order on every exit path, because the service
//! interfaces hold references into the client and the client into the
//! device.

use std::iter::once;

use windows::core::PCWSTR;
use windows::Win32::Media::Audio::*;
use windows::Win32::System::Com::*;

use audio_suppress_core::models::error::AudioError;
use audio_suppress_core::models::format::{FormatRequest, NegotiatedFormat};
use audio_suppress_core::traits::endpoint_device::EndpointDevice;

/// Native shared-mode buffer duration: 1 second in 100-nanosecond units.
/// Sized independently of the requested frames-per-buffer so the engine
/// side never starves the processing side.
const NATIVE_BUFFER_DURATION: i64 = 10_000_000;

const WAVE_FORMAT_IEEE_FLOAT_TAG: u16 = 0x0003;
const WAVE_FORMAT_EXTENSIBLE_TAG: u16 = 0xFFFE;

/// One bound WASAPI endpoint: device, audio client, render and capture
/// services, and the endpoint's mix format.
///
/// Field order is release order. Rust drops struct fields top to bottom,
/// which gives exactly the reverse of acquisition: mix format, capture
/// service, render service, client, device.
pub struct WasapiEndpointDevice {
    mix_format: MixFormat,
    capture_client: IAudioCaptureClient,
    render_client: IAudioRenderClient,
    audio_client: IAudioClient,
    device: IMMDevice,

    request: FormatRequest,
}

// SAFETY: every COM interface held here was created in a multithreaded
// apartment, so moving the device to another thread (the stream runner)
// is sound. The device is moved, never shared, across threads.
unsafe impl Send for WasapiEndpointDevice {}

impl WasapiEndpointDevice {
    /// The endpoint's MMDevice ID, as reported by the device itself.
    pub fn endpoint_id(&self) -> Result<String, AudioError> {
        unsafe {
            let id = self
                .device
                .GetId()
                .map_err(|e| AudioError::EndpointResolution(format!("GetId failed: {}", e)))?;
            Ok(id.to_string().unwrap_or_default())
        }
    }

    pub(crate) fn audio_client(&self) -> &IAudioClient {
        &self.audio_client
    }

    pub(crate) fn capture_client(&self) -> &IAudioCaptureClient {
        &self.capture_client
    }

    pub(crate) fn render_client(&self) -> &IAudioRenderClient {
        &self.render_client
    }
}

impl EndpointDevice for WasapiEndpointDevice {
    /// Bind to the endpoint with the given MMDevice ID.
    ///
    /// On failure the error names the step that failed, and the locals
    /// acquired before it drop in reverse declaration order, so
    /// later-acquired handles are always released before the handles they
    /// reference. COM is initialized on the calling thread and stays
    /// initialized for the life of the process.
    fn open(endpoint_id: &str, request: FormatRequest) -> Result<Self, AudioError> {
        unsafe {
            CoInitializeEx(None, COINIT_MULTITHREADED)
                .map_err(|e| AudioError::Unknown(format!("CoInitializeEx failed: {}", e)))?;

            let enumerator: IMMDeviceEnumerator =
                CoCreateInstance(&MMDeviceEnumerator, None, CLSCTX_ALL).map_err(|e| {
                    AudioError::EndpointResolution(format!("failed to create enumerator: {}", e))
                })?;

            let wide_id: Vec<u16> = endpoint_id.encode_utf16().chain(once(0)).collect();
            let device = enumerator.GetDevice(PCWSTR(wide_id.as_ptr())).map_err(|_| {
                AudioError::EndpointResolution(format!("no endpoint with id {}", endpoint_id))
            })?;

            let audio_client: IAudioClient = device
                .Activate(CLSCTX_ALL, None)
                .map_err(|e| AudioError::Activation(format!("Activate failed: {}", e)))?;

            let mix_format = MixFormat(audio_client.GetMixFormat().map_err(|e| {
                AudioError::FormatNegotiation(format!("GetMixFormat failed: {}", e))
            })?);

            audio_client
                .Initialize(
                    AUDCLNT_SHAREMODE_SHARED,
                    0,
                    NATIVE_BUFFER_DURATION,
                    0,
                    mix_format.as_ptr(),
                    None,
                )
                .map_err(|e| {
                    AudioError::StreamInit(format!("IAudioClient::Initialize failed: {}", e))
                })?;

            let render_client: IAudioRenderClient = audio_client.GetService().map_err(|e| {
                AudioError::ServiceQuery(format!("render service query failed: {}", e))
            })?;

            let capture_client: IAudioCaptureClient = audio_client.GetService().map_err(|e| {
                AudioError::ServiceQuery(format!("capture service query failed: {}", e))
            })?;

            Ok(Self {
                mix_format,
                capture_client,
                render_client,
                audio_client,
                device,
                request,
            })
        }
    }

    fn request(&self) -> FormatRequest {
        self.request
    }

    fn negotiated(&self) -> NegotiatedFormat {
        self.mix_format.describe()
    }
}

impl std::fmt::Debug for WasapiEndpointDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WasapiEndpointDevice")
            .field("request", &self.request)
            .field("negotiated", &self.mix_format.describe())
            .finish_non_exhaustive()
    }
}

/// Owner of the `WAVEFORMATEX` allocation returned by `GetMixFormat`.
/// Freed with `CoTaskMemFree` on drop.
struct MixFormat(*mut WAVEFORMATEX);

impl MixFormat {
    fn as_ptr(&self) -> *const WAVEFORMATEX {
        self.0
    }

    /// Read the endpoint's actual operating format.
    ///
    /// Shared-mode engines mix in Float32; extensible formats carry the
    /// float subtype, so both tags are treated as float here.
    fn describe(&self) -> NegotiatedFormat {
        let format = unsafe { &*self.0 };
        NegotiatedFormat {
            sample_rate: format.nSamplesPerSec,
            channels: format.nChannels,
            bits_per_sample: format.wBitsPerSample,
            is_float: format.wFormatTag == WAVE_FORMAT_IEEE_FLOAT_TAG
                || format.wFormatTag == WAVE_FORMAT_EXTENSIBLE_TAG,
        }
    }
}

impl Drop for MixFormat {
    fn drop(&mut self) {
        unsafe {
            CoTaskMemFree(Some(self.0 as *const _ as *const _));
        }
    }
}
