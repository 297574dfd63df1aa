//! # audio-suppress-windows
//!
//! Windows WASAPI backend for audio-suppression-kit.
//!
//! Provides:
//! - `WasapiEndpointDevice` — one bound endpoint: shared-mode client plus
//!   render and capture services, released in reverse acquisition order
//! - `DeviceEnumerator` — endpoint listing via the MMDevice API
//! - `StreamRunner` — capture → suppress → render pump thread
//!
//! ## Usage
//! ```ignore
//! use audio_suppress_core::{FormatRequest, SuppressionProcessor};
//! use audio_suppress_windows::{DeviceEnumerator, StreamRunner, WasapiEndpointDevice};
//!
//! let enumerator = DeviceEnumerator::new()?;
//! let mic = enumerator.default_capture_endpoint_id()?;
//! let speakers = enumerator.default_render_endpoint_id()?;
//!
//! let processor = SuppressionProcessor::<WasapiEndpointDevice>::open(
//!     &mic,
//!     Some(&speakers),
//!     FormatRequest::default(),
//! )?;
//! processor.start();
//! let runner = StreamRunner::spawn(processor, callback)?;
//! ```

#[cfg(target_os = "windows")]
pub mod device_enumerator;
#[cfg(target_os = "windows")]
pub mod stream;
#[cfg(target_os = "windows")]
pub mod wasapi_device;

#[cfg(target_os = "windows")]
pub use device_enumerator::DeviceEnumerator;
#[cfg(target_os = "windows")]
pub use stream::StreamRunner;
#[cfg(target_os = "windows")]
pub use wasapi_device::WasapiEndpointDevice;
