use std::sync::Arc;

use crate::models::error::AudioError;
use crate::models::format::{FormatRequest, NegotiatedFormat};

/// Callback invoked when a processed audio buffer is available.
///
/// Parameters:
/// - `samples`: Interleaved f32 samples after both suppression stages.
/// - `sample_rate`: Sample rate of the delivered audio in Hz.
/// - `channels`: Number of interleaved channels.
pub type ProcessedAudioCallback = Arc<dyn Fn(&[f32], u32, u16) + Send + Sync + 'static>;

/// Interface for platform-specific audio endpoint devices.
///
/// A device binds to one named endpoint and owns its native client and
/// capture/render service handles for its whole lifetime. Implemented by:
/// - `WasapiEndpointDevice` (Windows)
/// - Future: a Core Audio device on macOS
///
/// Construction is the only state transition: a value of the implementing
/// type is fully bound, and dropping it releases every native handle.
pub trait EndpointDevice: Sized {
    /// Bind to the endpoint identified by `endpoint_id`.
    ///
    /// The error distinguishes which native step failed; any handles
    /// acquired before the failing step are released before returning.
    fn open(endpoint_id: &str, request: FormatRequest) -> Result<Self, AudioError>;

    /// The parameters the caller asked for.
    ///
    /// These are NOT the native stream parameters — shared-mode endpoints
    /// keep their own mix format, and nothing reconciles the two. Callers
    /// needing the actual format must use [`EndpointDevice::negotiated`].
    fn request(&self) -> FormatRequest;

    /// The format the endpoint actually operates at.
    fn negotiated(&self) -> NegotiatedFormat;

    /// Requested sample rate in Hz.
    fn sample_rate(&self) -> u32 {
        self.request().sample_rate
    }

    /// Requested channel count.
    fn channels(&self) -> u16 {
        self.request().channels
    }

    /// Requested frames per processing buffer.
    fn frames_per_buffer(&self) -> usize {
        self.request().frames_per_buffer
    }
}
