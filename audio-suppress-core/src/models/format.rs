use serde::{Deserialize, Serialize};

/// Stream parameters requested when opening a device.
///
/// These are what the caller asked for, not what the endpoint runs at.
/// Shared-mode endpoints keep their own mix format; the request is only
/// used to size the processing buffers. See [`NegotiatedFormat`] for what
/// the hardware actually delivers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormatRequest {
    /// Requested sample rate in Hz (default: 44100).
    pub sample_rate: u32,

    /// Requested channel count (default: 1, mono).
    pub channels: u16,

    /// Frames per processing buffer (default: 1024).
    pub frames_per_buffer: usize,
}

impl FormatRequest {
    pub fn validate(&self) -> Result<(), String> {
        if self.sample_rate == 0 {
            return Err("sample rate must be positive".into());
        }
        if self.channels == 0 {
            return Err("channel count must be positive".into());
        }
        if self.frames_per_buffer == 0 {
            return Err("frames per buffer must be positive".into());
        }
        Ok(())
    }

    /// Interleaved samples in one processing buffer.
    pub fn samples_per_buffer(&self) -> usize {
        self.frames_per_buffer * self.channels as usize
    }
}

impl Default for FormatRequest {
    fn default() -> Self {
        Self {
            sample_rate: 44100,
            channels: 1,
            frames_per_buffer: 1024,
        }
    }
}

/// The format an endpoint actually operates at, as reported by the
/// platform. May differ from the [`FormatRequest`] in every field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NegotiatedFormat {
    pub sample_rate: u32,
    pub channels: u16,
    pub bits_per_sample: u16,
    /// Whether samples are IEEE float (shared-mode WASAPI mixes in f32).
    pub is_float: bool,
}
