//! # audio-suppress-core
//!
//! Platform-agnostic audio suppression core library.
//!
//! Owns the streaming hot path: stage buffers, the noise/voice amplitude
//! gates, and the start/stop and threshold controls shared with a control
//! thread. Platform-specific backends (Windows WASAPI) implement the
//! `EndpointDevice` trait and plug into the generic `SuppressionProcessor`.
//!
//! ## Architecture
//!
//! ```text
//! audio-suppress-core (this crate)
//! ├── traits/       ← EndpointDevice, ProcessedAudioCallback
//! ├── models/       ← AudioError, FormatRequest, NegotiatedFormat, EndpointInfo
//! ├── processing/   ← suppression gates + atomic threshold storage
//! └── processor.rs  ← SuppressionProcessor (device pair + hot path)
//! ```

pub mod models;
pub mod processing;
pub mod processor;
pub mod traits;

// Re-export key types at crate root for convenience.
pub use models::endpoint::{EndpointDirection, EndpointInfo};
pub use models::error::AudioError;
pub use models::format::{FormatRequest, NegotiatedFormat};
pub use processing::suppression::SuppressionLevels;
pub use processor::{ProcessorHandle, SuppressionProcessor};
pub use traits::endpoint_device::{EndpointDevice, ProcessedAudioCallback};
