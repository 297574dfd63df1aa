use thiserror::Error;

/// Errors that can occur while opening devices or streaming audio.
///
/// Device setup keeps the identity of the native step that failed
/// (resolution, activation, format negotiation, stream init, service
/// query) instead of collapsing everything into one opaque failure.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AudioError {
    #[error("invalid format request: {0}")]
    InvalidRequest(String),

    #[error("endpoint resolution failed: {0}")]
    EndpointResolution(String),

    #[error("client activation failed: {0}")]
    Activation(String),

    #[error("format negotiation failed: {0}")]
    FormatNegotiation(String),

    #[error("stream initialization failed: {0}")]
    StreamInit(String),

    #[error("service query failed: {0}")]
    ServiceQuery(String),

    #[error("{requested} samples exceed stage buffer capacity {capacity}")]
    BoundsViolation { requested: usize, capacity: usize },

    #[error("stream failure: {0}")]
    StreamFailure(String),

    #[error("unknown error: {0}")]
    Unknown(String),
}
