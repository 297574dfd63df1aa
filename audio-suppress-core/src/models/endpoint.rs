use serde::{Deserialize, Serialize};

/// Data flow direction of an audio endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EndpointDirection {
    Capture,
    Render,
}

/// An audio endpoint available on the host, as listed by a backend
/// enumerator. The `id` is the platform-specific identifier accepted by
/// the backend's device open call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointInfo {
    pub id: String,
    pub name: String,
    pub direction: EndpointDirection,
    pub is_default: bool,
}
