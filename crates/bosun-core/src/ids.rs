use serde::{Deserialize, Serialize};

/// Correlates a response to its originating request on a shared channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(
    /// Monotonic numeric request identifier.
    pub u64,
);

/// Selects which handler processes a request body on the receiving peer.
///
/// Codes are meaningful only within one protocol version; allocation of
/// codes to concrete operations is owned by the fabric layer, not this core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OperationCode(
    /// Single-byte operation selector.
    pub u8,
);
