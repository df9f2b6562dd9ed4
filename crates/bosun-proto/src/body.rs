use serde::{Serialize, de::DeserializeOwned};

use crate::ProtoError;

/// Serializes a value to CBOR bytes for an operation body.
///
/// The protocol core treats bodies as opaque; CBOR is the convention the
/// fabric's typed operations use inside their body writers and readers.
pub fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, ProtoError> {
    serde_cbor::to_vec(value).map_err(|err| ProtoError::Encode(err.to_string()))
}

/// Serializes a value as CBOR directly into an envelope body buffer.
pub fn encode_into<T: Serialize>(value: &T, out: &mut Vec<u8>) -> Result<(), ProtoError> {
    serde_cbor::to_writer(&mut *out, value).map_err(|err| ProtoError::Encode(err.to_string()))
}

/// Deserializes an operation body from CBOR bytes.
pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, ProtoError> {
    serde_cbor::from_slice(bytes).map_err(|err| ProtoError::Decode(err.to_string()))
}
