//! Canonical CBOR encode/decode helpers (§4.5, §6): every mdoc wire structure goes through
//! [`cbor_serialize`]/[`cbor_deserialize`] rather than calling `ciborium` directly, so the
//! canonical-map-ordering and error-wrapping behavior lives in one place.

use ciborium::value::Value;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::CborError;
use crate::error::Result;

/// Serialize `value` to canonical CBOR bytes (definite-length, shortest-form integers — the
/// defaults `ciborium` already produces; map-key ordering is the responsibility of the type
/// being serialized, since `ciborium` preserves struct field declaration order).
pub fn cbor_serialize<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    ciborium::into_writer(value, &mut buf).map_err(|e| CborError::Encode(e.to_string()))?;
    Ok(buf)
}

/// Deserialize CBOR bytes into `T`.
pub fn cbor_deserialize<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    ciborium::from_reader(bytes).map_err(|e| CborError::Decode(e.to_string()))
}

/// Parse into the untyped [`Value`] tree, for code that needs to inspect a structure before (or
/// instead of) committing to a concrete type — e.g. extracting a COSE header label.
pub fn cbor_value(bytes: &[u8]) -> Result<Value> {
    ciborium::from_reader(bytes).map_err(|e| CborError::Decode(e.to_string()))
}

pub fn cbor_value_bytes(value: &Value) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    ciborium::into_writer(value, &mut buf).map_err(|e| CborError::Encode(e.to_string()))?;
    Ok(buf)
}
