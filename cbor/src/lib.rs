//! Canonical CBOR encode/decode helpers, the `CborSeq`/`TaggedBytes` wire-shape wrappers, a
//! diagnostic-notation renderer, and COSE_Sign1 construction/verification (§4.5).

pub mod cose;
pub mod diag;
pub mod error;
pub mod ser;
pub mod wrappers;

pub use ciborium::value::Value;
pub use error::CborError;
pub use error::Result;
pub use ser::cbor_deserialize;
pub use ser::cbor_serialize;
pub use ser::cbor_value;
pub use wrappers::CborIntMap;
pub use wrappers::CborSeq;
pub use wrappers::IntKeyed;
pub use wrappers::TaggedBytes;
