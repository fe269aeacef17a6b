//! Cryptographic primitives and EC key abstractions: digests, MACs, AEAD, signing, key
//! agreement, HKDF, and HPKE, plus the double-coordinate/OKP key types and their COSE_Key/JWK
//! codecs that the rest of the workspace builds on.

pub mod aead;
pub mod curve;
pub mod digest;
pub mod error;
pub mod hkdf;
pub mod hpke;
pub mod keys;
pub mod mac;
pub mod sign;

pub use error::CryptoError;
pub use error::Result;
