//! Core ISO/IEC 18013-5 mdoc types and protocol logic: engagement, session encryption, device
//! requests/responses, the Mobile Security Object, and the key abstractions credentials sign
//! and MAC with.

pub mod engagement;
pub mod error;
pub mod keys;
pub mod mso;
pub mod request;
pub mod response;
pub mod session;

pub use error::MdocError;
pub use error::Result;
