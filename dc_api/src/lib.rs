//! W3C Digital Credentials API dispatcher (§4.13): bridges the browser-mediated DC API's JSON
//! envelope to the core ISO mdoc request pipeline, running it once in-process per call with no
//! transport of its own.

pub mod dispatcher;
pub mod envelope;
pub mod error;
pub mod jws;
pub mod transcript;

pub use dispatcher::DcApiDispatcher;
pub use dispatcher::DEFAULT_CIPHER_SUITE;
pub use envelope::Protocol;
pub use error::DcApiError;
pub use error::Result;
