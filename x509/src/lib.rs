//! X.509 certificate and CRL parsing, chain validation, and (behind the `generate` feature)
//! certificate building (§4.4).

pub mod algorithm;
pub mod certificate;
pub mod chain;
pub mod crl;
pub mod error;

#[cfg(feature = "generate")]
pub mod builder;

pub use certificate::Certificate;
pub use chain::CertificateChain;
pub use crl::Crl;
pub use error::Result;
pub use error::X509Error;
