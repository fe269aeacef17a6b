use error_category::ErrorCategory;

/// The error taxonomy shared by every subsystem in the core (§7). Individual crates define
/// their own, more specific error enums (e.g. `mdoc_core::VerificationError`), but every one of
/// them is convertible into one of these variants so that a caller at the edge of the core (the
/// presentment loop, the DC API dispatcher) can report a single, stable set of failure kinds
/// regardless of which subsystem raised them.
#[derive(Debug, thiserror::Error, ErrorCategory)]
pub enum CoreError {
    #[error("malformed encoding: {0}")]
    #[category(pd)]
    InvalidEncoding(String),

    #[error("engagement violates version/origin-info constraints: {0}")]
    #[category(expected)]
    InvalidEngagement(String),

    #[error("signature verification failed: {0}")]
    #[category(unexpected)]
    SignatureVerification(String),

    #[error("decryption failed: {0}")]
    #[category(unexpected)]
    Decrypt(String),

    #[error("unsupported algorithm or curve: {0}")]
    #[category(unexpected)]
    UnsupportedAlgorithm(String),

    #[error("reader authentication has not been verified yet")]
    #[category(critical)]
    ReaderAuthNotVerified,

    #[error("secure-area key is locked and needs to be unlocked")]
    #[category(expected)]
    KeyLocked,

    #[error("secure-area key has been invalidated")]
    #[category(expected)]
    KeyInvalidated,

    #[error("user canceled the presentment")]
    #[category(expected)]
    PresentmentCanceled,

    #[error("timed out waiting for a message from the reader")]
    #[category(expected)]
    PresentmentTimeout,

    #[error("the transport was closed")]
    #[category(expected)]
    TransportClosed,

    #[error("storage failure: {0}")]
    #[category(unexpected)]
    Storage(String),
}

pub type Result<T, E = CoreError> = std::result::Result<T, E>;
