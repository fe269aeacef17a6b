use error_category::ErrorCategory;

/// Error taxonomy for the cryptographic primitive layer (§7: `SignatureVerificationError`,
/// `DecryptError`, `UnsupportedAlgorithmError`, `KeyLockedError`, `KeyInvalidatedError`).
#[derive(Debug, thiserror::Error, ErrorCategory)]
pub enum CryptoError {
    #[error("malformed encoding: {0}")]
    #[category(pd)]
    InvalidEncoding(String),

    #[error("curve or cipher suite not supported: {0}")]
    #[category(unexpected)]
    UnsupportedAlgorithm(String),

    #[error("aead tag mismatch or malformed ciphertext")]
    #[category(unexpected)]
    Decrypt,

    #[error("nonce has incorrect length: expected {expected}, got {actual}")]
    #[category(unexpected)]
    InvalidNonceLength { expected: usize, actual: usize },

    #[error("signature verification failed")]
    #[category(unexpected)]
    SignatureVerification,

    #[error("the two keys in a key agreement are on different curves, or the curve does not support key agreement")]
    #[category(unexpected)]
    IncompatibleKeyAgreement,

    #[error("secure-area key needs to be unlocked before it can be used")]
    #[category(expected)]
    KeyLocked,

    #[error("secure-area key has been permanently invalidated")]
    #[category(expected)]
    KeyInvalidated,

    #[error("hkdf output length {0} exceeds 255 * hash length")]
    #[category(unexpected)]
    HkdfLengthTooLarge(usize),
}

pub type Result<T, E = CryptoError> = std::result::Result<T, E>;
