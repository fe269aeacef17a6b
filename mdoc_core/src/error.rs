use error_category::ErrorCategory;

#[derive(Debug, thiserror::Error, ErrorCategory)]
pub enum MdocError {
    #[error(transparent)]
    #[category(defer)]
    Crypto(#[from] crypto::CryptoError),

    #[error(transparent)]
    #[category(defer)]
    Cbor(#[from] cbor::CborError),

    #[error(transparent)]
    #[category(defer)]
    X509(#[from] x509::X509Error),

    #[error("engagement violates version/origin-info constraints: {0}")]
    #[category(expected)]
    InvalidEngagement(String),

    #[error("reader authentication has not been verified yet")]
    #[category(critical)]
    ReaderAuthNotVerified,

    #[error("reader authentication signature verification failed for doc request {index}")]
    #[category(unexpected)]
    ReaderAuthVerification { index: usize },

    #[error("device authentication signature/MAC verification failed")]
    #[category(unexpected)]
    DeviceAuthVerification,

    #[error("MSO digest mismatch for namespace `{namespace}` element `{element}`")]
    #[category(unexpected)]
    DigestMismatch { namespace: String, element: String },

    #[error("session data carried neither a payload nor a termination status")]
    #[category(unexpected)]
    MalformedSessionData,

    #[error("session was terminated by the other party")]
    #[category(expected)]
    SessionTerminated,
}

pub type Result<T, E = MdocError> = std::result::Result<T, E>;
