use error_category::ErrorCategory;

#[derive(Debug, thiserror::Error, ErrorCategory)]
pub enum DcApiError {
    #[error("unsupported DC API protocol `{0}`")]
    #[category(expected)]
    UnsupportedProtocol(String),

    #[error("malformed request envelope: {0}")]
    #[category(expected)]
    MalformedEnvelope(String),

    #[error("invalid base64url in field `{0}`")]
    #[category(expected)]
    InvalidBase64(&'static str),

    #[error("request JWS failed verification")]
    #[category(unexpected)]
    JwsVerification,

    #[error(transparent)]
    #[category(defer)]
    Mdoc(#[from] mdoc_core::MdocError),

    #[error(transparent)]
    #[category(defer)]
    Cbor(#[from] cbor::CborError),

    #[error(transparent)]
    #[category(defer)]
    Crypto(#[from] crypto::error::CryptoError),

    #[error(transparent)]
    #[category(defer)]
    X509(#[from] x509::X509Error),

    #[error(transparent)]
    #[category(defer)]
    Presentment(#[from] presentment::PresentmentError),
}

pub type Result<T, E = DcApiError> = std::result::Result<T, E>;
