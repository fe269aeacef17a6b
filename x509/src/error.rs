use error_category::ErrorCategory;

#[derive(Debug, thiserror::Error, ErrorCategory)]
pub enum X509Error {
    #[error("failed to parse certificate: {0}")]
    #[category(pd)]
    Parse(String),

    #[error("failed to parse CRL: {0}")]
    #[category(pd)]
    ParseCrl(String),

    #[error("certificate signature verification failed")]
    #[category(unexpected)]
    SignatureVerification,

    #[error("unsupported signature algorithm OID: {0}")]
    #[category(unexpected)]
    UnsupportedAlgorithm(String),

    #[error("certificate chain is empty")]
    #[category(unexpected)]
    EmptyChain,

    #[error("certificate extension `{0}` was malformed or absent")]
    #[category(unexpected)]
    Extension(String),

    #[error(transparent)]
    #[category(defer)]
    Crypto(#[from] crypto::CryptoError),

    #[cfg(feature = "generate")]
    #[error("failed to build certificate: {0}")]
    #[category(unexpected)]
    Build(String),
}

pub type Result<T, E = X509Error> = std::result::Result<T, E>;
