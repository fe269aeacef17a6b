use error_category::ErrorCategory;

#[derive(Debug, thiserror::Error, ErrorCategory)]
pub enum CborError {
    #[error("failed to encode CBOR: {0}")]
    #[category(pd)]
    Encode(String),

    #[error("failed to decode CBOR: {0}")]
    #[category(pd)]
    Decode(String),

    #[error("CBOR value had an unexpected shape: {0}")]
    #[category(pd)]
    UnexpectedShape(String),

    #[error("COSE_Sign1 structure is malformed: {0}")]
    #[category(pd)]
    Cose(String),
}

pub type Result<T, E = CborError> = std::result::Result<T, E>;
