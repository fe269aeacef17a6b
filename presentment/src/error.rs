use error_category::ErrorCategory;

#[derive(Debug, thiserror::Error, ErrorCategory)]
pub enum PresentmentError {
    #[error("transport reached a terminal state ({0:?}) before becoming connected")]
    #[category(expected)]
    TransportFailed(crate::transport::TransportState),

    #[error("timed out waiting for the reader's next message")]
    #[category(expected)]
    Timeout,

    #[error("user canceled the presentment")]
    #[category(expected)]
    Canceled,

    #[error("no document matched requested doc type `{0}`")]
    #[category(expected)]
    NoMatchingDocument(String),

    #[error("no usable credential for doc type `{0}`")]
    #[category(expected)]
    NoUsableCredential(String),

    #[error("a Requester must carry at least one of origin, appId, or certChain")]
    #[category(expected)]
    InvalidRequester,

    #[error(transparent)]
    #[category(defer)]
    Mdoc(#[from] mdoc_core::MdocError),

    #[error(transparent)]
    #[category(defer)]
    Cbor(#[from] cbor::CborError),

    #[error(transparent)]
    #[category(defer)]
    DocumentStore(#[from] document_store::DocumentStoreError),

    #[error("transport send/receive failed: {0}")]
    #[category(unexpected)]
    Transport(String),
}

pub type Result<T, E = PresentmentError> = std::result::Result<T, E>;
