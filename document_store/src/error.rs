use error_category::ErrorCategory;

#[derive(Debug, thiserror::Error, ErrorCategory)]
pub enum DocumentStoreError {
    #[error("no document with identifier `{0}`")]
    #[category(expected)]
    NotFound(String),

    #[error("document `{0}` has no usable certified credential")]
    #[category(expected)]
    NoUsableCredential(String),

    #[error("no credential with identifier `{0}` on document `{1}`")]
    #[category(expected)]
    CredentialNotFound(String, String),

    #[error("row for document `{0}` could not be decoded under any known schema version")]
    #[category(unexpected)]
    UndecodableRow(String),

    #[error(transparent)]
    #[category(defer)]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    #[category(defer)]
    Mdoc(#[from] mdoc_core::MdocError),
}

pub type Result<T, E = DocumentStoreError> = std::result::Result<T, E>;
