//! The document/credential store (§4.6, §4.7): an in-memory reference implementation of the
//! store contract, the document/credential lifecycle types, and the event stream they publish
//! to.

pub mod credential;
pub mod document;
pub mod error;
pub mod events;
pub mod migration;
pub mod store;

pub use credential::Credential;
pub use credential::CredentialState;
pub use document::Document;
pub use document::DocumentData;
pub use error::DocumentStoreError;
pub use error::Result;
pub use events::DocumentEvent;
pub use store::DocumentStore;
