//! Proximity presentment (§4.11, §4.12): runs a single ISO/IEC 18013-5 `mdoc` session over an
//! abstract [`Transport`], delegating trust/consent/credential-selection decisions to a
//! [`PresentmentSource`] supplied by the embedding application.

pub mod error;
pub mod model;
pub mod presentment;
pub mod reader_auth;
pub mod source;
pub mod timeouts;
pub mod transport;

pub use error::PresentmentError;
pub use error::Result;
pub use model::PresentmentModel;
pub use model::PresentmentState;
pub use presentment::Iso18013Presentment;
pub use source::CredentialPresentmentData;
pub use source::CredentialPresentmentMatch;
pub use source::CredentialPresentmentOption;
pub use source::CredentialPresentmentSelection;
pub use source::DefaultPresentmentSource;
pub use source::PresentmentSource;
pub use source::Requester;
pub use source::TrustMetadata;
pub use timeouts::PresentmentTimeouts;
pub use transport::Transport;
pub use transport::TransportState;
