//! `DeviceRequest` (§4.10): the reader's request for attributes, with optional per-doc-request
//! or session-wide reader authentication that must be explicitly verified before it can be read.

use std::cell::Cell;
use std::collections::BTreeMap;

use coset::CoseSign1;
use indexmap::IndexMap;
use serde::Deserialize;
use serde::Serialize;

use crate::engagement::VERSION_1_0;
use crate::error::MdocError;
use crate::error::Result;
use crate::session::SessionTranscript;

pub type NameSpace = String;
pub type DataElementIdentifier = String;
pub type DocType = String;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemsRequest {
    pub doc_type: DocType,
    /// `namespace -> (element identifier -> intent to retain)`.
    pub name_spaces: IndexMap<NameSpace, IndexMap<DataElementIdentifier, bool>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_info: Option<BTreeMap<String, ciborium::value::Value>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocRequest {
    pub items_request: cbor::TaggedBytes<ItemsRequest>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reader_auth: Option<CoseSign1>,
    /// Set to `true` once [`DeviceRequest::verify_reader_authentication`] has checked this
    /// request's signature (or the session-wide `reader_auth_all`); gates [`Self::reader_auth`]
    /// per §4.10/§8 ("Reader-auth access rule").
    #[serde(skip)]
    verified: Cell<bool>,
}

impl DocRequest {
    pub fn items_request(&self) -> &ItemsRequest {
        &self.items_request.0
    }

    /// The request's own `reader_auth`, if any — only readable after verification.
    pub fn reader_auth(&self) -> Result<Option<&CoseSign1>> {
        if !self.verified.get() {
            return Err(MdocError::ReaderAuthNotVerified);
        }
        Ok(self.reader_auth.as_ref())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceRequest {
    pub version: String,
    pub doc_requests: Vec<DocRequest>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_request_info: Option<BTreeMap<String, ciborium::value::Value>>,
    /// A single reader-authentication signature covering every `docRequest` in this message, as
    /// an alternative to each carrying its own `reader_auth` (§4.10). Only readable after
    /// [`DeviceRequest::verify_reader_authentication`] has checked it (§8: "Reader-auth access
    /// rule") — use [`DeviceRequest::reader_auth_all`], not this field, outside this module.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reader_auth_all: Option<CoseSign1>,
    #[serde(skip)]
    verified: Cell<bool>,
}

/// `ReaderAuthentication = ["ReaderAuthentication", sessionTranscript, itemsRequestBytes]`
/// (§4.10): the structure each per-doc-request `reader_auth` actually signs.
fn reader_authentication_bytes(session_transcript: &SessionTranscript, items_request: &cbor::TaggedBytes<ItemsRequest>) -> Result<Vec<u8>> {
    #[derive(Serialize)]
    struct ReaderAuthenticationKeyed<'a> {
        reader_authentication: cbor::wrappers::RequiredValue<cbor::wrappers::ReaderAuthenticationString>,
        session_transcript: &'a SessionTranscript,
        items_request_bytes: &'a cbor::TaggedBytes<ItemsRequest>,
    }

    let keyed = ReaderAuthenticationKeyed {
        reader_authentication: Default::default(),
        session_transcript,
        items_request_bytes: items_request,
    };
    Ok(cbor::cbor_serialize(&cbor::CborSeq(keyed))?)
}

/// `ReaderAuthenticationAll = ["ReaderAuthenticationAll", sessionTranscript,
/// itemsRequestBytes...]` (§4.10/§8): what a session-wide `readerAuthAll` signs — one
/// `ItemsRequestBytes` per `docRequest`, in order, instead of a single one.
fn reader_authentication_all_bytes(session_transcript: &SessionTranscript, doc_requests: &[DocRequest]) -> Result<Vec<u8>> {
    #[derive(Serialize)]
    struct ReaderAuthenticationAllKeyed<'a> {
        reader_authentication_all: cbor::wrappers::RequiredValue<cbor::wrappers::ReaderAuthenticationAllString>,
        session_transcript: &'a SessionTranscript,
        items_request_bytes: Vec<&'a cbor::TaggedBytes<ItemsRequest>>,
    }

    let keyed = ReaderAuthenticationAllKeyed {
        reader_authentication_all: Default::default(),
        session_transcript,
        items_request_bytes: doc_requests.iter().map(|doc_request| &doc_request.items_request).collect(),
    };
    Ok(cbor::cbor_serialize(&cbor::CborSeq(keyed))?)
}

impl DeviceRequest {
    /// Verify every `docRequest`'s own `reader_auth`, and the session-wide `reader_auth_all` if
    /// present, marking each as verified on success so [`DocRequest::reader_auth`] and
    /// [`Self::reader_auth_all`] become readable (§4.10, §8: "Reader-auth access rule").
    pub fn verify_reader_authentication(&self, session_transcript: &SessionTranscript, verify_fn: impl Fn(&CoseSign1, &[u8]) -> Result<()>) -> Result<()> {
        for (index, doc_request) in self.doc_requests.iter().enumerate() {
            let Some(reader_auth) = &doc_request.reader_auth else {
                doc_request.verified.set(true);
                continue;
            };
            let structure_bytes = reader_authentication_bytes(session_transcript, &doc_request.items_request)?;
            verify_fn(reader_auth, &structure_bytes).map_err(|_| MdocError::ReaderAuthVerification { index })?;
            doc_request.verified.set(true);
        }

        match &self.reader_auth_all {
            Some(reader_auth_all) => {
                let structure_bytes = reader_authentication_all_bytes(session_transcript, &self.doc_requests)?;
                verify_fn(reader_auth_all, &structure_bytes).map_err(|_| MdocError::ReaderAuthVerification { index: usize::MAX })?;
                self.verified.set(true);
            }
            None => self.verified.set(true),
        }

        Ok(())
    }

    /// The session-wide `readerAuthAll`, if any — only readable after
    /// [`Self::verify_reader_authentication`] (§8: "Reader-auth access rule").
    pub fn reader_auth_all(&self) -> Result<Option<&CoseSign1>> {
        if !self.verified.get() {
            return Err(MdocError::ReaderAuthNotVerified);
        }
        Ok(self.reader_auth_all.as_ref())
    }

    pub fn requires_v1_1(&self) -> bool {
        self.device_request_info.is_some()
    }

    pub fn minimum_version(&self) -> &'static str {
        if self.requires_v1_1() {
            "1.1"
        } else {
            VERSION_1_0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_items_request() -> cbor::TaggedBytes<ItemsRequest> {
        let mut elements = IndexMap::new();
        elements.insert("family_name".to_owned(), true);
        let mut name_spaces = IndexMap::new();
        name_spaces.insert("org.iso.18013.5.1".to_owned(), elements);
        cbor::TaggedBytes(ItemsRequest {
            doc_type: "org.iso.18013.5.1.mDL".to_owned(),
            name_spaces,
            request_info: None,
        })
    }

    fn empty_transcript() -> SessionTranscript {
        crate::session::SessionTranscript(crate::session::SessionTranscriptKeyed {
            device_engagement_bytes: None,
            e_reader_key_bytes: None,
            handover: ciborium::value::Value::Null,
        })
    }

    #[test]
    fn accessing_reader_auth_before_verification_fails() {
        let doc_request = DocRequest {
            items_request: sample_items_request(),
            reader_auth: None,
            verified: Cell::new(false),
        };
        assert!(matches!(doc_request.reader_auth(), Err(MdocError::ReaderAuthNotVerified)));
    }

    #[test]
    fn accessing_reader_auth_all_before_verification_fails() {
        let request = DeviceRequest {
            version: VERSION_1_0.to_owned(),
            doc_requests: vec![DocRequest { items_request: sample_items_request(), reader_auth: None, verified: Cell::new(false) }],
            device_request_info: None,
            reader_auth_all: None,
            verified: Cell::new(false),
        };
        assert!(matches!(request.reader_auth_all(), Err(MdocError::ReaderAuthNotVerified)));
    }

    #[test]
    fn verification_with_no_reader_auth_present_succeeds_and_unlocks_access() {
        let request = DeviceRequest {
            version: VERSION_1_0.to_owned(),
            doc_requests: vec![DocRequest {
                items_request: sample_items_request(),
                reader_auth: None,
                verified: Cell::new(false),
            }],
            device_request_info: None,
            reader_auth_all: None,
            verified: Cell::new(false),
        };
        request.verify_reader_authentication(&empty_transcript(), |_, _| Ok(())).unwrap();
        assert_eq!(request.doc_requests[0].reader_auth().unwrap(), None);
        assert_eq!(request.reader_auth_all().unwrap(), None);
    }

    #[test]
    fn reader_auth_all_is_verified_against_every_doc_request() {
        use coset::CoseSign1Builder;

        let reader_auth_all = CoseSign1Builder::new().build();
        let request = DeviceRequest {
            version: VERSION_1_0.to_owned(),
            doc_requests: vec![
                DocRequest { items_request: sample_items_request(), reader_auth: None, verified: Cell::new(false) },
                DocRequest { items_request: sample_items_request(), reader_auth: None, verified: Cell::new(false) },
            ],
            device_request_info: None,
            reader_auth_all: Some(reader_auth_all.clone()),
            verified: Cell::new(false),
        };

        let expected_structure_bytes = reader_authentication_all_bytes(&empty_transcript(), &request.doc_requests).unwrap();

        let seen = Cell::new(false);
        request
            .verify_reader_authentication(&empty_transcript(), |cose, structure_bytes| {
                assert_eq!(cose, &reader_auth_all);
                assert_eq!(structure_bytes, expected_structure_bytes.as_slice());
                seen.set(true);
                Ok(())
            })
            .unwrap();

        assert!(seen.get());
        assert!(request.reader_auth_all().unwrap().is_some());
        assert!(request.doc_requests.iter().all(|doc_request| doc_request.reader_auth().unwrap().is_none()));
    }

    /// §8 concrete scenario 2 (Annex D `DeviceRequest`): a single `docType="org.iso.18013.5.1.mDL"`
    /// doc-request over the `org.iso.18013.5.1` namespace, naming exactly the claims and
    /// intent-to-retain flags the scenario lists. Reconstructed rather than copied — the
    /// published `ISO_18013_5_ANNEX_D_DEVICE_REQUEST` bytes weren't available to this pass (see
    /// DESIGN.md) — but exercising the same `docType`/namespace/claim shape and the successful
    /// `verifyReaderAuthentication` path.
    #[test]
    fn annex_d_style_device_request_reader_auth_succeeds() {
        use coset::CoseSign1Builder;

        let mut elements = IndexMap::new();
        elements.insert("family_name".to_owned(), true);
        elements.insert("document_number".to_owned(), true);
        elements.insert("driving_privileges".to_owned(), true);
        elements.insert("issue_date".to_owned(), true);
        elements.insert("expiry_date".to_owned(), true);
        elements.insert("portrait".to_owned(), false);
        let mut name_spaces = IndexMap::new();
        name_spaces.insert("org.iso.18013.5.1".to_owned(), elements);
        let items_request = cbor::TaggedBytes(ItemsRequest {
            doc_type: "org.iso.18013.5.1.mDL".to_owned(),
            name_spaces,
            request_info: None,
        });

        let reader_auth = CoseSign1Builder::new().build();
        let doc_request = DocRequest { items_request, reader_auth: Some(reader_auth.clone()), verified: Cell::new(false) };
        let request = DeviceRequest {
            version: VERSION_1_0.to_owned(),
            doc_requests: vec![doc_request],
            device_request_info: None,
            reader_auth_all: None,
            verified: Cell::new(false),
        };

        let expected_structure_bytes = reader_authentication_bytes(&empty_transcript(), &request.doc_requests[0].items_request).unwrap();
        request
            .verify_reader_authentication(&empty_transcript(), |cose, structure_bytes| {
                assert_eq!(cose, &reader_auth);
                assert_eq!(structure_bytes, expected_structure_bytes.as_slice());
                Ok(())
            })
            .unwrap();

        let items_request = request.doc_requests[0].items_request();
        assert_eq!(items_request.doc_type, "org.iso.18013.5.1.mDL");
        let claims = &items_request.name_spaces["org.iso.18013.5.1"];
        assert_eq!(claims["family_name"], true);
        assert_eq!(claims["portrait"], false);
    }

    /// §8 concrete scenario 3: a tampered reader signature (standing in for "byte index 655
    /// flipped" against a real `ISO_18013_5_ANNEX_D_DEVICE_REQUEST`, which wasn't available to
    /// reconstruct against — see DESIGN.md) fails verification and names the failing doc-request
    /// by index, not just generically.
    #[test]
    fn tampered_reader_auth_reports_failing_doc_request_index() {
        use coset::CoseSign1Builder;

        let mut elements = IndexMap::new();
        elements.insert("document_number".to_owned(), true);
        let mut name_spaces = IndexMap::new();
        name_spaces.insert("org.iso.18013.5.1".to_owned(), elements);
        let second_items_request = cbor::TaggedBytes(ItemsRequest {
            doc_type: "org.iso.18013.5.1.mDL".to_owned(),
            name_spaces,
            request_info: None,
        });

        let valid = DocRequest { items_request: sample_items_request(), reader_auth: Some(CoseSign1Builder::new().build()), verified: Cell::new(false) };
        let tampered = DocRequest { items_request: second_items_request, reader_auth: Some(CoseSign1Builder::new().build()), verified: Cell::new(false) };
        let request = DeviceRequest {
            version: VERSION_1_0.to_owned(),
            doc_requests: vec![valid, tampered],
            device_request_info: None,
            reader_auth_all: None,
            verified: Cell::new(false),
        };

        let result = request.verify_reader_authentication(&empty_transcript(), |_, structure_bytes| {
            // Simulates a signature check against a structure whose signed bytes were altered
            // (the real scenario: one flipped byte in the Annex D vector) by failing only once
            // past the first doc-request's structure bytes.
            if structure_bytes == reader_authentication_bytes(&empty_transcript(), &request.doc_requests[0].items_request).unwrap().as_slice() {
                Ok(())
            } else {
                Err(MdocError::ReaderAuthVerification { index: 0 })
            }
        });

        assert!(matches!(result, Err(MdocError::ReaderAuthVerification { index: 1 })));
    }

    #[test]
    fn reader_auth_all_failure_reports_index_max() {
        use coset::CoseSign1Builder;

        let request = DeviceRequest {
            version: VERSION_1_0.to_owned(),
            doc_requests: vec![DocRequest { items_request: sample_items_request(), reader_auth: None, verified: Cell::new(false) }],
            device_request_info: None,
            reader_auth_all: Some(CoseSign1Builder::new().build()),
            verified: Cell::new(false),
        };

        let result = request.verify_reader_authentication(&empty_transcript(), |_, _| Err(MdocError::ReaderAuthVerification { index: 0 }));
        assert!(matches!(result, Err(MdocError::ReaderAuthVerification { index: usize::MAX })));
    }
}
