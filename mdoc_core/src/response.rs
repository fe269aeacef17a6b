//! `DeviceResponse` (§4.10): the holder's answer to a `DeviceRequest`, carrying issuer-signed
//! attributes plus device authentication in either signature or MAC mode.

use cbor::CborSeq;
use cbor::TaggedBytes;
use coset::CoseMac0;
use coset::CoseSign1;
use crypto::keys::EcPublicKey;
use crypto::mac::MacAlgorithm;
use indexmap::IndexMap;
use serde::Deserialize;
use serde::Serialize;

use crate::error::MdocError;
use crate::error::Result;
use crate::keys::SigningKey;
use crate::mso::MobileSecurityObject;
use crate::request::DataElementIdentifier;
use crate::request::DocType;
use crate::request::NameSpace;
use crate::session::SessionTranscript;

/// `namespace -> [IssuerSignedItemBytes]`, kept in insertion order so digest-ID assignment in
/// `mso.rs` stays stable across a round trip.
pub type IssuerNameSpaces = IndexMap<NameSpace, Vec<TaggedBytes<ciborium::value::Value>>>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssuerSigned {
    pub name_spaces: IssuerNameSpaces,
    pub issuer_auth: CoseSign1,
}

impl IssuerSigned {
    /// Restricts the issuer-signed namespaces down to the elements the reader actually asked for
    /// (§4.10: a `docRequest`'s `itemsRequest.nameSpaces` names at most what may be disclosed).
    /// Namespaces or elements the issuer never signed are simply absent from the result.
    pub fn filter_to_requested(&self, requested: &IndexMap<NameSpace, IndexMap<DataElementIdentifier, bool>>) -> Result<IssuerNameSpaces> {
        let mut filtered = IssuerNameSpaces::new();
        for (name_space, items) in &self.name_spaces {
            let Some(requested_elements) = requested.get(name_space) else {
                continue;
            };
            let mut kept = Vec::new();
            for item in items {
                let (_, element_identifier) = issuer_signed_item_id_and_identifier(item)?;
                if requested_elements.contains_key(&element_identifier) {
                    kept.push(item.clone());
                }
            }
            if !kept.is_empty() {
                filtered.insert(name_space.clone(), kept);
            }
        }
        Ok(filtered)
    }
}

/// `DeviceAuthentication = ["DeviceAuthentication", sessionTranscript, docType, deviceNamespacesBytes]`
/// (§4.10): the structure both the ECDSA and MAC device-authentication modes cover.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct DeviceAuthenticationKeyed<'a> {
    device_authentication: cbor::wrappers::RequiredValue<cbor::wrappers::DeviceAuthenticationString>,
    session_transcript: &'a SessionTranscript,
    doc_type: &'a DocType,
    device_name_spaces_bytes: &'a TaggedBytes<DeviceNameSpaces>,
}

pub type DeviceNameSpaces = IndexMap<NameSpace, IndexMap<DataElementIdentifier, ciborium::value::Value>>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum DeviceAuth {
    #[serde(rename = "deviceSignature")]
    Signature(CoseSign1),
    #[serde(rename = "deviceMac")]
    Mac(CoseMac0),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceSigned {
    pub name_spaces: TaggedBytes<DeviceNameSpaces>,
    pub device_auth: DeviceAuth,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub doc_type: DocType,
    pub issuer_signed: IssuerSigned,
    pub device_signed: DeviceSigned,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde_repr::Serialize_repr, serde_repr::Deserialize_repr)]
#[repr(u16)]
pub enum DocumentError {
    DataNotReturned = 0,
}

pub const STATUS_OK: u64 = 0;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceResponse {
    pub version: String,
    pub documents: Option<Vec<Document>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document_errors: Option<IndexMap<DocType, DocumentError>>,
    pub status: u64,
}

/// Accumulates documents (and per-doc-type errors, for requested types that couldn't be
/// satisfied) into a single `DeviceResponse` (§4.10: `buildDeviceResponse`).
#[derive(Default)]
pub struct DeviceResponseBuilder {
    documents: Vec<Document>,
    document_errors: IndexMap<DocType, DocumentError>,
}

impl DeviceResponseBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_document(mut self, document: Document) -> Self {
        self.documents.push(document);
        self
    }

    pub fn add_document_error(mut self, doc_type: DocType, error: DocumentError) -> Self {
        self.document_errors.insert(doc_type, error);
        self
    }

    pub fn build(self, status: u64) -> DeviceResponse {
        DeviceResponse {
            version: "1.0".to_owned(),
            documents: (!self.documents.is_empty()).then_some(self.documents),
            document_errors: (!self.document_errors.is_empty()).then_some(self.document_errors),
            status,
        }
    }
}

fn device_authentication_bytes(session_transcript: &SessionTranscript, doc_type: &DocType, device_name_spaces: &TaggedBytes<DeviceNameSpaces>) -> Result<Vec<u8>> {
    let keyed = DeviceAuthenticationKeyed {
        device_authentication: Default::default(),
        session_transcript,
        doc_type,
        device_name_spaces_bytes: device_name_spaces,
    };
    Ok(cbor::cbor_serialize(&CborSeq(keyed))?)
}

/// One already-signed document plus the session key material it needs to produce `deviceAuth`,
/// assembled by the caller from the selected credential and the filtered issuer namespaces.
pub struct DocumentBuilder<'a> {
    pub doc_type: DocType,
    pub issuer_signed: IssuerSigned,
    pub device_name_spaces: DeviceNameSpaces,
    pub device_key: &'a SigningKey,
    /// `Some` selects MAC mode (key-agreement device authentication); `None` selects ECDSA
    /// signature mode. §4.10: "Choice is driven by the credential's key algorithm and the value
    /// of `preferSignatureToKeyAgreement`" — that choice is made by the caller before reaching
    /// this builder.
    pub mac_with_reader_key: Option<&'a EcPublicKey>,
}

impl<'a> DocumentBuilder<'a> {
    pub fn build(self, session_transcript: &SessionTranscript) -> Result<Document> {
        let device_name_spaces = TaggedBytes(self.device_name_spaces);
        let structure_bytes = device_authentication_bytes(session_transcript, &self.doc_type, &device_name_spaces)?;

        let device_auth = match self.mac_with_reader_key {
            None => {
                let alg = cbor::cose::cose_algorithm(self.device_key.algorithm);
                let signature = self.device_key.sign(&structure_bytes)?;
                let cose = cbor::cose::sign_cose1_detached(alg, coset::Header::default(), &structure_bytes, b"", |_| signature);
                DeviceAuth::Signature(cose)
            }
            Some(reader_public_key) => {
                let shared_secret = self.device_key.key_agreement(reader_public_key)?;
                let mac_key = crypto::hkdf::hkdf(crypto::digest::DigestAlgorithm::Sha256, &structure_bytes, &shared_secret, b"EMacKey", 32)?;
                let tag = crypto::mac::mac(MacAlgorithm::HmacSha256, &mac_key, &structure_bytes)?;
                let cose = cbor::cose::mac0_detached(coset::iana::Algorithm::HMAC_256_256, coset::Header::default(), &structure_bytes, b"", |_| tag);
                DeviceAuth::Mac(cose)
            }
        };

        Ok(Document {
            doc_type: self.doc_type,
            issuer_signed: self.issuer_signed,
            device_signed: DeviceSigned { name_spaces: device_name_spaces, device_auth },
        })
    }
}

impl Document {
    /// Verifies this document's device authentication, given the reader's own ephemeral private
    /// key for the MAC-mode case (the device authenticated to the reader's public key; only the
    /// reader can recompute the same shared secret to check the tag).
    pub fn verify_device_auth(&self, session_transcript: &SessionTranscript, device_public_key: &EcPublicKey, reader_ephemeral_for_mac: Option<&crypto::keys::EcPrivateKey>) -> Result<()> {
        let structure_bytes = device_authentication_bytes(session_transcript, &self.doc_type, &self.device_signed.name_spaces)?;
        match (&self.device_signed.device_auth, reader_ephemeral_for_mac) {
            (DeviceAuth::Signature(cose_sign1), _) => {
                let alg = cose_sign1
                    .protected
                    .header
                    .alg
                    .clone()
                    .ok_or(MdocError::DeviceAuthVerification)?;
                let sig_alg = signature_algorithm_from_cose(&alg).ok_or(MdocError::DeviceAuthVerification)?;
                let device_public_key = device_public_key.clone();
                cbor::cose::verify_cose1_detached(cose_sign1, &structure_bytes, b"", |sig, data| {
                    crypto::sign::check_signature(&device_public_key, data, sig_alg, sig)
                })
                .map_err(|_| MdocError::DeviceAuthVerification)
            }
            (DeviceAuth::Mac(cose_mac0), Some(reader_private_key)) => {
                let shared_secret = crypto::sign::key_agreement(reader_private_key, device_public_key)?;
                let mac_key = crypto::hkdf::hkdf(crypto::digest::DigestAlgorithm::Sha256, &structure_bytes, &shared_secret, b"EMacKey", 32)?;
                cbor::cose::verify_mac0_detached(cose_mac0, &structure_bytes, b"", |tag, data| crypto::mac::check_mac(MacAlgorithm::HmacSha256, &mac_key, data, tag))
                    .map_err(|_| MdocError::DeviceAuthVerification)
            }
            (DeviceAuth::Mac(_), None) => Err(MdocError::DeviceAuthVerification),
        }
    }

    /// Verifies every requested claim's issuer digest against `mso` (§8: "MSO digest
    /// consistency"). Returns the first mismatch, if any.
    pub fn verify_issuer_digests(&self, mso: &MobileSecurityObject) -> Result<()> {
        for (name_space, items) in &self.issuer_signed.name_spaces {
            for item in items {
                let item_bytes = cbor::cbor_serialize(item)?;
                let (digest_id, element_identifier) = issuer_signed_item_id_and_identifier(item)?;
                mso.verify_digest(name_space, digest_id, &item_bytes, &element_identifier)?;
            }
        }
        Ok(())
    }
}

fn signature_algorithm_from_cose(alg: &coset::RegisteredLabelWithPrivate<coset::iana::Algorithm>) -> Option<crypto::sign::SignatureAlgorithm> {
    use coset::iana::Algorithm;
    use coset::RegisteredLabelWithPrivate::Assigned;
    match alg {
        Assigned(Algorithm::ES256) => Some(crypto::sign::SignatureAlgorithm::Es256),
        Assigned(Algorithm::ES384) => Some(crypto::sign::SignatureAlgorithm::Es384),
        Assigned(Algorithm::ES512) => Some(crypto::sign::SignatureAlgorithm::Es512),
        Assigned(Algorithm::EdDSA) => Some(crypto::sign::SignatureAlgorithm::Ed25519),
        _ => None,
    }
}

fn issuer_signed_item_id_and_identifier(item: &TaggedBytes<ciborium::value::Value>) -> Result<(u64, String)> {
    let ciborium::value::Value::Map(entries) = &item.0 else {
        return Err(cbor::CborError::UnexpectedShape("IssuerSignedItem must be a CBOR map".to_owned()).into());
    };
    let mut digest_id = None;
    let mut element_identifier = None;
    for (key, value) in entries {
        match key.as_text() {
            Some("digestID") => digest_id = value.as_integer().and_then(|i| i64::try_from(i).ok()).map(|i| i as u64),
            Some("elementIdentifier") => element_identifier = value.as_text().map(str::to_owned),
            _ => {}
        }
    }
    let digest_id = digest_id.ok_or_else(|| cbor::CborError::UnexpectedShape("IssuerSignedItem missing digestID".to_owned()))?;
    let element_identifier = element_identifier.ok_or_else(|| cbor::CborError::UnexpectedShape("IssuerSignedItem missing elementIdentifier".to_owned()))?;
    Ok((digest_id, element_identifier))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::KeyIdentity;
    use crypto::curve::DoubleCoordinateCurve;
    use crypto::keys::EcPrivateKey;
    use crypto::sign::SignatureAlgorithm;

    fn sample_session_transcript() -> SessionTranscript {
        CborSeq(crate::session::SessionTranscriptKeyed {
            device_engagement_bytes: None,
            e_reader_key_bytes: None,
            handover: ciborium::value::Value::Null,
        })
    }

    #[test]
    fn signature_mode_device_auth_round_trips() {
        let device_key = EcPrivateKey::generate(DoubleCoordinateCurve::P256).unwrap();
        let device_public = device_key.public_key();
        let signing_key = SigningKey::explicit(device_key, SignatureAlgorithm::Es256, KeyIdentity::Anonymous);

        let issuer_signed = IssuerSigned { name_spaces: IndexMap::new(), issuer_auth: dummy_cose_sign1() };
        let transcript = sample_session_transcript();
        let builder = DocumentBuilder {
            doc_type: "org.iso.18013.5.1.mDL".to_owned(),
            issuer_signed,
            device_name_spaces: IndexMap::new(),
            device_key: &signing_key,
            mac_with_reader_key: None,
        };
        let document = builder.build(&transcript).unwrap();
        document.verify_device_auth(&transcript, &device_public, None).unwrap();
    }

    #[test]
    fn mac_mode_device_auth_round_trips() {
        let device_key = EcPrivateKey::generate(DoubleCoordinateCurve::P256).unwrap();
        let device_public = device_key.public_key();
        let signing_key = SigningKey::explicit(device_key, SignatureAlgorithm::Es256, KeyIdentity::Anonymous);

        let reader_key = EcPrivateKey::generate(DoubleCoordinateCurve::P256).unwrap();
        let reader_public = reader_key.public_key();

        let issuer_signed = IssuerSigned { name_spaces: IndexMap::new(), issuer_auth: dummy_cose_sign1() };
        let transcript = sample_session_transcript();
        let builder = DocumentBuilder {
            doc_type: "org.iso.18013.5.1.mDL".to_owned(),
            issuer_signed,
            device_name_spaces: IndexMap::new(),
            device_key: &signing_key,
            mac_with_reader_key: Some(&reader_public),
        };
        let document = builder.build(&transcript).unwrap();
        document.verify_device_auth(&transcript, &device_public, Some(&reader_key)).unwrap();
    }

    fn dummy_cose_sign1() -> CoseSign1 {
        coset::CoseSign1Builder::new().build()
    }
}
