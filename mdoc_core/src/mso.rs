//! Mobile Security Object (§4.10): the issuer-signed map that binds a device key and a set of
//! per-namespace attribute digests to a validity window.

use std::collections::BTreeMap;

use chrono::DateTime;
use chrono::Utc;
use crypto::digest::digest as compute_digest;
use crypto::digest::DigestAlgorithm;
use indexmap::IndexMap;
use serde::Deserialize;
use serde::Serialize;

use crate::error::MdocError;
use crate::error::Result;
use crate::request::DataElementIdentifier;
use crate::request::DocType;
use crate::request::NameSpace;

pub type DigestId = u64;

/// Truncates to whole seconds: the MSO's `tdate` fields carry no fractional component (§4.4/§9.1
/// convention, applied here too since `validityInfo` is built the same way certificate validity
/// is).
fn truncate_to_seconds(dt: DateTime<Utc>) -> DateTime<Utc> {
    DateTime::from_timestamp(dt.timestamp(), 0).unwrap_or(dt)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidityInfo {
    pub signed: DateTime<Utc>,
    pub valid_from: DateTime<Utc>,
    pub valid_until: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected_update: Option<DateTime<Utc>>,
}

impl ValidityInfo {
    pub fn new(signed: DateTime<Utc>, valid_from: DateTime<Utc>, valid_until: DateTime<Utc>) -> Self {
        Self {
            signed: truncate_to_seconds(signed),
            valid_from: truncate_to_seconds(valid_from),
            valid_until: truncate_to_seconds(valid_until),
            expected_update: None,
        }
    }

    pub fn with_expected_update(mut self, expected_update: DateTime<Utc>) -> Self {
        self.expected_update = Some(truncate_to_seconds(expected_update));
        self
    }

    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.valid_from && now <= self.valid_until
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceKeyInfo {
    pub device_key: ciborium::value::Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_authorizations: Option<KeyAuthorizations>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KeyAuthorizations {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name_spaces: Option<Vec<NameSpace>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_elements: Option<IndexMap<NameSpace, Vec<DataElementIdentifier>>>,
}

pub type ValueDigests = IndexMap<NameSpace, BTreeMap<DigestId, serde_bytes::ByteBuf>>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MobileSecurityObject {
    pub version: String,
    pub digest_algorithm: String,
    pub doc_type: DocType,
    pub value_digests: ValueDigests,
    pub device_key_info: DeviceKeyInfo,
    pub validity_info: ValidityInfo,
}

fn algorithm_name(alg: DigestAlgorithm) -> &'static str {
    match alg {
        DigestAlgorithm::Sha256 => "SHA-256",
        DigestAlgorithm::Sha384 => "SHA-384",
        DigestAlgorithm::Sha512 => "SHA-512",
    }
}

fn algorithm_from_name(name: &str) -> Result<DigestAlgorithm> {
    match name {
        "SHA-256" => Ok(DigestAlgorithm::Sha256),
        "SHA-384" => Ok(DigestAlgorithm::Sha384),
        "SHA-512" => Ok(DigestAlgorithm::Sha512),
        other => Err(MdocError::InvalidEngagement(format!("unsupported MSO digestAlgorithm `{other}`"))),
    }
}

pub struct MobileSecurityObjectBuilder {
    digest_algorithm: DigestAlgorithm,
    doc_type: DocType,
    value_digests: ValueDigests,
    device_key_info: DeviceKeyInfo,
    validity_info: ValidityInfo,
}

impl MobileSecurityObjectBuilder {
    pub fn new(digest_algorithm: DigestAlgorithm, doc_type: DocType, device_key_info: DeviceKeyInfo, validity_info: ValidityInfo) -> Self {
        Self {
            digest_algorithm,
            doc_type,
            value_digests: IndexMap::new(),
            device_key_info,
            validity_info,
        }
    }

    /// Digests every `IssuerSignedItemBytes` in `name_space`, assigning consecutive digest IDs
    /// in iteration order. Callers that need randomized digest ID assignment (to avoid leaking
    /// item ordering) should shuffle `items` before calling this.
    pub fn with_name_space(mut self, name_space: NameSpace, items: impl IntoIterator<Item = (DigestId, Vec<u8>)>) -> Self {
        let digests = items
            .into_iter()
            .map(|(id, item_bytes)| (id, serde_bytes::ByteBuf::from(compute_digest(self.digest_algorithm, &item_bytes))))
            .collect();
        self.value_digests.insert(name_space, digests);
        self
    }

    pub fn build(self) -> MobileSecurityObject {
        MobileSecurityObject {
            version: "1.0".to_owned(),
            digest_algorithm: algorithm_name(self.digest_algorithm).to_owned(),
            doc_type: self.doc_type,
            value_digests: self.value_digests,
            device_key_info: self.device_key_info,
            validity_info: self.validity_info,
        }
    }
}

impl MobileSecurityObject {
    pub fn digest_algorithm(&self) -> Result<DigestAlgorithm> {
        algorithm_from_name(&self.digest_algorithm)
    }

    /// Recomputes the digest of `item_bytes` (an `IssuerSignedItemBytes` encoding) and compares
    /// it against the indexed digest for `(name_space, digest_id)` (§8: "MSO digest consistency").
    pub fn verify_digest(&self, name_space: &str, digest_id: DigestId, item_bytes: &[u8], element: &str) -> Result<()> {
        let alg = self.digest_algorithm()?;
        let expected = self
            .value_digests
            .get(name_space)
            .and_then(|digests| digests.get(&digest_id))
            .ok_or_else(|| MdocError::DigestMismatch { namespace: name_space.to_owned(), element: element.to_owned() })?;
        let actual = compute_digest(alg, item_bytes);
        if actual != expected.as_slice() {
            return Err(MdocError::DigestMismatch { namespace: name_space.to_owned(), element: element.to_owned() });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crypto::curve::DoubleCoordinateCurve;
    use crypto::keys::EcPrivateKey;

    fn sample_device_key_info() -> DeviceKeyInfo {
        let key = EcPrivateKey::generate(DoubleCoordinateCurve::P256).unwrap().public_key();
        DeviceKeyInfo { device_key: key.to_cose_key(), key_authorizations: None }
    }

    fn sample_validity() -> ValidityInfo {
        let now = DateTime::from_timestamp(1_700_000_000, 500_000_000).unwrap();
        ValidityInfo::new(now, now, now + chrono::Duration::days(365))
    }

    #[test]
    fn validity_info_truncates_fractional_seconds() {
        let validity = sample_validity();
        assert_eq!(validity.signed.timestamp_subsec_nanos(), 0);
    }

    #[test]
    fn digest_round_trips_and_detects_tampering() {
        let item_bytes = b"issuer signed item bytes".to_vec();
        let mso = MobileSecurityObjectBuilder::new(DigestAlgorithm::Sha256, "org.iso.18013.5.1.mDL".to_owned(), sample_device_key_info(), sample_validity())
            .with_name_space("org.iso.18013.5.1".to_owned(), [(0, item_bytes.clone())])
            .build();

        mso.verify_digest("org.iso.18013.5.1", 0, &item_bytes, "family_name").unwrap();

        let tampered = b"different bytes".to_vec();
        assert!(matches!(
            mso.verify_digest("org.iso.18013.5.1", 0, &tampered, "family_name"),
            Err(MdocError::DigestMismatch { .. })
        ));
    }

    #[test]
    fn missing_namespace_fails_with_digest_mismatch() {
        let mso = MobileSecurityObjectBuilder::new(DigestAlgorithm::Sha256, "org.iso.18013.5.1.mDL".to_owned(), sample_device_key_info(), sample_validity()).build();
        assert!(matches!(
            mso.verify_digest("org.iso.18013.5.1", 0, b"x", "family_name"),
            Err(MdocError::DigestMismatch { .. })
        ));
    }

    /// §8 scenario 4: an MSO built against concrete, reproducible inputs (fixed validity window,
    /// two namespaces, one credential type) round-trips through CBOR and its diagnostic rendering
    /// names every field and namespace a reviewer would expect to see. This doesn't compare
    /// against a literal snapshot string — chrono's exact RFC 3339 rendering of `DateTime<Utc>`
    /// isn't nailed down here — just that the structure is the one that was built.
    #[test]
    fn diagnostic_rendering_exposes_photoid_mso_structure() {
        let valid_from = DateTime::from_timestamp(1_764_547_200, 0).unwrap(); // 2025-12-01T00:00:00Z
        let valid_until = valid_from + chrono::Duration::days(30);
        let expected_update = valid_from + chrono::Duration::days(20);
        let validity = ValidityInfo::new(valid_from, valid_from, valid_until).with_expected_update(expected_update);

        let portrait_bytes = b"issuer signed item bytes: portrait".to_vec();
        let sex_bytes = b"issuer signed item bytes: sex".to_vec();

        let mso = MobileSecurityObjectBuilder::new(
            DigestAlgorithm::Sha256,
            "org.iso.23220.photoid.1".to_owned(),
            sample_device_key_info(),
            validity,
        )
        .with_name_space("org.iso.23220.1".to_owned(), [(0, portrait_bytes.clone())])
        .with_name_space("org.iso.23220.photoid.1".to_owned(), [(0, sex_bytes.clone())])
        .build();

        let bytes = cbor::cbor_serialize(&mso).unwrap();
        let decoded: MobileSecurityObject = cbor::cbor_deserialize(&bytes).unwrap();
        assert_eq!(decoded.doc_type, mso.doc_type);
        assert_eq!(decoded.value_digests, mso.value_digests);

        let value: ciborium::value::Value = cbor::cbor_deserialize(&bytes).unwrap();
        let diagnostic = cbor::diag::to_diagnostic(&value, cbor::diag::DiagOptions { pretty: true, decode_embedded_cbor: false });

        let portrait_digest = hex::encode(compute_digest(DigestAlgorithm::Sha256, &portrait_bytes));
        let sex_digest = hex::encode(compute_digest(DigestAlgorithm::Sha256, &sex_bytes));

        assert!(diagnostic.contains("org.iso.23220.photoid.1"));
        assert!(diagnostic.contains("org.iso.23220.1"));
        assert!(diagnostic.contains("SHA-256"));
        assert!(diagnostic.contains("device_key"));
        assert!(diagnostic.contains(&portrait_digest));
        assert!(diagnostic.contains(&sex_digest));
    }
}
