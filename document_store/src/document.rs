//! `Document` (§4.6, §4.7): a named collection of credentials, addressed by a stable identifier
//! and ordered in listings by [`DocumentData`]'s comparator fields.

use std::cmp::Ordering;

use chrono::DateTime;
use chrono::Utc;
use parking_lot::Mutex;
use serde::Deserialize;
use serde::Serialize;
use uuid::Uuid;

use crate::credential::Credential;
use crate::credential::CredentialState;
use crate::error::DocumentStoreError;
use crate::error::Result;

pub const CURRENT_SCHEMA_VERSION: u32 = 1;

/// The persisted row shape for a document, independent of its in-memory [`Credential`]s (which
/// carry live key material and so are never serialized wholesale into this row — §4.6 describes
/// only `DocumentData`, not the credential rows, as CBOR-shaped; this core keeps the credential
/// table as an implementation-private concern of the store).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentData {
    pub provisioned: bool,
    pub created: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ordering_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub type_display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub card_art: Option<serde_bytes_vec::ByteVec>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issuer_logo: Option<serde_bytes_vec::ByteVec>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub authorization_data: Option<serde_bytes_vec::ByteVec>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

/// A minimal stand-in for a dedicated byte-buffer newtype: kept local rather than pulling in
/// `serde_bytes` (which is tuned for borrowed `&[u8]`/CBOR byte strings, not JSON-compatible
/// owned buffers) since this row also has to round-trip through the JSON legacy-migration path.
pub mod serde_bytes_vec {
    use serde::Deserialize;
    use serde::Deserializer;
    use serde::Serialize;
    use serde::Serializer;

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct ByteVec(pub Vec<u8>);

    impl Serialize for ByteVec {
        fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
            serde_bytes::serialize(&self.0, serializer)
        }
    }

    impl<'de> Deserialize<'de> for ByteVec {
        fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
            serde_bytes::deserialize(deserializer).map(ByteVec)
        }
    }
}

impl DocumentData {
    pub fn new(created: DateTime<Utc>) -> Self {
        Self {
            provisioned: false,
            created,
            ordering_key: None,
            display_name: None,
            type_display_name: None,
            card_art: None,
            issuer_logo: None,
            authorization_data: None,
            metadata: None,
        }
    }
}

/// A document plus its owned credentials. Edits to the credential list acquire `lock`; the store
/// must never hold `lock` across an acquisition of its own store-wide lock (§4.6: "the design
/// forbids holding a per-document mutex across any store-lock acquisition").
pub struct Document {
    pub identifier: Uuid,
    pub data: DocumentData,
    lock: Mutex<Vec<Credential>>,
}

impl Document {
    pub fn new(identifier: Uuid, data: DocumentData) -> Self {
        Self { identifier, data, lock: Mutex::new(Vec::new()) }
    }

    pub fn comparator_key(&self) -> (String, DateTime<Utc>, Uuid) {
        (self.data.ordering_key.clone().unwrap_or_default(), self.data.created, self.identifier)
    }

    pub fn add_credential(&self, credential: Credential) {
        self.lock.lock().push(credential);
    }

    pub fn delete_credential(&self, identifier: Uuid) -> Result<()> {
        let mut credentials = self.lock.lock();
        let index = credentials
            .iter()
            .position(|c| c.identifier == identifier)
            .ok_or_else(|| DocumentStoreError::CredentialNotFound(identifier.to_string(), self.identifier.to_string()))?;
        credentials.remove(index);
        for credential in credentials.iter_mut() {
            if credential.replacement_for_identifier == Some(identifier) {
                credential.replacement_for_deleted();
            }
        }
        Ok(())
    }

    pub fn with_credentials<R>(&self, f: impl FnOnce(&[Credential]) -> R) -> R {
        f(&self.lock.lock())
    }

    pub fn with_credentials_mut<R>(&self, f: impl FnOnce(&mut Vec<Credential>) -> R) -> R {
        f(&mut self.lock.lock())
    }

    /// §4.7 `findCredential`: the least-used currently-valid certified credential in `domain`,
    /// ties broken by identifier.
    pub fn find_credential(&self, domain: &str, now: DateTime<Utc>) -> Option<Uuid> {
        self.lock
            .lock()
            .iter()
            .filter(|c| c.domain == domain && c.is_certified() && c.is_valid_at(now))
            .min_by(|a, b| a.usage_count.cmp(&b.usage_count).then_with(|| a.identifier.cmp(&b.identifier)))
            .map(|c| c.identifier)
    }

    /// `(total, availableAtNowWithZeroUsage)` per §4.7.
    pub fn count_usable_credentials(&self, domain: &str, now: DateTime<Utc>) -> (usize, usize) {
        let credentials = self.lock.lock();
        let usable = credentials.iter().filter(|c| c.domain == domain && c.is_certified() && c.is_valid_at(now));
        let total = usable.clone().count();
        let zero_usage = usable.filter(|c| c.usage_count == 0).count();
        (total, zero_usage)
    }

    pub fn increment_usage(&self, credential_identifier: Uuid) -> Result<()> {
        let mut credentials = self.lock.lock();
        let credential = credentials
            .iter_mut()
            .find(|c| c.identifier == credential_identifier)
            .ok_or_else(|| DocumentStoreError::CredentialNotFound(credential_identifier.to_string(), self.identifier.to_string()))?;
        credential.usage_count += 1;
        Ok(())
    }

    pub fn mark_invalidated(&self, credential_identifier: Uuid) {
        let mut credentials = self.lock.lock();
        if let Some(credential) = credentials.iter_mut().find(|c| c.identifier == credential_identifier) {
            credential.invalidate();
        }
    }
}

/// Ordering for document listings per §4.6: `(orderingKey ?? "", created, identifier)` ascending.
pub fn compare_documents(a: &Document, b: &Document) -> Ordering {
    a.comparator_key().cmp(&b.comparator_key())
}

impl CredentialState {
    pub fn is_gone(self) -> bool {
        matches!(self, CredentialState::Gone)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crypto::curve::DoubleCoordinateCurve;
    use crypto::keys::EcPrivateKey;
    use crypto::sign::SignatureAlgorithm;
    use mdoc_core::keys::KeyIdentity;

    fn sample_credential(domain: &str, usage_count: u64, valid: bool) -> Credential {
        let key = EcPrivateKey::generate(DoubleCoordinateCurve::P256).unwrap();
        let signing_key = SigningKey::explicit(key, SignatureAlgorithm::Es256, KeyIdentity::Anonymous);
        let mut credential = Credential::new_pending(domain.to_owned(), "org.iso.18013.5.1.mDL".to_owned(), signing_key, None);
        let now = Utc::now();
        let (from, until) = if valid {
            (now - chrono::Duration::days(1), now + chrono::Duration::days(1))
        } else {
            (now - chrono::Duration::days(10), now - chrono::Duration::days(5))
        };
        credential.certify(vec![], from, until).unwrap();
        credential.usage_count = usage_count;
        credential
    }

    #[test]
    fn find_credential_picks_least_used_valid_certified_credential() {
        let document = Document::new(Uuid::new_v4(), DocumentData::new(Utc::now()));
        let least_used = sample_credential("pid", 0, true);
        let least_used_id = least_used.identifier;
        document.add_credential(sample_credential("pid", 5, true));
        document.add_credential(least_used);
        document.add_credential(sample_credential("pid", 1, false));

        let found = document.find_credential("pid", Utc::now()).unwrap();
        assert_eq!(found, least_used_id);
    }

    #[test]
    fn count_usable_credentials_reports_total_and_zero_usage() {
        let document = Document::new(Uuid::new_v4(), DocumentData::new(Utc::now()));
        document.add_credential(sample_credential("pid", 0, true));
        document.add_credential(sample_credential("pid", 1, true));
        document.add_credential(sample_credential("pid", 0, false));

        let (total, zero_usage) = document.count_usable_credentials("pid", Utc::now());
        assert_eq!(total, 2);
        assert_eq!(zero_usage, 1);
    }

    #[test]
    fn deleting_credential_breaks_replacement_chain_of_dependents() {
        let document = Document::new(Uuid::new_v4(), DocumentData::new(Utc::now()));
        let target = sample_credential("pid", 0, true);
        let target_id = target.identifier;
        document.add_credential(target);

        let key = EcPrivateKey::generate(DoubleCoordinateCurve::P256).unwrap();
        let signing_key = SigningKey::explicit(key, SignatureAlgorithm::Es256, KeyIdentity::Anonymous);
        let dependent = Credential::new_pending("pid".to_owned(), "org.iso.18013.5.1.mDL".to_owned(), signing_key, Some(target_id));
        document.add_credential(dependent);

        document.delete_credential(target_id).unwrap();
        document.with_credentials(|credentials| {
            assert_eq!(credentials.len(), 1);
            assert!(credentials[0].replacement_chain_broken());
        });
    }

    #[test]
    fn comparator_orders_by_ordering_key_then_created_then_identifier() {
        let now = Utc::now();
        let mut a_data = DocumentData::new(now);
        a_data.ordering_key = Some("b".to_owned());
        let mut b_data = DocumentData::new(now);
        b_data.ordering_key = Some("a".to_owned());

        let a = Document::new(Uuid::new_v4(), a_data);
        let b = Document::new(Uuid::new_v4(), b_data);

        assert_eq!(compare_documents(&a, &b), Ordering::Greater);
    }
}
