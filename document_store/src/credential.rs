//! Credential lifecycle (§4.7): `Pending → Certified → Gone`, with an `invalidated` side
//! transition driven by the secure area reporting a destroyed key.

use chrono::DateTime;
use chrono::Utc;
use mdoc_core::keys::SigningKey;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialState {
    Pending,
    Certified,
    Gone,
}

/// An mdoc credential's binding in a document: a `docType`, a private key capable of ECDSA
/// signing or key agreement, and the certification/usage bookkeeping §4.7 requires.
pub struct Credential {
    pub identifier: Uuid,
    pub domain: String,
    pub doc_type: String,
    pub signing_key: SigningKey,
    state: CredentialState,
    pub valid_from: Option<DateTime<Utc>>,
    pub valid_until: Option<DateTime<Utc>>,
    pub usage_count: u64,
    pub issuer_provided_data: Option<Vec<u8>>,
    pub replacement_for_identifier: Option<Uuid>,
    replacement_broken: bool,
}

impl Credential {
    pub fn new_pending(domain: String, doc_type: String, signing_key: SigningKey, replacement_for_identifier: Option<Uuid>) -> Self {
        Self {
            identifier: Uuid::new_v4(),
            domain,
            doc_type,
            signing_key,
            state: CredentialState::Pending,
            valid_from: None,
            valid_until: None,
            usage_count: 0,
            issuer_provided_data: None,
            replacement_for_identifier,
            replacement_broken: false,
        }
    }

    pub fn is_certified(&self) -> bool {
        self.state == CredentialState::Certified
    }

    pub fn state(&self) -> CredentialState {
        self.state
    }

    /// Transitions `Pending → Certified`. A credential may be certified at most once (§4.7).
    pub fn certify(&mut self, issuer_data: Vec<u8>, valid_from: DateTime<Utc>, valid_until: DateTime<Utc>) -> Result<(), CredentialAlreadyCertified> {
        if self.state != CredentialState::Pending {
            return Err(CredentialAlreadyCertified);
        }
        self.issuer_provided_data = Some(issuer_data);
        self.valid_from = Some(valid_from);
        self.valid_until = Some(valid_until);
        self.state = CredentialState::Certified;
        Ok(())
    }

    pub fn mark_gone(&mut self) {
        self.state = CredentialState::Gone;
    }

    /// Called by the secure area integration when it reports the backing key destroyed: the
    /// `Certified ─invalidated→ Gone` side transition.
    pub fn invalidate(&mut self) {
        self.state = CredentialState::Gone;
    }

    /// Called when the credential this one names as `replacement_for_identifier` is deleted: the
    /// replacement chain is broken and this credential becomes a normal, unchained one.
    pub fn replacement_for_deleted(&mut self) {
        self.replacement_broken = true;
        self.replacement_for_identifier = None;
    }

    pub fn replacement_chain_broken(&self) -> bool {
        self.replacement_broken
    }

    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        match (self.valid_from, self.valid_until) {
            (Some(from), Some(until)) => now >= from && now < until,
            _ => false,
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("credential has already been certified")]
pub struct CredentialAlreadyCertified;

#[cfg(test)]
mod tests {
    use super::*;
    use crypto::curve::DoubleCoordinateCurve;
    use crypto::keys::EcPrivateKey;
    use crypto::sign::SignatureAlgorithm;
    use mdoc_core::keys::KeyIdentity;

    fn sample_signing_key() -> SigningKey {
        let key = EcPrivateKey::generate(DoubleCoordinateCurve::P256).unwrap();
        SigningKey::explicit(key, SignatureAlgorithm::Es256, KeyIdentity::Anonymous)
    }

    #[test]
    fn certify_transitions_pending_to_certified_exactly_once() {
        let mut credential = Credential::new_pending("domain".to_owned(), "org.iso.18013.5.1.mDL".to_owned(), sample_signing_key(), None);
        assert_eq!(credential.state(), CredentialState::Pending);

        let now = Utc::now();
        credential.certify(vec![1, 2, 3], now, now + chrono::Duration::days(1)).unwrap();
        assert!(credential.is_certified());

        let result = credential.certify(vec![4, 5, 6], now, now + chrono::Duration::days(1));
        assert!(result.is_err());
    }

    #[test]
    fn validity_window_is_half_open() {
        let mut credential = Credential::new_pending("domain".to_owned(), "org.iso.18013.5.1.mDL".to_owned(), sample_signing_key(), None);
        let from = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        let until = from + chrono::Duration::days(1);
        credential.certify(vec![], from, until).unwrap();

        assert!(credential.is_valid_at(from));
        assert!(!credential.is_valid_at(until));
        assert!(credential.is_valid_at(until - chrono::Duration::seconds(1)));
    }

    #[test]
    fn invalidation_moves_certified_credential_to_gone() {
        let mut credential = Credential::new_pending("domain".to_owned(), "org.iso.18013.5.1.mDL".to_owned(), sample_signing_key(), None);
        let now = Utc::now();
        credential.certify(vec![], now, now + chrono::Duration::days(1)).unwrap();
        credential.invalidate();
        assert_eq!(credential.state(), CredentialState::Gone);
    }

    #[test]
    fn replacement_for_deleted_breaks_the_chain() {
        let target = Uuid::new_v4();
        let mut credential = Credential::new_pending("domain".to_owned(), "org.iso.18013.5.1.mDL".to_owned(), sample_signing_key(), Some(target));
        assert_eq!(credential.replacement_for_identifier, Some(target));

        credential.replacement_for_deleted();
        assert!(credential.replacement_chain_broken());
        assert!(credential.replacement_for_identifier.is_none());
    }
}
