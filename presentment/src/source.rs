//! The source-of-truth hook (§4.12): trust resolution, consent, and credential selection are
//! delegated to the embedding application through this trait, with a default implementation
//! covering the common mdoc-only case.
//!
//! §3 "Presentment data model" shapes the request/response surface of that hook: [`Requester`]
//! identifies who's asking, [`TrustMetadata`] is what the application can say about them,
//! [`CredentialPresentmentData`] is the set of document/credential combinations that could
//! satisfy the request, and [`CredentialPresentmentSelection`] is what the user (or a default
//! policy) ultimately picked.

use std::collections::HashSet;

use async_trait::async_trait;
use document_store::DocumentStore;
use uuid::Uuid;

use crate::error::PresentmentError;
use crate::error::Result;

/// Identifies the party asking for a presentment (§3). At least one of `origin`/`app_id`/
/// `cert_chain` must be present — a `Requester` with none of them carries no information and
/// can't be shown to the user or passed to `resolveTrust`.
#[derive(Debug, Clone, Default)]
pub struct Requester {
    pub origin: Option<String>,
    pub app_id: Option<String>,
    pub cert_chain: Option<Vec<Vec<u8>>>,
}

impl Requester {
    pub fn new(origin: Option<String>, app_id: Option<String>, cert_chain: Option<Vec<Vec<u8>>>) -> Result<Self> {
        if origin.is_none() && app_id.is_none() && cert_chain.is_none() {
            return Err(PresentmentError::InvalidRequester);
        }
        Ok(Self { origin, app_id, cert_chain })
    }

    pub fn from_cert_chain(cert_chain: Vec<Vec<u8>>) -> Result<Self> {
        Self::new(None, None, Some(cert_chain))
    }
}

/// Whatever the embedding application can say about the party making the request (§3), returned
/// by [`PresentmentSource::resolve_trust`] and threaded through to `show_consent_prompt`.
#[derive(Debug, Clone, Default)]
pub struct TrustMetadata {
    pub display_name: Option<String>,
    pub display_icon: Option<Vec<u8>>,
    pub display_icon_url: Option<String>,
    pub privacy_policy_url: Option<String>,
}

/// One way a single document/credential could answer one of the request's `docRequest`s.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialPresentmentOption {
    pub document_id: Uuid,
    pub credential_id: Uuid,
    pub doc_type: String,
    /// Data element identifiers this option would disclose.
    pub claims: Vec<String>,
}

/// The groupings of documents the user may choose from to satisfy a request (§3): one inner
/// `Vec` per `docRequest`/credential-set, each holding every document/credential combination that
/// could answer it.
#[derive(Debug, Clone, Default)]
pub struct CredentialPresentmentData {
    pub credential_sets: Vec<Vec<CredentialPresentmentOption>>,
}

impl CredentialPresentmentData {
    pub fn new(credential_sets: Vec<Vec<CredentialPresentmentOption>>) -> Self {
        Self { credential_sets }
    }

    pub fn is_empty(&self) -> bool {
        self.credential_sets.is_empty()
    }

    /// Merges redundant options: duplicate `(document, credential)` pairs within one credential
    /// set collapse to a single entry. Never changes the number of credential sets — each still
    /// corresponds to one `docRequest`, which `generate_combinations`/the response builder rely on.
    pub fn consolidate(mut self) -> Self {
        for set in &mut self.credential_sets {
            let mut seen = HashSet::new();
            set.retain(|option| seen.insert((option.document_id, option.credential_id)));
        }
        self
    }

    /// The cross product of every credential set's options, one pick per set — every combination
    /// of documents/credentials that together would satisfy the whole request. A credential set
    /// with no options at all makes the whole request unsatisfiable, so this returns no
    /// combinations in that case. Within each set, options matching a document in `preselected`
    /// sort first, so index `0` of the result is the combination a caller should default to.
    pub fn generate_combinations(&self, preselected: &[Uuid]) -> Vec<CredentialPresentmentSelection> {
        if self.credential_sets.is_empty() || self.credential_sets.iter().any(|set| set.is_empty()) {
            return Vec::new();
        }

        let ordered_sets: Vec<Vec<&CredentialPresentmentOption>> = self
            .credential_sets
            .iter()
            .map(|set| {
                let mut options: Vec<&CredentialPresentmentOption> = set.iter().collect();
                options.sort_by_key(|option| !preselected.contains(&option.document_id));
                options
            })
            .collect();

        let mut combinations: Vec<Vec<&CredentialPresentmentOption>> = vec![Vec::new()];
        for set in &ordered_sets {
            let mut next = Vec::with_capacity(combinations.len() * set.len());
            for combination in &combinations {
                for option in set {
                    let mut extended = combination.clone();
                    extended.push(*option);
                    next.push(extended);
                }
            }
            combinations = next;
        }

        combinations
            .into_iter()
            .map(|combination| CredentialPresentmentSelection {
                matches: combination
                    .into_iter()
                    .map(|option| CredentialPresentmentMatch {
                        document_id: option.document_id,
                        credential_id: option.credential_id,
                        doc_type: option.doc_type.clone(),
                        claims: option.claims.clone(),
                    })
                    .collect(),
            })
            .collect()
    }
}

/// A single `(credential, claims)` match chosen out of one credential set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialPresentmentMatch {
    pub document_id: Uuid,
    pub credential_id: Uuid,
    pub doc_type: String,
    pub claims: Vec<String>,
}

/// The chosen set of `(credential, claims)` matches resulting from the consent prompt (§3) — one
/// per credential set in the [`CredentialPresentmentData`] it was selected from.
#[derive(Debug, Clone, Default)]
pub struct CredentialPresentmentSelection {
    pub matches: Vec<CredentialPresentmentMatch>,
}

impl CredentialPresentmentSelection {
    pub fn document_ids(&self) -> Vec<Uuid> {
        self.matches.iter().map(|m| m.document_id).collect()
    }
}

#[async_trait]
pub trait PresentmentSource: Send + Sync {
    async fn resolve_trust(&self, requester: &Requester) -> Option<TrustMetadata>;

    /// Shows the user what's requested; returns `None` if the user cancels. `preselected` names
    /// the documents the core would pick automatically per credential set (§4.11 step 5), which
    /// an interactive implementation typically offers as the default choice.
    async fn show_consent_prompt(
        &self,
        requester: Option<&Requester>,
        trust_metadata: Option<&TrustMetadata>,
        data: &CredentialPresentmentData,
        preselected: &[Uuid],
    ) -> Option<CredentialPresentmentSelection>;

    /// Picks the credential to use for `document_id`, given whether key-agreement-capable
    /// curves are acceptable to the reader for this request (§4.12: `keyAgreementPossible`).
    async fn select_credential(&self, document_id: Uuid, doc_type: &str, key_agreement_possible: bool, prefer_signature_to_key_agreement: bool) -> Option<Uuid>;
}

/// Matches documents by `docType` and prefers a key-agreement-capable credential over a
/// signature-capable one only when the reader allows it and the caller hasn't opted out
/// (§4.12: "If `preferSignatureToKeyAgreement=false` and a KA-capable credential exists ...").
pub struct DefaultPresentmentSource {
    store: std::sync::Arc<DocumentStore>,
    domain: String,
}

impl DefaultPresentmentSource {
    pub fn new(store: std::sync::Arc<DocumentStore>, domain: impl Into<String>) -> Self {
        Self { store, domain: domain.into() }
    }
}

#[async_trait]
impl PresentmentSource for DefaultPresentmentSource {
    async fn resolve_trust(&self, _requester: &Requester) -> Option<TrustMetadata> {
        None
    }

    /// Auto-accepts the combination whose documents match `preselected`, if `generate_combinations`
    /// produced one, falling back to the first combination offered.
    async fn show_consent_prompt(
        &self,
        _requester: Option<&Requester>,
        _trust_metadata: Option<&TrustMetadata>,
        data: &CredentialPresentmentData,
        preselected: &[Uuid],
    ) -> Option<CredentialPresentmentSelection> {
        let combinations = data.clone().consolidate().generate_combinations(preselected);
        combinations
            .iter()
            .find(|combination| combination.document_ids() == preselected)
            .or_else(|| combinations.first())
            .cloned()
    }

    async fn select_credential(&self, document_id: Uuid, _doc_type: &str, key_agreement_possible: bool, prefer_signature_to_key_agreement: bool) -> Option<Uuid> {
        let document = self.store.lookup_document(document_id)?;
        let now = chrono::Utc::now();

        if key_agreement_possible && !prefer_signature_to_key_agreement {
            if let Some(ka_credential) = document.with_credentials(|creds| {
                creds
                    .iter()
                    .filter(|c| c.domain == self.domain && c.is_certified() && c.is_valid_at(now))
                    .filter(|c| c.signing_key.is_key_agreement_capable().unwrap_or(false))
                    .min_by(|a, b| a.usage_count.cmp(&b.usage_count).then_with(|| a.identifier.cmp(&b.identifier)))
                    .map(|c| c.identifier)
            }) {
                return Some(ka_credential);
            }
        }

        document.find_credential(&self.domain, now)
    }
}
