//! The document store (§4.6): a table of [`Document`]s keyed by identifier, a single event
//! stream, and schema migration on read.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use uuid::Uuid;
use wallet_common::generator::Generator;

use crate::document::compare_documents;
use crate::document::Document;
use crate::document::DocumentData;
use crate::error::DocumentStoreError;
use crate::error::Result;
use crate::events::DocumentEvent;
use crate::events::EventStream;
use crate::migration::decode_row;
use crate::migration::CustomMigration;

/// In-memory reference implementation of the document store contract (§1 non-goals: "does not
/// own the persistent-store schema, only its contract" — a real deployment backs this table with
/// its own storage; this core only needs the table's behavior to be correct).
pub struct DocumentStore {
    documents: RwLock<HashMap<Uuid, Arc<Document>>>,
    events: EventStream,
    custom_migration: Option<CustomMigration>,
}

impl DocumentStore {
    pub fn new() -> Self {
        Self { documents: RwLock::new(HashMap::new()), events: EventStream::new(), custom_migration: None }
    }

    /// Registers a custom schema-v0 migration function. Must be called before any row needing
    /// migration is read (§4.6).
    pub fn with_custom_migration(mut self, migration: CustomMigration) -> Self {
        self.custom_migration = Some(migration);
        self
    }

    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<DocumentEvent> {
        self.events.subscribe()
    }

    pub fn create_document(&self, time_generator: &dyn Generator<chrono::DateTime<chrono::Utc>>, metadata_factory: impl FnOnce() -> DocumentData) -> Arc<Document> {
        let identifier = Uuid::new_v4();
        let mut data = metadata_factory();
        data.created = time_generator.generate();
        let document = Arc::new(Document::new(identifier, data));

        self.documents.write().insert(identifier, document.clone());
        self.events.publish(DocumentEvent::Added(identifier));
        document
    }

    pub fn lookup_document(&self, identifier: Uuid) -> Option<Arc<Document>> {
        self.documents.read().get(&identifier).cloned()
    }

    /// Lists document identifiers, sorted per the §4.6 comparator if `sorted` is requested.
    pub fn list_document_ids(&self, sorted: bool) -> Vec<Uuid> {
        let documents = self.documents.read();
        if !sorted {
            return documents.keys().copied().collect();
        }
        let mut entries: Vec<&Arc<Document>> = documents.values().collect();
        entries.sort_by(|a, b| compare_documents(a, b));
        entries.into_iter().map(|d| d.identifier).collect()
    }

    pub fn delete_document(&self, identifier: Uuid) -> Result<()> {
        let removed = self.documents.write().remove(&identifier);
        if removed.is_none() {
            return Err(DocumentStoreError::NotFound(identifier.to_string()));
        }
        self.events.publish(DocumentEvent::Deleted(identifier));
        Ok(())
    }

    pub fn emit_document_changed(&self, identifier: Uuid) {
        self.events.publish(DocumentEvent::Updated(identifier));
    }

    /// Decodes a persisted row through the schema-migration path (§4.6), for stores whose
    /// backing implementation hands this core raw bytes rather than an already-typed row.
    pub fn decode_document_row(&self, bytes: &[u8]) -> DocumentData {
        decode_row(bytes, self.custom_migration.as_ref())
    }

    /// §4.7 `findCredential` resolved across the whole store: picks the matching document's
    /// usable credential for `(doc_type, domain, now)`.
    pub fn find_credential(&self, doc_type: &str, domain: &str, now: chrono::DateTime<chrono::Utc>) -> Option<(Arc<Document>, Uuid)> {
        let documents = self.documents.read();
        documents
            .values()
            .filter(|document| document.with_credentials(|creds| creds.iter().any(|c| c.doc_type == doc_type)))
            .find_map(|document| document.find_credential(domain, now).map(|credential_id| (document.clone(), credential_id)))
    }
}

impl Default for DocumentStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crypto::curve::DoubleCoordinateCurve;
    use crypto::keys::EcPrivateKey;
    use crypto::sign::SignatureAlgorithm;
    use mdoc_core::keys::KeyIdentity;
    use mdoc_core::keys::SigningKey;
    use wallet_common::generator::mock::MockTimeGenerator;

    fn signing_key() -> SigningKey {
        let key = EcPrivateKey::generate(DoubleCoordinateCurve::P256).unwrap();
        SigningKey::explicit(key, SignatureAlgorithm::Es256, KeyIdentity::Anonymous)
    }

    #[test]
    fn create_lookup_and_delete_round_trip() {
        let store = DocumentStore::new();
        let time_generator = MockTimeGenerator::default();

        let document = store.create_document(&time_generator, || DocumentData::new(chrono::Utc::now()));
        assert!(store.lookup_document(document.identifier).is_some());

        store.delete_document(document.identifier).unwrap();
        assert!(store.lookup_document(document.identifier).is_none());
        assert!(matches!(store.delete_document(document.identifier), Err(DocumentStoreError::NotFound(_))));
    }

    #[test]
    fn list_document_ids_sorted_honors_comparator() {
        let store = DocumentStore::new();
        let time_generator = MockTimeGenerator::default();

        let mut first_data = DocumentData::new(chrono::Utc::now());
        first_data.ordering_key = Some("b".to_owned());
        let first = store.create_document(&time_generator, || first_data);

        let mut second_data = DocumentData::new(chrono::Utc::now());
        second_data.ordering_key = Some("a".to_owned());
        let second = store.create_document(&time_generator, || second_data);

        let ids = store.list_document_ids(true);
        assert_eq!(ids, vec![second.identifier, first.identifier]);
    }

    #[test]
    fn find_credential_locates_owning_document_across_the_store() {
        let store = DocumentStore::new();
        let time_generator = MockTimeGenerator::default();
        let document = store.create_document(&time_generator, || DocumentData::new(chrono::Utc::now()));

        let mut cred = crate::credential::Credential::new_pending("pid".to_owned(), "org.iso.18013.5.1.mDL".to_owned(), signing_key(), None);
        let now = chrono::Utc::now();
        cred.certify(vec![], now - chrono::Duration::days(1), now + chrono::Duration::days(1)).unwrap();
        let credential_id = cred.identifier;
        document.add_credential(cred);

        let found = store.find_credential("org.iso.18013.5.1.mDL", "pid", now);
        assert!(matches!(found, Some((doc, cid)) if doc.identifier == document.identifier && cid == credential_id));
    }
}
