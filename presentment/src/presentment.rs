//! `Iso18013Presentment` (§4.11): the request-handling loop that drives one proximity
//! presentment session from transport-connected to completion.

use std::sync::Arc;

use cbor::CborSeq;
use cbor::TaggedBytes;
use crypto::keys::EcPrivateKey;
use crypto::keys::EcPublicKey;
use document_store::DocumentStore;
use mdoc_core::engagement::DeviceEngagement;
use mdoc_core::request::DeviceRequest;
use mdoc_core::response::DeviceResponseBuilder;
use mdoc_core::response::DocumentBuilder;
use mdoc_core::response::DocumentError;
use mdoc_core::response::IssuerSigned;
use mdoc_core::response::STATUS_OK;
use mdoc_core::session::SessionData;
use mdoc_core::session::SessionEncryption;
use mdoc_core::session::SessionEstablishment;
use mdoc_core::session::SessionTranscript;
use mdoc_core::session::SessionTranscriptKeyed;
use mdoc_core::MdocError;

use crate::error::PresentmentError;
use crate::error::Result;
use crate::model::PresentmentModel;
use crate::model::PresentmentState;
use crate::reader_auth::extract_x5chain_der;
use crate::reader_auth::verify_reader_auth;
use crate::source::PresentmentSource;
use crate::timeouts::PresentmentTimeouts;
use crate::transport::Transport;
use crate::transport::TransportState;

/// Drives one proximity presentment session end to end (§4.11): waits for the transport to
/// settle, handles one or more reader requests in sequence, and always leaves the transport
/// closed on the way out.
pub struct Iso18013Presentment {
    source: Arc<dyn PresentmentSource>,
    store: Arc<DocumentStore>,
    timeouts: PresentmentTimeouts,
}

struct Session {
    encryption: SessionEncryption,
    transcript: SessionTranscript,
    reader_public_key: EcPublicKey,
}

impl Iso18013Presentment {
    pub fn new(source: Arc<dyn PresentmentSource>, store: Arc<DocumentStore>, timeouts: PresentmentTimeouts) -> Self {
        Self { source, store, timeouts }
    }

    /// Runs one presentment session. `device_engagement`/`handover` identify how the reader found
    /// this device (and so feed `SessionTranscript`); `e_device_key` is the ephemeral private key
    /// advertised in that engagement.
    #[tracing::instrument(skip_all)]
    pub async fn run(
        &self,
        transport: &dyn Transport,
        model: &PresentmentModel,
        device_engagement: TaggedBytes<DeviceEngagement>,
        e_device_key: EcPrivateKey,
        handover: ciborium::value::Value,
    ) -> Result<()> {
        model.transition(PresentmentState::Connecting);
        match transport.wait_until_settled().await {
            TransportState::Connected => {}
            other => return Err(PresentmentError::TransportFailed(other)),
        }

        let result = self.request_loop(transport, model, device_engagement, e_device_key, handover).await;

        if !matches!(result, Ok(true)) {
            let termination = SessionEncryption::terminate();
            if let Ok(bytes) = cbor::cbor_serialize(&termination) {
                let _ = transport.send(bytes).await;
            }
        }
        transport.close().await;

        match result {
            Ok(_) => {
                model.transition(PresentmentState::Completed);
                Ok(())
            }
            Err(PresentmentError::Canceled) => {
                model.transition(PresentmentState::CanceledByUser);
                Err(PresentmentError::Canceled)
            }
            Err(e) => Err(e),
        }
    }

    /// Returns `Ok(true)` if the reader terminated the session cleanly (so no termination message
    /// needs to be sent back), `Ok(false)`/`Err` otherwise.
    async fn request_loop(
        &self,
        transport: &dyn Transport,
        model: &PresentmentModel,
        device_engagement: TaggedBytes<DeviceEngagement>,
        e_device_key: EcPrivateKey,
        handover: ciborium::value::Value,
    ) -> Result<bool> {
        let mut session: Option<Session> = None;

        loop {
            model.transition(PresentmentState::WaitingForReader);
            let timeout = if session.is_none() { self.timeouts.first_message } else { self.timeouts.subsequent_message };
            let message = tokio::time::timeout(timeout, transport.receive())
                .await
                .map_err(|_| PresentmentError::Timeout)?
                .map_err(PresentmentError::Transport)?;

            let plaintext = if session.is_none() {
                let establishment: SessionEstablishment = cbor::cbor_deserialize(&message)?;
                let reader_public_key = EcPublicKey::from_cose_key(&establishment.e_reader_key.0).map_err(MdocError::from)?;

                let transcript = CborSeq(SessionTranscriptKeyed {
                    device_engagement_bytes: Some(device_engagement.clone()),
                    e_reader_key_bytes: Some(establishment.e_reader_key.clone()),
                    handover: handover.clone(),
                });
                let mut encryption = SessionEncryption::from_keys(&e_device_key, &reader_public_key, &transcript)?;
                let plaintext = encryption.decrypt_from_reader(&SessionData { data: Some(establishment.data), status: None })?;
                session = Some(Session { encryption, transcript, reader_public_key });
                plaintext
            } else {
                let session_data: SessionData = cbor::cbor_deserialize(&message)?;
                session.as_mut().expect("session established above").encryption.decrypt_from_reader(&session_data)?
            };

            let Some(plaintext) = plaintext else {
                return Ok(true);
            };

            model.begin_request();
            let established = session.as_mut().expect("session established before any request is processed");
            self.handle_request(transport, model, &plaintext, established).await?;

            if model.is_canceled_by_user() {
                return Err(PresentmentError::Canceled);
            }
        }
    }

    async fn handle_request(&self, transport: &dyn Transport, model: &PresentmentModel, plaintext: &[u8], session: &mut Session) -> Result<()> {
        let request: DeviceRequest = cbor::cbor_deserialize(plaintext)?;
        let reader_public_key = session.reader_public_key.clone();
        let (response, used_credentials) = self.process_request(&session.transcript, &request, model, Some(&reader_public_key)).await?;

        let response_bytes = cbor::cbor_serialize(&response)?;
        let session_data = session.encryption.encrypt_to_reader(&response_bytes, None)?;
        let wire_bytes = cbor::cbor_serialize(&session_data)?;
        transport.send(wire_bytes).await.map_err(PresentmentError::Transport)?;

        // §5: "Credential counters are incremented ... after the response is successfully
        // encrypted" — not while assembling the response, in case encryption never completes.
        self.commit_usage(&used_credentials)?;

        Ok(())
    }

    /// Runs the request-handling pipeline (§4.11 steps 3-6: verify reader auth, resolve trust,
    /// obtain consent, assemble per-document responses) without touching the transport. Shared by
    /// the transport-driven loop above and by in-process callers (the W3C DC API path) that
    /// already have a `SessionTranscript` and a single `DeviceRequest` to answer. `reader_public_key`
    /// is only needed when a credential ends up answering in MAC mode.
    ///
    /// Returns the built response alongside the `(document_id, credential_id)` pairs that were
    /// used to build it; callers must call [`Self::commit_usage`] with that list only once their
    /// own transport-specific encryption of the response bytes has succeeded (§5: "Credential
    /// counters are incremented ... after the response is successfully encrypted").
    pub async fn process_request(
        &self,
        transcript: &SessionTranscript,
        request: &DeviceRequest,
        model: &PresentmentModel,
        reader_public_key: Option<&EcPublicKey>,
    ) -> Result<(mdoc_core::response::DeviceResponse, Vec<(uuid::Uuid, uuid::Uuid)>)> {
        request.verify_reader_authentication(transcript, verify_reader_auth)?;

        let requester = self.build_requester(request);
        let trust_metadata = match &requester {
            Some(requester) => self.source.resolve_trust(requester).await,
            None => None,
        };

        model.transition(PresentmentState::WaitingForUserInput);
        let preselected = self.preselect_documents(request);
        let data = self.build_presentment_data(request).await;
        let selection = self
            .source
            .show_consent_prompt(requester.as_ref(), trust_metadata.as_ref(), &data, &preselected)
            .await
            .ok_or(PresentmentError::Canceled)?;
        model.set_selected_documents(selection.document_ids());

        model.transition(PresentmentState::Sending);
        let mut builder = DeviceResponseBuilder::new();
        let mut used_credentials = Vec::new();
        for (index, doc_request) in request.doc_requests.iter().enumerate() {
            let items_request = doc_request.items_request();
            let doc_type = items_request.doc_type.clone();
            let (key_agreement_possible, _) = request_flags(items_request);

            let outcome = match selection.matches.get(index) {
                Some(chosen) => {
                    self.build_response_document(chosen.document_id, chosen.credential_id, items_request, key_agreement_possible, transcript, reader_public_key)
                        .await
                }
                None => Ok(None),
            };
            match outcome {
                Ok(Some((document, document_id, credential_id))) => {
                    used_credentials.push((document_id, credential_id));
                    builder = builder.add_document(document);
                }
                Ok(None) => builder = builder.add_document_error(doc_type, DocumentError::DataNotReturned),
                Err(_) => builder = builder.add_document_error(doc_type, DocumentError::DataNotReturned),
            }
        }

        Ok((builder.build(STATUS_OK), used_credentials))
    }

    /// Increments the usage counter of each `(document_id, credential_id)` pair that answered a
    /// request, once the caller's own response encryption has succeeded (§5).
    pub fn commit_usage(&self, used_credentials: &[(uuid::Uuid, uuid::Uuid)]) -> Result<()> {
        for (document_id, credential_id) in used_credentials {
            if let Some(document) = self.store.lookup_document(*document_id) {
                document.increment_usage(*credential_id)?;
            }
        }
        Ok(())
    }

    /// Builds a [`crate::source::Requester`] out of whatever identifies the reader in this
    /// request — currently only the certificate chain behind a per-doc-request or session-wide
    /// reader-auth signature, if either verified successfully. Returns `None` when the reader
    /// supplied no reader-auth at all, since a `Requester` with no identifier is invalid (§3).
    fn build_requester(&self, request: &DeviceRequest) -> Option<crate::source::Requester> {
        let certificate_chain = request
            .doc_requests
            .iter()
            .find_map(|r| r.reader_auth().ok().flatten().and_then(extract_x5chain_der))
            .or_else(|| request.reader_auth_all().ok().flatten().and_then(extract_x5chain_der))?;
        crate::source::Requester::from_cert_chain(certificate_chain).ok()
    }

    /// Builds the groupings of documents/credentials that could answer each `docRequest` (§3,
    /// §4.12): one credential set per `docRequest`, in order, so index `i` here lines up with
    /// `request.doc_requests[i]`.
    async fn build_presentment_data(&self, request: &DeviceRequest) -> crate::source::CredentialPresentmentData {
        let mut credential_sets = Vec::with_capacity(request.doc_requests.len());
        for doc_request in &request.doc_requests {
            let items_request = doc_request.items_request();
            let doc_type = &items_request.doc_type;
            let claims: Vec<String> = items_request.name_spaces.values().flat_map(|elements| elements.keys().cloned()).collect();
            let (key_agreement_possible, prefer_signature) = request_flags(items_request);

            let mut options = Vec::new();
            for document_id in documents_matching_doc_type(&self.store, doc_type) {
                if let Some(credential_id) = self.source.select_credential(document_id, doc_type, key_agreement_possible, prefer_signature).await {
                    options.push(crate::source::CredentialPresentmentOption {
                        document_id,
                        credential_id,
                        doc_type: doc_type.clone(),
                        claims: claims.clone(),
                    });
                }
            }
            credential_sets.push(options);
        }
        crate::source::CredentialPresentmentData::new(credential_sets)
    }

    fn preselect_documents(&self, request: &DeviceRequest) -> Vec<uuid::Uuid> {
        request
            .doc_requests
            .iter()
            .filter_map(|doc_request| documents_matching_doc_type(&self.store, &doc_request.items_request().doc_type).into_iter().next())
            .collect()
    }

    async fn build_response_document(
        &self,
        document_id: uuid::Uuid,
        credential_id: uuid::Uuid,
        items_request: &mdoc_core::request::ItemsRequest,
        key_agreement_possible: bool,
        transcript: &SessionTranscript,
        reader_public_key: Option<&EcPublicKey>,
    ) -> Result<Option<(mdoc_core::response::Document, uuid::Uuid, uuid::Uuid)>> {
        let doc_type = &items_request.doc_type;
        let Some(document) = self.store.lookup_document(document_id) else {
            return Ok(None);
        };

        let issuer_signed_bytes = document.with_credentials(|creds| creds.iter().find(|c| c.identifier == credential_id).and_then(|c| c.issuer_provided_data.clone()));
        let Some(issuer_signed_bytes) = issuer_signed_bytes else {
            return Ok(None);
        };
        let issuer_signed: IssuerSigned = cbor::cbor_deserialize(&issuer_signed_bytes)?;
        let disclosed_name_spaces = issuer_signed.filter_to_requested(&items_request.name_spaces)?;
        let issuer_signed = IssuerSigned { name_spaces: disclosed_name_spaces, issuer_auth: issuer_signed.issuer_auth };

        let built = document.with_credentials(|creds| -> Result<mdoc_core::response::Document> {
            let credential = creds.iter().find(|c| c.identifier == credential_id).ok_or_else(|| PresentmentError::NoUsableCredential(doc_type.clone()))?;

            let use_mac = key_agreement_possible && credential.signing_key.is_key_agreement_capable().unwrap_or(false) && reader_public_key.is_some();
            let doc_builder = DocumentBuilder {
                doc_type: doc_type.clone(),
                issuer_signed,
                device_name_spaces: Default::default(),
                device_key: &credential.signing_key,
                mac_with_reader_key: use_mac.then_some(reader_public_key.expect("checked by use_mac")),
            };
            Ok(doc_builder.build(transcript)?)
        })?;

        Ok(Some((built, document_id, credential_id)))
    }
}

/// Reads the reader-supplied `keyAgreementPossible`/`preferSignatureToKeyAgreement` hints out of
/// `itemsRequest.requestInfo` (§4.10/§4.12), defaulting to signature mode when absent.
fn request_flags(items_request: &mdoc_core::request::ItemsRequest) -> (bool, bool) {
    let Some(info) = &items_request.request_info else {
        return (false, true);
    };
    let key_agreement_possible = info.get("keyAgreementPossible").and_then(|v| v.as_bool()).unwrap_or(false);
    let prefer_signature = info.get("preferSignatureToKeyAgreement").and_then(|v| v.as_bool()).unwrap_or(true);
    (key_agreement_possible, prefer_signature)
}

fn documents_matching_doc_type(store: &DocumentStore, doc_type: &str) -> Vec<uuid::Uuid> {
    store
        .list_document_ids(true)
        .into_iter()
        .filter_map(|id| store.lookup_document(id))
        .filter(|document| document.with_credentials(|creds| creds.iter().any(|c| c.doc_type == doc_type)))
        .map(|document| document.identifier)
        .collect()
}
