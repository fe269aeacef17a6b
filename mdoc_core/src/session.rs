//! mdoc session encryption (§4.8): key derivation from the session transcript, nonce
//! construction, and the `SessionData`/`SessionEstablishment` wire messages.

use cbor::CborSeq;
use cbor::TaggedBytes;
use crypto::aead::AeadAlgorithm;
use crypto::digest::DigestAlgorithm;
use crypto::keys::EcPrivateKey;
use crypto::keys::EcPublicKey;
use serde::Deserialize;
use serde::Serialize;

use crate::engagement::DeviceEngagement;
use crate::error::MdocError;
use crate::error::Result;

pub const STATUS_SESSION_TERMINATION: u64 = 20;

/// `SessionTranscript = [DeviceEngagementBytes, EReaderKeyBytes, handover]` (§4.8). `handover` is
/// left as an untyped CBOR value: its shape depends on the transport/channel (QR, NFC, the W3C
/// DC API's synthetic transcript in §4.13) and is opaque to session-key derivation.
pub type SessionTranscript = CborSeq<SessionTranscriptKeyed>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionTranscriptKeyed {
    pub device_engagement_bytes: Option<TaggedBytes<DeviceEngagement>>,
    pub e_reader_key_bytes: Option<TaggedBytes<ciborium::value::Value>>,
    pub handover: ciborium::value::Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionDirection {
    DeviceToReader,
    ReaderToDevice,
}

impl SessionDirection {
    fn identifier(self) -> [u8; 4] {
        match self {
            Self::DeviceToReader => *b"SKDe",
            Self::ReaderToDevice => *b"SKRe",
        }
    }

    fn hkdf_info(self) -> &'static [u8] {
        match self {
            Self::DeviceToReader => b"SKDevice",
            Self::ReaderToDevice => b"SKReader",
        }
    }
}

/// A single AES-128-GCM session key plus its monotonically increasing message counter (§4.8,
/// §5: "Credential counters are incremented ... after the response is successfully encrypted").
pub struct SessionKey {
    direction: SessionDirection,
    key: Vec<u8>,
    counter: u64,
}

impl SessionKey {
    fn derive(direction: SessionDirection, shared_secret: &[u8], session_transcript_bytes: &[u8]) -> Result<Self> {
        let key = crypto::hkdf::hkdf(DigestAlgorithm::Sha256, session_transcript_bytes, shared_secret, direction.hkdf_info(), 32)?;
        Ok(Self { direction, key, counter: 1 })
    }

    fn nonce(&self) -> [u8; 12] {
        let mut nonce = [0u8; 12];
        nonce[..4].copy_from_slice(&self.direction.identifier());
        nonce[4..].copy_from_slice(&self.counter.to_be_bytes());
        nonce
    }

    fn encrypt(&mut self, plaintext: &[u8]) -> Result<Vec<u8>> {
        let nonce = self.nonce();
        let ciphertext = crypto::aead::encrypt(AeadAlgorithm::A128Gcm, &self.key, &nonce, plaintext, None)?;
        self.counter += 1;
        Ok(ciphertext)
    }

    fn decrypt(&mut self, ciphertext: &[u8]) -> Result<Vec<u8>> {
        let nonce = self.nonce();
        let plaintext = crypto::aead::decrypt(AeadAlgorithm::A128Gcm, &self.key, &nonce, ciphertext, None)?;
        self.counter += 1;
        Ok(plaintext)
    }
}

/// Owns both directions' session keys for one presentment session and the transcript they were
/// derived from.
pub struct SessionEncryption {
    device_key: SessionKey,
    reader_key: SessionKey,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionData {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_bytes::ByteBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionEstablishment {
    pub e_reader_key: TaggedBytes<ciborium::value::Value>,
    pub data: serde_bytes::ByteBuf,
}

impl SessionEncryption {
    /// Derive the mdoc-side and reader-side session keys from the ECDH shared secret and the
    /// canonical bytes of `session_transcript`.
    pub fn derive(shared_secret: &[u8], session_transcript: &SessionTranscript) -> Result<Self> {
        let transcript_bytes = cbor::cbor_serialize(session_transcript)?;
        Ok(Self {
            device_key: SessionKey::derive(SessionDirection::DeviceToReader, shared_secret, &transcript_bytes)?,
            reader_key: SessionKey::derive(SessionDirection::ReaderToDevice, shared_secret, &transcript_bytes)?,
        })
    }

    pub fn from_keys(device_private: &EcPrivateKey, reader_public: &EcPublicKey, session_transcript: &SessionTranscript) -> Result<Self> {
        let shared_secret = crypto::sign::key_agreement(device_private, reader_public)?;
        Self::derive(&shared_secret, session_transcript)
    }

    /// Encrypt `plaintext` as a device→reader `SessionData` message, optionally carrying a
    /// terminal `status` (only `STATUS_SESSION_TERMINATION` is used by this core).
    pub fn encrypt_to_reader(&mut self, plaintext: &[u8], status: Option<u64>) -> Result<SessionData> {
        let ciphertext = self.device_key.encrypt(plaintext)?;
        Ok(SessionData { data: Some(serde_bytes::ByteBuf::from(ciphertext)), status })
    }

    pub fn terminate() -> SessionData {
        SessionData { data: None, status: Some(STATUS_SESSION_TERMINATION) }
    }

    /// Decrypt a reader→device `SessionData` message. Returns `Ok(None)` if the message is a
    /// clean termination (empty `data`, `status = 20`); an error otherwise.
    pub fn decrypt_from_reader(&mut self, session_data: &SessionData) -> Result<Option<Vec<u8>>> {
        match (&session_data.data, session_data.status) {
            (None, Some(STATUS_SESSION_TERMINATION)) => Ok(None),
            (None, _) => Err(MdocError::MalformedSessionData),
            (Some(ciphertext), _) => self.reader_key.decrypt(ciphertext).map(Some),
        }
    }
}
