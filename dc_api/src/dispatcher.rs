//! `DcApiDispatcher` (§4.13): the W3C Digital Credentials API entry point. Dispatches by
//! `protocol`, runs the ISO mdoc request pipeline in-process (no transport), and wraps the
//! response for HPKE delivery back through the browser.

use std::sync::Arc;

use crypto::hpke::CipherSuite;
use crypto::hpke::HpkeAeadAlgorithm;
use crypto::hpke::KemAlgorithm;
use crypto::keys::EcPublicKey;
use mdoc_core::request::DeviceRequest;
use presentment::Iso18013Presentment;
use presentment::PresentmentModel;

use crate::envelope::decode_base64url;
use crate::envelope::encode_base64url;
use crate::envelope::IsoMdocRequestData;
use crate::envelope::Protocol;
use crate::envelope::RequestEnvelope;
use crate::envelope::ResponseData;
use crate::envelope::ResponseEnvelope;
use crate::error::DcApiError;
use crate::error::Result;
use crate::jws;
use crate::transcript::build_session_transcript;
use crate::transcript::encryption_parameters;
use crate::transcript::EncryptionInfo;

/// `DHKEM(P-256)+HKDF-SHA256+AES-128-GCM`, the suite §4.13 names for wrapping DC API responses.
pub const DEFAULT_CIPHER_SUITE: CipherSuite = CipherSuite::new(KemAlgorithm::DhkemP256, HpkeAeadAlgorithm::Aes128Gcm);

pub struct DcApiDispatcher {
    presentment: Arc<Iso18013Presentment>,
    suite: CipherSuite,
}

impl DcApiDispatcher {
    pub fn new(presentment: Arc<Iso18013Presentment>, suite: CipherSuite) -> Self {
        Self { presentment, suite }
    }

    pub fn with_default_suite(presentment: Arc<Iso18013Presentment>) -> Self {
        Self::new(presentment, DEFAULT_CIPHER_SUITE)
    }

    /// Handles one DC API request/response round trip. `origin` is the calling page's origin, as
    /// supplied by the platform (never trust a value carried inside the request itself).
    #[tracing::instrument(skip_all)]
    pub async fn dispatch(&self, envelope_json: &[u8], model: &PresentmentModel, origin: &str) -> Result<Vec<u8>> {
        let envelope: RequestEnvelope = serde_json::from_slice(envelope_json).map_err(|e| DcApiError::MalformedEnvelope(e.to_string()))?;
        let protocol = Protocol::parse(&envelope.protocol)?;

        if protocol.is_signed_request() {
            let compact = envelope
                .data
                .as_str()
                .ok_or_else(|| DcApiError::MalformedEnvelope("signed request `data` must be a JWS string".to_owned()))?;
            jws::verify_signed_request(compact)?;
        }

        match protocol {
            Protocol::IsoMdoc => self.dispatch_iso_mdoc(envelope.data, model, origin).await,
            Protocol::OpenId4Vp | Protocol::OpenId4VpV1Signed | Protocol::OpenId4VpV1Unsigned => {
                tracing::debug!(protocol = %envelope.protocol, "openid4vp dispatch requested but out of scope");
                Err(DcApiError::UnsupportedProtocol(envelope.protocol))
            }
        }
    }

    async fn dispatch_iso_mdoc(&self, data: serde_json::Value, model: &PresentmentModel, origin: &str) -> Result<Vec<u8>> {
        let request_data: IsoMdocRequestData = serde_json::from_value(data).map_err(|e| DcApiError::MalformedEnvelope(e.to_string()))?;
        let device_request_bytes = decode_base64url("data.deviceRequest", &request_data.device_request)?;
        let encryption_info_bytes = decode_base64url("data.encryptionInfo", &request_data.encryption_info)?;

        let transcript = build_session_transcript(&encryption_info_bytes, origin)?;
        let device_request: DeviceRequest = cbor::cbor_deserialize(&device_request_bytes)?;
        let encryption_info: EncryptionInfo = cbor::cbor_deserialize(&encryption_info_bytes)?;
        let recipient_public_key = EcPublicKey::from_cose_key(&encryption_parameters(&encryption_info).recipient_public_key)?;

        // No device-engagement-derived reader key exists in this flow, so device authentication
        // always falls back to signature mode (§4.12's MAC mode needs a reader ephemeral key).
        let (response, used_credentials) = self.presentment.process_request(&transcript, &device_request, model, None).await?;
        let response_bytes = cbor::cbor_serialize(&response)?;

        let (enc, mut context) = crypto::hpke::setup_sender(self.suite, &recipient_public_key, b"")?;
        let cipher_text = context.seal(b"", &response_bytes)?;

        // §5: increment only once the HPKE seal (this flow's "encryption") has actually succeeded.
        self.presentment.commit_usage(&used_credentials)?;

        let wrapped = ciborium::value::Value::Array(vec![
            ciborium::value::Value::Text("dcapi".to_owned()),
            ciborium::value::Value::Map(vec![
                (ciborium::value::Value::Text("enc".to_owned()), ciborium::value::Value::Bytes(enc)),
                (ciborium::value::Value::Text("cipherText".to_owned()), ciborium::value::Value::Bytes(cipher_text)),
            ]),
        ]);
        let wrapped_bytes = cbor::cbor_serialize(&wrapped)?;

        let response_envelope = ResponseEnvelope {
            protocol: "org.iso.mdoc".to_owned(),
            data: ResponseData { response: encode_base64url(&wrapped_bytes) },
        };
        serde_json::to_vec(&response_envelope).map_err(|e| DcApiError::MalformedEnvelope(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_suite_matches_spec() {
        assert_eq!(DEFAULT_CIPHER_SUITE.kem, KemAlgorithm::DhkemP256);
        assert_eq!(DEFAULT_CIPHER_SUITE.aead, HpkeAeadAlgorithm::Aes128Gcm);
    }
}
