//! Synthetic `SessionTranscript` construction for the W3C Digital Credentials API (§4.13, §6):
//! with no real device engagement or reader-key exchange to anchor the transcript, the
//! `encryptionInfo` blob and calling origin stand in for both.

use cbor::wrappers::RequiredValue;
use mdoc_core::session::SessionTranscript;
use mdoc_core::session::SessionTranscriptKeyed;
use serde::Deserialize;
use serde::Serialize;

cbor::const_cbor_string!(DcApiString, "dcapi");

/// `EncryptionInfo = ["dcapi", {nonce, recipientPublicKey}]`: the reader's ephemeral HPKE
/// recipient key plus a per-request nonce, carried alongside the wrapped `DeviceRequest`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncryptionParameters {
    pub nonce: serde_bytes::ByteBuf,
    pub recipient_public_key: ciborium::value::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct EncryptionInfoKeyed {
    kind: RequiredValue<DcApiString>,
    parameters: EncryptionParameters,
}

pub type EncryptionInfo = cbor::CborSeq<EncryptionInfoKeyed>;

pub fn encryption_parameters(encryption_info: &EncryptionInfo) -> &EncryptionParameters {
    &encryption_info.0.parameters
}

/// `SessionTranscript = [null, null, ["dcapi", SHA-256(CBOR([encryptionInfo, origin]))]]` (§4.13).
pub fn build_session_transcript(encryption_info_bytes: &[u8], origin: &str) -> crate::error::Result<SessionTranscript> {
    let encryption_info_value: ciborium::value::Value = cbor::cbor_deserialize(encryption_info_bytes)?;
    let hashed = ciborium::value::Value::Array(vec![encryption_info_value, ciborium::value::Value::Text(origin.to_owned())]);
    let hashed_bytes = cbor::cbor_serialize(&hashed)?;
    let digest = crypto::digest::digest(crypto::digest::DigestAlgorithm::Sha256, &hashed_bytes);

    let handover = ciborium::value::Value::Array(vec![ciborium::value::Value::Text("dcapi".to_owned()), ciborium::value::Value::Bytes(digest)]);

    Ok(cbor::CborSeq(SessionTranscriptKeyed {
        device_engagement_bytes: None,
        e_reader_key_bytes: None,
        handover,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_encryption_info_bytes() -> Vec<u8> {
        let info = EncryptionInfo(EncryptionInfoKeyed {
            kind: Default::default(),
            parameters: EncryptionParameters {
                nonce: serde_bytes::ByteBuf::from(vec![1, 2, 3]),
                recipient_public_key: ciborium::value::Value::Map(Vec::new()),
            },
        });
        cbor::cbor_serialize(&info).unwrap()
    }

    #[test]
    fn same_inputs_produce_same_transcript() {
        let bytes = sample_encryption_info_bytes();
        let a = build_session_transcript(&bytes, "https://example.test").unwrap();
        let b = build_session_transcript(&bytes, "https://example.test").unwrap();
        assert_eq!(cbor::cbor_serialize(&a).unwrap(), cbor::cbor_serialize(&b).unwrap());
    }

    #[test]
    fn different_origin_changes_transcript() {
        let bytes = sample_encryption_info_bytes();
        let a = build_session_transcript(&bytes, "https://example.test").unwrap();
        let b = build_session_transcript(&bytes, "https://attacker.test").unwrap();
        assert_ne!(cbor::cbor_serialize(&a).unwrap(), cbor::cbor_serialize(&b).unwrap());
    }

    #[test]
    fn encryption_info_round_trips_through_cbor() {
        let bytes = sample_encryption_info_bytes();
        let decoded: EncryptionInfo = cbor::cbor_deserialize(&bytes).unwrap();
        assert_eq!(encryption_parameters(&decoded).nonce.as_ref(), &[1, 2, 3]);
    }
}
