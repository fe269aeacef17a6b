//! Minimal compact-JWS verification (RFC 7515) for the DC API's signed-request variant (§4.13):
//! only what's needed to check a request's `x5c`-carried signature, not general JOSE processing.

use serde::Deserialize;

use crate::envelope::decode_base64url;
use crate::error::DcApiError;
use crate::error::Result;

#[derive(Debug, Deserialize)]
struct JwsHeader {
    alg: String,
    x5c: Vec<String>,
}

/// Verifies a compact JWS (`header.payload.signature`, each base64url without padding) against
/// the leaf of its own `x5c` header, after validating the chain. Returns the decoded payload
/// bytes on success.
pub fn verify_signed_request(compact: &str) -> Result<Vec<u8>> {
    let parts: Vec<&str> = compact.split('.').collect();
    if parts.len() != 3 {
        return Err(DcApiError::MalformedEnvelope("expected a three-part compact JWS".to_owned()));
    }
    let (header_part, payload_part, signature_part) = (parts[0], parts[1], parts[2]);

    let header_bytes = decode_base64url("jws.header", header_part)?;
    let header: JwsHeader = serde_json::from_slice(&header_bytes).map_err(|e| DcApiError::MalformedEnvelope(e.to_string()))?;
    let alg = signature_algorithm_from_jws(&header.alg).ok_or(DcApiError::JwsVerification)?;

    let chain = x509::CertificateChain::from_x5c(&header.x5c).map_err(|_| DcApiError::JwsVerification)?;
    chain.validate()?;
    let leaf_public_key = chain.leaf().public_key()?;

    let signature = decode_base64url("jws.signature", signature_part)?;
    let signing_input = format!("{header_part}.{payload_part}");
    crypto::sign::check_signature_fixed_width(&leaf_public_key, signing_input.as_bytes(), alg, &signature).map_err(|_| DcApiError::JwsVerification)?;

    decode_base64url("jws.payload", payload_part)
}

fn signature_algorithm_from_jws(alg: &str) -> Option<crypto::sign::SignatureAlgorithm> {
    match alg {
        "ES256" => Some(crypto::sign::SignatureAlgorithm::Es256),
        "ES384" => Some(crypto::sign::SignatureAlgorithm::Es384),
        "ES512" => Some(crypto::sign::SignatureAlgorithm::Es512),
        "EdDSA" => Some(crypto::sign::SignatureAlgorithm::Ed25519),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_compact_jws_is_rejected() {
        let result = verify_signed_request("not-a-jws");
        assert!(matches!(result, Err(DcApiError::MalformedEnvelope(_))));
    }

    #[test]
    fn unknown_algorithm_is_rejected() {
        let header = serde_json::json!({"alg": "none", "x5c": Vec::<String>::new()});
        let header_b64 = crate::envelope::encode_base64url(header.to_string().as_bytes());
        let compact = format!("{header_b64}.cGF5bG9hZA.c2ln");
        let result = verify_signed_request(&compact);
        assert!(matches!(result, Err(DcApiError::JwsVerification)));
    }
}
