//! COSE_Sign1 construction and verification (§4.5), built on `coset` rather than hand-rolling the
//! header/signature-structure bookkeeping RFC 8152 already specifies precisely.

use coset::iana;
use coset::CborSerializable;
use coset::CoseMac0;
use coset::CoseMac0Builder;
use coset::CoseSign1;
use coset::CoseSign1Builder;
use coset::Header;
use coset::HeaderBuilder;

use crate::error::CborError;
use crate::error::Result;

/// Map one of this workspace's signature algorithms onto the COSE algorithm identifier used in
/// the protected header (`alg`, label 1).
pub fn cose_algorithm(alg: crypto::sign::SignatureAlgorithm) -> iana::Algorithm {
    match alg {
        crypto::sign::SignatureAlgorithm::Es256 => iana::Algorithm::ES256,
        crypto::sign::SignatureAlgorithm::Es384 => iana::Algorithm::ES384,
        crypto::sign::SignatureAlgorithm::Es512 => iana::Algorithm::ES512,
        crypto::sign::SignatureAlgorithm::Ed25519 => iana::Algorithm::EdDSA,
        crypto::sign::SignatureAlgorithm::Ed448 => iana::Algorithm::EdDSA,
    }
}

/// Build a `COSE_Sign1` over `payload`, signing the RFC 8152 `Sig_structure` (`"Signature1"`,
/// protected headers, `external_aad`, payload) with `sign_fn`.
pub fn sign_cose1(
    alg: iana::Algorithm,
    unprotected: Header,
    payload: Vec<u8>,
    external_aad: &[u8],
    sign_fn: impl FnOnce(&[u8]) -> Vec<u8>,
) -> CoseSign1 {
    let protected = HeaderBuilder::new().algorithm(alg).build();
    CoseSign1Builder::new()
        .protected(protected)
        .unprotected(unprotected)
        .payload(payload)
        .create_signature(external_aad, sign_fn)
        .build()
}

/// Verify a `COSE_Sign1`'s signature over its (protected-header-bound) `Sig_structure`, using
/// `verify_fn` to check the raw signature bytes against the recomputed structure bytes.
pub fn verify_cose1(
    cose: &CoseSign1,
    external_aad: &[u8],
    verify_fn: impl FnOnce(&[u8], &[u8]) -> std::result::Result<(), crypto::CryptoError>,
) -> Result<()> {
    cose.verify_signature(external_aad, verify_fn)
        .map_err(|e| CborError::Cose(format!("{e:?}")))
}

pub fn cose1_to_bytes(cose: &CoseSign1) -> Result<Vec<u8>> {
    cose.clone().to_vec().map_err(|e| CborError::Cose(e.to_string()))
}

pub fn cose1_from_bytes(bytes: &[u8]) -> Result<CoseSign1> {
    CoseSign1::from_slice(bytes).map_err(|e| CborError::Cose(e.to_string()))
}

/// Build a `COSE_Sign1` with its payload detached (left `null` on the wire): the mdoc
/// `deviceSigned`/`issuerAuth` structures sign bytes that are carried separately, not inline, so
/// the signature covers a payload the message itself never repeats.
pub fn sign_cose1_detached(
    alg: iana::Algorithm,
    unprotected: Header,
    detached_payload: &[u8],
    external_aad: &[u8],
    sign_fn: impl FnOnce(&[u8]) -> Vec<u8>,
) -> CoseSign1 {
    let protected = HeaderBuilder::new().algorithm(alg).build();
    CoseSign1Builder::new()
        .protected(protected)
        .unprotected(unprotected)
        .create_detached_signature(detached_payload, external_aad, sign_fn)
        .build()
}

pub fn verify_cose1_detached(
    cose: &CoseSign1,
    detached_payload: &[u8],
    external_aad: &[u8],
    verify_fn: impl FnOnce(&[u8], &[u8]) -> std::result::Result<(), crypto::CryptoError>,
) -> Result<()> {
    cose.verify_detached_signature(detached_payload, external_aad, verify_fn)
        .map_err(|e| CborError::Cose(format!("{e:?}")))
}

/// Build a `COSE_Mac0` with a detached payload, covering the MAC-mode `deviceSigned` structure
/// the same way [`sign_cose1_detached`] covers the signature-mode one.
pub fn mac0_detached(alg: iana::Algorithm, unprotected: Header, detached_payload: &[u8], external_aad: &[u8], mac_fn: impl FnOnce(&[u8]) -> Vec<u8>) -> CoseMac0 {
    let protected = HeaderBuilder::new().algorithm(alg).build();
    CoseMac0Builder::new()
        .protected(protected)
        .unprotected(unprotected)
        .create_detached_tag(detached_payload, external_aad, mac_fn)
        .build()
}

pub fn verify_mac0_detached(
    cose: &CoseMac0,
    detached_payload: &[u8],
    external_aad: &[u8],
    verify_fn: impl FnOnce(&[u8], &[u8]) -> std::result::Result<(), crypto::CryptoError>,
) -> Result<()> {
    cose.verify_detached_tag(detached_payload, external_aad, verify_fn)
        .map_err(|e| CborError::Cose(format!("{e:?}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crypto::keys::EcPrivateKey;
    use crypto::curve::DoubleCoordinateCurve;

    #[test]
    fn sign_and_verify_round_trip() {
        let key = EcPrivateKey::generate(DoubleCoordinateCurve::P256).unwrap();
        let public = key.public_key();
        let alg = crypto::sign::SignatureAlgorithm::Es256;

        let cose = sign_cose1(cose_algorithm(alg), Header::default(), b"payload".to_vec(), b"", |data| {
            crypto::sign::sign(&key, alg, data).unwrap()
        });

        verify_cose1(&cose, b"", |sig, data| crypto::sign::check_signature(&public, data, alg, sig)).unwrap();
    }

    #[test]
    fn tampered_payload_fails_verification() {
        let key = EcPrivateKey::generate(DoubleCoordinateCurve::P256).unwrap();
        let public = key.public_key();
        let alg = crypto::sign::SignatureAlgorithm::Es256;

        let mut cose = sign_cose1(cose_algorithm(alg), Header::default(), b"payload".to_vec(), b"", |data| {
            crypto::sign::sign(&key, alg, data).unwrap()
        });
        cose.payload = Some(b"tampered".to_vec());

        let result = verify_cose1(&cose, b"", |sig, data| crypto::sign::check_signature(&public, data, alg, sig));
        assert!(result.is_err());
    }
}
