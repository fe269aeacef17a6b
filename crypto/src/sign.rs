use ed25519_dalek::Signer as _;
use ed25519_dalek::Verifier as _;
use signature::Signer as _;
use signature::Verifier as _;

use crate::error::CryptoError;
use crate::error::Result;
use crate::keys::EcPrivateKey;
use crate::keys::EcPublicKey;

/// Signature algorithms (§4.1). Each only applies to the curve it names: `ES256` signs with a
/// P-256 key and so on, `EdDSA` variants sign with the matching OKP curve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureAlgorithm {
    Es256,
    Es384,
    Es512,
    Ed25519,
    Ed448,
}

impl SignatureAlgorithm {
    /// COSE `alg` header values (RFC 8152 §8.1, RFC 8230).
    pub const fn cose_alg(self) -> i64 {
        match self {
            Self::Es256 => -7,
            Self::Es384 => -35,
            Self::Es512 => -36,
            Self::Ed25519 => -8,
            Self::Ed448 => -8, // EdDSA is a single COSE alg; curve disambiguates (RFC 8152 §8.2).
        }
    }
}

/// Sign `msg` with `key` using `alg`. `alg` must match the key's curve. ECDSA signatures are
/// DER-encoded (a `SEQUENCE` of two unsigned `INTEGER`s); Ed25519/Ed448 signatures are the raw
/// `R‖S` concatenation.
pub fn sign(key: &EcPrivateKey, alg: SignatureAlgorithm, msg: &[u8]) -> Result<Vec<u8>> {
    match (key, alg) {
        (EcPrivateKey::DoubleCoordinate(d), SignatureAlgorithm::Es256) => {
            let signing_key: p256::ecdsa::SigningKey = d.try_into()?;
            let sig: p256::ecdsa::Signature = signing_key.try_sign(msg).map_err(|_| CryptoError::SignatureVerification)?;
            Ok(sig.to_der().as_bytes().to_vec())
        }
        (EcPrivateKey::DoubleCoordinate(d), SignatureAlgorithm::Es384) => {
            let signing_key: p384::ecdsa::SigningKey = d.try_into()?;
            let sig: p384::ecdsa::Signature = signing_key.try_sign(msg).map_err(|_| CryptoError::SignatureVerification)?;
            Ok(sig.to_der().as_bytes().to_vec())
        }
        (EcPrivateKey::DoubleCoordinate(d), SignatureAlgorithm::Es512) => {
            let signing_key: p521::ecdsa::SigningKey = d.try_into()?;
            let sig: p521::ecdsa::Signature = signing_key.try_sign(msg).map_err(|_| CryptoError::SignatureVerification)?;
            Ok(sig.to_der().as_bytes().to_vec())
        }
        (EcPrivateKey::Okp(o), SignatureAlgorithm::Ed25519) => {
            let signing_key: ed25519_dalek::SigningKey = o.try_into()?;
            Ok(signing_key.sign(msg).to_bytes().to_vec())
        }
        (EcPrivateKey::Okp(o), SignatureAlgorithm::Ed448) => {
            let signing_key: ed448_goldilocks::SigningKey = o.try_into()?;
            Ok(signing_key.sign(msg).to_bytes().to_vec())
        }
        _ => Err(CryptoError::UnsupportedAlgorithm(format!(
            "{alg:?} does not apply to this key's curve"
        ))),
    }
}

/// Verify `signature` over `msg` under `alg`, failing with [`CryptoError::SignatureVerification`]
/// on mismatch (§8: "flipping any bit ... causes verification to fail").
pub fn check_signature(key: &EcPublicKey, msg: &[u8], alg: SignatureAlgorithm, signature: &[u8]) -> Result<()> {
    match (key, alg) {
        (EcPublicKey::DoubleCoordinate(d), SignatureAlgorithm::Es256) => {
            let verifying_key: p256::ecdsa::VerifyingKey = d.try_into()?;
            let sig = p256::ecdsa::Signature::from_der(signature).map_err(|_| CryptoError::SignatureVerification)?;
            verifying_key.verify(msg, &sig).map_err(|_| CryptoError::SignatureVerification)
        }
        (EcPublicKey::DoubleCoordinate(d), SignatureAlgorithm::Es384) => {
            let verifying_key: p384::ecdsa::VerifyingKey = d.try_into()?;
            let sig = p384::ecdsa::Signature::from_der(signature).map_err(|_| CryptoError::SignatureVerification)?;
            verifying_key.verify(msg, &sig).map_err(|_| CryptoError::SignatureVerification)
        }
        (EcPublicKey::DoubleCoordinate(d), SignatureAlgorithm::Es512) => {
            let verifying_key: p521::ecdsa::VerifyingKey = d.try_into()?;
            let sig = p521::ecdsa::Signature::from_der(signature).map_err(|_| CryptoError::SignatureVerification)?;
            verifying_key.verify(msg, &sig).map_err(|_| CryptoError::SignatureVerification)
        }
        (EcPublicKey::Okp(o), SignatureAlgorithm::Ed25519) => {
            let verifying_key: ed25519_dalek::VerifyingKey = o.try_into()?;
            let sig_bytes: [u8; 64] = signature
                .try_into()
                .map_err(|_| CryptoError::SignatureVerification)?;
            verifying_key
                .verify(msg, &ed25519_dalek::Signature::from_bytes(&sig_bytes))
                .map_err(|_| CryptoError::SignatureVerification)
        }
        (EcPublicKey::Okp(o), SignatureAlgorithm::Ed448) => {
            let verifying_key: ed448_goldilocks::VerifyingKey = o.try_into()?;
            let sig = ed448_goldilocks::Signature::try_from(signature).map_err(|_| CryptoError::SignatureVerification)?;
            verifying_key.verify(msg, &sig).map_err(|_| CryptoError::SignatureVerification)
        }
        _ => Err(CryptoError::UnsupportedAlgorithm(format!(
            "{alg:?} does not apply to this key's curve"
        ))),
    }
}

/// Verify `signature` over `msg` under `alg`, where `signature` is the fixed-width `R‖S`
/// concatenation RFC 7518 §3.4 uses for JWS ECDSA (as opposed to the DER `SEQUENCE` [`check_signature`]
/// expects). Ed25519/Ed448 are already raw in both callers, so they delegate to [`check_signature`].
pub fn check_signature_fixed_width(key: &EcPublicKey, msg: &[u8], alg: SignatureAlgorithm, signature: &[u8]) -> Result<()> {
    match (key, alg) {
        (EcPublicKey::DoubleCoordinate(d), SignatureAlgorithm::Es256) => {
            let verifying_key: p256::ecdsa::VerifyingKey = d.try_into()?;
            let sig = p256::ecdsa::Signature::from_slice(signature).map_err(|_| CryptoError::SignatureVerification)?;
            verifying_key.verify(msg, &sig).map_err(|_| CryptoError::SignatureVerification)
        }
        (EcPublicKey::DoubleCoordinate(d), SignatureAlgorithm::Es384) => {
            let verifying_key: p384::ecdsa::VerifyingKey = d.try_into()?;
            let sig = p384::ecdsa::Signature::from_slice(signature).map_err(|_| CryptoError::SignatureVerification)?;
            verifying_key.verify(msg, &sig).map_err(|_| CryptoError::SignatureVerification)
        }
        (EcPublicKey::DoubleCoordinate(d), SignatureAlgorithm::Es512) => {
            let verifying_key: p521::ecdsa::VerifyingKey = d.try_into()?;
            let sig = p521::ecdsa::Signature::from_slice(signature).map_err(|_| CryptoError::SignatureVerification)?;
            verifying_key.verify(msg, &sig).map_err(|_| CryptoError::SignatureVerification)
        }
        (EcPublicKey::Okp(_), SignatureAlgorithm::Ed25519 | SignatureAlgorithm::Ed448) => check_signature(key, msg, alg, signature),
        _ => Err(CryptoError::UnsupportedAlgorithm(format!(
            "{alg:?} does not apply to this key's curve"
        ))),
    }
}

/// Generate a fresh EC private key on `curve` using a cryptographically secure RNG (§4.1,
/// §5: "Calls to createEcPrivateKey ... must use a cryptographically secure source").
pub fn create_ec_private_key(curve: crate::curve::DoubleCoordinateCurve) -> Result<EcPrivateKey> {
    EcPrivateKey::generate(curve)
}

/// ECDH key agreement between `private_key` and `other_public_key`. Both keys must be on the
/// same key-agreement-capable curve (all double-coordinate curves, plus OKP X25519/X448).
pub fn key_agreement(private_key: &EcPrivateKey, other_public_key: &EcPublicKey) -> Result<Vec<u8>> {
    match (private_key, other_public_key) {
        (EcPrivateKey::DoubleCoordinate(d_priv), EcPublicKey::DoubleCoordinate(d_pub)) if d_priv.curve == d_pub.curve => {
            d_priv.diffie_hellman(d_pub)
        }
        (EcPrivateKey::Okp(o_priv), EcPublicKey::Okp(o_pub))
            if o_priv.curve == crate::curve::OkpCurve::X25519 && o_pub.curve == crate::curve::OkpCurve::X25519 =>
        {
            let secret: x25519_dalek::StaticSecret = o_priv.try_into()?;
            let public: x25519_dalek::PublicKey = o_pub.try_into()?;
            Ok(secret.diffie_hellman(&public).as_bytes().to_vec())
        }
        _ => Err(CryptoError::IncompatibleKeyAgreement),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::curve::DoubleCoordinateCurve;
    use crate::curve::OkpCurve;
    use crate::keys::EcPrivateKey;

    #[test]
    fn es256_sign_verify_round_trip() {
        let key = EcPrivateKey::generate(DoubleCoordinateCurve::P256).unwrap();
        let sig = sign(&key, SignatureAlgorithm::Es256, b"message").unwrap();
        check_signature(&key.public_key(), b"message", SignatureAlgorithm::Es256, &sig).unwrap();
    }

    #[test]
    fn es256_flipped_bit_fails_verification() {
        let key = EcPrivateKey::generate(DoubleCoordinateCurve::P256).unwrap();
        let mut sig = sign(&key, SignatureAlgorithm::Es256, b"message").unwrap();
        let last = sig.len() - 1;
        sig[last] ^= 0x01;
        assert!(matches!(
            check_signature(&key.public_key(), b"message", SignatureAlgorithm::Es256, &sig),
            Err(CryptoError::SignatureVerification)
        ));
    }

    #[test]
    fn ed25519_sign_verify_round_trip() {
        let key = EcPrivateKey::generate_okp(OkpCurve::Ed25519).unwrap();
        let sig = sign(&key, SignatureAlgorithm::Ed25519, b"message").unwrap();
        assert_eq!(sig.len(), 64);
        check_signature(&key.public_key(), b"message", SignatureAlgorithm::Ed25519, &sig).unwrap();
    }

    #[test]
    fn mismatched_algorithm_and_curve_is_rejected() {
        let key = EcPrivateKey::generate(DoubleCoordinateCurve::P384).unwrap();
        assert!(matches!(
            sign(&key, SignatureAlgorithm::Es256, b"message"),
            Err(CryptoError::UnsupportedAlgorithm(_))
        ));
    }

    #[test]
    fn key_agreement_round_trip() {
        let alice = EcPrivateKey::generate(DoubleCoordinateCurve::P256).unwrap();
        let bob = EcPrivateKey::generate(DoubleCoordinateCurve::P256).unwrap();
        let shared_a = key_agreement(&alice, &bob.public_key()).unwrap();
        let shared_b = key_agreement(&bob, &alice.public_key()).unwrap();
        assert_eq!(shared_a, shared_b);
    }
}
