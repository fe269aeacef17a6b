//! HMAC-based Key Derivation Function (RFC 5869), used both directly (§4.2) and as the building
//! block for HPKE's `KeySchedule` (§4.3).

use hkdf::Hkdf;
use sha2::Sha256;
use sha2::Sha384;
use sha2::Sha512;

use crate::digest::DigestAlgorithm;
use crate::error::CryptoError;
use crate::error::Result;

/// `HKDF-Extract` then `HKDF-Expand` in one call, producing `length` bytes of output keying
/// material. Fails with [`CryptoError::HkdfLengthTooLarge`] if `length > 255 * hash_len`
/// (RFC 5869 §2.3).
pub fn hkdf(alg: DigestAlgorithm, salt: &[u8], ikm: &[u8], info: &[u8], length: usize) -> Result<Vec<u8>> {
    let max_len = 255 * alg.output_len();
    if length > max_len {
        return Err(CryptoError::HkdfLengthTooLarge(length));
    }
    let mut okm = vec![0u8; length];
    match alg {
        DigestAlgorithm::Sha256 => {
            let (_, hk) = Hkdf::<Sha256>::extract(Some(salt), ikm);
            hk.expand(info, &mut okm)
        }
        DigestAlgorithm::Sha384 => {
            let (_, hk) = Hkdf::<Sha384>::extract(Some(salt), ikm);
            hk.expand(info, &mut okm)
        }
        DigestAlgorithm::Sha512 => {
            let (_, hk) = Hkdf::<Sha512>::extract(Some(salt), ikm);
            hk.expand(info, &mut okm)
        }
    }
    .map_err(|_| CryptoError::HkdfLengthTooLarge(length))?;
    Ok(okm)
}

/// `HKDF-Extract` alone, returning the pseudorandom key.
pub fn hkdf_extract(alg: DigestAlgorithm, salt: &[u8], ikm: &[u8]) -> Vec<u8> {
    match alg {
        DigestAlgorithm::Sha256 => Hkdf::<Sha256>::extract(Some(salt), ikm).0.to_vec(),
        DigestAlgorithm::Sha384 => Hkdf::<Sha384>::extract(Some(salt), ikm).0.to_vec(),
        DigestAlgorithm::Sha512 => Hkdf::<Sha512>::extract(Some(salt), ikm).0.to_vec(),
    }
}

/// `HKDF-Expand` alone, given an already-extracted pseudorandom key.
pub fn hkdf_expand(alg: DigestAlgorithm, prk: &[u8], info: &[u8], length: usize) -> Result<Vec<u8>> {
    let max_len = 255 * alg.output_len();
    if length > max_len {
        return Err(CryptoError::HkdfLengthTooLarge(length));
    }
    let mut okm = vec![0u8; length];
    match alg {
        DigestAlgorithm::Sha256 => Hkdf::<Sha256>::from_prk(prk).map_err(|_| CryptoError::InvalidEncoding("prk too short".to_owned()))?.expand(info, &mut okm),
        DigestAlgorithm::Sha384 => Hkdf::<Sha384>::from_prk(prk).map_err(|_| CryptoError::InvalidEncoding("prk too short".to_owned()))?.expand(info, &mut okm),
        DigestAlgorithm::Sha512 => Hkdf::<Sha512>::from_prk(prk).map_err(|_| CryptoError::InvalidEncoding("prk too short".to_owned()))?.expand(info, &mut okm),
    }
    .map_err(|_| CryptoError::HkdfLengthTooLarge(length))?;
    Ok(okm)
}

#[cfg(test)]
mod tests {
    use super::*;

    // RFC 5869 test case 1.
    #[test]
    fn rfc5869_test_case_1() {
        let ikm = hex::decode("0b0b0b0b0b0b0b0b0b0b0b0b0b0b0b0b0b0b0b0b0b0b").unwrap();
        let salt = hex::decode("000102030405060708090a0b0c").unwrap();
        let info = hex::decode("f0f1f2f3f4f5f6f7f8f9").unwrap();
        let okm = hkdf(DigestAlgorithm::Sha256, &salt, &ikm, &info, 42).unwrap();
        assert_eq!(
            hex::encode(okm),
            "3cb25f25faacd57a90434f64d0362f2a2d2d0a90cf1a5a4c5db02d56ecc4c5bf34007208d5b887185865"
        );
    }

    #[test]
    fn length_over_limit_is_rejected() {
        assert!(matches!(
            hkdf(DigestAlgorithm::Sha256, &[], &[], &[], 255 * 32 + 1),
            Err(CryptoError::HkdfLengthTooLarge(_))
        ));
    }
}
