use hmac::Hmac;
use hmac::Mac;
use sha2::Sha384;
use sha2::Sha512;
use sha2::Sha256;

use crate::error::CryptoError;
use crate::error::Result;

/// MAC algorithms (§4.1). Used both standalone and as the `deviceMac` authentication mode for
/// key-agreement-based mdoc credentials (§4.10).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MacAlgorithm {
    HmacSha256,
    HmacSha384,
    HmacSha512,
}

pub fn mac(alg: MacAlgorithm, key: &[u8], msg: &[u8]) -> Result<Vec<u8>> {
    fn run<M: Mac>(key: &[u8], msg: &[u8]) -> Result<Vec<u8>>
    where
        M: hmac::digest::KeyInit,
    {
        let mut mac = M::new_from_slice(key).map_err(|_| CryptoError::InvalidEncoding("invalid HMAC key length".to_owned()))?;
        mac.update(msg);
        Ok(mac.finalize().into_bytes().to_vec())
    }

    match alg {
        MacAlgorithm::HmacSha256 => run::<Hmac<Sha256>>(key, msg),
        MacAlgorithm::HmacSha384 => run::<Hmac<Sha384>>(key, msg),
        MacAlgorithm::HmacSha512 => run::<Hmac<Sha512>>(key, msg),
    }
}

/// Constant-time verification of a MAC tag.
pub fn check_mac(alg: MacAlgorithm, key: &[u8], msg: &[u8], tag: &[u8]) -> Result<()> {
    let expected = mac(alg, key, msg)?;
    if subtle::ConstantTimeEq::ct_eq(expected.as_slice(), tag).into() {
        Ok(())
    } else {
        Err(CryptoError::SignatureVerification)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hmac_sha256_round_trips() {
        let key = b"key material that is long enough";
        let tag = mac(MacAlgorithm::HmacSha256, key, b"hello").unwrap();
        check_mac(MacAlgorithm::HmacSha256, key, b"hello", &tag).unwrap();
        assert!(check_mac(MacAlgorithm::HmacSha256, key, b"world", &tag).is_err());
    }
}
