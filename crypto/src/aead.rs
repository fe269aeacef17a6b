use aes_gcm::aead::Aead;
use aes_gcm::aead::Payload;
use aes_gcm::Aes128Gcm;
use aes_gcm::Aes192Gcm;
use aes_gcm::Nonce;
use aes_gcm::Aes256Gcm;
use aes_gcm::KeyInit;

use crate::error::CryptoError;
use crate::error::Result;

pub const NONCE_LEN: usize = 12;

/// AEAD cipher suites (§4.1). `A128GCM` is also the fixed cipher for mdoc session encryption
/// (§4.8) and `A128GCM`/`A256GCM` back the two HPKE AEADs (§4.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AeadAlgorithm {
    A128Gcm,
    A192Gcm,
    A256Gcm,
}

impl AeadAlgorithm {
    pub const fn key_len(self) -> usize {
        match self {
            Self::A128Gcm => 16,
            Self::A192Gcm => 24,
            Self::A256Gcm => 32,
        }
    }
}

fn check_nonce(nonce: &[u8]) -> Result<()> {
    if nonce.len() != NONCE_LEN {
        return Err(CryptoError::InvalidNonceLength {
            expected: NONCE_LEN,
            actual: nonce.len(),
        });
    }
    Ok(())
}

pub fn encrypt(alg: AeadAlgorithm, key: &[u8], nonce: &[u8], plaintext: &[u8], aad: Option<&[u8]>) -> Result<Vec<u8>> {
    check_nonce(nonce)?;
    let nonce = Nonce::from_slice(nonce);
    let payload = Payload {
        msg: plaintext,
        aad: aad.unwrap_or(&[]),
    };
    match alg {
        AeadAlgorithm::A128Gcm => Aes128Gcm::new_from_slice(key)
            .map_err(|_| CryptoError::InvalidEncoding("invalid AES-128-GCM key length".to_owned()))?
            .encrypt(nonce, payload)
            .map_err(|_| CryptoError::Decrypt),
        AeadAlgorithm::A192Gcm => Aes192Gcm::new_from_slice(key)
            .map_err(|_| CryptoError::InvalidEncoding("invalid AES-192-GCM key length".to_owned()))?
            .encrypt(nonce, payload)
            .map_err(|_| CryptoError::Decrypt),
        AeadAlgorithm::A256Gcm => Aes256Gcm::new_from_slice(key)
            .map_err(|_| CryptoError::InvalidEncoding("invalid AES-256-GCM key length".to_owned()))?
            .encrypt(nonce, payload)
            .map_err(|_| CryptoError::Decrypt),
    }
}

pub fn decrypt(alg: AeadAlgorithm, key: &[u8], nonce: &[u8], ciphertext: &[u8], aad: Option<&[u8]>) -> Result<Vec<u8>> {
    check_nonce(nonce)?;
    let nonce = Nonce::from_slice(nonce);
    let payload = Payload {
        msg: ciphertext,
        aad: aad.unwrap_or(&[]),
    };
    match alg {
        AeadAlgorithm::A128Gcm => Aes128Gcm::new_from_slice(key)
            .map_err(|_| CryptoError::InvalidEncoding("invalid AES-128-GCM key length".to_owned()))?
            .decrypt(nonce, payload)
            .map_err(|_| CryptoError::Decrypt),
        AeadAlgorithm::A192Gcm => Aes192Gcm::new_from_slice(key)
            .map_err(|_| CryptoError::InvalidEncoding("invalid AES-192-GCM key length".to_owned()))?
            .decrypt(nonce, payload)
            .map_err(|_| CryptoError::Decrypt),
        AeadAlgorithm::A256Gcm => Aes256Gcm::new_from_slice(key)
            .map_err(|_| CryptoError::InvalidEncoding("invalid AES-256-GCM key length".to_owned()))?
            .decrypt(nonce, payload)
            .map_err(|_| CryptoError::Decrypt),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips() {
        let key = [0x42u8; 16];
        let nonce = [0x01u8; 12];
        let ct = encrypt(AeadAlgorithm::A128Gcm, &key, &nonce, b"hello world", Some(b"aad")).unwrap();
        let pt = decrypt(AeadAlgorithm::A128Gcm, &key, &nonce, &ct, Some(b"aad")).unwrap();
        assert_eq!(pt, b"hello world");
    }

    #[test]
    fn tag_mismatch_is_rejected() {
        let key = [0x42u8; 16];
        let nonce = [0x01u8; 12];
        let mut ct = encrypt(AeadAlgorithm::A128Gcm, &key, &nonce, b"hello world", None).unwrap();
        *ct.last_mut().unwrap() ^= 0xff;
        assert!(matches!(
            decrypt(AeadAlgorithm::A128Gcm, &key, &nonce, &ct, None),
            Err(CryptoError::Decrypt)
        ));
    }

    #[test]
    fn rejects_wrong_nonce_length() {
        let key = [0x42u8; 16];
        let short_nonce = [0x01u8; 8];
        assert!(matches!(
            encrypt(AeadAlgorithm::A128Gcm, &key, &short_nonce, b"x", None),
            Err(CryptoError::InvalidNonceLength { .. })
        ));
    }
}
