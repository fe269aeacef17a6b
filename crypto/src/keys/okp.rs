use pkcs8::DecodePrivateKey;
use pkcs8::EncodePrivateKey;

use crate::curve::OkpCurve;
use crate::error::CryptoError;
use crate::error::Result;

/// An Octet Key Pair public key: `{curve, x}` (§3). `x` is the raw public key encoding for the
/// curve (32 bytes for Ed25519/X25519, 57 for Ed448, 56 for X448).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OkpPublicKey {
    pub curve: OkpCurve,
    pub x: Vec<u8>,
}

/// An Octet Key Pair private key: `{curve, x, d}` (§3). `d` is the raw seed/scalar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OkpPrivateKey {
    pub curve: OkpCurve,
    pub x: Vec<u8>,
    pub d: Vec<u8>,
}

fn check_len(curve: OkpCurve, field: &str, bytes: &[u8]) -> Result<()> {
    let expected = curve.key_size();
    if bytes.len() != expected {
        return Err(CryptoError::InvalidEncoding(format!(
            "{field} has length {}, expected {expected} for {curve:?}",
            bytes.len()
        )));
    }
    Ok(())
}

impl OkpPublicKey {
    pub fn new(curve: OkpCurve, x: Vec<u8>) -> Result<Self> {
        check_len(curve, "x", &x)?;
        Ok(Self { curve, x })
    }
}

impl OkpPrivateKey {
    pub fn public_key(&self) -> OkpPublicKey {
        OkpPublicKey {
            curve: self.curve,
            x: self.x.clone(),
        }
    }

    /// Generate a fresh key pair on `curve` using a cryptographically secure RNG.
    pub fn generate(curve: OkpCurve) -> Result<Self> {
        match curve {
            OkpCurve::Ed25519 => {
                let signing_key = ed25519_dalek::SigningKey::generate(&mut rand_core::OsRng);
                Ok(Self {
                    curve,
                    x: signing_key.verifying_key().to_bytes().to_vec(),
                    d: signing_key.to_bytes().to_vec(),
                })
            }
            OkpCurve::Ed448 => {
                let signing_key = ed448_goldilocks::SigningKey::generate(&mut rand_core::OsRng);
                Ok(Self {
                    curve,
                    x: signing_key.verifying_key().to_bytes().to_vec(),
                    d: signing_key.to_bytes().to_vec(),
                })
            }
            OkpCurve::X25519 => {
                let secret = x25519_dalek::StaticSecret::random_from_rng(rand_core::OsRng);
                let public = x25519_dalek::PublicKey::from(&secret);
                Ok(Self {
                    curve,
                    x: public.as_bytes().to_vec(),
                    d: secret.to_bytes().to_vec(),
                })
            }
            OkpCurve::X448 => Err(CryptoError::UnsupportedAlgorithm(
                "X448 has no wired-up arithmetic backend".to_owned(),
            )),
        }
    }

    /// PKCS#8 PEM encoding. Only Ed25519 is supported; the others have no PKCS#8 backend wired up.
    pub fn to_pkcs8_pem(&self) -> Result<String> {
        match self.curve {
            OkpCurve::Ed25519 => {
                let signing_key: ed25519_dalek::SigningKey = self.try_into()?;
                signing_key
                    .to_pkcs8_pem(Default::default())
                    .map(|pem| pem.to_string())
                    .map_err(|e| CryptoError::InvalidEncoding(format!("failed to encode PKCS8 PEM: {e}")))
            }
            _ => Err(CryptoError::UnsupportedAlgorithm(format!("{:?} has no PEM backend", self.curve))),
        }
    }

    pub fn from_pkcs8_pem(curve: OkpCurve, pem: &str) -> Result<Self> {
        match curve {
            OkpCurve::Ed25519 => {
                let signing_key = ed25519_dalek::SigningKey::from_pkcs8_pem(pem)
                    .map_err(|e| CryptoError::InvalidEncoding(format!("invalid PKCS8 PEM: {e}")))?;
                Ok(Self {
                    curve,
                    x: signing_key.verifying_key().to_bytes().to_vec(),
                    d: signing_key.to_bytes().to_vec(),
                })
            }
            _ => Err(CryptoError::UnsupportedAlgorithm(format!("{curve:?} has no PEM backend"))),
        }
    }
}

impl TryFrom<&OkpPrivateKey> for ed25519_dalek::SigningKey {
    type Error = CryptoError;

    fn try_from(key: &OkpPrivateKey) -> Result<Self> {
        if key.curve != OkpCurve::Ed25519 {
            return Err(CryptoError::UnsupportedAlgorithm(format!("expected Ed25519, got {:?}", key.curve)));
        }
        let seed: [u8; 32] = key
            .d
            .clone()
            .try_into()
            .map_err(|_| CryptoError::InvalidEncoding("Ed25519 seed must be 32 bytes".to_owned()))?;
        Ok(Self::from_bytes(&seed))
    }
}

impl TryFrom<&OkpPublicKey> for ed25519_dalek::VerifyingKey {
    type Error = CryptoError;

    fn try_from(key: &OkpPublicKey) -> Result<Self> {
        if key.curve != OkpCurve::Ed25519 {
            return Err(CryptoError::UnsupportedAlgorithm(format!("expected Ed25519, got {:?}", key.curve)));
        }
        let bytes: [u8; 32] = key
            .x
            .clone()
            .try_into()
            .map_err(|_| CryptoError::InvalidEncoding("Ed25519 public key must be 32 bytes".to_owned()))?;
        Self::from_bytes(&bytes).map_err(|_| CryptoError::InvalidEncoding("invalid Ed25519 point".to_owned()))
    }
}

impl TryFrom<&OkpPrivateKey> for ed448_goldilocks::SigningKey {
    type Error = CryptoError;

    fn try_from(key: &OkpPrivateKey) -> Result<Self> {
        if key.curve != OkpCurve::Ed448 {
            return Err(CryptoError::UnsupportedAlgorithm(format!("expected Ed448, got {:?}", key.curve)));
        }
        let seed: [u8; 57] = key
            .d
            .clone()
            .try_into()
            .map_err(|_| CryptoError::InvalidEncoding("Ed448 seed must be 57 bytes".to_owned()))?;
        Ok(Self::from_bytes(&seed))
    }
}

impl TryFrom<&OkpPublicKey> for ed448_goldilocks::VerifyingKey {
    type Error = CryptoError;

    fn try_from(key: &OkpPublicKey) -> Result<Self> {
        if key.curve != OkpCurve::Ed448 {
            return Err(CryptoError::UnsupportedAlgorithm(format!("expected Ed448, got {:?}", key.curve)));
        }
        Self::try_from(key.x.as_slice()).map_err(|_| CryptoError::InvalidEncoding("invalid Ed448 point".to_owned()))
    }
}

impl TryFrom<&OkpPrivateKey> for x25519_dalek::StaticSecret {
    type Error = CryptoError;

    fn try_from(key: &OkpPrivateKey) -> Result<Self> {
        if key.curve != OkpCurve::X25519 {
            return Err(CryptoError::UnsupportedAlgorithm(format!("expected X25519, got {:?}", key.curve)));
        }
        let bytes: [u8; 32] = key
            .d
            .clone()
            .try_into()
            .map_err(|_| CryptoError::InvalidEncoding("X25519 secret must be 32 bytes".to_owned()))?;
        Ok(Self::from(bytes))
    }
}

impl TryFrom<&OkpPublicKey> for x25519_dalek::PublicKey {
    type Error = CryptoError;

    fn try_from(key: &OkpPublicKey) -> Result<Self> {
        if key.curve != OkpCurve::X25519 {
            return Err(CryptoError::UnsupportedAlgorithm(format!("expected X25519, got {:?}", key.curve)));
        }
        let bytes: [u8; 32] = key
            .x
            .clone()
            .try_into()
            .map_err(|_| CryptoError::InvalidEncoding("X25519 public key must be 32 bytes".to_owned()))?;
        Ok(Self::from(bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ed25519_pem_round_trip() {
        let key = OkpPrivateKey::generate(OkpCurve::Ed25519).unwrap();
        let pem = key.to_pkcs8_pem().unwrap();
        let back = OkpPrivateKey::from_pkcs8_pem(OkpCurve::Ed25519, &pem).unwrap();
        assert_eq!(key, back);
    }

    #[test]
    fn x25519_key_sizes() {
        let key = OkpPrivateKey::generate(OkpCurve::X25519).unwrap();
        assert_eq!(key.x.len(), 32);
        assert_eq!(key.d.len(), 32);
    }

    #[test]
    fn x448_has_no_arithmetic_backend() {
        assert!(matches!(
            OkpPrivateKey::generate(OkpCurve::X448),
            Err(CryptoError::UnsupportedAlgorithm(_))
        ));
    }
}
