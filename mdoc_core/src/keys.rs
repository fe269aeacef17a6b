//! `AsymmetricKey`/`SigningKey` abstraction (§3, §9): a credential's private key may live as a
//! plain in-memory key or behind a hardware-backed [`SecureArea`], and may be anonymous,
//! `kid`-named, or certified with an `x5c` chain. Callers that just want to sign or do key
//! agreement don't need to know which.

use crypto::keys::EcPrivateKey;
use crypto::keys::EcPublicKey;
use crypto::sign::SignatureAlgorithm;
use crypto::CryptoError;
use x509::CertificateChain;

use crate::error::Result;

/// Capability set a secure area (software, TEE, Secure Enclave, HSM) must provide. Keys are
/// identified by `(secure area, alias)` and never handled as raw key material outside the area
/// that owns them (§9: "Polymorphism over secure areas").
pub trait SecureArea: Send + Sync {
    /// Opaque identifier for this secure area instance (e.g. `"software"`, `"android_strongbox"`).
    fn identifier(&self) -> &str;

    fn create_key(&self, alias: &str, algorithm: SignatureAlgorithm) -> Result<EcPublicKey>;

    fn public_key(&self, alias: &str) -> Result<EcPublicKey>;

    /// Sign `payload` with the key named `alias`. Fails with
    /// [`CryptoError::KeyLocked`]/[`CryptoError::KeyInvalidated`] (wrapped in [`MdocError`]) if
    /// the key needs unlocking or no longer exists.
    fn sign(&self, alias: &str, payload: &[u8]) -> Result<Vec<u8>>;

    /// ECDH key agreement using the key named `alias`, for MAC-mode device authentication.
    fn key_agreement(&self, alias: &str, other_public_key: &EcPublicKey) -> Result<Vec<u8>>;

    fn delete_key(&self, alias: &str) -> Result<()>;
}

/// A named reference to a key in a [`SecureArea`].
#[derive(Debug, Clone)]
pub struct SecureAreaKeyRef {
    pub alias: String,
}

/// Where a [`SigningKey`]'s private key material lives.
pub enum KeyBacking {
    /// The private key is held directly in memory (used by tests and by the software fallback).
    Explicit(EcPrivateKey),
    /// The private key lives in a [`SecureArea`], referenced by alias.
    SecureArea { area: std::sync::Arc<dyn SecureArea>, key_ref: SecureAreaKeyRef },
}

/// How the key's identity is advertised alongside a signature: unadorned, by a `kid`, or with a
/// full certificate chain (§3: `AsymmetricKey` sum type over backing × identity).
pub enum KeyIdentity {
    Anonymous,
    Named { kid: String },
    Certified { chain: CertificateChain },
}

/// A key plus its advertised identity — the unit the mdoc pipeline signs and MACs with.
pub struct SigningKey {
    pub backing: KeyBacking,
    pub identity: KeyIdentity,
    pub algorithm: SignatureAlgorithm,
}

impl SigningKey {
    pub fn explicit(key: EcPrivateKey, algorithm: SignatureAlgorithm, identity: KeyIdentity) -> Self {
        Self { backing: KeyBacking::Explicit(key), identity, algorithm }
    }

    pub fn public_key(&self) -> Result<EcPublicKey> {
        match &self.backing {
            KeyBacking::Explicit(key) => Ok(key.public_key()),
            KeyBacking::SecureArea { area, key_ref } => area.public_key(&key_ref.alias),
        }
    }

    pub fn sign(&self, payload: &[u8]) -> Result<Vec<u8>> {
        match &self.backing {
            KeyBacking::Explicit(key) => Ok(crypto::sign::sign(key, self.algorithm, payload)?),
            KeyBacking::SecureArea { area, key_ref } => area.sign(&key_ref.alias, payload),
        }
    }

    pub fn key_agreement(&self, other_public_key: &EcPublicKey) -> Result<Vec<u8>> {
        match &self.backing {
            KeyBacking::Explicit(key) => Ok(crypto::sign::key_agreement(key, other_public_key)?),
            KeyBacking::SecureArea { area, key_ref } => area.key_agreement(&key_ref.alias, other_public_key),
        }
    }

    pub fn is_key_agreement_capable(&self) -> Result<bool> {
        let capable = match self.public_key()? {
            EcPublicKey::DoubleCoordinate(_) => true,
            EcPublicKey::Okp(o) => matches!(o.curve, crypto::curve::OkpCurve::X25519 | crypto::curve::OkpCurve::X448),
        };
        Ok(capable)
    }
}

/// An in-process software [`SecureArea`]: keys are held in an in-memory map, never locked or
/// invalidated. Used by tests and as the default backing when no hardware secure area is wired
/// up.
pub mod software {
    use std::collections::HashMap;
    use std::sync::RwLock;

    use crypto::curve::DoubleCoordinateCurve;

    use super::*;

    #[derive(Default)]
    pub struct SoftwareSecureArea {
        keys: RwLock<HashMap<String, EcPrivateKey>>,
    }

    impl SoftwareSecureArea {
        pub fn new() -> Self {
            Self::default()
        }
    }

    impl SecureArea for SoftwareSecureArea {
        fn identifier(&self) -> &str {
            "software"
        }

        fn create_key(&self, alias: &str, algorithm: SignatureAlgorithm) -> Result<EcPublicKey> {
            let curve = match algorithm {
                SignatureAlgorithm::Es256 => DoubleCoordinateCurve::P256,
                SignatureAlgorithm::Es384 => DoubleCoordinateCurve::P384,
                SignatureAlgorithm::Es512 => DoubleCoordinateCurve::P521,
                SignatureAlgorithm::Ed25519 | SignatureAlgorithm::Ed448 => {
                    return Err(crate::error::MdocError::Crypto(CryptoError::UnsupportedAlgorithm(
                        "software secure area only issues double-coordinate keys".to_owned(),
                    )))
                }
            };
            let key = EcPrivateKey::generate(curve)?;
            let public = key.public_key();
            self.keys.write().unwrap().insert(alias.to_owned(), key);
            Ok(public)
        }

        fn public_key(&self, alias: &str) -> Result<EcPublicKey> {
            let keys = self.keys.read().unwrap();
            let key = keys.get(alias).ok_or(CryptoError::KeyInvalidated)?;
            Ok(key.public_key())
        }

        fn sign(&self, alias: &str, payload: &[u8]) -> Result<Vec<u8>> {
            let keys = self.keys.read().unwrap();
            let key = keys.get(alias).ok_or(CryptoError::KeyInvalidated)?;
            let alg = match key {
                EcPrivateKey::DoubleCoordinate(d) => match d.curve {
                    DoubleCoordinateCurve::P256 => SignatureAlgorithm::Es256,
                    DoubleCoordinateCurve::P384 => SignatureAlgorithm::Es384,
                    DoubleCoordinateCurve::P521 => SignatureAlgorithm::Es512,
                    _ => return Err(CryptoError::UnsupportedAlgorithm("curve has no signing backend".to_owned()).into()),
                },
                EcPrivateKey::Okp(o) => match o.curve {
                    crypto::curve::OkpCurve::Ed25519 => SignatureAlgorithm::Ed25519,
                    crypto::curve::OkpCurve::Ed448 => SignatureAlgorithm::Ed448,
                    _ => return Err(CryptoError::UnsupportedAlgorithm("curve is not signing-capable".to_owned()).into()),
                },
            };
            Ok(crypto::sign::sign(key, alg, payload)?)
        }

        fn key_agreement(&self, alias: &str, other_public_key: &EcPublicKey) -> Result<Vec<u8>> {
            let keys = self.keys.read().unwrap();
            let key = keys.get(alias).ok_or(CryptoError::KeyInvalidated)?;
            Ok(crypto::sign::key_agreement(key, other_public_key)?)
        }

        fn delete_key(&self, alias: &str) -> Result<()> {
            self.keys.write().unwrap().remove(alias);
            Ok(())
        }
    }
}
