use elliptic_curve::sec1::ToEncodedPoint;
use pkcs8::DecodePrivateKey;
use pkcs8::DecodePublicKey;
use pkcs8::EncodePrivateKey;
use pkcs8::EncodePublicKey;

use crate::curve::DoubleCoordinateCurve;
use crate::error::CryptoError;
use crate::error::Result;

/// An EC public key on a double-coordinate (Weierstrass) curve: `{curve, x, y}` (§3).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DoubleCoordinatePublicKey {
    pub curve: DoubleCoordinateCurve,
    pub x: Vec<u8>,
    pub y: Vec<u8>,
}

/// An EC private key on a double-coordinate curve: `{curve, x, y, d}` (§3). `d.len()` must equal
/// `curve.coordinate_size()`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DoubleCoordinatePrivateKey {
    pub curve: DoubleCoordinateCurve,
    pub x: Vec<u8>,
    pub y: Vec<u8>,
    pub d: Vec<u8>,
}

fn check_len(curve: DoubleCoordinateCurve, field: &str, bytes: &[u8]) -> Result<()> {
    let expected = curve.coordinate_size();
    if bytes.len() != expected {
        return Err(CryptoError::InvalidEncoding(format!(
            "{field} has length {}, expected {expected} for {curve:?}",
            bytes.len()
        )));
    }
    Ok(())
}

impl DoubleCoordinatePublicKey {
    pub fn new(curve: DoubleCoordinateCurve, x: Vec<u8>, y: Vec<u8>) -> Result<Self> {
        check_len(curve, "x", &x)?;
        check_len(curve, "y", &y)?;
        Ok(Self { curve, x, y })
    }
}

impl DoubleCoordinatePrivateKey {
    pub fn public_key(&self) -> DoubleCoordinatePublicKey {
        DoubleCoordinatePublicKey {
            curve: self.curve,
            x: self.x.clone(),
            y: self.y.clone(),
        }
    }

    pub fn diffie_hellman(&self, other: &DoubleCoordinatePublicKey) -> Result<Vec<u8>> {
        if self.curve != other.curve {
            return Err(CryptoError::IncompatibleKeyAgreement);
        }
        match self.curve {
            DoubleCoordinateCurve::P256 => {
                let secret: p256::SecretKey = self.try_into()?;
                let public: p256::PublicKey = other.try_into()?;
                let shared = p256::ecdh::diffie_hellman(secret.to_nonzero_scalar(), public.as_affine());
                Ok(shared.raw_secret_bytes().to_vec())
            }
            DoubleCoordinateCurve::P384 => {
                let secret: p384::SecretKey = self.try_into()?;
                let public: p384::PublicKey = other.try_into()?;
                let shared = p384::ecdh::diffie_hellman(secret.to_nonzero_scalar(), public.as_affine());
                Ok(shared.raw_secret_bytes().to_vec())
            }
            DoubleCoordinateCurve::P521 => {
                let secret: p521::SecretKey = self.try_into()?;
                let public: p521::PublicKey = other.try_into()?;
                let shared = p521::ecdh::diffie_hellman(secret.to_nonzero_scalar(), public.as_affine());
                Ok(shared.raw_secret_bytes().to_vec())
            }
            _ => Err(CryptoError::UnsupportedAlgorithm(format!(
                "{:?} has no wired-up arithmetic backend",
                self.curve
            ))),
        }
    }
}

macro_rules! impl_nist_curve {
    ($curve_mod:ident, $curve_variant:ident) => {
        impl TryFrom<&DoubleCoordinatePrivateKey> for $curve_mod::ecdsa::SigningKey {
            type Error = CryptoError;

            fn try_from(key: &DoubleCoordinatePrivateKey) -> Result<Self> {
                let secret: $curve_mod::SecretKey = key.try_into()?;
                Ok(Self::from(secret))
            }
        }

        impl TryFrom<&DoubleCoordinatePrivateKey> for $curve_mod::SecretKey {
            type Error = CryptoError;

            fn try_from(key: &DoubleCoordinatePrivateKey) -> Result<Self> {
                if key.curve != DoubleCoordinateCurve::$curve_variant {
                    return Err(CryptoError::UnsupportedAlgorithm(format!(
                        "expected {:?}, got {:?}",
                        DoubleCoordinateCurve::$curve_variant,
                        key.curve
                    )));
                }
                $curve_mod::SecretKey::from_slice(&key.d).map_err(|_| CryptoError::InvalidEncoding("invalid scalar `d`".to_owned()))
            }
        }

        impl TryFrom<&DoubleCoordinatePublicKey> for $curve_mod::ecdsa::VerifyingKey {
            type Error = CryptoError;

            fn try_from(key: &DoubleCoordinatePublicKey) -> Result<Self> {
                let public: $curve_mod::PublicKey = key.try_into()?;
                Ok(Self::from(public))
            }
        }

        impl TryFrom<&DoubleCoordinatePublicKey> for $curve_mod::PublicKey {
            type Error = CryptoError;

            fn try_from(key: &DoubleCoordinatePublicKey) -> Result<Self> {
                if key.curve != DoubleCoordinateCurve::$curve_variant {
                    return Err(CryptoError::UnsupportedAlgorithm(format!(
                        "expected {:?}, got {:?}",
                        DoubleCoordinateCurve::$curve_variant,
                        key.curve
                    )));
                }
                let point = $curve_mod::EncodedPoint::from_affine_coordinates(
                    $curve_mod::FieldBytes::from_slice(&key.x),
                    $curve_mod::FieldBytes::from_slice(&key.y),
                    false,
                );
                $curve_mod::PublicKey::from_encoded_point(&point)
                    .into_option()
                    .ok_or_else(|| CryptoError::InvalidEncoding("point is not on the curve".to_owned()))
            }
        }

        impl From<&$curve_mod::PublicKey> for DoubleCoordinatePublicKey {
            fn from(key: &$curve_mod::PublicKey) -> Self {
                let point = key.to_encoded_point(false);
                DoubleCoordinatePublicKey {
                    curve: DoubleCoordinateCurve::$curve_variant,
                    x: point.x().expect("uncompressed point always has x").to_vec(),
                    y: point.y().expect("uncompressed point always has y").to_vec(),
                }
            }
        }
    };
}

impl_nist_curve!(p256, P256);
impl_nist_curve!(p384, P384);
impl_nist_curve!(p521, P521);

impl DoubleCoordinatePrivateKey {
    /// Generate a fresh private key on `curve` using a cryptographically secure RNG.
    pub fn generate(curve: DoubleCoordinateCurve) -> Result<Self> {
        match curve {
            DoubleCoordinateCurve::P256 => {
                let secret = p256::SecretKey::random(&mut rand_core::OsRng);
                let public = DoubleCoordinatePublicKey::from(&secret.public_key());
                Ok(DoubleCoordinatePrivateKey {
                    curve,
                    x: public.x,
                    y: public.y,
                    d: secret.to_bytes().to_vec(),
                })
            }
            DoubleCoordinateCurve::P384 => {
                let secret = p384::SecretKey::random(&mut rand_core::OsRng);
                let public = DoubleCoordinatePublicKey::from(&secret.public_key());
                Ok(DoubleCoordinatePrivateKey {
                    curve,
                    x: public.x,
                    y: public.y,
                    d: secret.to_bytes().to_vec(),
                })
            }
            DoubleCoordinateCurve::P521 => {
                let secret = p521::SecretKey::random(&mut rand_core::OsRng);
                let public = DoubleCoordinatePublicKey::from(&secret.public_key());
                Ok(DoubleCoordinatePrivateKey {
                    curve,
                    x: public.x,
                    y: public.y,
                    d: secret.to_bytes().to_vec(),
                })
            }
            _ => Err(CryptoError::UnsupportedAlgorithm(format!(
                "{curve:?} has no wired-up arithmetic backend"
            ))),
        }
    }

    /// PKCS#8 (RFC 5208) PEM encoding of the private key.
    pub fn to_pkcs8_pem(&self) -> Result<String> {
        let pem = match self.curve {
            DoubleCoordinateCurve::P256 => {
                let secret: p256::SecretKey = self.try_into()?;
                secret.to_pkcs8_pem(Default::default())
            }
            DoubleCoordinateCurve::P384 => {
                let secret: p384::SecretKey = self.try_into()?;
                secret.to_pkcs8_pem(Default::default())
            }
            DoubleCoordinateCurve::P521 => {
                let secret: p521::SecretKey = self.try_into()?;
                secret.to_pkcs8_pem(Default::default())
            }
            _ => return Err(CryptoError::UnsupportedAlgorithm(format!("{:?} has no PEM backend", self.curve))),
        }
        .map_err(|e| CryptoError::InvalidEncoding(format!("failed to encode PKCS8 PEM: {e}")))?;
        Ok(pem.to_string())
    }

    pub fn from_pkcs8_pem(curve: DoubleCoordinateCurve, pem: &str) -> Result<Self> {
        match curve {
            DoubleCoordinateCurve::P256 => {
                let secret = p256::SecretKey::from_pkcs8_pem(pem)
                    .map_err(|e| CryptoError::InvalidEncoding(format!("invalid PKCS8 PEM: {e}")))?;
                let public = DoubleCoordinatePublicKey::from(&secret.public_key());
                Ok(DoubleCoordinatePrivateKey {
                    curve,
                    x: public.x,
                    y: public.y,
                    d: secret.to_bytes().to_vec(),
                })
            }
            DoubleCoordinateCurve::P384 => {
                let secret = p384::SecretKey::from_pkcs8_pem(pem)
                    .map_err(|e| CryptoError::InvalidEncoding(format!("invalid PKCS8 PEM: {e}")))?;
                let public = DoubleCoordinatePublicKey::from(&secret.public_key());
                Ok(DoubleCoordinatePrivateKey {
                    curve,
                    x: public.x,
                    y: public.y,
                    d: secret.to_bytes().to_vec(),
                })
            }
            DoubleCoordinateCurve::P521 => {
                let secret = p521::SecretKey::from_pkcs8_pem(pem)
                    .map_err(|e| CryptoError::InvalidEncoding(format!("invalid PKCS8 PEM: {e}")))?;
                let public = DoubleCoordinatePublicKey::from(&secret.public_key());
                Ok(DoubleCoordinatePrivateKey {
                    curve,
                    x: public.x,
                    y: public.y,
                    d: secret.to_bytes().to_vec(),
                })
            }
            _ => Err(CryptoError::UnsupportedAlgorithm(format!("{curve:?} has no PEM backend"))),
        }
    }
}

impl DoubleCoordinatePublicKey {
    /// SubjectPublicKeyInfo (RFC 5280) PEM encoding.
    pub fn to_spki_pem(&self) -> Result<String> {
        let pem = match self.curve {
            DoubleCoordinateCurve::P256 => {
                let public: p256::PublicKey = self.try_into()?;
                public.to_public_key_pem(Default::default())
            }
            DoubleCoordinateCurve::P384 => {
                let public: p384::PublicKey = self.try_into()?;
                public.to_public_key_pem(Default::default())
            }
            DoubleCoordinateCurve::P521 => {
                let public: p521::PublicKey = self.try_into()?;
                public.to_public_key_pem(Default::default())
            }
            _ => return Err(CryptoError::UnsupportedAlgorithm(format!("{:?} has no PEM backend", self.curve))),
        }
        .map_err(|e| CryptoError::InvalidEncoding(format!("failed to encode SPKI PEM: {e}")))?;
        Ok(pem)
    }

    pub fn from_spki_pem(curve: DoubleCoordinateCurve, pem: &str) -> Result<Self> {
        match curve {
            DoubleCoordinateCurve::P256 => Ok(DoubleCoordinatePublicKey::from(
                &p256::PublicKey::from_public_key_pem(pem).map_err(|e| CryptoError::InvalidEncoding(format!("invalid SPKI PEM: {e}")))?,
            )),
            DoubleCoordinateCurve::P384 => Ok(DoubleCoordinatePublicKey::from(
                &p384::PublicKey::from_public_key_pem(pem).map_err(|e| CryptoError::InvalidEncoding(format!("invalid SPKI PEM: {e}")))?,
            )),
            DoubleCoordinateCurve::P521 => Ok(DoubleCoordinatePublicKey::from(
                &p521::PublicKey::from_public_key_pem(pem).map_err(|e| CryptoError::InvalidEncoding(format!("invalid SPKI PEM: {e}")))?,
            )),
            _ => Err(CryptoError::UnsupportedAlgorithm(format!("{curve:?} has no PEM backend"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn p256_pem_round_trip() {
        let key = DoubleCoordinatePrivateKey::generate(DoubleCoordinateCurve::P256).unwrap();
        let pem = key.to_pkcs8_pem().unwrap();
        let back = DoubleCoordinatePrivateKey::from_pkcs8_pem(DoubleCoordinateCurve::P256, &pem).unwrap();
        assert_eq!(key, back);

        let pub_pem = key.public_key().to_spki_pem().unwrap();
        let pub_back = DoubleCoordinatePublicKey::from_spki_pem(DoubleCoordinateCurve::P256, &pub_pem).unwrap();
        assert_eq!(key.public_key(), pub_back);
    }

    #[test]
    fn d_size_matches_coordinate_size() {
        let key = DoubleCoordinatePrivateKey::generate(DoubleCoordinateCurve::P384).unwrap();
        assert_eq!(key.d.len(), DoubleCoordinateCurve::P384.coordinate_size());
    }

    #[test]
    fn brainpool_has_no_arithmetic_backend() {
        assert!(matches!(
            DoubleCoordinatePrivateKey::generate(DoubleCoordinateCurve::BrainpoolP256R1),
            Err(CryptoError::UnsupportedAlgorithm(_))
        ));
    }
}
