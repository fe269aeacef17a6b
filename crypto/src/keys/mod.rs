//! EC key abstractions (§3, §4.1): double-coordinate (Weierstrass) keys and Octet Key Pairs,
//! unified behind [`EcPublicKey`]/[`EcPrivateKey`] so callers that don't care which curve family
//! they're holding (COSE_Key and JWK codecs, ECDH dispatch) don't have to match on it themselves.

pub mod cose_key;
pub mod double_coordinate;
pub mod jwk;
pub mod okp;

use crate::curve::DoubleCoordinateCurve;
use crate::curve::OkpCurve;
use crate::error::Result;
pub use double_coordinate::DoubleCoordinatePrivateKey;
pub use double_coordinate::DoubleCoordinatePublicKey;
pub use jwk::Jwk;
pub use okp::OkpPrivateKey;
pub use okp::OkpPublicKey;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EcPublicKey {
    DoubleCoordinate(DoubleCoordinatePublicKey),
    Okp(OkpPublicKey),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EcPrivateKey {
    DoubleCoordinate(DoubleCoordinatePrivateKey),
    Okp(OkpPrivateKey),
}

impl EcPrivateKey {
    /// Generate a fresh private key on a double-coordinate `curve`.
    pub fn generate(curve: DoubleCoordinateCurve) -> Result<Self> {
        Ok(Self::DoubleCoordinate(DoubleCoordinatePrivateKey::generate(curve)?))
    }

    /// Generate a fresh private key on an OKP `curve`.
    pub fn generate_okp(curve: OkpCurve) -> Result<Self> {
        Ok(Self::Okp(OkpPrivateKey::generate(curve)?))
    }

    pub fn public_key(&self) -> EcPublicKey {
        match self {
            Self::DoubleCoordinate(d) => EcPublicKey::DoubleCoordinate(d.public_key()),
            Self::Okp(o) => EcPublicKey::Okp(o.public_key()),
        }
    }

    pub fn to_cose_key(&self) -> ciborium::value::Value {
        match self {
            Self::DoubleCoordinate(d) => d.to_cose_key(),
            Self::Okp(o) => o.to_cose_key(),
        }
    }

    pub fn to_jwk(&self) -> Jwk {
        match self {
            Self::DoubleCoordinate(d) => d.to_jwk(),
            Self::Okp(o) => o.to_jwk(),
        }
    }
}

impl EcPublicKey {
    pub fn to_cose_key(&self) -> ciborium::value::Value {
        match self {
            Self::DoubleCoordinate(d) => d.to_cose_key(),
            Self::Okp(o) => o.to_cose_key(),
        }
    }

    pub fn from_cose_key(value: &ciborium::value::Value) -> Result<Self> {
        match DoubleCoordinatePublicKey::from_cose_key(value) {
            Ok(d) => Ok(Self::DoubleCoordinate(d)),
            Err(_) => Ok(Self::Okp(OkpPublicKey::from_cose_key(value)?)),
        }
    }

    pub fn to_jwk(&self) -> Jwk {
        match self {
            Self::DoubleCoordinate(d) => d.to_jwk(),
            Self::Okp(o) => o.to_jwk(),
        }
    }

    pub fn from_jwk(jwk: &Jwk) -> Result<Self> {
        match jwk.kty.as_str() {
            "EC" => Ok(Self::DoubleCoordinate(DoubleCoordinatePublicKey::from_jwk(jwk)?)),
            "OKP" => Ok(Self::Okp(OkpPublicKey::from_jwk(jwk)?)),
            other => Err(crate::error::CryptoError::UnsupportedAlgorithm(format!("unknown JWK kty `{other}`"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn double_coordinate_round_trips_through_cose_key() {
        let key = EcPrivateKey::generate(DoubleCoordinateCurve::P256).unwrap();
        let public = key.public_key();
        let cbor = public.to_cose_key();
        let back = EcPublicKey::from_cose_key(&cbor).unwrap();
        assert_eq!(public, back);
    }

    #[test]
    fn okp_round_trips_through_jwk() {
        let key = EcPrivateKey::generate_okp(OkpCurve::Ed25519).unwrap();
        let public = key.public_key();
        let jwk = public.to_jwk();
        let back = EcPublicKey::from_jwk(&jwk).unwrap();
        assert_eq!(public, back);
    }
}
