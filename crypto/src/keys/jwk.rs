use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use serde::Deserialize;
use serde::Serialize;

use crate::curve::DoubleCoordinateCurve;
use crate::curve::OkpCurve;
use crate::error::CryptoError;
use crate::error::Result;
use crate::keys::double_coordinate::DoubleCoordinatePrivateKey;
use crate::keys::double_coordinate::DoubleCoordinatePublicKey;
use crate::keys::okp::OkpPrivateKey;
use crate::keys::okp::OkpPublicKey;

/// JSON Web Key (RFC 7517). Only the fields relevant to EC/OKP keys are modeled; unknown fields
/// present on deserialization are ignored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Jwk {
    pub kty: String,
    pub crv: String,
    pub x: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub d: Option<String>,
}

fn encode(bytes: &[u8]) -> String {
    URL_SAFE_NO_PAD.encode(bytes)
}

fn decode(field: &str, value: &str) -> Result<Vec<u8>> {
    URL_SAFE_NO_PAD
        .decode(value)
        .map_err(|e| CryptoError::InvalidEncoding(format!("invalid base64url in JWK field `{field}`: {e}")))
}

impl DoubleCoordinatePublicKey {
    pub fn to_jwk(&self) -> Jwk {
        Jwk {
            kty: "EC".to_owned(),
            crv: self.curve.jwk_crv().to_owned(),
            x: encode(&self.x),
            y: Some(encode(&self.y)),
            d: None,
        }
    }

    pub fn from_jwk(jwk: &Jwk) -> Result<Self> {
        if jwk.kty != "EC" {
            return Err(CryptoError::InvalidEncoding(format!("expected kty=EC, got {}", jwk.kty)));
        }
        let curve = DoubleCoordinateCurve::from_jwk_crv(&jwk.crv)
            .ok_or_else(|| CryptoError::UnsupportedAlgorithm(format!("unknown JWK crv `{}`", jwk.crv)))?;
        let y = jwk
            .y
            .as_deref()
            .ok_or_else(|| CryptoError::InvalidEncoding("EC JWK is missing `y`".to_owned()))?;
        Ok(Self {
            curve,
            x: decode("x", &jwk.x)?,
            y: decode("y", y)?,
        })
    }
}

impl DoubleCoordinatePrivateKey {
    pub fn to_jwk(&self) -> Jwk {
        let mut jwk = self.public_key().to_jwk();
        jwk.d = Some(encode(&self.d));
        jwk
    }

    pub fn from_jwk(jwk: &Jwk) -> Result<Self> {
        let public = DoubleCoordinatePublicKey::from_jwk(jwk)?;
        let d = jwk
            .d
            .as_deref()
            .ok_or_else(|| CryptoError::InvalidEncoding("EC private JWK is missing `d`".to_owned()))?;
        Ok(Self {
            curve: public.curve,
            x: public.x,
            y: public.y,
            d: decode("d", d)?,
        })
    }
}

impl OkpPublicKey {
    pub fn to_jwk(&self) -> Jwk {
        Jwk {
            kty: "OKP".to_owned(),
            crv: self.curve.jwk_crv().to_owned(),
            x: encode(&self.x),
            y: None,
            d: None,
        }
    }

    pub fn from_jwk(jwk: &Jwk) -> Result<Self> {
        if jwk.kty != "OKP" {
            return Err(CryptoError::InvalidEncoding(format!("expected kty=OKP, got {}", jwk.kty)));
        }
        let curve = OkpCurve::from_jwk_crv(&jwk.crv)
            .ok_or_else(|| CryptoError::UnsupportedAlgorithm(format!("unknown JWK crv `{}`", jwk.crv)))?;
        Ok(Self {
            curve,
            x: decode("x", &jwk.x)?,
        })
    }
}

impl OkpPrivateKey {
    pub fn to_jwk(&self) -> Jwk {
        let mut jwk = self.public_key().to_jwk();
        jwk.d = Some(encode(&self.d));
        jwk
    }

    pub fn from_jwk(jwk: &Jwk) -> Result<Self> {
        let public = OkpPublicKey::from_jwk(jwk)?;
        let d = jwk
            .d
            .as_deref()
            .ok_or_else(|| CryptoError::InvalidEncoding("OKP private JWK is missing `d`".to_owned()))?;
        Ok(Self {
            curve: public.curve,
            x: public.x,
            d: decode("d", d)?,
        })
    }
}
