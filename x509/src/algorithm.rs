//! Mapping between X.509 `AlgorithmIdentifier` OIDs and this workspace's curve/signature
//! algorithm enums (§4.4). Kept as plain dotted-OID string comparisons rather than pulling in a
//! full OID registry crate, since the set of OIDs the mdoc ecosystem actually uses is small.

use crypto::curve::DoubleCoordinateCurve;
use crypto::sign::SignatureAlgorithm;

use crate::error::X509Error;
use crate::error::Result;

pub const OID_ECDSA_WITH_SHA256: &str = "1.2.840.10045.4.3.2";
pub const OID_ECDSA_WITH_SHA384: &str = "1.2.840.10045.4.3.3";
pub const OID_ECDSA_WITH_SHA512: &str = "1.2.840.10045.4.3.4";
pub const OID_ED25519: &str = "1.3.101.112";
pub const OID_ED448: &str = "1.3.101.113";

pub const OID_EC_PUBLIC_KEY: &str = "1.2.840.10045.2.1";
pub const OID_CURVE_P256: &str = "1.2.840.10045.3.1.7";
pub const OID_CURVE_P384: &str = "1.3.132.0.34";
pub const OID_CURVE_P521: &str = "1.3.132.0.35";
pub const OID_CURVE_BRAINPOOL_P256R1: &str = "1.3.36.3.3.2.8.1.1.7";
pub const OID_CURVE_BRAINPOOL_P320R1: &str = "1.3.36.3.3.2.8.1.1.9";
pub const OID_CURVE_BRAINPOOL_P384R1: &str = "1.3.36.3.3.2.8.1.1.11";
pub const OID_CURVE_BRAINPOOL_P512R1: &str = "1.3.36.3.3.2.8.1.1.13";

/// `signatureAlgorithm` OID → the signing algorithm used to produce the signature bytes.
/// Ed25519/Ed448 are self-describing (their OID implies the whole signature scheme); ECDSA OIDs
/// only fix the digest, not the curve, but the curve is always deducible from the signing
/// certificate's own public key, so callers pair this with [`curve_from_spki_algorithm`].
pub fn signature_algorithm_from_oid(oid: &str) -> Result<SignatureAlgorithm> {
    match oid {
        OID_ECDSA_WITH_SHA256 => Ok(SignatureAlgorithm::Es256),
        OID_ECDSA_WITH_SHA384 => Ok(SignatureAlgorithm::Es384),
        OID_ECDSA_WITH_SHA512 => Ok(SignatureAlgorithm::Es512),
        OID_ED25519 => Ok(SignatureAlgorithm::Ed25519),
        OID_ED448 => Ok(SignatureAlgorithm::Ed448),
        other => Err(X509Error::UnsupportedAlgorithm(other.to_owned())),
    }
}

pub fn oid_for_curve(curve: DoubleCoordinateCurve) -> &'static str {
    match curve {
        DoubleCoordinateCurve::P256 => OID_CURVE_P256,
        DoubleCoordinateCurve::P384 => OID_CURVE_P384,
        DoubleCoordinateCurve::P521 => OID_CURVE_P521,
        DoubleCoordinateCurve::BrainpoolP256R1 => OID_CURVE_BRAINPOOL_P256R1,
        DoubleCoordinateCurve::BrainpoolP320R1 => OID_CURVE_BRAINPOOL_P320R1,
        DoubleCoordinateCurve::BrainpoolP384R1 => OID_CURVE_BRAINPOOL_P384R1,
        DoubleCoordinateCurve::BrainpoolP512R1 => OID_CURVE_BRAINPOOL_P512R1,
    }
}

pub fn curve_from_oid(oid: &str) -> Result<DoubleCoordinateCurve> {
    match oid {
        OID_CURVE_P256 => Ok(DoubleCoordinateCurve::P256),
        OID_CURVE_P384 => Ok(DoubleCoordinateCurve::P384),
        OID_CURVE_P521 => Ok(DoubleCoordinateCurve::P521),
        OID_CURVE_BRAINPOOL_P256R1 => Ok(DoubleCoordinateCurve::BrainpoolP256R1),
        OID_CURVE_BRAINPOOL_P320R1 => Ok(DoubleCoordinateCurve::BrainpoolP320R1),
        OID_CURVE_BRAINPOOL_P384R1 => Ok(DoubleCoordinateCurve::BrainpoolP384R1),
        OID_CURVE_BRAINPOOL_P512R1 => Ok(DoubleCoordinateCurve::BrainpoolP512R1),
        other => Err(X509Error::UnsupportedAlgorithm(other.to_owned())),
    }
}
