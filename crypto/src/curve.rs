use serde::Deserialize;
use serde::Serialize;
use strum::EnumIter;

/// The double-coordinate (NIST/Brainpool Weierstrass) curves recognized by [`crate::keys::EcPublicKey`].
///
/// Full ECDSA/ECDH arithmetic is wired up for the three NIST curves via `p256`/`p384`/`p521`.
/// The four Brainpool curves are represented structurally (coordinate sizes, COSE/JWK `crv`
/// names, PEM OIDs) so that keys and certificates that carry them round-trip through every
/// encoding, but signing/key-agreement over them returns [`crate::error::CryptoError::UnsupportedAlgorithm`]
/// because no maintained, audited Brainpool arithmetic backend is available as a dependency
/// (see DESIGN.md).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumIter)]
pub enum DoubleCoordinateCurve {
    P256,
    P384,
    P521,
    BrainpoolP256R1,
    BrainpoolP320R1,
    BrainpoolP384R1,
    BrainpoolP512R1,
}

impl DoubleCoordinateCurve {
    /// Size in bytes of a single coordinate (and of the private scalar `d`), i.e. `⌈bitSize/8⌉`.
    pub const fn coordinate_size(self) -> usize {
        match self {
            Self::P256 | Self::BrainpoolP256R1 => 32,
            Self::P384 | Self::BrainpoolP384R1 => 48,
            Self::BrainpoolP320R1 => 40,
            Self::P521 => 66,
            Self::BrainpoolP512R1 => 64,
        }
    }

    pub const fn has_arithmetic_backend(self) -> bool {
        matches!(self, Self::P256 | Self::P384 | Self::P521)
    }

    /// COSE `crv` values, per RFC 8152 §13.1 (NIST curves) and the Brainpool registrations.
    pub const fn cose_crv(self) -> i64 {
        match self {
            Self::P256 => 1,
            Self::P384 => 2,
            Self::P521 => 3,
            Self::BrainpoolP256R1 => 256,
            Self::BrainpoolP320R1 => 257,
            Self::BrainpoolP384R1 => 258,
            Self::BrainpoolP512R1 => 259,
        }
    }

    pub fn from_cose_crv(crv: i64) -> Option<Self> {
        Some(match crv {
            1 => Self::P256,
            2 => Self::P384,
            3 => Self::P521,
            256 => Self::BrainpoolP256R1,
            257 => Self::BrainpoolP320R1,
            258 => Self::BrainpoolP384R1,
            259 => Self::BrainpoolP512R1,
            _ => return None,
        })
    }

    /// JWK `crv` values (RFC 7518 §7.6 for NIST curves; Brainpool names follow the informal
    /// convention used by JOSE implementations that support them).
    pub const fn jwk_crv(self) -> &'static str {
        match self {
            Self::P256 => "P-256",
            Self::P384 => "P-384",
            Self::P521 => "P-521",
            Self::BrainpoolP256R1 => "brainpoolP256r1",
            Self::BrainpoolP320R1 => "brainpoolP320r1",
            Self::BrainpoolP384R1 => "brainpoolP384r1",
            Self::BrainpoolP512R1 => "brainpoolP512r1",
        }
    }

    pub fn from_jwk_crv(crv: &str) -> Option<Self> {
        Some(match crv {
            "P-256" => Self::P256,
            "P-384" => Self::P384,
            "P-521" => Self::P521,
            "brainpoolP256r1" => Self::BrainpoolP256R1,
            "brainpoolP320r1" => Self::BrainpoolP320R1,
            "brainpoolP384r1" => Self::BrainpoolP384R1,
            "brainpoolP512r1" => Self::BrainpoolP512R1,
            _ => return None,
        })
    }
}

/// The Octet Key Pair curves recognized by [`crate::keys::EcPublicKey`] (RFC 8152 §13.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumIter)]
pub enum OkpCurve {
    Ed25519,
    Ed448,
    X25519,
    X448,
}

impl OkpCurve {
    /// Size in bytes of the canonical public-key (and private seed) encoding.
    pub const fn key_size(self) -> usize {
        match self {
            Self::Ed25519 | Self::X25519 => 32,
            Self::Ed448 => 57,
            Self::X448 => 56,
        }
    }

    pub const fn cose_crv(self) -> i64 {
        match self {
            Self::X25519 => 4,
            Self::X448 => 5,
            Self::Ed25519 => 6,
            Self::Ed448 => 7,
        }
    }

    pub fn from_cose_crv(crv: i64) -> Option<Self> {
        Some(match crv {
            4 => Self::X25519,
            5 => Self::X448,
            6 => Self::Ed25519,
            7 => Self::Ed448,
            _ => return None,
        })
    }

    pub const fn jwk_crv(self) -> &'static str {
        match self {
            Self::Ed25519 => "Ed25519",
            Self::Ed448 => "Ed448",
            Self::X25519 => "X25519",
            Self::X448 => "X448",
        }
    }

    pub fn from_jwk_crv(crv: &str) -> Option<Self> {
        Some(match crv {
            "Ed25519" => Self::Ed25519,
            "Ed448" => Self::Ed448,
            "X25519" => Self::X25519,
            "X448" => Self::X448,
            _ => return None,
        })
    }

    pub const fn is_signing(self) -> bool {
        matches!(self, Self::Ed25519 | Self::Ed448)
    }

    pub const fn is_key_agreement(self) -> bool {
        matches!(self, Self::X25519 | Self::X448)
    }
}
