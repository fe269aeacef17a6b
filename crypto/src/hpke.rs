//! Hybrid Public Key Encryption (RFC 9180), used to wrap DC API responses toward a reader's
//! ephemeral public key (§4.3, §4.11 dcapi dispatch). Implemented directly against the RFC's
//! label-extract/label-expand construction rather than a borrowed `hpke` crate, since the suite
//! surface here (DHKEM over both curve families, an EXPORT_ONLY AEAD mode, explicit PSK/Auth
//! modes) is narrow enough that re-deriving it from the RFC text is clearer than adapting a
//! general-purpose implementation.

use aes_gcm::aead::Aead;
use aes_gcm::aead::KeyInit;
use aes_gcm::aead::Payload;
use aes_gcm::Aes128Gcm;
use aes_gcm::Aes256Gcm;
use aes_gcm::Nonce;

use crate::curve::DoubleCoordinateCurve;
use crate::curve::OkpCurve;
use crate::digest::DigestAlgorithm;
use crate::error::CryptoError;
use crate::error::Result;
use crate::hkdf::hkdf_expand;
use crate::hkdf::hkdf_extract;
use crate::keys::double_coordinate::DoubleCoordinatePublicKey;
use crate::keys::okp::OkpPublicKey;
use crate::keys::EcPrivateKey;
use crate::keys::EcPublicKey;

const VERSION_LABEL: &[u8] = b"HPKE-v1";

/// The KEM half of an HPKE cipher suite: DHKEM over a named curve (RFC 9180 §4.1, §7.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KemAlgorithm {
    DhkemP256,
    DhkemP384,
    DhkemP521,
    DhkemX25519,
    DhkemX448,
}

impl KemAlgorithm {
    const fn id(self) -> u16 {
        match self {
            Self::DhkemP256 => 0x0010,
            Self::DhkemP384 => 0x0011,
            Self::DhkemP521 => 0x0012,
            Self::DhkemX25519 => 0x0020,
            Self::DhkemX448 => 0x0021,
        }
    }

    const fn kdf(self) -> KdfAlgorithm {
        match self {
            Self::DhkemP256 => KdfAlgorithm::HkdfSha256,
            Self::DhkemP384 => KdfAlgorithm::HkdfSha384,
            Self::DhkemP521 => KdfAlgorithm::HkdfSha512,
            Self::DhkemX25519 => KdfAlgorithm::HkdfSha256,
            Self::DhkemX448 => KdfAlgorithm::HkdfSha512,
        }
    }

    const fn nsecret(self) -> usize {
        match self {
            Self::DhkemP256 => 32,
            Self::DhkemP384 => 48,
            Self::DhkemP521 => 64,
            Self::DhkemX25519 => 32,
            Self::DhkemX448 => 64,
        }
    }
}

/// The KDF half of an HPKE cipher suite (RFC 9180 §7.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KdfAlgorithm {
    HkdfSha256,
    HkdfSha384,
    HkdfSha512,
}

impl KdfAlgorithm {
    const fn id(self) -> u16 {
        match self {
            Self::HkdfSha256 => 0x0001,
            Self::HkdfSha384 => 0x0002,
            Self::HkdfSha512 => 0x0003,
        }
    }

    const fn digest(self) -> DigestAlgorithm {
        match self {
            Self::HkdfSha256 => DigestAlgorithm::Sha256,
            Self::HkdfSha384 => DigestAlgorithm::Sha384,
            Self::HkdfSha512 => DigestAlgorithm::Sha512,
        }
    }
}

/// The AEAD half of an HPKE cipher suite, including the distinguished `EXPORT_ONLY` pseudo-AEAD
/// (RFC 9180 §7.3) under which only [`Context::export`] is usable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HpkeAeadAlgorithm {
    Aes128Gcm,
    Aes256Gcm,
    ExportOnly,
}

impl HpkeAeadAlgorithm {
    const fn id(self) -> u16 {
        match self {
            Self::Aes128Gcm => 0x0001,
            Self::Aes256Gcm => 0x0002,
            Self::ExportOnly => 0xffff,
        }
    }

    const fn key_len(self) -> usize {
        match self {
            Self::Aes128Gcm => 16,
            Self::Aes256Gcm => 32,
            Self::ExportOnly => 0,
        }
    }

    const fn nonce_len(self) -> usize {
        match self {
            Self::Aes128Gcm | Self::Aes256Gcm => 12,
            Self::ExportOnly => 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CipherSuite {
    pub kem: KemAlgorithm,
    pub aead: HpkeAeadAlgorithm,
}

impl CipherSuite {
    pub const fn new(kem: KemAlgorithm, aead: HpkeAeadAlgorithm) -> Self {
        Self { kem, aead }
    }

    fn kdf(self) -> KdfAlgorithm {
        self.kem.kdf()
    }

    fn suite_id(self) -> Vec<u8> {
        let mut id = b"HPKE".to_vec();
        id.extend_from_slice(&self.kem.id().to_be_bytes());
        id.extend_from_slice(&self.kdf().id().to_be_bytes());
        id.extend_from_slice(&self.aead.id().to_be_bytes());
        id
    }

    fn kem_suite_id(self) -> Vec<u8> {
        let mut id = b"KEM".to_vec();
        id.extend_from_slice(&self.kem.id().to_be_bytes());
        id
    }
}

fn labeled_extract(kdf: KdfAlgorithm, suite_id: &[u8], salt: &[u8], label: &[u8], ikm: &[u8]) -> Vec<u8> {
    let mut labeled_ikm = Vec::with_capacity(VERSION_LABEL.len() + suite_id.len() + label.len() + ikm.len());
    labeled_ikm.extend_from_slice(VERSION_LABEL);
    labeled_ikm.extend_from_slice(suite_id);
    labeled_ikm.extend_from_slice(label);
    labeled_ikm.extend_from_slice(ikm);
    hkdf_extract(kdf.digest(), salt, &labeled_ikm)
}

fn labeled_expand(kdf: KdfAlgorithm, suite_id: &[u8], prk: &[u8], label: &[u8], info: &[u8], length: usize) -> Result<Vec<u8>> {
    let len_bytes = (length as u16).to_be_bytes();
    let mut labeled_info = Vec::with_capacity(2 + VERSION_LABEL.len() + suite_id.len() + label.len() + info.len());
    labeled_info.extend_from_slice(&len_bytes);
    labeled_info.extend_from_slice(VERSION_LABEL);
    labeled_info.extend_from_slice(suite_id);
    labeled_info.extend_from_slice(label);
    labeled_info.extend_from_slice(info);
    hkdf_expand(kdf.digest(), prk, &labeled_info, length)
}

/// Canonical wire encoding of an [`EcPublicKey`] per RFC 9180 §4.1: the uncompressed SEC1 point
/// for DHKEM curves, and the raw `x` coordinate for OKP curves.
pub fn serialize_public_key(key: &EcPublicKey) -> Vec<u8> {
    match key {
        EcPublicKey::DoubleCoordinate(d) => {
            let mut out = vec![0x04];
            out.extend_from_slice(&d.x);
            out.extend_from_slice(&d.y);
            out
        }
        EcPublicKey::Okp(o) => o.x.clone(),
    }
}

fn deserialize_public_key(kem: KemAlgorithm, bytes: &[u8]) -> Result<EcPublicKey> {
    match kem {
        KemAlgorithm::DhkemP256 | KemAlgorithm::DhkemP384 | KemAlgorithm::DhkemP521 => {
            let curve = match kem {
                KemAlgorithm::DhkemP256 => DoubleCoordinateCurve::P256,
                KemAlgorithm::DhkemP384 => DoubleCoordinateCurve::P384,
                _ => DoubleCoordinateCurve::P521,
            };
            let coord = curve.coordinate_size();
            if bytes.len() != 1 + 2 * coord || bytes[0] != 0x04 {
                return Err(CryptoError::InvalidEncoding("malformed uncompressed EC point".to_owned()));
            }
            Ok(EcPublicKey::DoubleCoordinate(DoubleCoordinatePublicKey::new(
                curve,
                bytes[1..1 + coord].to_vec(),
                bytes[1 + coord..].to_vec(),
            )?))
        }
        KemAlgorithm::DhkemX25519 | KemAlgorithm::DhkemX448 => {
            let curve = if kem == KemAlgorithm::DhkemX25519 { OkpCurve::X25519 } else { OkpCurve::X448 };
            Ok(EcPublicKey::Okp(OkpPublicKey::new(curve, bytes.to_vec())?))
        }
    }
}

fn dh(kem: KemAlgorithm, private: &EcPrivateKey, public: &EcPublicKey) -> Result<Vec<u8>> {
    match (kem, private, public) {
        (KemAlgorithm::DhkemP256, EcPrivateKey::DoubleCoordinate(d), EcPublicKey::DoubleCoordinate(p))
        | (KemAlgorithm::DhkemP384, EcPrivateKey::DoubleCoordinate(d), EcPublicKey::DoubleCoordinate(p))
        | (KemAlgorithm::DhkemP521, EcPrivateKey::DoubleCoordinate(d), EcPublicKey::DoubleCoordinate(p)) => d.diffie_hellman(p),
        (KemAlgorithm::DhkemX25519, EcPrivateKey::Okp(o_priv), EcPublicKey::Okp(o_pub)) if o_priv.curve == OkpCurve::X25519 => {
            let secret: x25519_dalek::StaticSecret = o_priv.try_into()?;
            let public: x25519_dalek::PublicKey = o_pub.try_into()?;
            Ok(secret.diffie_hellman(&public).as_bytes().to_vec())
        }
        _ => Err(CryptoError::UnsupportedAlgorithm(format!("{kem:?} X448 DH is not wired up"))),
    }
}

/// `Encap`: generate an ephemeral key pair, DH with the recipient's public key, and return
/// `(shared_secret, enc)` where `enc` is the serialized ephemeral public key to send alongside
/// the ciphertext.
fn encap(suite: CipherSuite, recipient_public_key: &EcPublicKey) -> Result<(Vec<u8>, Vec<u8>)> {
    let ephemeral = generate_kem_keypair(suite.kem)?;
    let dh_secret = dh(suite.kem, &ephemeral, recipient_public_key)?;
    let enc = serialize_public_key(&ephemeral.public_key());
    let pkrm = serialize_public_key(recipient_public_key);
    let shared_secret = extract_and_expand(suite, &dh_secret, &enc, &pkrm)?;
    Ok((shared_secret, enc))
}

/// `Decap`: recover the shared secret from the sender's `enc` using the recipient's private key.
fn decap(suite: CipherSuite, enc: &[u8], recipient_private_key: &EcPrivateKey) -> Result<Vec<u8>> {
    let ephemeral_public = deserialize_public_key(suite.kem, enc)?;
    let dh_secret = dh(suite.kem, recipient_private_key, &ephemeral_public)?;
    let pkrm = serialize_public_key(&recipient_private_key.public_key());
    extract_and_expand(suite, &dh_secret, enc, &pkrm)
}

fn extract_and_expand(suite: CipherSuite, dh_secret: &[u8], enc: &[u8], pkrm: &[u8]) -> Result<Vec<u8>> {
    let kem_suite_id = suite.kem_suite_id();
    let kdf = suite.kem.kdf();
    let eae_prk = labeled_extract(kdf, &kem_suite_id, b"", b"eae_prk", dh_secret);
    let mut kem_context = Vec::with_capacity(enc.len() + pkrm.len());
    kem_context.extend_from_slice(enc);
    kem_context.extend_from_slice(pkrm);
    labeled_expand(kdf, &kem_suite_id, &eae_prk, b"shared_secret", &kem_context, suite.kem.nsecret())
}

fn generate_kem_keypair(kem: KemAlgorithm) -> Result<EcPrivateKey> {
    match kem {
        KemAlgorithm::DhkemP256 => EcPrivateKey::generate(DoubleCoordinateCurve::P256),
        KemAlgorithm::DhkemP384 => EcPrivateKey::generate(DoubleCoordinateCurve::P384),
        KemAlgorithm::DhkemP521 => EcPrivateKey::generate(DoubleCoordinateCurve::P521),
        KemAlgorithm::DhkemX25519 => EcPrivateKey::generate_okp(OkpCurve::X25519),
        KemAlgorithm::DhkemX448 => EcPrivateKey::generate_okp(OkpCurve::X448),
    }
}

const MODE_BASE: u8 = 0x00;
const MODE_PSK: u8 = 0x01;
const MODE_AUTH: u8 = 0x02;
const MODE_AUTH_PSK: u8 = 0x03;

/// A derived HPKE context shared by sender and receiver: the AEAD key, base nonce, running
/// sequence counter, and exporter secret (RFC 9180 §5.1-§5.2). `seq` is incremented on every
/// [`Context::seal`]/[`Context::open`] call and wraps back to encrypt/decrypt under a fresh
/// nonce each time.
pub struct Context {
    suite: CipherSuite,
    key: Vec<u8>,
    base_nonce: Vec<u8>,
    seq: u64,
    exporter_secret: Vec<u8>,
}

struct KeySchedule {
    key: Vec<u8>,
    base_nonce: Vec<u8>,
    exporter_secret: Vec<u8>,
}

fn key_schedule(suite: CipherSuite, mode: u8, shared_secret: &[u8], info: &[u8], psk: &[u8], psk_id: &[u8]) -> Result<KeySchedule> {
    let suite_id = suite.suite_id();
    let kdf = suite.kem.kdf();
    let psk_id_hash = labeled_extract(kdf, &suite_id, b"", b"psk_id_hash", psk_id);
    let info_hash = labeled_extract(kdf, &suite_id, b"", b"info_hash", info);
    let mut context = vec![mode];
    context.extend_from_slice(&psk_id_hash);
    context.extend_from_slice(&info_hash);

    let secret = labeled_extract(kdf, &suite_id, shared_secret, b"secret", psk);
    let exporter_secret = labeled_expand(kdf, &suite_id, &secret, b"exp", &context, kdf.digest().output_len())?;
    let base_nonce = labeled_expand(kdf, &suite_id, &secret, b"base_nonce", &context, suite.aead.nonce_len())?;
    let key = if suite.aead.key_len() > 0 {
        labeled_expand(kdf, &suite_id, &secret, b"key", &context, suite.aead.key_len())?
    } else {
        Vec::new()
    };
    Ok(KeySchedule { key, base_nonce, exporter_secret })
}

impl Context {
    fn nonce(&self) -> Vec<u8> {
        let mut nonce = self.base_nonce.clone();
        let seq_bytes = self.seq.to_be_bytes();
        let offset = nonce.len() - seq_bytes.len();
        for (n, s) in nonce[offset..].iter_mut().zip(seq_bytes.iter()) {
            *n ^= s;
        }
        nonce
    }

    /// Encrypt `plaintext` under the current sequence counter and advance it.
    pub fn seal(&mut self, aad: &[u8], plaintext: &[u8]) -> Result<Vec<u8>> {
        let nonce = self.nonce();
        let ciphertext = match self.suite.aead {
            HpkeAeadAlgorithm::Aes128Gcm => {
                let cipher = Aes128Gcm::new_from_slice(&self.key).map_err(|_| CryptoError::InvalidEncoding("bad HPKE key".to_owned()))?;
                cipher
                    .encrypt(Nonce::from_slice(&nonce), Payload { msg: plaintext, aad })
                    .map_err(|_| CryptoError::Decrypt)?
            }
            HpkeAeadAlgorithm::Aes256Gcm => {
                let cipher = Aes256Gcm::new_from_slice(&self.key).map_err(|_| CryptoError::InvalidEncoding("bad HPKE key".to_owned()))?;
                cipher
                    .encrypt(Nonce::from_slice(&nonce), Payload { msg: plaintext, aad })
                    .map_err(|_| CryptoError::Decrypt)?
            }
            HpkeAeadAlgorithm::ExportOnly => {
                return Err(CryptoError::UnsupportedAlgorithm("EXPORT_ONLY suites cannot seal/open".to_owned()))
            }
        };
        self.seq += 1;
        Ok(ciphertext)
    }

    /// Decrypt `ciphertext` under the current sequence counter and advance it.
    pub fn open(&mut self, aad: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>> {
        let nonce = self.nonce();
        let plaintext = match self.suite.aead {
            HpkeAeadAlgorithm::Aes128Gcm => {
                let cipher = Aes128Gcm::new_from_slice(&self.key).map_err(|_| CryptoError::InvalidEncoding("bad HPKE key".to_owned()))?;
                cipher
                    .decrypt(Nonce::from_slice(&nonce), Payload { msg: ciphertext, aad })
                    .map_err(|_| CryptoError::Decrypt)?
            }
            HpkeAeadAlgorithm::Aes256Gcm => {
                let cipher = Aes256Gcm::new_from_slice(&self.key).map_err(|_| CryptoError::InvalidEncoding("bad HPKE key".to_owned()))?;
                cipher
                    .decrypt(Nonce::from_slice(&nonce), Payload { msg: ciphertext, aad })
                    .map_err(|_| CryptoError::Decrypt)?
            }
            HpkeAeadAlgorithm::ExportOnly => {
                return Err(CryptoError::UnsupportedAlgorithm("EXPORT_ONLY suites cannot seal/open".to_owned()))
            }
        };
        self.seq += 1;
        Ok(plaintext)
    }

    /// `Export`: derive `length` bytes of exported secret keying material, independent of `seq`.
    pub fn export(&self, exporter_context: &[u8], length: usize) -> Result<Vec<u8>> {
        labeled_expand(self.suite.kem.kdf(), &self.suite.suite_id(), &self.exporter_secret, b"sec", exporter_context, length)
    }
}

/// Sender-side single-shot setup (RFC 9180 §5.1.1, Base mode). Returns `(enc, Context)`: `enc`
/// must be sent to the receiver alongside any sealed ciphertexts.
pub fn setup_sender(suite: CipherSuite, recipient_public_key: &EcPublicKey, info: &[u8]) -> Result<(Vec<u8>, Context)> {
    let (shared_secret, enc) = encap(suite, recipient_public_key)?;
    let ks = key_schedule(suite, MODE_BASE, &shared_secret, info, b"", b"")?;
    Ok((
        enc,
        Context {
            suite,
            key: ks.key,
            base_nonce: ks.base_nonce,
            seq: 0,
            exporter_secret: ks.exporter_secret,
        },
    ))
}

/// Receiver-side single-shot setup (RFC 9180 §5.1.1, Base mode).
pub fn setup_receiver(suite: CipherSuite, enc: &[u8], recipient_private_key: &EcPrivateKey, info: &[u8]) -> Result<Context> {
    let shared_secret = decap(suite, enc, recipient_private_key)?;
    let ks = key_schedule(suite, MODE_BASE, &shared_secret, info, b"", b"")?;
    Ok(Context {
        suite,
        key: ks.key,
        base_nonce: ks.base_nonce,
        seq: 0,
        exporter_secret: ks.exporter_secret,
    })
}

/// Sender-side setup in PSK mode (RFC 9180 §5.1.2): `psk`/`psk_id` must match between sender and
/// receiver out-of-band.
pub fn setup_sender_psk(suite: CipherSuite, recipient_public_key: &EcPublicKey, info: &[u8], psk: &[u8], psk_id: &[u8]) -> Result<(Vec<u8>, Context)> {
    let (shared_secret, enc) = encap(suite, recipient_public_key)?;
    let ks = key_schedule(suite, MODE_PSK, &shared_secret, info, psk, psk_id)?;
    Ok((
        enc,
        Context {
            suite,
            key: ks.key,
            base_nonce: ks.base_nonce,
            seq: 0,
            exporter_secret: ks.exporter_secret,
        },
    ))
}

/// Receiver-side setup in PSK mode.
pub fn setup_receiver_psk(suite: CipherSuite, enc: &[u8], recipient_private_key: &EcPrivateKey, info: &[u8], psk: &[u8], psk_id: &[u8]) -> Result<Context> {
    let shared_secret = decap(suite, enc, recipient_private_key)?;
    let ks = key_schedule(suite, MODE_PSK, &shared_secret, info, psk, psk_id)?;
    Ok(Context {
        suite,
        key: ks.key,
        base_nonce: ks.base_nonce,
        seq: 0,
        exporter_secret: ks.exporter_secret,
    })
}

/// Sender-side setup in Auth mode (RFC 9180 §5.1.3): the sender additionally authenticates with
/// `sender_private_key`, and the receiver must know the corresponding public key out-of-band.
pub fn setup_sender_auth(
    suite: CipherSuite,
    recipient_public_key: &EcPublicKey,
    sender_private_key: &EcPrivateKey,
    info: &[u8],
) -> Result<(Vec<u8>, Context)> {
    let ephemeral = generate_kem_keypair(suite.kem)?;
    let dh_es = dh(suite.kem, &ephemeral, recipient_public_key)?;
    let dh_ss = dh(suite.kem, sender_private_key, recipient_public_key)?;
    let mut dh_secret = dh_es;
    dh_secret.extend_from_slice(&dh_ss);
    let enc = serialize_public_key(&ephemeral.public_key());
    let pkrm = serialize_public_key(recipient_public_key);
    let pksm = serialize_public_key(&sender_private_key.public_key());
    let mut kem_context = Vec::with_capacity(enc.len() + pkrm.len() + pksm.len());
    kem_context.extend_from_slice(&enc);
    kem_context.extend_from_slice(&pkrm);
    kem_context.extend_from_slice(&pksm);
    let kem_suite_id = suite.kem_suite_id();
    let kdf = suite.kem.kdf();
    let eae_prk = labeled_extract(kdf, &kem_suite_id, b"", b"eae_prk", &dh_secret);
    let shared_secret = labeled_expand(kdf, &kem_suite_id, &eae_prk, b"shared_secret", &kem_context, suite.kem.nsecret())?;
    let ks = key_schedule(suite, MODE_AUTH, &shared_secret, info, b"", b"")?;
    Ok((
        enc,
        Context {
            suite,
            key: ks.key,
            base_nonce: ks.base_nonce,
            seq: 0,
            exporter_secret: ks.exporter_secret,
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SUITE: CipherSuite = CipherSuite::new(KemAlgorithm::DhkemP256, HpkeAeadAlgorithm::Aes128Gcm);

    #[test]
    fn base_mode_round_trips() {
        let recipient = EcPrivateKey::generate(DoubleCoordinateCurve::P256).unwrap();
        let (enc, mut sender_ctx) = setup_sender(SUITE, &recipient.public_key(), b"info").unwrap();
        let mut receiver_ctx = setup_receiver(SUITE, &enc, &recipient, b"info").unwrap();

        let ciphertext = sender_ctx.seal(b"aad", b"hello hpke").unwrap();
        let plaintext = receiver_ctx.open(b"aad", &ciphertext).unwrap();
        assert_eq!(plaintext, b"hello hpke");
    }

    #[test]
    fn sequence_advances_each_call() {
        let recipient = EcPrivateKey::generate(DoubleCoordinateCurve::P256).unwrap();
        let (enc, mut sender_ctx) = setup_sender(SUITE, &recipient.public_key(), b"info").unwrap();
        let mut receiver_ctx = setup_receiver(SUITE, &enc, &recipient, b"info").unwrap();

        let c1 = sender_ctx.seal(b"", b"first").unwrap();
        let c2 = sender_ctx.seal(b"", b"first").unwrap();
        assert_ne!(c1, c2);
        assert_eq!(receiver_ctx.open(b"", &c1).unwrap(), b"first");
        assert_eq!(receiver_ctx.open(b"", &c2).unwrap(), b"first");
    }

    #[test]
    fn export_only_suite_rejects_seal() {
        let suite = CipherSuite::new(KemAlgorithm::DhkemX25519, HpkeAeadAlgorithm::ExportOnly);
        let recipient = EcPrivateKey::generate_okp(OkpCurve::X25519).unwrap();
        let (enc, mut sender_ctx) = setup_sender(suite, &recipient.public_key(), b"info").unwrap();
        let mut receiver_ctx = setup_receiver(suite, &enc, &recipient, b"info").unwrap();

        let exported_sender = sender_ctx.export(b"label", 32).unwrap();
        let exported_receiver = receiver_ctx.export(b"label", 32).unwrap();
        assert_eq!(exported_sender, exported_receiver);
        assert!(matches!(sender_ctx.seal(b"", b""), Err(CryptoError::UnsupportedAlgorithm(_))));
    }
}
