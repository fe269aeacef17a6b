use rand::rngs::OsRng;
use rand::RngCore;

/// Fill a freshly allocated buffer of `len` bytes from a cryptographically secure source.
///
/// Used wherever the spec calls for "cryptographically secure randomness": AEAD nonces that
/// are not otherwise derived from a counter, ephemeral key generation, and issuer-namespace
/// digest-ID assignment.
pub fn random_bytes(len: usize) -> Vec<u8> {
    let mut bytes = vec![0u8; len];
    OsRng.fill_bytes(&mut bytes);
    bytes
}

pub fn sha256(msg: &[u8]) -> Vec<u8> {
    use sha2::Digest;
    sha2::Sha256::digest(msg).to_vec()
}
