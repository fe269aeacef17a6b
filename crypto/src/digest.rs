use sha2::Digest as _;
use sha2::Sha384;
use sha2::Sha512;
use sha2::Sha256;

/// Digest algorithms usable standalone (§4.1) and as the MSO `digestAlgorithm` (§4.10).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DigestAlgorithm {
    Sha256,
    Sha384,
    Sha512,
}

impl DigestAlgorithm {
    pub const fn output_len(self) -> usize {
        match self {
            Self::Sha256 => 32,
            Self::Sha384 => 48,
            Self::Sha512 => 64,
        }
    }
}

pub fn digest(alg: DigestAlgorithm, msg: &[u8]) -> Vec<u8> {
    match alg {
        DigestAlgorithm::Sha256 => Sha256::digest(msg).to_vec(),
        DigestAlgorithm::Sha384 => Sha384::digest(msg).to_vec(),
        DigestAlgorithm::Sha512 => Sha512::digest(msg).to_vec(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sha256_of_empty_string() {
        let got = digest(DigestAlgorithm::Sha256, b"");
        assert_eq!(
            hex::encode(got),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }
}
