//! Certificate chains (§3, §8): an ordered leaf-to-root list, with the x5c (RFC 7515 `x5c`-style)
//! wire encoding used by COSE `x5chain` headers and JWS headers alike.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

use crate::certificate::Certificate;
use crate::error::Result;
use crate::error::X509Error;

#[derive(Debug, Clone)]
pub struct CertificateChain(Vec<Certificate>);

impl CertificateChain {
    pub fn new(certificates: Vec<Certificate>) -> Result<Self> {
        if certificates.is_empty() {
            return Err(X509Error::EmptyChain);
        }
        Ok(Self(certificates))
    }

    pub fn leaf(&self) -> &Certificate {
        &self.0[0]
    }

    pub fn certificates(&self) -> &[Certificate] {
        &self.0
    }

    /// Verify that each certificate in the chain is signed by the next, and (if the last
    /// certificate is self-signed) that its own signature checks out too.
    pub fn validate(&self) -> Result<()> {
        for window in self.0.windows(2) {
            let [subject, issuer] = window else { unreachable!() };
            subject.verify(&issuer.public_key()?)?;
        }
        if let Some(last) = self.0.last() {
            if last.is_self_signed() {
                last.verify(&last.public_key()?)?;
            }
        }
        Ok(())
    }

    /// `x5c`: a list of non-URL-safe, padded base64 DER certificates, leaf first. `exclude_root`
    /// drops the last element when it is self-signed, matching common relying-party convention
    /// of not re-shipping a root the verifier already trusts out of band.
    pub fn to_x5c(&self, exclude_root: bool) -> Vec<String> {
        let mut certs = self.0.as_slice();
        if exclude_root {
            if let Some(last) = certs.last() {
                if last.is_self_signed() {
                    certs = &certs[..certs.len() - 1];
                }
            }
        }
        certs.iter().map(|c| STANDARD.encode(c.to_der())).collect()
    }

    pub fn from_x5c(x5c: &[String]) -> Result<Self> {
        let certs = x5c
            .iter()
            .map(|entry| {
                let der = STANDARD.decode(entry).map_err(|e| X509Error::Parse(e.to_string()))?;
                Certificate::from_der(der)
            })
            .collect::<Result<Vec<_>>>()?;
        Self::new(certs)
    }
}

#[cfg(all(test, feature = "generate"))]
mod tests {
    use super::*;
    use crate::builder::CertificateBuilder;
    use crypto::curve::DoubleCoordinateCurve;
    use crypto::keys::EcPrivateKey;

    #[test]
    fn single_self_signed_cert_validates() {
        let key = EcPrivateKey::generate(DoubleCoordinateCurve::P256).unwrap();
        let cert = CertificateBuilder::new("CN=root")
            .self_signed(&key)
            .unwrap();
        let chain = CertificateChain::new(vec![cert]).unwrap();
        chain.validate().unwrap();
    }

    #[test]
    fn x5c_round_trips() {
        let key = EcPrivateKey::generate(DoubleCoordinateCurve::P256).unwrap();
        let cert = CertificateBuilder::new("CN=root").self_signed(&key).unwrap();
        let chain = CertificateChain::new(vec![cert]).unwrap();
        let x5c = chain.to_x5c(false);
        let back = CertificateChain::from_x5c(&x5c).unwrap();
        assert_eq!(chain.leaf().to_der(), back.leaf().to_der());
    }
}
