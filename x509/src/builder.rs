//! Certificate construction (§4.4), feature-gated behind `generate` since it is only needed by
//! issuer-side tooling and tests, not by the holder/verifier runtime. Delegates the ASN.1
//! bookkeeping to `rcgen`, signing with our own key types by handing `rcgen` their PKCS#8 PEM.

use chrono::DateTime;
use chrono::Utc;
use crypto::keys::EcPrivateKey;
use rcgen::BasicConstraints;
use rcgen::CertificateParams;
use rcgen::DistinguishedName;
use rcgen::DnType;
use rcgen::IsCa;
use rcgen::KeyPair;
use rcgen::KeyUsagePurpose as RcgenKeyUsagePurpose;

use crate::certificate::Certificate;
use crate::error::Result;
use crate::error::X509Error;

pub struct CertificateBuilder {
    subject: String,
    not_before: Option<DateTime<Utc>>,
    not_after: Option<DateTime<Utc>>,
    is_ca: bool,
    path_len: Option<u8>,
    key_usages: Vec<RcgenKeyUsagePurpose>,
}

impl CertificateBuilder {
    /// `subject` is a `"CN=..."` string; only the common name is honored (the spec's extension
    /// helpers care about key usage and SKI/AKI, not full RDN sequences).
    pub fn new(subject: &str) -> Self {
        Self {
            subject: subject.to_owned(),
            not_before: None,
            not_after: None,
            is_ca: false,
            path_len: None,
            key_usages: vec![RcgenKeyUsagePurpose::DigitalSignature],
        }
    }

    pub fn validity(mut self, not_before: DateTime<Utc>, not_after: DateTime<Utc>) -> Self {
        self.not_before = Some(not_before);
        self.not_after = Some(not_after);
        self
    }

    pub fn ca(mut self, path_len: Option<u8>) -> Self {
        self.is_ca = true;
        self.path_len = path_len;
        self.key_usages = vec![RcgenKeyUsagePurpose::KeyCertSign, RcgenKeyUsagePurpose::CrlSign];
        self
    }

    fn params(&self) -> Result<CertificateParams> {
        let mut params = CertificateParams::new(Vec::<String>::new()).map_err(|e| X509Error::Build(e.to_string()))?;

        let mut dn = DistinguishedName::new();
        dn.push(DnType::CommonName, common_name(&self.subject));
        params.distinguished_name = dn;

        if let (Some(nb), Some(na)) = (self.not_before, self.not_after) {
            params.not_before = chrono_to_rcgen_time(nb)?;
            params.not_after = chrono_to_rcgen_time(na)?;
        }

        params.is_ca = if self.is_ca {
            IsCa::Ca(self.path_len.map(BasicConstraints::Constrained).unwrap_or(BasicConstraints::Unconstrained))
        } else {
            IsCa::NoCa
        };
        params.key_usages = self.key_usages.clone();

        Ok(params)
    }

    /// Build and self-sign, using `key` as both the certificate's public key and the signer.
    pub fn self_signed(self, key: &EcPrivateKey) -> Result<Certificate> {
        let params = self.params()?;
        let key_pair = rcgen_key_pair(key)?;
        let cert = params.self_signed(&key_pair).map_err(|e| X509Error::Build(e.to_string()))?;
        Certificate::from_der(cert.der().to_vec())
    }

    /// Build and sign with `issuer_key`, chaining to `issuer_cert` (whose own DER is re-parsed
    /// only to satisfy `rcgen`'s API; its bytes are not altered).
    pub fn signed_by(self, subject_key: &EcPrivateKey, issuer_cert: &Certificate, issuer_key: &EcPrivateKey) -> Result<Certificate> {
        let params = self.params()?;
        let subject_key_pair = rcgen_key_pair(subject_key)?;
        let issuer_key_pair = rcgen_key_pair(issuer_key)?;
        let issuer_params = CertificateParams::from_ca_cert_der(&rcgen::CertificateDer::from(issuer_cert.to_der().to_vec()))
            .map_err(|e| X509Error::Build(e.to_string()))?;
        let issuer = issuer_params
            .self_signed(&issuer_key_pair)
            .map_err(|e| X509Error::Build(e.to_string()))?;
        let cert = params
            .signed_by(&subject_key_pair, &issuer, &issuer_key_pair)
            .map_err(|e| X509Error::Build(e.to_string()))?;
        Certificate::from_der(cert.der().to_vec())
    }
}

fn common_name(subject: &str) -> String {
    subject.strip_prefix("CN=").unwrap_or(subject).to_owned()
}

/// `rcgen` validity bounds are `time::OffsetDateTime`; fractional seconds are truncated, matching
/// §4.4's "fractional seconds are truncated with a logged warning" rule (the warning is the
/// caller's responsibility when it knows the original had sub-second precision).
fn chrono_to_rcgen_time(dt: DateTime<Utc>) -> Result<time::OffsetDateTime> {
    time::OffsetDateTime::from_unix_timestamp(dt.timestamp()).map_err(|e| X509Error::Build(e.to_string()))
}

fn rcgen_key_pair(key: &EcPrivateKey) -> Result<KeyPair> {
    let pem = match key {
        EcPrivateKey::DoubleCoordinate(d) => d.to_pkcs8_pem()?,
        EcPrivateKey::Okp(o) => o.to_pkcs8_pem()?,
    };
    KeyPair::from_pem(&pem).map_err(|e| X509Error::Build(e.to_string()))
}
