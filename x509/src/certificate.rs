//! Lazily parsed X.509 certificates (§3, §4.4). Only the outer `Certificate ::= SEQUENCE` is
//! validated at construction time; every accessor parses the substructure it needs from the
//! retained DER bytes. This preserves the exact signed bytes (`tbs_certificate`) for
//! verification regardless of how the rest of the structure is later re-encoded.

use std::collections::BTreeMap;

use chrono::DateTime;
use chrono::Utc;
use crypto::keys::EcPublicKey;
use x509_parser::extensions::ParsedExtension;
use x509_parser::prelude::FromDer;
use x509_parser::prelude::X509Certificate as ParsedX509Certificate;

use crate::algorithm;
use crate::error::Result;
use crate::error::X509Error;

/// Purposes drawn from the `KeyUsage` extension (RFC 5280 §4.2.1.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyUsagePurpose {
    DigitalSignature,
    NonRepudiation,
    KeyEncipherment,
    DataEncipherment,
    KeyAgreement,
    KeyCertSign,
    CrlSign,
    EncipherOnly,
    DecipherOnly,
}

#[derive(Debug, Clone)]
pub struct Certificate {
    der: Vec<u8>,
}

impl Certificate {
    pub fn from_der(der: Vec<u8>) -> Result<Self> {
        let (_, _) = ParsedX509Certificate::from_der(&der).map_err(|e| X509Error::Parse(e.to_string()))?;
        Ok(Self { der })
    }

    pub fn from_pem(pem_str: &str) -> Result<Self> {
        let pem = pem::parse(pem_str).map_err(|e| X509Error::Parse(e.to_string()))?;
        Self::from_der(pem.contents().to_vec())
    }

    pub fn to_der(&self) -> &[u8] {
        &self.der
    }

    pub fn to_pem(&self) -> String {
        let pem = pem::Pem::new("CERTIFICATE", self.der.clone());
        pem::encode(&pem)
    }

    fn parsed(&self) -> ParsedX509Certificate<'_> {
        ParsedX509Certificate::from_der(&self.der)
            .expect("bytes were validated in from_der")
            .1
    }

    pub fn version(&self) -> u32 {
        self.parsed().version().0
    }

    pub fn serial_hex(&self) -> String {
        self.parsed().raw_serial_as_string()
    }

    pub fn subject(&self) -> String {
        self.parsed().subject().to_string()
    }

    pub fn issuer(&self) -> String {
        self.parsed().issuer().to_string()
    }

    pub fn not_before(&self) -> Result<DateTime<Utc>> {
        asn1_time_to_chrono(self.parsed().validity().not_before.timestamp())
    }

    pub fn not_after(&self) -> Result<DateTime<Utc>> {
        asn1_time_to_chrono(self.parsed().validity().not_after.timestamp())
    }

    pub fn is_valid_at(&self, now: DateTime<Utc>) -> Result<bool> {
        Ok(now >= self.not_before()? && now < self.not_after()?)
    }

    /// The certificate's EC public key, dispatched to the right curve via the SPKI's
    /// `namedCurve` OID (or, for OKP curves, the SPKI algorithm OID itself).
    pub fn public_key(&self) -> Result<EcPublicKey> {
        let spki = &self.parsed().tbs_certificate.subject_pki;
        let alg_oid = spki.algorithm.algorithm.to_id_string();

        if let Ok(sig_alg) = algorithm::signature_algorithm_from_oid(&alg_oid) {
            if matches!(sig_alg, crypto::sign::SignatureAlgorithm::Ed25519 | crypto::sign::SignatureAlgorithm::Ed448) {
                let curve = match sig_alg {
                    crypto::sign::SignatureAlgorithm::Ed25519 => crypto::curve::OkpCurve::Ed25519,
                    _ => crypto::curve::OkpCurve::Ed448,
                };
                let x = spki.subject_public_key.data.to_vec();
                let key = crypto::keys::okp::OkpPublicKey::new(curve, x)?;
                return Ok(EcPublicKey::Okp(key));
            }
        }

        let curve_oid = spki
            .algorithm
            .parameters
            .as_ref()
            .and_then(|params| params.as_oid().ok())
            .map(|oid| oid.to_id_string())
            .ok_or_else(|| X509Error::Extension("subjectPublicKeyInfo.algorithm.parameters (namedCurve)".to_owned()))?;
        let curve = algorithm::curve_from_oid(&curve_oid)?;

        let spki_pem_bytes = spki.raw;
        let pem = pem::encode(&pem::Pem::new("PUBLIC KEY", spki_pem_bytes.to_vec()));
        Ok(EcPublicKey::DoubleCoordinate(crypto::keys::double_coordinate::DoubleCoordinatePublicKey::from_spki_pem(
            curve, &pem,
        )?))
    }

    fn signature_algorithm(&self) -> Result<crypto::sign::SignatureAlgorithm> {
        let oid = self.parsed().signature_algorithm.algorithm.to_id_string();
        algorithm::signature_algorithm_from_oid(&oid)
    }

    /// Verify this certificate's signature under `issuer_public_key` (or its own public key, for
    /// a self-signed certificate).
    pub fn verify(&self, issuer_public_key: &EcPublicKey) -> Result<()> {
        let parsed = self.parsed();
        let tbs = parsed.tbs_certificate.as_ref();
        let signature = parsed.signature_value.data.as_ref();
        let alg = self.signature_algorithm()?;

        let signature = match alg {
            crypto::sign::SignatureAlgorithm::Ed25519 | crypto::sign::SignatureAlgorithm::Ed448 => signature.to_vec(),
            _ => signature.to_vec(),
        };

        crypto::sign::check_signature(issuer_public_key, tbs, alg, &signature).map_err(|_| X509Error::SignatureVerification)
    }

    pub fn subject_key_identifier(&self) -> Result<Vec<u8>> {
        for ext in self.parsed().extensions() {
            if let ParsedExtension::SubjectKeyIdentifier(id) = ext.parsed_extension() {
                return Ok(id.0.to_vec());
            }
        }
        Err(X509Error::Extension("subjectKeyIdentifier".to_owned()))
    }

    pub fn authority_key_identifier(&self) -> Option<Vec<u8>> {
        self.parsed().extensions().iter().find_map(|ext| match ext.parsed_extension() {
            ParsedExtension::AuthorityKeyIdentifier(aki) => aki.key_identifier.as_ref().map(|id| id.0.to_vec()),
            _ => None,
        })
    }

    pub fn key_usage(&self) -> Result<BTreeMap<KeyUsagePurpose, bool>> {
        for ext in self.parsed().extensions() {
            if let ParsedExtension::KeyUsage(ku) = ext.parsed_extension() {
                let mut map = BTreeMap::new();
                map.insert(KeyUsagePurpose::DigitalSignature, ku.digital_signature());
                map.insert(KeyUsagePurpose::NonRepudiation, ku.non_repudiation());
                map.insert(KeyUsagePurpose::KeyEncipherment, ku.key_encipherment());
                map.insert(KeyUsagePurpose::DataEncipherment, ku.data_encipherment());
                map.insert(KeyUsagePurpose::KeyAgreement, ku.key_agreement());
                map.insert(KeyUsagePurpose::KeyCertSign, ku.key_cert_sign());
                map.insert(KeyUsagePurpose::CrlSign, ku.crl_sign());
                map.insert(KeyUsagePurpose::EncipherOnly, ku.encipher_only());
                map.insert(KeyUsagePurpose::DecipherOnly, ku.decipher_only());
                return Ok(map);
            }
        }
        Err(X509Error::Extension("keyUsage".to_owned()))
    }

    pub fn basic_constraints(&self) -> Option<(bool, Option<u32>)> {
        self.parsed().extensions().iter().find_map(|ext| match ext.parsed_extension() {
            ParsedExtension::BasicConstraints(bc) => Some((bc.ca, bc.path_len_constraint)),
            _ => None,
        })
    }

    pub fn is_self_signed(&self) -> bool {
        self.subject() == self.issuer()
    }
}

impl PartialEq for Certificate {
    fn eq(&self, other: &Self) -> bool {
        self.der == other.der
    }
}
impl Eq for Certificate {}

fn asn1_time_to_chrono(unix_timestamp: i64) -> Result<DateTime<Utc>> {
    DateTime::from_timestamp(unix_timestamp, 0).ok_or_else(|| X509Error::Parse("timestamp out of range".to_owned()))
}

impl KeyUsagePurpose {}
