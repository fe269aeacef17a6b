//! Reader-authentication verification support (§4.10): extracting the reader's certificate chain
//! from a COSE_Sign1's `x5chain` unprotected header (label 33, RFC 9360) and checking the
//! signature against its leaf.

use coset::Label;
use mdoc_core::error::MdocError;
use x509::CertificateChain;

const X5CHAIN_HEADER_LABEL: i64 = 33;

/// Pulls the DER-encoded certificate chain out of a COSE_Sign1's `x5chain` unprotected header
/// (RFC 9360 label 33), which may carry either a single certificate or an array of them.
pub fn extract_x5chain_der(cose: &coset::CoseSign1) -> Option<Vec<Vec<u8>>> {
    let (_, value) = cose.unprotected.rest.iter().find(|(label, _)| matches!(label, Label::Int(X5CHAIN_HEADER_LABEL)))?;

    match value {
        ciborium::value::Value::Bytes(der) => Some(vec![der.clone()]),
        ciborium::value::Value::Array(entries) => Some(
            entries
                .iter()
                .filter_map(|entry| match entry {
                    ciborium::value::Value::Bytes(der) => Some(der.clone()),
                    _ => None,
                })
                .collect(),
        ),
        _ => None,
    }
}

fn extract_x5chain(cose: &coset::CoseSign1) -> Option<CertificateChain> {
    let der_chain = extract_x5chain_der(cose)?;
    let certificates = der_chain.into_iter().map(x509::Certificate::from_der).collect::<x509::Result<Vec<_>>>().ok()?;
    CertificateChain::new(certificates).ok()
}

/// Builds the `verify_fn` closure `DeviceRequest::verify_reader_authentication` expects: for
/// each `readerAuth`, pull its `x5chain`, check the chain validates, then check the COSE
/// signature against the leaf's public key.
pub fn verify_reader_auth(cose: &coset::CoseSign1, structure_bytes: &[u8]) -> mdoc_core::error::Result<()> {
    let chain = extract_x5chain(cose).ok_or_else(|| MdocError::ReaderAuthVerification { index: usize::MAX })?;
    chain.validate().map_err(MdocError::X509)?;

    let alg = cose.protected.header.alg.clone().ok_or(MdocError::ReaderAuthVerification { index: usize::MAX })?;
    let sig_alg = signature_algorithm_from_cose(&alg).ok_or(MdocError::ReaderAuthVerification { index: usize::MAX })?;
    let leaf_public_key = chain.leaf().public_key().map_err(MdocError::X509)?;

    cbor::cose::verify_cose1_detached(cose, structure_bytes, b"", |sig, data| crypto::sign::check_signature(&leaf_public_key, data, sig_alg, sig))
        .map_err(|_| MdocError::ReaderAuthVerification { index: usize::MAX })
}

fn signature_algorithm_from_cose(alg: &coset::RegisteredLabelWithPrivate<coset::iana::Algorithm>) -> Option<crypto::sign::SignatureAlgorithm> {
    use coset::iana::Algorithm;
    use coset::RegisteredLabelWithPrivate::Assigned;
    match alg {
        Assigned(Algorithm::ES256) => Some(crypto::sign::SignatureAlgorithm::Es256),
        Assigned(Algorithm::ES384) => Some(crypto::sign::SignatureAlgorithm::Es384),
        Assigned(Algorithm::ES512) => Some(crypto::sign::SignatureAlgorithm::Es512),
        Assigned(Algorithm::EdDSA) => Some(crypto::sign::SignatureAlgorithm::Ed25519),
        _ => None,
    }
}
