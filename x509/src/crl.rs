//! Certificate Revocation Lists (§3): just enough to answer "is this serial revoked, and as of
//! when".

use chrono::DateTime;
use chrono::Utc;
use x509_parser::prelude::CertificateRevocationList as ParsedCrl;
use x509_parser::prelude::FromDer;

use crate::error::Result;
use crate::error::X509Error;

#[derive(Debug, Clone)]
pub struct Crl {
    der: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct RevokedEntry {
    pub serial_hex: String,
    pub revocation_time: DateTime<Utc>,
}

impl Crl {
    pub fn from_der(der: Vec<u8>) -> Result<Self> {
        ParsedCrl::from_der(&der).map_err(|e| X509Error::ParseCrl(e.to_string()))?;
        Ok(Self { der })
    }

    fn parsed(&self) -> ParsedCrl<'_> {
        ParsedCrl::from_der(&self.der).expect("validated in from_der").1
    }

    pub fn issuer(&self) -> String {
        self.parsed().issuer().to_string()
    }

    pub fn this_update(&self) -> Result<DateTime<Utc>> {
        timestamp_to_chrono(self.parsed().last_update().timestamp())
    }

    pub fn next_update(&self) -> Result<Option<DateTime<Utc>>> {
        self.parsed().next_update().map(|t| timestamp_to_chrono(t.timestamp())).transpose()
    }

    pub fn revoked_entries(&self) -> Result<Vec<RevokedEntry>> {
        self.parsed()
            .iter_revoked_certificates()
            .map(|entry| {
                Ok(RevokedEntry {
                    serial_hex: entry.raw_serial_as_string(),
                    revocation_time: timestamp_to_chrono(entry.revocation_date.timestamp())?,
                })
            })
            .collect()
    }

    pub fn is_revoked(&self, serial_hex: &str) -> Result<bool> {
        Ok(self.revoked_entries()?.iter().any(|entry| entry.serial_hex.eq_ignore_ascii_case(serial_hex)))
    }
}

fn timestamp_to_chrono(unix_timestamp: i64) -> Result<DateTime<Utc>> {
    DateTime::from_timestamp(unix_timestamp, 0).ok_or_else(|| X509Error::ParseCrl("timestamp out of range".to_owned()))
}
