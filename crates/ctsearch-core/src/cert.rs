// ── Certificate data model ────────────────────────────────────

use x509_parser::prelude::*;

use crate::cacher::fingerprint;
use crate::error::CtSearchError;

/// The structured view of a certificate, produced only downstream of the
/// pre-filter stage. Holds the raw bytes alongside the parsed names so
/// callers never need to re-parse to recover the original DER.
pub struct ParsedCertificate {
    der: Vec<u8>,
    issuer: String,
    subject: String,
}

impl ParsedCertificate {
    /// Parse `der` as an ASN.1 DER X.509 certificate.
    pub fn parse(der: Vec<u8>) -> Result<Self, CtSearchError> {
        let (_, cert) = X509Certificate::from_der(&der)
            .map_err(|e| CtSearchError::CertParse(e.to_string()))?;
        let issuer = cert.issuer().to_string();
        let subject = cert.subject().to_string();
        Ok(ParsedCertificate {
            der,
            issuer,
            subject,
        })
    }

    pub fn raw(&self) -> &[u8] {
        &self.der
    }

    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    /// The SHA-256 fingerprint of the raw DER bytes.
    pub fn fingerprint(&self) -> [u8; 32] {
        fingerprint(&self.der)
    }
}
