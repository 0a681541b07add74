//! Certificate metadata as presented by an EAP server.
//!
//! # Security
//!
//! - Input is limited to 16KB to prevent DoS
//! - The x509_parser library handles ASN.1 parsing safely
//! - No signature verification happens here; entries carry metadata only

use std::fmt;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use sha2::{Digest, Sha256};
use thiserror::Error;
use x509_parser::prelude::*;

/// Maximum certificate size (16KB is generous for a single cert)
pub const MAX_CERT_SIZE: usize = 16 * 1024;

/// Errors that can occur during certificate parsing.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CertError {
    #[error("certificate too large: {0} bytes (max {MAX_CERT_SIZE})")]
    TooLarge(usize),

    #[error("failed to parse X.509 certificate: {0}")]
    Parse(String),
}

/// One certificate from a server-presented chain.
///
/// Immutable once built. Two entries are the same certificate when their DER
/// encodings are byte-identical.
#[derive(Clone)]
pub struct CertEntry {
    der: Vec<u8>,
    subject: String,
    issuer: String,
    is_ca: bool,
    signature: Vec<u8>,
}

impl CertEntry {
    /// Build an entry from already-parsed metadata.
    pub fn new(
        der: impl Into<Vec<u8>>,
        subject: impl Into<String>,
        issuer: impl Into<String>,
        is_ca: bool,
    ) -> Self {
        Self {
            der: der.into(),
            subject: subject.into(),
            issuer: issuer.into(),
            is_ca,
            signature: Vec::new(),
        }
    }

    /// Attach the certificate's signature bytes (builder pattern).
    pub fn with_signature(mut self, signature: impl Into<Vec<u8>>) -> Self {
        self.signature = signature.into();
        self
    }

    /// Extract metadata from a DER-encoded X.509 certificate.
    ///
    /// # Errors
    ///
    /// Returns `CertError::TooLarge` if certificate exceeds 16KB.
    /// Returns `CertError::Parse` if the certificate is malformed.
    pub fn from_der(cert_der: &[u8]) -> Result<Self, CertError> {
        // Input size validation (DoS protection)
        if cert_der.len() > MAX_CERT_SIZE {
            return Err(CertError::TooLarge(cert_der.len()));
        }

        let (_, cert) = X509Certificate::from_der(cert_der)
            .map_err(|e| CertError::Parse(format!("{:?}", e)))?;

        let is_ca = cert
            .basic_constraints()
            .map_err(|e| CertError::Parse(format!("{:?}", e)))?
            .map(|ext| ext.value.ca)
            .unwrap_or(false);

        Ok(Self {
            der: cert_der.to_vec(),
            subject: cert.subject().to_string(),
            issuer: cert.issuer().to_string(),
            is_ca,
            signature: cert.signature_value.data.to_vec(),
        })
    }

    /// Raw DER bytes (may be empty for metadata-only entries).
    pub fn der(&self) -> &[u8] {
        &self.der
    }

    /// Subject distinguished name.
    pub fn subject(&self) -> &str {
        &self.subject
    }

    /// Issuer distinguished name.
    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    /// Whether the basic-constraints extension marks this as a CA.
    pub fn is_ca(&self) -> bool {
        self.is_ca
    }

    /// Subject equals issuer.
    pub fn is_self_signed(&self) -> bool {
        self.subject == self.issuer
    }

    pub fn signature(&self) -> &[u8] {
        &self.signature
    }

    /// Lowercase hex of the first `chars` characters of the signature.
    ///
    /// Returns `None` when the entry carries no signature.
    pub fn signature_hex_prefix(&self, chars: usize) -> Option<String> {
        if self.signature.is_empty() {
            return None;
        }
        let mut encoded = hex::encode(&self.signature);
        encoded.truncate(chars);
        Some(encoded)
    }

    /// SHA-256 fingerprint of the DER encoding.
    pub fn fingerprint(&self) -> CertFingerprint {
        CertFingerprint::of(&self.der)
    }
}

impl PartialEq for CertEntry {
    fn eq(&self, other: &Self) -> bool {
        self.der == other.der
    }
}

impl Eq for CertEntry {}

impl std::hash::Hash for CertEntry {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.der.hash(state);
    }
}

impl fmt::Debug for CertEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CertEntry")
            .field("subject", &self.subject)
            .field("issuer", &self.issuer)
            .field("is_ca", &self.is_ca)
            .field("fingerprint", &self.fingerprint())
            .finish()
    }
}

/// Display form of a certificate digest: `SHA256:{base64url_no_padding}`.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct CertFingerprint(String);

impl CertFingerprint {
    /// The prefix used for fingerprint strings.
    pub const PREFIX: &'static str = "SHA256:";

    fn of(bytes: &[u8]) -> Self {
        let hash = Sha256::digest(bytes);
        Self(format!("{}{}", Self::PREFIX, URL_SAFE_NO_PAD.encode(hash)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CertFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for CertFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CertFingerprint({})", self.0)
    }
}
