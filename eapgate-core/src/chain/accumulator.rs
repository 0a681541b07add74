//! Collects the certificates presented during one negotiation.

use std::fmt;

use crate::cert::CertEntry;
use crate::subject::{SubjectError, SubjectInfo};

/// Position of a certificate in the server's chain. 0 is the server cert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CertDepth(u32);

impl CertDepth {
    /// Depth of the server (leaf) certificate.
    pub const SERVER: CertDepth = CertDepth(0);

    pub fn new(depth: u32) -> Self {
        Self(depth)
    }

    pub fn is_server(self) -> bool {
        self.0 == 0
    }
}

impl TryFrom<i32> for CertDepth {
    type Error = SubmitError;

    fn try_from(depth: i32) -> Result<Self, Self::Error> {
        u32::try_from(depth)
            .map(CertDepth)
            .map_err(|_| SubmitError::InvalidInput("negative certificate depth"))
    }
}

impl fmt::Display for CertDepth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Errors returned when a certificate cannot be cached.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum SubmitError {
    /// Bad arguments (negative depth, absent certificate, no negotiation).
    #[error("invalid input: {0}")]
    InvalidInput(&'static str),

    /// The anchor candidate's subject DN could not be parsed.
    #[error("malformed certificate subject: {0}")]
    MalformedSubject(#[source] SubjectError),

    /// The anchor candidate's issuer DN could not be parsed.
    #[error("malformed certificate issuer: {0}")]
    MalformedIssuer(#[source] SubjectError),
}

/// How an accepted certificate was recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Became the trust-anchor candidate.
    Anchor,
    /// Recorded in the chain only; a deeper anchor is already known.
    Intermediate,
}

/// The certificate currently treated as the root of trust.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnchorCandidate {
    pub cert: CertEntry,
    pub depth: CertDepth,
    pub subject: SubjectInfo,
    pub issuer: SubjectInfo,
}

/// Certificate state for a single negotiation.
///
/// Invariant: the anchor depth never decreases between resets.
#[derive(Debug, Clone, Default)]
pub struct ChainAccumulator {
    chain: Vec<CertEntry>,
    server_cert: Option<CertEntry>,
    anchor: Option<AnchorCandidate>,
}

impl ChainAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop everything collected so far.
    pub fn reset(&mut self) {
        self.chain.clear();
        self.server_cert = None;
        self.anchor = None;
    }

    /// Record one certificate received at `depth`.
    ///
    /// The certificate is appended to the chain (unless already present) and
    /// recorded as the server certificate when it is the first at depth 0,
    /// before any anchor bookkeeping. A certificate at least as deep as the
    /// current anchor replaces it, provided its subject and issuer parse.
    ///
    /// # Errors
    ///
    /// - `SubmitError::InvalidInput` for an empty DER encoding.
    /// - `SubmitError::MalformedSubject` / `SubmitError::MalformedIssuer`
    ///   when an anchor candidate's names do not parse; the previous anchor
    ///   is kept.
    pub fn submit(&mut self, depth: CertDepth, cert: CertEntry) -> Result<SubmitOutcome, SubmitError> {
        if cert.der().is_empty() {
            return Err(SubmitError::InvalidInput("absent certificate"));
        }

        if !self.chain.contains(&cert) {
            self.chain.push(cert.clone());
        }

        if depth.is_server() && self.server_cert.is_none() {
            self.server_cert = Some(cert.clone());
        }

        if let Some(anchor) = &self.anchor {
            if depth < anchor.depth {
                return Ok(SubmitOutcome::Intermediate);
            }
        }

        let subject = SubjectInfo::parse(cert.subject()).map_err(SubmitError::MalformedSubject)?;
        let issuer = SubjectInfo::parse(cert.issuer()).map_err(SubmitError::MalformedIssuer)?;

        self.anchor = Some(AnchorCandidate {
            cert,
            depth,
            subject,
            issuer,
        });
        Ok(SubmitOutcome::Anchor)
    }

    /// Certificates in arrival order, deduplicated.
    pub fn chain(&self) -> &[CertEntry] {
        &self.chain
    }

    pub fn server_cert(&self) -> Option<&CertEntry> {
        self.server_cert.as_ref()
    }

    pub fn anchor(&self) -> Option<&AnchorCandidate> {
        self.anchor.as_ref()
    }

    pub fn is_empty(&self) -> bool {
        self.chain.is_empty()
    }
}
