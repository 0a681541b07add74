//! Structural validation of a chain as received.

use crate::cert::CertEntry;

/// Why a chain failed structural validation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum ChainDefect {
    #[error("no certificates were received")]
    Empty,

    /// The first certificate is neither self-signed nor a CA.
    #[error("root certificate {subject:?} is not a CA or self-signed certificate")]
    RootNotTrustable { subject: String },

    /// A certificate's issuer does not name its predecessor's subject.
    #[error("certificate {index} issuer {issuer:?} does not match parent subject {parent_subject:?}")]
    BrokenLink {
        index: usize,
        issuer: String,
        parent_subject: String,
    },
}

/// Check issuer/subject linkage of `chain` in arrival order.
///
/// The first entry is the presumed root and must be self-signed or carry a
/// CA basic constraint. Every later entry's issuer must equal the subject of
/// the entry right before it. The chain is not re-sorted by depth.
///
/// # Errors
///
/// Returns the first [`ChainDefect`] encountered.
pub fn validate_chain(chain: &[CertEntry]) -> Result<(), ChainDefect> {
    let (root, rest) = chain.split_first().ok_or(ChainDefect::Empty)?;

    if !root.is_ca() && !root.is_self_signed() {
        return Err(ChainDefect::RootNotTrustable {
            subject: root.subject().to_string(),
        });
    }

    let mut parent = root;
    for (offset, cert) in rest.iter().enumerate() {
        if cert.issuer() != parent.subject() {
            return Err(ChainDefect::BrokenLink {
                index: offset + 1,
                issuer: cert.issuer().to_string(),
                parent_subject: parent.subject().to_string(),
            });
        }
        parent = cert;
    }

    Ok(())
}

/// Boolean form of [`validate_chain`].
#[must_use]
pub fn is_chain_valid(chain: &[CertEntry]) -> bool {
    validate_chain(chain).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cert(tag: u8, subject: &str, issuer: &str, is_ca: bool) -> CertEntry {
        CertEntry::new(vec![tag], subject, issuer, is_ca)
    }

    fn three_level_chain() -> Vec<CertEntry> {
        vec![
            cert(1, "CN=Root", "CN=Root", true),
            cert(2, "CN=Intermediate", "CN=Root", true),
            cert(3, "CN=radius.corp", "CN=Intermediate", false),
        ]
    }

    #[test]
    fn test_empty_chain_is_invalid() {
        assert_eq!(validate_chain(&[]), Err(ChainDefect::Empty));
        assert!(!is_chain_valid(&[]));
    }

    #[test]
    fn test_linked_chain_is_valid() {
        assert!(is_chain_valid(&three_level_chain()));
    }

    #[test]
    fn test_single_self_signed_root_is_valid() {
        assert!(is_chain_valid(&[cert(1, "CN=Root", "CN=Root", false)]));
    }

    #[test]
    fn test_ca_flagged_root_need_not_be_self_signed() {
        let chain = [
            cert(1, "CN=Sub CA", "CN=Offline Root", true),
            cert(2, "CN=radius.corp", "CN=Sub CA", false),
        ];
        assert!(is_chain_valid(&chain));
    }

    #[test]
    fn test_untrustable_root_is_invalid() {
        let chain = [cert(1, "CN=leaf", "CN=someone", false)];
        assert!(matches!(
            validate_chain(&chain),
            Err(ChainDefect::RootNotTrustable { .. })
        ));
    }

    #[test]
    fn test_broken_issuer_link_is_invalid() {
        let mut chain = three_level_chain();
        chain[2] = cert(3, "CN=radius.corp", "CN=Somebody Else", false);

        assert_eq!(
            validate_chain(&chain),
            Err(ChainDefect::BrokenLink {
                index: 2,
                issuer: "CN=Somebody Else".into(),
                parent_subject: "CN=Intermediate".into(),
            })
        );
    }

    #[test]
    fn test_broken_subject_link_is_invalid() {
        let mut chain = three_level_chain();
        chain[1] = cert(2, "CN=Renamed", "CN=Root", true);
        assert!(!is_chain_valid(&chain));
    }

    #[test]
    fn test_leaf_first_arrival_is_invalid() {
        // Arrival order is authoritative; leaf-first chains fail.
        let mut chain = three_level_chain();
        chain.reverse();
        assert!(!is_chain_valid(&chain));
    }
}
