//! Pure server-trust library for enterprise (EAP) networks.
//!
//! This crate is intentionally IO-free:
//! - No filesystem operations
//! - No network calls
//! - No timers
//! - No logging
//!
//! It answers one question for a connection attempt whose server presents a
//! certificate the device has no root to verify against: may the session
//! proceed, and under which trust model?
//!
//! - [`subject`] - Distinguished-name parsing
//! - [`cert`] - Certificate metadata extracted from DER
//! - [`network`] - Network identity and enterprise flags
//! - [`chain`] - Chain collection and structural validation
//! - [`policy`] - The Trust-On-First-Use decision function
//!
//! # Example
//!
//! ```
//! use eapgate_core::chain::{is_chain_valid, CertDepth, ChainAccumulator};
//! use eapgate_core::cert::CertEntry;
//! use eapgate_core::network::EnterpriseFlags;
//! use eapgate_core::policy::{decide, DeviceCapabilities, PolicyInput, TofuDecision};
//!
//! let mut chain = ChainAccumulator::new();
//! let root = CertEntry::new(vec![1], "CN=Corp Root", "CN=Corp Root", true);
//! let server = CertEntry::new(vec![2], "CN=radius.corp", "CN=Corp Root", false);
//! chain.submit(CertDepth::new(1), root).unwrap();
//! chain.submit(CertDepth::SERVER, server).unwrap();
//!
//! let device = DeviceCapabilities { tofu_supported: true, insecure_enterprise_allowed: false };
//! let flags = EnterpriseFlags { uses_server_cert: true, tofu_enabled: true, ..Default::default() };
//! let input = PolicyInput::new(device, &flags).with_material(
//!     chain.anchor().is_some(),
//!     chain.server_cert().is_some(),
//!     is_chain_valid(chain.chain()),
//! );
//! assert_eq!(decide(&input), TofuDecision::NeedsApproval);
//! ```

pub mod cert;
pub mod chain;
pub mod network;
pub mod policy;
pub mod subject;

pub use cert::{CertEntry, CertError, CertFingerprint};
pub use chain::{AnchorCandidate, CertDepth, ChainAccumulator, SubmitError, SubmitOutcome};
pub use network::{EnterpriseFlags, InterfaceName, NetworkId, NetworkRef};
pub use policy::{DeviceCapabilities, PolicyInput, TofuDecision};
pub use subject::{SubjectError, SubjectInfo};
