//! Server certificate chain collection and structural validation.
//!
//! Certificates arrive one at a time, tagged with their depth (0 is the
//! server certificate, larger values are closer to the root). Two orderings
//! coexist and are intentionally not reconciled:
//!
//! - [`ChainAccumulator`] picks the trust-anchor candidate by maximum depth.
//! - [`validate_chain`] walks certificates in arrival order, treating the
//!   first one received as the root.

mod accumulator;
mod validator;

pub use accumulator::{AnchorCandidate, CertDepth, ChainAccumulator, SubmitError, SubmitOutcome};
pub use validator::{is_chain_valid, validate_chain, ChainDefect};
