//! Negotiation error types.

/// Policy-level failures that drive a negotiation to the `Error` state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum TrustFailure {
    /// The device requires TOFU but the network does not enable it.
    #[error("trust on first use is required but not enabled for this network")]
    Unsupported,

    /// The anchor or server certificate was never received.
    #[error("root or server certificate missing")]
    MissingMaterial,

    /// The received chain failed structural validation.
    #[error("invalid server certificate chain")]
    InvalidChain,
}

/// A user response or timer firing that no longer applies.
///
/// Logged and dropped, never reported to the caller.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[non_exhaustive]
pub enum StaleResponse {
    #[error("no negotiation in progress")]
    NoNegotiation,

    #[error("response for {actual:?} but negotiating {expected:?}")]
    SsidMismatch { expected: String, actual: String },

    #[error("negotiation is not awaiting approval")]
    NotAwaitingApproval,

    #[error("timer was cancelled or superseded")]
    TimerSuperseded,
}
