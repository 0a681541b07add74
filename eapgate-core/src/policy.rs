//! Trust-On-First-Use policy.
//!
//! [`decide`] is a pure function: no state, no IO. The same [`PolicyInput`]
//! always produces the same [`TofuDecision`].

use serde::{Deserialize, Serialize};

use crate::network::EnterpriseFlags;

/// Device-wide trust capabilities.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeviceCapabilities {
    /// The device can pin a server-presented root on first use.
    pub tofu_supported: bool,
    /// Enterprise networks without a CA certificate may connect without TOFU.
    pub insecure_enterprise_allowed: bool,
}

/// Every fact the policy looks at.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct PolicyInput {
    pub tofu_supported: bool,
    pub insecure_enterprise_allowed: bool,
    pub tofu_enabled: bool,
    pub user_approved_no_ca_cert: bool,
    pub has_ca_certificate: bool,
    pub uses_server_cert: bool,
    pub anchor_present: bool,
    pub server_cert_present: bool,
    pub chain_valid: bool,
}

impl PolicyInput {
    /// Input with no certificate material collected yet.
    pub fn new(device: DeviceCapabilities, flags: &EnterpriseFlags) -> Self {
        Self {
            tofu_supported: device.tofu_supported,
            insecure_enterprise_allowed: device.insecure_enterprise_allowed,
            tofu_enabled: flags.tofu_enabled,
            user_approved_no_ca_cert: flags.user_approved_no_ca_cert,
            has_ca_certificate: flags.has_ca_certificate,
            uses_server_cert: flags.uses_server_cert,
            anchor_present: false,
            server_cert_present: false,
            chain_valid: false,
        }
    }

    /// Attach the state of the collected chain (builder pattern).
    pub fn with_material(mut self, anchor_present: bool, server_cert_present: bool, chain_valid: bool) -> Self {
        self.anchor_present = anchor_present;
        self.server_cert_present = server_cert_present;
        self.chain_valid = chain_valid;
        self
    }

    /// TOFU is in effect: supported on the device and enabled for the network.
    pub fn uses_tofu(&self) -> bool {
        self.tofu_supported && self.tofu_enabled
    }
}

/// Outcome of the TOFU policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TofuDecision {
    /// No approval handling needed.
    Skip,
    /// The device requires TOFU but the network does not enable it.
    FatalUnsupported,
    /// TOFU applies but the anchor or server certificate is missing.
    FatalMissingMaterial,
    /// TOFU applies but the chain failed structural validation.
    FatalInvalidChain,
    /// Insecure enterprise connections are allowed; proceed without asking.
    SkipInsecureAllowed,
    /// Ask the user.
    NeedsApproval,
}

/// Whether a network needs TOFU / insecure-enterprise handling at all.
///
/// Only looks at configuration, never at certificate material, so it can run
/// before any certificate arrives.
#[must_use]
pub fn requires_handling(input: &PolicyInput) -> bool {
    if !input.uses_server_cert || input.has_ca_certificate {
        return false;
    }

    // A previous approval still counts when TOFU cannot be used, or when
    // insecure networks are allowed and this one does not opt into TOFU.
    if input.user_approved_no_ca_cert
        && (!input.tofu_supported || (input.insecure_enterprise_allowed && !input.tofu_enabled))
    {
        return false;
    }

    true
}

/// Decide how to treat the negotiation described by `input`.
#[must_use]
pub fn decide(input: &PolicyInput) -> TofuDecision {
    if !requires_handling(input) {
        return TofuDecision::Skip;
    }

    if input.tofu_supported && !input.insecure_enterprise_allowed && !input.tofu_enabled {
        return TofuDecision::FatalUnsupported;
    }

    if input.uses_tofu() {
        if !input.anchor_present || !input.server_cert_present {
            return TofuDecision::FatalMissingMaterial;
        }
        if !input.chain_valid {
            return TofuDecision::FatalInvalidChain;
        }
    } else if input.insecure_enterprise_allowed {
        return TofuDecision::SkipInsecureAllowed;
    }

    TofuDecision::NeedsApproval
}
