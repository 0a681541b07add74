//! Approval state machine for one managed interface.
//!
//! One [`ApprovalMachine`] owns at most one in-flight negotiation. Every
//! method must be called from a single serialized context; see
//! [`crate::runtime`] for a tokio-backed one.
//!
//! Lifecycle:
//! ```text
//! Idle ──prepare──▶ CollectingCertificates ──evaluate──▶ Deciding
//!                                                     │
//!        ┌──────────────── skip ◀────────────────────┤
//!        ▼                                           ├── fatal ──▶ Error ──▶ Idle
//!      Idle ◀── Accepted / Rejected ◀── AwaitingUserApproval ◀── needs approval
//! ```

use std::sync::Arc;
use std::time::Duration;

use eapgate_core::cert::CertEntry;
use eapgate_core::chain::{is_chain_valid, CertDepth, ChainAccumulator, SubmitOutcome};
use eapgate_core::network::{InterfaceName, NetworkRef};
use eapgate_core::policy::{decide, requires_handling, DeviceCapabilities, PolicyInput, TofuDecision};
use serde::Serialize;

use crate::collaborators::{Collaborators, PromptHandle, TimerHandle, TimerService, UiArtifact};
use crate::config::HandlerConfig;
use crate::error::{StaleResponse, TrustFailure};
use crate::prompt::{Notice, OngoingAlert, Prompt};

/// Where the interface's negotiation currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalState {
    Idle,
    CollectingCertificates,
    Deciding,
    AwaitingUserApproval,
    Accepted,
    Rejected,
    Error,
}

/// How the most recent negotiation ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Accepted,
    Rejected,
    /// The ongoing alert went unanswered.
    TimedOut,
    /// `None` when the failure came from an abnormal user response.
    Failed(Option<TrustFailure>),
}

/// Which outcome callback a teardown reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Reject,
    Error,
    Silent,
}

/// The single in-flight negotiation.
#[derive(Debug)]
struct Negotiation {
    network: NetworkRef,
    /// Policy facts known at prepare time; material is attached on evaluate.
    base: PolicyInput,
    chain: ChainAccumulator,
    prompt: Option<PromptHandle>,
    alert_shown: bool,
    timer: Option<TimerHandle>,
}

impl Negotiation {
    fn new(network: NetworkRef, base: PolicyInput) -> Self {
        Self {
            network,
            base,
            chain: ChainAccumulator::new(),
            prompt: None,
            alert_shown: false,
            timer: None,
        }
    }

    fn uses_tofu(&self) -> bool {
        self.base.uses_tofu()
    }

    fn policy_input(&self) -> PolicyInput {
        self.base.with_material(
            self.chain.anchor().is_some(),
            self.chain.server_cert().is_some(),
            is_chain_valid(self.chain.chain()),
        )
    }
}

/// TOFU / insecure-enterprise approval state machine for one interface.
pub struct ApprovalMachine {
    interface: InterfaceName,
    device: DeviceCapabilities,
    notification_timeout: Duration,
    help_link: String,
    collaborators: Collaborators,
    timers: Arc<dyn TimerService>,
    /// Most recent network passed to `prepare_connection`.
    connecting: Option<NetworkRef>,
    negotiation: Option<Negotiation>,
    state: ApprovalState,
    last_resolution: Option<Resolution>,
}

impl ApprovalMachine {
    pub fn new(
        interface: InterfaceName,
        config: &HandlerConfig,
        collaborators: Collaborators,
        timers: Arc<dyn TimerService>,
    ) -> Self {
        Self {
            interface,
            device: config.capabilities(),
            notification_timeout: config.notification_timeout(),
            help_link: config.ca_cert_help_link.clone(),
            collaborators,
            timers,
            connecting: None,
            negotiation: None,
            state: ApprovalState::Idle,
            last_resolution: None,
        }
    }

    pub fn interface(&self) -> &InterfaceName {
        &self.interface
    }

    pub fn state(&self) -> ApprovalState {
        self.state
    }

    pub fn last_resolution(&self) -> Option<Resolution> {
        self.last_resolution
    }

    /// SSID of the in-flight negotiation, if any.
    pub fn negotiating_ssid(&self) -> Option<&str> {
        self.negotiation.as_ref().map(|n| n.network.ssid.as_str())
    }

    /// Collected certificates of the in-flight negotiation.
    pub fn chain(&self) -> Option<&ChainAccumulator> {
        self.negotiation.as_ref().map(|n| &n.chain)
    }

    // ── Inputs from the connection owner ─────────────────────────────────

    /// Start tracking a connection attempt to `network`.
    ///
    /// Any earlier negotiation is dropped: its prompt, alert and timer are
    /// dismissed without reporting an outcome.
    pub fn prepare_connection(&mut self, network: NetworkRef) {
        self.connecting = Some(network.clone());

        if let Some(previous) = self.negotiation.take() {
            tracing::debug!(
                interface = %self.interface,
                ssid = %previous.network.ssid,
                "Discarding previous negotiation"
            );
            self.dismiss_artifacts(&previous);
        }
        self.state = ApprovalState::Idle;

        let Some(flags) = network.enterprise else {
            tracing::debug!(ssid = %network.ssid, "Not an enterprise network");
            return;
        };

        let mut base = PolicyInput::new(self.device, &flags);
        if base.uses_server_cert && !base.has_ca_certificate {
            base.has_ca_certificate = self.collaborators.config_store.has_ca_certificate(network.id);
        }

        if !requires_handling(&base) {
            tracing::debug!(
                ssid = %network.ssid,
                network_id = %network.id,
                "Network does not need certificate approval"
            );
            return;
        }

        tracing::info!(
            interface = %self.interface,
            ssid = %network.ssid,
            network_id = %network.id,
            tofu = base.uses_tofu(),
            "Collecting server certificates"
        );

        // Cached credentials would let the next attempt skip the EAP exchange.
        self.collaborators.native.purge_cached_auth_data(network.id);
        self.collaborators.native.clear_all_networks(&self.interface);

        self.negotiation = Some(Negotiation::new(network, base));
        self.state = ApprovalState::CollectingCertificates;
    }

    /// Record one certificate of the server's chain.
    ///
    /// Returns false if the certificate could not be cached.
    pub fn submit_certificate(&mut self, ssid: &str, depth: i32, cert: CertEntry) -> bool {
        if ssid.is_empty() {
            tracing::warn!("Certificate submitted without an SSID");
            return false;
        }
        let Some(negotiation) = self.negotiation.as_mut() else {
            tracing::debug!(ssid = %ssid, "No negotiation for submitted certificate");
            return false;
        };
        if negotiation.network.ssid != ssid {
            tracing::warn!(
                ssid = %ssid,
                expected = %negotiation.network.ssid,
                "Certificate submitted for a different network"
            );
            return false;
        }
        if self.state != ApprovalState::CollectingCertificates {
            tracing::warn!(ssid = %ssid, state = ?self.state, "Not collecting certificates");
            return false;
        }

        let depth = match CertDepth::try_from(depth) {
            Ok(depth) => depth,
            Err(e) => {
                tracing::warn!(ssid = %ssid, depth, error = %e, "Rejected certificate");
                return false;
            }
        };

        let fingerprint = cert.fingerprint();
        match negotiation.chain.submit(depth, cert) {
            Ok(SubmitOutcome::Anchor) => {
                tracing::debug!(ssid = %ssid, depth = %depth, fingerprint = %fingerprint, "New trust anchor candidate");
                true
            }
            Ok(SubmitOutcome::Intermediate) => {
                tracing::debug!(ssid = %ssid, depth = %depth, fingerprint = %fingerprint, "Cached certificate");
                true
            }
            Err(e) => {
                tracing::error!(ssid = %ssid, depth = %depth, error = %e, "Cannot cache certificate");
                false
            }
        }
    }

    /// Run the trust policy for the in-flight negotiation.
    ///
    /// Returns true while approval handling is in progress or has just
    /// failed the attempt; false if the connection may proceed untouched.
    pub fn evaluate(&mut self, user_initiated: bool) -> bool {
        let Some(negotiation) = self.negotiation.as_ref() else {
            return false;
        };
        let connecting_id = self.connecting.as_ref().map(|n| n.id);
        if connecting_id != Some(negotiation.network.id) {
            tracing::debug!(
                ssid = %negotiation.network.ssid,
                "Connecting network changed; nothing to evaluate"
            );
            return false;
        }

        match self.state {
            ApprovalState::AwaitingUserApproval => return true,
            ApprovalState::CollectingCertificates => {}
            other => {
                tracing::warn!(state = ?other, "Evaluate outside certificate collection");
                return false;
            }
        }

        self.state = ApprovalState::Deciding;
        let ssid = negotiation.network.ssid.clone();
        let decision = decide(&negotiation.policy_input());
        tracing::debug!(ssid = %ssid, ?decision, user_initiated, "Trust policy decided");

        match decision {
            TofuDecision::Skip | TofuDecision::SkipInsecureAllowed => {
                self.negotiation = None;
                self.state = ApprovalState::Idle;
                false
            }
            TofuDecision::NeedsApproval => {
                self.await_approval(user_initiated);
                true
            }
            TofuDecision::FatalUnsupported => {
                self.fail(TrustFailure::Unsupported, &ssid, user_initiated)
            }
            TofuDecision::FatalMissingMaterial => {
                self.fail(TrustFailure::MissingMaterial, &ssid, user_initiated)
            }
            TofuDecision::FatalInvalidChain => {
                self.fail(TrustFailure::InvalidChain, &ssid, user_initiated)
            }
        }
    }

    // ── Inputs from the user and the timer ───────────────────────────────

    pub fn on_user_accept(&mut self, ssid: &str) {
        if let Err(stale) = self.check_response(ssid) {
            tracing::warn!(ssid = %ssid, reason = %stale, "Ignoring accept");
            return;
        }
        if ssid.is_empty() {
            self.abnormal_response();
            return;
        }
        self.accept();
    }

    pub fn on_user_reject(&mut self, ssid: &str) {
        if let Err(stale) = self.check_response(ssid) {
            tracing::warn!(ssid = %ssid, reason = %stale, "Ignoring reject");
            return;
        }
        if ssid.is_empty() {
            self.abnormal_response();
            return;
        }
        tracing::info!(ssid = %ssid, "User rejected the network");
        self.resolve(Outcome::Reject, Resolution::Rejected, Some(ssid));
    }

    /// The ongoing alert was tapped; switch to the modal prompt.
    pub fn on_alert_tapped(&mut self, ssid: &str) {
        if let Err(stale) = self.check_response(ssid) {
            tracing::warn!(ssid = %ssid, reason = %stale, "Ignoring alert tap");
            return;
        }
        let Some(negotiation) = self.negotiation.as_ref() else {
            return;
        };
        if ssid.is_empty() || !negotiation.uses_tofu() {
            return;
        }
        self.await_approval(true);
    }

    pub fn on_timeout(&mut self, handle: TimerHandle) {
        let Some(negotiation) = self.negotiation.as_mut() else {
            tracing::debug!(timer = handle.0, reason = %StaleResponse::NoNegotiation, "Ignoring timer");
            return;
        };
        if negotiation.timer != Some(handle) {
            tracing::debug!(timer = handle.0, reason = %StaleResponse::TimerSuperseded, "Ignoring timer");
            return;
        }
        // Already fired; nothing left to cancel.
        negotiation.timer = None;

        let network_id = negotiation.network.id;
        let ssid = negotiation.network.ssid.clone();
        tracing::info!(ssid = %ssid, "No response to certificate alert");

        if self.connecting.as_ref().map(|n| n.id) == Some(network_id) {
            self.collaborators.native.disconnect(&self.interface);
        }
        self.resolve(Outcome::Silent, Resolution::TimedOut, Some(&ssid));
    }

    // ── Transitions ──────────────────────────────────────────────────────

    /// Error teardown for a fatal policy decision. Always returns true.
    fn fail(&mut self, failure: TrustFailure, ssid: &str, user_initiated: bool) -> bool {
        self.resolve(Outcome::Error, Resolution::Failed(Some(failure)), Some(ssid));
        if failure == TrustFailure::InvalidChain {
            self.collaborators
                .notifier
                .show_notice(&Notice::invalid_chain(ssid, user_initiated));
        }
        true
    }

    /// An empty SSID passes whenever a negotiation exists; callers fail it.
    fn check_response(&self, ssid: &str) -> Result<(), StaleResponse> {
        let negotiation = self.negotiation.as_ref().ok_or(StaleResponse::NoNegotiation)?;
        if ssid.is_empty() {
            return Ok(());
        }
        if self.state != ApprovalState::AwaitingUserApproval {
            return Err(StaleResponse::NotAwaitingApproval);
        }
        if negotiation.network.ssid != ssid {
            return Err(StaleResponse::SsidMismatch {
                expected: negotiation.network.ssid.clone(),
                actual: ssid.to_string(),
            });
        }
        Ok(())
    }

    /// A response with no usable SSID arrived while a negotiation was active.
    fn abnormal_response(&mut self) {
        tracing::warn!("Response without an SSID; failing the negotiation");
        self.resolve(Outcome::Error, Resolution::Failed(None), None);
    }

    fn await_approval(&mut self, user_initiated: bool) {
        let Some(negotiation) = self.negotiation.as_ref() else {
            return;
        };
        self.dismiss_artifacts(negotiation);

        let ssid = negotiation.network.ssid.clone();
        let tofu = negotiation.uses_tofu();

        let mut prompt = None;
        let mut alert_shown = false;
        let mut timer = None;

        if user_initiated {
            let content = match negotiation.chain.anchor() {
                Some(anchor) if tofu => Prompt::trust_server(&ssid, anchor),
                None if tofu => {
                    tracing::error!(ssid = %ssid, "No trust anchor to show");
                    self.resolve(
                        Outcome::Error,
                        Resolution::Failed(Some(TrustFailure::MissingMaterial)),
                        Some(&ssid),
                    );
                    return;
                }
                _ => Prompt::approve_without_ca(&ssid, &self.help_link),
            };
            prompt = Some(self.collaborators.notifier.show_prompt(&content));
        } else {
            let alert = if tofu {
                OngoingAlert::trust_server(&ssid)
            } else {
                OngoingAlert::approve_without_ca(&ssid, &self.help_link)
            };
            self.collaborators.notifier.show_ongoing_alert(&alert);
            alert_shown = true;
            timer = Some(self.timers.arm(self.notification_timeout));
        }

        tracing::info!(ssid = %ssid, user_initiated, tofu, "Awaiting user approval");
        self.finish_await(prompt, alert_shown, timer);
    }

    fn finish_await(&mut self, prompt: Option<PromptHandle>, alert_shown: bool, timer: Option<TimerHandle>) {
        if let Some(negotiation) = self.negotiation.as_mut() {
            negotiation.prompt = prompt;
            negotiation.alert_shown = alert_shown;
            negotiation.timer = timer;
        }
        self.state = ApprovalState::AwaitingUserApproval;
    }

    fn accept(&mut self) {
        let Some(negotiation) = self.negotiation.as_ref() else {
            return;
        };
        let id = negotiation.network.id;
        let ssid = negotiation.network.ssid.clone();

        if negotiation.uses_tofu() {
            let (Some(anchor), Some(server)) = (negotiation.chain.anchor(), negotiation.chain.server_cert()) else {
                tracing::error!(ssid = %ssid, "Accepted without a trust anchor and server certificate");
                self.resolve(
                    Outcome::Error,
                    Resolution::Failed(Some(TrustFailure::MissingMaterial)),
                    Some(&ssid),
                );
                return;
            };
            if !self
                .collaborators
                .config_store
                .update_ca_certificate(id, &anchor.cert, server)
            {
                // The user's decision stands even if pinning failed.
                tracing::error!(ssid = %ssid, network_id = %id, "Failed to save the trusted CA certificate");
            } else {
                tracing::info!(
                    ssid = %ssid,
                    fingerprint = %anchor.cert.fingerprint(),
                    "Pinned server CA certificate"
                );
            }
        } else {
            self.collaborators.config_store.set_approved_without_ca(id, true);
        }

        self.state = ApprovalState::Accepted;
        self.collaborators.config_store.set_auto_join(id, true);
        self.clear_negotiation();
        self.last_resolution = Some(Resolution::Accepted);
        self.state = ApprovalState::Idle;

        tracing::info!(ssid = %ssid, "Network approved");
        self.collaborators.callbacks.on_accept(&ssid);
    }

    /// Reject, error and timeout teardown.
    fn resolve(&mut self, outcome: Outcome, resolution: Resolution, ssid: Option<&str>) {
        self.state = match outcome {
            Outcome::Error => ApprovalState::Error,
            Outcome::Reject | Outcome::Silent => ApprovalState::Rejected,
        };

        let network_id = self.negotiation.as_ref().map(|n| n.network.id);
        if let Some(id) = network_id {
            self.collaborators.config_store.set_auto_join(id, false);
        }
        self.clear_negotiation();
        if let Some(id) = network_id {
            self.collaborators.native.purge_cached_auth_data(id);
        }
        self.collaborators.native.clear_all_networks(&self.interface);

        self.last_resolution = Some(resolution);
        self.state = ApprovalState::Idle;
        tracing::info!(ssid = ?ssid, ?resolution, "Negotiation ended");

        match outcome {
            Outcome::Reject => {
                if let Some(ssid) = ssid {
                    self.collaborators.callbacks.on_reject(ssid);
                }
            }
            Outcome::Error => self.collaborators.callbacks.on_error(ssid),
            Outcome::Silent => {}
        }
    }

    /// Dismiss outstanding artifacts and drop the negotiation.
    fn clear_negotiation(&mut self) {
        if let Some(negotiation) = self.negotiation.take() {
            self.dismiss_artifacts(&negotiation);
        }
    }

    fn dismiss_artifacts(&self, negotiation: &Negotiation) {
        if let Some(timer) = negotiation.timer {
            self.timers.cancel(timer);
        }
        if let Some(prompt) = negotiation.prompt {
            self.collaborators.notifier.dismiss(&UiArtifact::Prompt(prompt));
        }
        if negotiation.alert_shown {
            self.collaborators.notifier.dismiss(&UiArtifact::Alert {
                ssid: negotiation.network.ssid.clone(),
            });
        }
    }
}

impl std::fmt::Debug for ApprovalMachine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApprovalMachine")
            .field("interface", &self.interface)
            .field("state", &self.state)
            .field("negotiation", &self.negotiation)
            .field("last_resolution", &self.last_resolution)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use eapgate_core::network::{EnterpriseFlags, NetworkId};

    fn negotiation() -> Negotiation {
        let flags = EnterpriseFlags {
            uses_server_cert: true,
            has_ca_certificate: false,
            tofu_enabled: true,
            user_approved_no_ca_cert: false,
        };
        let device = DeviceCapabilities {
            tofu_supported: true,
            insecure_enterprise_allowed: false,
        };
        Negotiation::new(
            NetworkRef::enterprise(NetworkId(1), "corp", flags),
            PolicyInput::new(device, &flags),
        )
    }

    #[test]
    fn test_policy_input_tracks_collected_material() {
        let mut negotiation = negotiation();
        let empty = negotiation.policy_input();
        assert!(!empty.anchor_present);
        assert!(!empty.server_cert_present);
        assert!(!empty.chain_valid);
        assert_eq!(decide(&empty), TofuDecision::FatalMissingMaterial);

        let root = CertEntry::new(vec![1], "CN=Root", "CN=Root", true);
        let leaf = CertEntry::new(vec![2], "CN=radius", "CN=Root", false);
        negotiation.chain.submit(CertDepth::new(1), root).unwrap();
        negotiation.chain.submit(CertDepth::SERVER, leaf).unwrap();

        let full = negotiation.policy_input();
        assert!(full.anchor_present && full.server_cert_present && full.chain_valid);
        assert_eq!(decide(&full), TofuDecision::NeedsApproval);
    }
}
