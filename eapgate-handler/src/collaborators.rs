//! External collaborators the approval machine drives.
//!
//! Dependencies are injected via traits, the same way a trust store or
//! replay cache would be:
//! - [`ConfigStore`] - Persisted network configuration
//! - [`NativeLayer`] - Supplicant / driver controls
//! - [`Notifier`] - Prompts, alerts and notices
//! - [`TimerService`] - Cancellable one-shot timers
//! - [`NegotiationCallbacks`] - Terminal outcome delivery
//!
//! Calls are fire-and-forget; each collaborator keeps itself consistent.

use std::sync::Arc;
use std::time::Duration;

use eapgate_core::cert::CertEntry;
use eapgate_core::network::{InterfaceName, NetworkId};

use crate::prompt::{Notice, OngoingAlert, Prompt};

/// Opaque handle of a shown prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PromptHandle(pub u64);

/// Opaque handle of an armed timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerHandle(pub u64);

/// Something shown to the user that must be taken down again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiArtifact {
    Prompt(PromptHandle),
    /// The ongoing alert for the given SSID.
    Alert { ssid: String },
}

/// Persisted network configuration.
pub trait ConfigStore: Send + Sync {
    fn has_ca_certificate(&self, network: NetworkId) -> bool;

    /// Record that the user accepted connecting without a CA certificate.
    fn set_approved_without_ca(&self, network: NetworkId, approved: bool);

    /// Pin `anchor` as the network's CA and `server` as its server certificate.
    ///
    /// Returns false if the configuration could not be updated.
    fn update_ca_certificate(&self, network: NetworkId, anchor: &CertEntry, server: &CertEntry) -> bool;

    fn set_auto_join(&self, network: NetworkId, allowed: bool);
}

/// Supplicant / driver controls for one interface.
pub trait NativeLayer: Send + Sync {
    /// Drop cached credentials (e.g. PMK) so the next attempt runs full EAP.
    fn purge_cached_auth_data(&self, network: NetworkId);

    /// Remove all networks so security-association caches are cleared.
    fn clear_all_networks(&self, interface: &InterfaceName);

    fn disconnect(&self, interface: &InterfaceName);
}

/// User-facing presentation.
///
/// User decisions come back through the machine's `on_user_accept`,
/// `on_user_reject` and `on_alert_tapped` entry points.
pub trait Notifier: Send + Sync {
    fn show_prompt(&self, prompt: &Prompt) -> PromptHandle;

    fn show_ongoing_alert(&self, alert: &OngoingAlert);

    fn show_notice(&self, notice: &Notice);

    fn dismiss(&self, artifact: &UiArtifact);
}

/// Cancellable one-shot timers.
///
/// When a timer fires, its owner delivers the handle to the machine's
/// `on_timeout` on the same serialized context as every other event.
pub trait TimerService: Send + Sync {
    fn arm(&self, duration: Duration) -> TimerHandle;

    fn cancel(&self, handle: TimerHandle);
}

/// Terminal outcomes reported to the connection owner.
pub trait NegotiationCallbacks: Send + Sync {
    fn on_accept(&self, ssid: &str);

    fn on_reject(&self, ssid: &str);

    /// `ssid` is `None` when the failing response carried no usable SSID.
    fn on_error(&self, ssid: Option<&str>);
}

/// Collaborators shared by every negotiation on one interface.
#[derive(Clone)]
pub struct Collaborators {
    pub config_store: Arc<dyn ConfigStore>,
    pub native: Arc<dyn NativeLayer>,
    pub notifier: Arc<dyn Notifier>,
    pub callbacks: Arc<dyn NegotiationCallbacks>,
}

impl std::fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collaborators").finish_non_exhaustive()
    }
}
