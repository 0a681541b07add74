//! Recording fakes for every collaborator.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use eapgate_core::cert::CertEntry;
use eapgate_core::network::{EnterpriseFlags, InterfaceName, NetworkId, NetworkRef};
use eapgate_handler::collaborators::{
    Collaborators, ConfigStore, NativeLayer, NegotiationCallbacks, Notifier, PromptHandle,
    TimerHandle, TimerService, UiArtifact,
};
use eapgate_handler::config::HandlerConfig;
use eapgate_handler::machine::ApprovalMachine;
use eapgate_handler::prompt::{Notice, OngoingAlert, Prompt};

pub const IFACE: &str = "wlan0";
pub const SSID: &str = "corp-wifi";
pub const NETWORK: NetworkId = NetworkId(7);

/// One observed collaborator call.
#[derive(Debug, Clone, PartialEq, Eq)]
#[allow(dead_code)]
pub enum Call {
    HasCa(NetworkId),
    ApprovedWithoutCa(NetworkId, bool),
    UpdateCa {
        network: NetworkId,
        anchor: CertEntry,
        server: CertEntry,
    },
    AutoJoin(NetworkId, bool),
    Purge(NetworkId),
    ClearAll(InterfaceName),
    Disconnect(InterfaceName),
    ShowPrompt(Prompt),
    ShowAlert(OngoingAlert),
    ShowNotice(Notice),
    Dismiss(UiArtifact),
    Arm {
        duration: Duration,
        handle: TimerHandle,
    },
    Cancel(TimerHandle),
    Accepted(String),
    Rejected(String),
    Errored(Option<String>),
}

impl Call {
    fn is_callback(&self) -> bool {
        matches!(self, Call::Accepted(_) | Call::Rejected(_) | Call::Errored(_))
    }

    fn is_ui_or_native(&self) -> bool {
        matches!(
            self,
            Call::Purge(_)
                | Call::ClearAll(_)
                | Call::Disconnect(_)
                | Call::ShowPrompt(_)
                | Call::ShowAlert(_)
                | Call::ShowNotice(_)
                | Call::Dismiss(_)
        )
    }
}

/// Implements every collaborator trait and records each call in order.
pub struct Recorder {
    calls: Mutex<Vec<Call>>,
    has_ca: AtomicBool,
    update_ca_succeeds: AtomicBool,
    next_handle: AtomicU64,
}

#[allow(dead_code)]
impl Recorder {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            calls: Mutex::new(Vec::new()),
            has_ca: AtomicBool::new(false),
            update_ca_succeeds: AtomicBool::new(true),
            next_handle: AtomicU64::new(1),
        })
    }

    pub fn set_has_ca(&self, value: bool) {
        self.has_ca.store(value, Ordering::SeqCst);
    }

    pub fn set_update_ca_succeeds(&self, value: bool) {
        self.update_ca_succeeds.store(value, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.calls.lock().unwrap().clear();
    }

    pub fn contains(&self, call: &Call) -> bool {
        self.calls().contains(call)
    }

    pub fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.calls().iter().filter(|c| pred(c)).count()
    }

    /// Outcome callbacks only.
    pub fn callbacks(&self) -> Vec<Call> {
        self.calls().into_iter().filter(Call::is_callback).collect()
    }

    pub fn ui_or_native_calls(&self) -> Vec<Call> {
        self.calls().into_iter().filter(Call::is_ui_or_native).collect()
    }

    pub fn prompts(&self) -> Vec<Prompt> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::ShowPrompt(p) => Some(p),
                _ => None,
            })
            .collect()
    }

    /// Handle of the most recently armed timer.
    pub fn last_timer(&self) -> Option<TimerHandle> {
        self.calls().into_iter().rev().find_map(|c| match c {
            Call::Arm { handle, .. } => Some(handle),
            _ => None,
        })
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }

    fn next(&self) -> u64 {
        self.next_handle.fetch_add(1, Ordering::SeqCst)
    }
}

impl ConfigStore for Recorder {
    fn has_ca_certificate(&self, network: NetworkId) -> bool {
        self.record(Call::HasCa(network));
        self.has_ca.load(Ordering::SeqCst)
    }

    fn set_approved_without_ca(&self, network: NetworkId, approved: bool) {
        self.record(Call::ApprovedWithoutCa(network, approved));
    }

    fn update_ca_certificate(&self, network: NetworkId, anchor: &CertEntry, server: &CertEntry) -> bool {
        self.record(Call::UpdateCa {
            network,
            anchor: anchor.clone(),
            server: server.clone(),
        });
        self.update_ca_succeeds.load(Ordering::SeqCst)
    }

    fn set_auto_join(&self, network: NetworkId, allowed: bool) {
        self.record(Call::AutoJoin(network, allowed));
    }
}

impl NativeLayer for Recorder {
    fn purge_cached_auth_data(&self, network: NetworkId) {
        self.record(Call::Purge(network));
    }

    fn clear_all_networks(&self, interface: &InterfaceName) {
        self.record(Call::ClearAll(interface.clone()));
    }

    fn disconnect(&self, interface: &InterfaceName) {
        self.record(Call::Disconnect(interface.clone()));
    }
}

impl Notifier for Recorder {
    fn show_prompt(&self, prompt: &Prompt) -> PromptHandle {
        self.record(Call::ShowPrompt(prompt.clone()));
        PromptHandle(self.next())
    }

    fn show_ongoing_alert(&self, alert: &OngoingAlert) {
        self.record(Call::ShowAlert(alert.clone()));
    }

    fn show_notice(&self, notice: &Notice) {
        self.record(Call::ShowNotice(notice.clone()));
    }

    fn dismiss(&self, artifact: &UiArtifact) {
        self.record(Call::Dismiss(artifact.clone()));
    }
}

impl TimerService for Recorder {
    fn arm(&self, duration: Duration) -> TimerHandle {
        let handle = TimerHandle(self.next());
        self.record(Call::Arm { duration, handle });
        handle
    }

    fn cancel(&self, handle: TimerHandle) {
        self.record(Call::Cancel(handle));
    }
}

impl NegotiationCallbacks for Recorder {
    fn on_accept(&self, ssid: &str) {
        self.record(Call::Accepted(ssid.to_string()));
    }

    fn on_reject(&self, ssid: &str) {
        self.record(Call::Rejected(ssid.to_string()));
    }

    fn on_error(&self, ssid: Option<&str>) {
        self.record(Call::Errored(ssid.map(str::to_string)));
    }
}

#[allow(dead_code)]
pub fn collaborators(recorder: &Arc<Recorder>) -> Collaborators {
    Collaborators {
        config_store: recorder.clone(),
        native: recorder.clone(),
        notifier: recorder.clone(),
        callbacks: recorder.clone(),
    }
}

/// Machine whose collaborators and timers are all `recorder`.
#[allow(dead_code)]
pub fn machine(config: &HandlerConfig) -> (ApprovalMachine, Arc<Recorder>) {
    let recorder = Recorder::new();
    let machine = ApprovalMachine::new(
        InterfaceName::new(IFACE),
        config,
        collaborators(&recorder),
        recorder.clone(),
    );
    (machine, recorder)
}

#[allow(dead_code)]
pub fn tofu_flags() -> EnterpriseFlags {
    EnterpriseFlags {
        uses_server_cert: true,
        has_ca_certificate: false,
        tofu_enabled: true,
        user_approved_no_ca_cert: false,
    }
}

#[allow(dead_code)]
pub fn tofu_network() -> NetworkRef {
    NetworkRef::enterprise(NETWORK, SSID, tofu_flags())
}

#[allow(dead_code)]
pub fn root_cert() -> CertEntry {
    CertEntry::new(b"root-der".to_vec(), "CN=Corp Root, O=Corp", "CN=Corp Root, O=Corp", true)
        .with_signature(vec![0x5a; 64])
}

#[allow(dead_code)]
pub fn server_cert() -> CertEntry {
    CertEntry::new(b"server-der".to_vec(), "CN=radius.corp", "CN=Corp Root, O=Corp", false)
}
