//! Serialized per-interface execution context.
//!
//! Each managed interface gets one tokio task that owns its
//! [`ApprovalMachine`]. Every operation is sent to that task as a
//! [`Command`], so transitions for one interface never run concurrently.
//! Timer firings are posted back into the same channel by
//! [`TokioTimerService`].

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use eapgate_core::cert::CertEntry;
use eapgate_core::network::{InterfaceName, NetworkRef};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::collaborators::{Collaborators, TimerHandle, TimerService};
use crate::config::HandlerConfig;
use crate::machine::{ApprovalMachine, ApprovalState, Resolution};

const COMMAND_BUFFER: usize = 32;

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum RuntimeError {
    #[error("handler for interface {0} has stopped")]
    WorkerStopped(InterfaceName),
}

/// Point-in-time view of an interface's machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub state: ApprovalState,
    pub negotiating_ssid: Option<String>,
    pub last_resolution: Option<Resolution>,
}

/// Work items processed by an interface task.
#[derive(Debug)]
pub enum Command {
    Prepare(NetworkRef),
    Submit {
        ssid: String,
        depth: i32,
        cert: CertEntry,
        reply: oneshot::Sender<bool>,
    },
    Evaluate {
        user_initiated: bool,
        reply: oneshot::Sender<bool>,
    },
    UserAccept(String),
    UserReject(String),
    AlertTapped(String),
    TimerFired(TimerHandle),
    Snapshot(oneshot::Sender<Snapshot>),
}

/// Cloneable handle to one interface task.
#[derive(Debug, Clone)]
pub struct InterfaceHandle {
    interface: InterfaceName,
    tx: mpsc::Sender<Command>,
}

impl InterfaceHandle {
    pub fn interface(&self) -> &InterfaceName {
        &self.interface
    }

    pub async fn prepare_connection(&self, network: NetworkRef) -> Result<(), RuntimeError> {
        self.send(Command::Prepare(network)).await
    }

    pub async fn submit_certificate(
        &self,
        ssid: impl Into<String>,
        depth: i32,
        cert: CertEntry,
    ) -> Result<bool, RuntimeError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Submit {
            ssid: ssid.into(),
            depth,
            cert,
            reply,
        })
        .await?;
        rx.await.map_err(|_| self.stopped())
    }

    pub async fn evaluate(&self, user_initiated: bool) -> Result<bool, RuntimeError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Evaluate {
            user_initiated,
            reply,
        })
        .await?;
        rx.await.map_err(|_| self.stopped())
    }

    pub async fn user_accept(&self, ssid: impl Into<String>) -> Result<(), RuntimeError> {
        self.send(Command::UserAccept(ssid.into())).await
    }

    pub async fn user_reject(&self, ssid: impl Into<String>) -> Result<(), RuntimeError> {
        self.send(Command::UserReject(ssid.into())).await
    }

    pub async fn alert_tapped(&self, ssid: impl Into<String>) -> Result<(), RuntimeError> {
        self.send(Command::AlertTapped(ssid.into())).await
    }

    /// Waits until every earlier command has been processed.
    pub async fn snapshot(&self) -> Result<Snapshot, RuntimeError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Snapshot(reply)).await?;
        rx.await.map_err(|_| self.stopped())
    }

    async fn send(&self, command: Command) -> Result<(), RuntimeError> {
        self.tx.send(command).await.map_err(|_| self.stopped())
    }

    fn stopped(&self) -> RuntimeError {
        RuntimeError::WorkerStopped(self.interface.clone())
    }
}

/// Start the task that owns `interface`'s approval machine.
///
/// The task exits once every [`InterfaceHandle`] has been dropped.
pub fn spawn_interface(
    interface: InterfaceName,
    config: &HandlerConfig,
    collaborators: Collaborators,
) -> (InterfaceHandle, JoinHandle<()>) {
    let (tx, rx) = mpsc::channel(COMMAND_BUFFER);
    let timers = Arc::new(TokioTimerService::new(tx.downgrade()));
    let machine = ApprovalMachine::new(interface.clone(), config, collaborators, timers);

    let worker = tokio::spawn(run(machine, rx));
    (InterfaceHandle { interface, tx }, worker)
}

async fn run(mut machine: ApprovalMachine, mut rx: mpsc::Receiver<Command>) {
    tracing::debug!(interface = %machine.interface(), "Interface handler started");

    while let Some(command) = rx.recv().await {
        match command {
            Command::Prepare(network) => machine.prepare_connection(network),
            Command::Submit {
                ssid,
                depth,
                cert,
                reply,
            } => {
                let _ = reply.send(machine.submit_certificate(&ssid, depth, cert));
            }
            Command::Evaluate {
                user_initiated,
                reply,
            } => {
                let _ = reply.send(machine.evaluate(user_initiated));
            }
            Command::UserAccept(ssid) => machine.on_user_accept(&ssid),
            Command::UserReject(ssid) => machine.on_user_reject(&ssid),
            Command::AlertTapped(ssid) => machine.on_alert_tapped(&ssid),
            Command::TimerFired(handle) => machine.on_timeout(handle),
            Command::Snapshot(reply) => {
                let _ = reply.send(Snapshot {
                    state: machine.state(),
                    negotiating_ssid: machine.negotiating_ssid().map(str::to_string),
                    last_resolution: machine.last_resolution(),
                });
            }
        }
    }

    tracing::debug!(interface = %machine.interface(), "Interface handler stopped");
}

/// [`TimerService`] backed by `tokio::time::sleep` tasks.
///
/// A fired timer posts [`Command::TimerFired`] to its interface task.
/// Holds only a weak sender so pending timers never keep the task alive.
pub struct TokioTimerService {
    tx: mpsc::WeakSender<Command>,
    next_id: AtomicU64,
    pending: Arc<DashMap<TimerHandle, JoinHandle<()>>>,
}

impl TokioTimerService {
    pub fn new(tx: mpsc::WeakSender<Command>) -> Self {
        Self {
            tx,
            next_id: AtomicU64::new(1),
            pending: Arc::new(DashMap::new()),
        }
    }

    /// Number of armed timers that have neither fired nor been cancelled.
    pub fn pending(&self) -> usize {
        self.pending.len()
    }
}

impl TimerService for TokioTimerService {
    fn arm(&self, duration: Duration) -> TimerHandle {
        let handle = TimerHandle(self.next_id.fetch_add(1, Ordering::Relaxed));
        let tx = self.tx.clone();
        let pending = Arc::clone(&self.pending);

        let deadline = tokio::time::Instant::now() + duration;
        let (registered_tx, registered_rx) = oneshot::channel::<()>();

        // The task must not remove its entry before `insert` below has run.
        let task = tokio::spawn(async move {
            if registered_rx.await.is_err() {
                return;
            }
            tokio::time::sleep_until(deadline).await;
            pending.remove(&handle);
            if let Some(tx) = tx.upgrade() {
                let _ = tx.send(Command::TimerFired(handle)).await;
            }
        });
        self.pending.insert(handle, task);
        let _ = registered_tx.send(());

        tracing::debug!(timer = handle.0, ?duration, "Timer armed");
        handle
    }

    fn cancel(&self, handle: TimerHandle) {
        if let Some((_, task)) = self.pending.remove(&handle) {
            task.abort();
            tracing::debug!(timer = handle.0, "Timer cancelled");
        }
    }
}

impl Drop for TokioTimerService {
    fn drop(&mut self) {
        for entry in self.pending.iter() {
            entry.value().abort();
        }
    }
}
