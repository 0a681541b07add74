//! User-approval handling for enterprise networks without a trusted root.
//!
//! Gates connections to EAP networks that have no CA certificate configured.
//! Server certificates are collected per attempt, checked by the trust policy
//! in [`eapgate_core`], and, where allowed, shown to the user so the server's
//! root can be trusted on first use.
//!
//! # Modules
//!
//! - [`machine`] - The per-interface approval state machine
//! - [`collaborators`] - Traits for configuration, native, UI and timer plumbing
//! - [`prompt`] - Prompt, alert and notice content
//! - [`config`] - Handler configuration
//! - [`runtime`] - Tokio task per interface with a cancellable timer service
//! - [`error`] - Error types

pub mod collaborators;
pub mod config;
pub mod error;
pub mod machine;
pub mod prompt;
pub mod runtime;

pub use collaborators::{
    Collaborators, ConfigStore, NativeLayer, NegotiationCallbacks, Notifier, PromptHandle,
    TimerHandle, TimerService, UiArtifact,
};
pub use config::{ConfigError, HandlerConfig};
pub use error::{StaleResponse, TrustFailure};
pub use machine::{ApprovalMachine, ApprovalState, Resolution};
pub use prompt::{AlertTapAction, CertificateDetails, Notice, OngoingAlert, Prompt, PromptKind};
pub use runtime::{spawn_interface, InterfaceHandle, RuntimeError, Snapshot, TokioTimerService};
