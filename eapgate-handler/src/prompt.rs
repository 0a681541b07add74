//! Content of the prompts, alerts and notices shown while a negotiation
//! waits on the user.
//!
//! Only structure and plain-text defaults live here; rendering is up to the
//! [`Notifier`](crate::collaborators::Notifier).

use std::fmt::Write as _;

use eapgate_core::chain::AnchorCandidate;
use serde::Serialize;

/// Number of signature hex characters shown to the user.
pub const SIGNATURE_PREFIX_CHARS: usize = 16;

/// What a prompt asks the user to decide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PromptKind {
    /// Pin the server-presented root certificate.
    TrustServerCertificate,
    /// Connect without any CA certificate.
    ApproveWithoutCa,
}

/// Identifying details of the trust-anchor candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CertificateDetails {
    pub server_name: String,
    pub issuer_name: String,
    pub organization: Option<String>,
    pub contact: Option<String>,
    pub signature: Option<String>,
}

impl CertificateDetails {
    pub fn from_anchor(anchor: &AnchorCandidate) -> Self {
        Self {
            server_name: anchor.subject.common_name.clone(),
            issuer_name: anchor.issuer.common_name.clone(),
            organization: anchor.subject.organization.clone(),
            contact: anchor.subject.email.clone(),
            signature: anchor.cert.signature_hex_prefix(SIGNATURE_PREFIX_CHARS),
        }
    }
}

/// A modal accept/reject prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Prompt {
    pub ssid: String,
    pub kind: PromptKind,
    pub title: String,
    pub message: String,
    pub details: Option<CertificateDetails>,
    pub help_link: Option<String>,
}

impl Prompt {
    /// Ask whether to trust the presented root certificate.
    pub fn trust_server(ssid: &str, anchor: &AnchorCandidate) -> Self {
        let details = CertificateDetails::from_anchor(anchor);

        let mut message = String::from(
            "Only connect if you recognize this certificate. It will be saved for future connections.\n",
        );
        let _ = writeln!(message, "Server name: {}", details.server_name);
        let _ = writeln!(message, "Issued by: {}", details.issuer_name);
        if let Some(org) = &details.organization {
            let _ = writeln!(message, "Organization: {org}");
        }
        if let Some(contact) = &details.contact {
            let _ = writeln!(message, "Contact: {contact}");
        }
        if let Some(signature) = &details.signature {
            let _ = writeln!(message, "Signature: {signature}");
        }

        Self {
            ssid: ssid.to_string(),
            kind: PromptKind::TrustServerCertificate,
            title: format!("Trust the server certificate for {ssid}?"),
            message: message.trim_end().to_string(),
            details: Some(details),
            help_link: None,
        }
    }

    /// Ask whether to connect with no way to verify the server.
    pub fn approve_without_ca(ssid: &str, help_link: &str) -> Self {
        Self {
            ssid: ssid.to_string(),
            kind: PromptKind::ApproveWithoutCa,
            title: format!("Connect to {ssid} without verifying the server?"),
            message: format!(
                "{ssid} has no certificate specified. Connecting may expose your credentials."
            ),
            details: None,
            help_link: non_empty(help_link),
        }
    }
}

/// What happens when the user taps an ongoing alert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "action", content = "url")]
pub enum AlertTapAction {
    /// Report back through `on_alert_tapped` so the prompt can be shown.
    ShowPrompt,
    /// Open a help page; the decision happens via the alert's own actions.
    OpenHelpLink(String),
}

/// A dismissible, ongoing alert for attempts the user did not start.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OngoingAlert {
    pub ssid: String,
    pub title: String,
    pub message: String,
    pub tap_action: AlertTapAction,
    /// The alert carries its own accept / reject actions.
    pub offers_decision: bool,
}

impl OngoingAlert {
    pub fn trust_server(ssid: &str) -> Self {
        Self {
            ssid: ssid.to_string(),
            title: "Verify this network".to_string(),
            message: format!("Review the server certificate for {ssid} before connecting."),
            tap_action: AlertTapAction::ShowPrompt,
            offers_decision: false,
        }
    }

    pub fn approve_without_ca(ssid: &str, help_link: &str) -> Self {
        Self {
            ssid: ssid.to_string(),
            title: "Network can't be verified".to_string(),
            message: format!("{ssid} has no certificate specified."),
            tap_action: AlertTapAction::OpenHelpLink(help_link.to_string()),
            offers_decision: true,
        }
    }
}

/// Informational message; solicits no decision and is not tracked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub ssid: String,
    pub title: String,
    pub message: String,
    /// Show as a dialog rather than a plain notification.
    pub modal: bool,
}

impl Notice {
    pub fn invalid_chain(ssid: &str, modal: bool) -> Self {
        Self {
            ssid: ssid.to_string(),
            title: format!("Can't connect to {ssid}"),
            message: "The server's certificate chain is invalid.".to_string(),
            modal,
        }
    }
}

fn non_empty(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}
