//! Network identity and enterprise-configuration snapshots.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque identifier of a configured network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NetworkId(pub u32);

impl NetworkId {
    pub fn new(id: u32) -> Self {
        Self(id)
    }
}

impl fmt::Display for NetworkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Name of a managed interface (e.g. `wlan0`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InterfaceName(pub String);

impl InterfaceName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for InterfaceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Enterprise (802.1X) configuration flags relevant to server trust.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EnterpriseFlags {
    /// The EAP method authenticates the server with a certificate.
    pub uses_server_cert: bool,
    /// A root CA certificate is configured for this network.
    pub has_ca_certificate: bool,
    /// Trust On First Use is enabled for this network.
    pub tofu_enabled: bool,
    /// The user previously approved connecting without a CA certificate.
    pub user_approved_no_ca_cert: bool,
}

/// Snapshot of a network for the duration of one connection attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkRef {
    pub id: NetworkId,
    pub ssid: String,
    /// `None` for non-enterprise networks.
    pub enterprise: Option<EnterpriseFlags>,
}

impl NetworkRef {
    /// An enterprise network with the given flags.
    pub fn enterprise(id: NetworkId, ssid: impl Into<String>, flags: EnterpriseFlags) -> Self {
        Self {
            id,
            ssid: ssid.into(),
            enterprise: Some(flags),
        }
    }

    /// A personal/open network.
    pub fn personal(id: NetworkId, ssid: impl Into<String>) -> Self {
        Self {
            id,
            ssid: ssid.into(),
            enterprise: None,
        }
    }

}
