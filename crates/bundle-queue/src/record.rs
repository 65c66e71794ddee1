//! The normalized server configuration produced by a successful conversion.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// How a configured server is reached.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ServerType {
    /// Spawned locally and spoken to over stdio.
    #[default]
    Local,
    /// Reached over the network at `url`.
    Remote,
}

impl ServerType {
    /// Maps the transport names bundles use in the wild onto a server type.
    pub fn from_alias(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "local" | "stdio" => Some(Self::Local),
            "remote" | "sse" | "http" | "streamable-http" | "streamable_http" => {
                Some(Self::Remote)
            }
            _ => None,
        }
    }
}

impl std::fmt::Display for ServerType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ServerType::Local => write!(f, "local"),
            ServerType::Remote => write!(f, "remote"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum VerificationStatus {
    #[default]
    Unverified,
    Verified,
}

/// A server configuration record, ready to be stored by the host application.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ServerConfig {
    pub name: String,
    #[serde(rename = "type")]
    pub server_type: ServerType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub env: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    pub disabled: bool,
    pub auto_start: bool,
    pub verification: VerificationStatus,
}

impl ServerConfig {
    /// Creates a local record with every optional field at its default.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            server_type: ServerType::Local,
            command: None,
            args: vec![],
            env: BTreeMap::new(),
            url: None,
            description: None,
            version: None,
            disabled: false,
            auto_start: false,
            verification: VerificationStatus::Unverified,
        }
    }

    pub fn with_command(mut self, command: impl Into<String>) -> Self {
        self.command = Some(command.into());
        self
    }
}
