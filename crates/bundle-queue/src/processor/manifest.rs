//! Normalisation of bundle manifests into [`ServerConfig`] records.
//!
//! Both decoders end up here: the archive decoder with the contents of the
//! bundled `manifest.json`, the JSON decoder with the uploaded document. A
//! manifest may describe its launch command at the top level or under
//! `server.mcp_config`; top-level values win.

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::config::RecordDefaults;
use crate::error::ConvertError;
use crate::record::{ServerConfig, ServerType, VerificationStatus};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BundleManifest {
    pub name: Option<String>,
    #[serde(alias = "display_name")]
    pub display_name: Option<String>,
    pub version: Option<String>,
    pub description: Option<String>,
    #[serde(rename = "type", alias = "transport")]
    pub server_type: Option<String>,
    pub command: Option<String>,
    pub args: Option<Vec<String>>,
    pub env: Option<BTreeMap<String, String>>,
    pub url: Option<String>,
    pub disabled: Option<bool>,
    #[serde(alias = "auto_start")]
    pub auto_start: Option<bool>,
    pub server: Option<ServerSection>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ServerSection {
    /// Runtime the entry point targets (`node`, `python`, `binary`).
    #[serde(rename = "type")]
    pub runtime: Option<String>,
    #[serde(alias = "entryPoint")]
    pub entry_point: Option<String>,
    #[serde(alias = "mcpConfig")]
    pub mcp_config: Option<LaunchConfig>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LaunchConfig {
    pub command: Option<String>,
    pub args: Option<Vec<String>>,
    pub env: Option<BTreeMap<String, String>>,
    pub url: Option<String>,
}

impl BundleManifest {
    pub fn from_value(value: serde_json::Value) -> Result<Self, ConvertError> {
        if !value.is_object() {
            return Err(ConvertError::InvalidManifest(
                "expected a JSON object".to_string(),
            ));
        }
        Ok(serde_json::from_value(value)?)
    }

    /// Builds the record. Only the name is required; a manifest without a
    /// `type` gets the configured default type.
    pub fn into_server_config(
        self,
        defaults: &RecordDefaults,
    ) -> Result<ServerConfig, ConvertError> {
        let name = self
            .name
            .or(self.display_name)
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
            .ok_or(ConvertError::MissingField { field: "name" })?;

        let (runtime, entry_point, launch) = match self.server {
            Some(server) => (
                server.runtime,
                server.entry_point,
                server.mcp_config.unwrap_or_default(),
            ),
            None => (None, None, LaunchConfig::default()),
        };

        let mut command = non_empty(self.command).or(non_empty(launch.command));
        let mut args = self.args.or(launch.args).unwrap_or_default();
        let url = non_empty(self.url).or(non_empty(launch.url));

        if command.is_none() {
            if let (Some(runtime), Some(entry)) = (runtime.as_deref(), entry_point) {
                match runtime_command(runtime) {
                    Some(program) => {
                        command = Some(program.to_string());
                        args.insert(0, entry);
                    }
                    None if runtime == "binary" => command = Some(entry),
                    None => {}
                }
            }
        }

        let mut env = launch.env.unwrap_or_default();
        env.extend(self.env.unwrap_or_default());

        let server_type = match self.server_type.as_deref() {
            Some(raw) => ServerType::from_alias(raw).ok_or_else(|| {
                ConvertError::InvalidManifest(format!("unknown server type '{}'", raw))
            })?,
            None => defaults.server_type,
        };

        Ok(ServerConfig {
            name,
            server_type,
            command,
            args,
            env,
            url,
            description: self.description,
            version: self.version,
            disabled: self.disabled.unwrap_or(defaults.disabled),
            auto_start: self.auto_start.unwrap_or(defaults.auto_start),
            verification: VerificationStatus::Unverified,
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn runtime_command(runtime: &str) -> Option<&'static str> {
    match runtime {
        "node" => Some("node"),
        "python" => Some("python3"),
        "uv" => Some("uv"),
        _ => None,
    }
}
