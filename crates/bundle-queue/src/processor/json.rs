use serde_json::Value;

use crate::config::RecordDefaults;
use crate::error::ConvertError;
use crate::processor::manifest::BundleManifest;
use crate::processor::{BundleDecoder, BundleFormat};
use crate::record::ServerConfig;

/// Decodes JSON bundles: either a bare manifest, or a client config
/// fragment of the form `{"mcpServers": {"<name>": {...}}}` holding one server.
pub struct JsonDecoder {
    defaults: RecordDefaults,
}

impl JsonDecoder {
    pub fn new(defaults: RecordDefaults) -> Self {
        Self { defaults }
    }
}

impl Default for JsonDecoder {
    fn default() -> Self {
        Self::new(RecordDefaults::default())
    }
}

impl BundleDecoder for JsonDecoder {
    fn decode(
        &self,
        payload: &[u8],
        _file_name: Option<&str>,
    ) -> Result<ServerConfig, ConvertError> {
        let value: Value = serde_json::from_slice(payload)?;
        let value = unwrap_servers_map(value)?;

        BundleManifest::from_value(value)?.into_server_config(&self.defaults)
    }

    fn supports(&self, format: BundleFormat) -> bool {
        matches!(format, BundleFormat::Json)
    }
}

fn unwrap_servers_map(value: Value) -> Result<Value, ConvertError> {
    let mut root = match value {
        Value::Object(root) => root,
        other => return Ok(other),
    };

    let servers = match root.remove("mcpServers") {
        Some(Value::Object(servers)) => servers,
        Some(_) => {
            return Err(ConvertError::InvalidManifest(
                "mcpServers must be an object".to_string(),
            ))
        }
        None => return Ok(Value::Object(root)),
    };

    if servers.len() != 1 {
        return Err(ConvertError::InvalidManifest(format!(
            "expected exactly one entry in mcpServers, found {}",
            servers.len()
        )));
    }

    let Some((key, mut server)) = servers.into_iter().next() else {
        return Err(ConvertError::InvalidManifest("mcpServers is empty".to_string()));
    };

    if let Value::Object(fields) = &mut server {
        fields.entry("name").or_insert(Value::String(key));
    }

    Ok(server)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::ServerType;

    #[test]
    fn test_decodes_bare_manifest() {
        let payload = br#"
            {"name": "search", "type": "http", "url": "https://search.example.com/mcp"}
        "#;

        let record = JsonDecoder::default().decode(payload, Some("search.json")).unwrap();
        assert_eq!(record.name, "search");
        assert_eq!(record.server_type, ServerType::Remote);
        assert_eq!(record.url.as_deref(), Some("https://search.example.com/mcp"));
    }

    #[test]
    fn test_decodes_servers_map() {
        let payload =
            br#"{"mcpServers": {"github": {"command": "docker", "args": ["run", "gh"]}}}"#;

        let record = JsonDecoder::default().decode(payload, None).unwrap();
        assert_eq!(record.name, "github");
        assert_eq!(record.command.as_deref(), Some("docker"));
    }

    #[test]
    fn test_servers_map_keeps_explicit_name() {
        let payload = br#"{"mcpServers": {"gh": {"name": "GitHub", "command": "docker"}}}"#;

        let record = JsonDecoder::default().decode(payload, None).unwrap();
        assert_eq!(record.name, "GitHub");
    }

    #[test]
    fn test_servers_map_with_several_entries() {
        let payload = br#"{"mcpServers": {"a": {"command": "x"}, "b": {"command": "y"}}}"#;

        let err = JsonDecoder::default().decode(payload, None).unwrap_err();
        assert!(matches!(err, ConvertError::InvalidManifest(_)));
    }

    #[test]
    fn test_malformed_json() {
        let err = JsonDecoder::default().decode(b"{\"name\": ", None).unwrap_err();
        assert!(matches!(err, ConvertError::InvalidJson(_)));
    }

    #[test]
    fn test_missing_name() {
        let err = JsonDecoder::default()
            .decode(br#"{"command": "node"}"#, None)
            .unwrap_err();
        assert_eq!(err.to_string(), "missing name");
    }
}
