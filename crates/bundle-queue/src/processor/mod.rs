//! The conversion collaborator: turns raw bundle bytes into a [`ServerConfig`].

pub mod archive;
pub mod format;
pub mod json;
pub mod manifest;

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use log::debug;

use crate::config::RecordDefaults;
use crate::error::ConvertError;
use crate::record::ServerConfig;

pub use archive::ArchiveDecoder;
pub use format::BundleFormat;
pub use json::JsonDecoder;

/// Converts one uploaded bundle into a configuration record.
///
/// This is the only thing the queue needs from the format layer; tests and
/// host applications can inject their own implementation.
#[async_trait]
pub trait BundleConverter: Send + Sync {
    async fn convert(
        &self,
        payload: Bytes,
        file_name: Option<String>,
    ) -> Result<ServerConfig, ConvertError>;
}

/// A synchronous decoder for one bundle format family.
pub trait BundleDecoder: Send + Sync {
    fn decode(
        &self,
        payload: &[u8],
        file_name: Option<&str>,
    ) -> Result<ServerConfig, ConvertError>;

    fn supports(&self, format: BundleFormat) -> bool;
}

/// Detects the bundle format and hands the payload to the matching decoder.
#[derive(Clone)]
pub struct DecoderRegistry {
    decoders: Arc<Vec<Box<dyn BundleDecoder>>>,
}

impl DecoderRegistry {
    pub fn new(defaults: RecordDefaults) -> Self {
        let decoders: Vec<Box<dyn BundleDecoder>> = vec![
            Box::new(ArchiveDecoder::new(defaults.clone())),
            Box::new(JsonDecoder::new(defaults)),
        ];

        Self {
            decoders: Arc::new(decoders),
        }
    }

    pub fn decode(
        &self,
        payload: &[u8],
        file_name: Option<&str>,
    ) -> Result<ServerConfig, ConvertError> {
        let format = BundleFormat::detect(payload, file_name);
        debug!(
            "Decoding {} byte bundle {:?} as {}",
            payload.len(),
            file_name.unwrap_or("<unnamed>"),
            format
        );

        for decoder in self.decoders.iter() {
            if decoder.supports(format) {
                return decoder.decode(payload, file_name);
            }
        }

        Err(ConvertError::UnsupportedFormat(format.to_string()))
    }
}

impl Default for DecoderRegistry {
    fn default() -> Self {
        Self::new(RecordDefaults::default())
    }
}

#[async_trait]
impl BundleConverter for DecoderRegistry {
    async fn convert(
        &self,
        payload: Bytes,
        file_name: Option<String>,
    ) -> Result<ServerConfig, ConvertError> {
        let registry = self.clone();
        // Zip inflation is CPU-bound; keep it off the async workers.
        tokio::task::spawn_blocking(move || registry.decode(&payload, file_name.as_deref()))
            .await
            .map_err(|e| ConvertError::Internal(format!("Decoder task failed: {}", e)))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Write};
    use zip::write::SimpleFileOptions;

    fn zipped_manifest(manifest: &str) -> Vec<u8> {
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        writer
            .start_file("manifest.json", SimpleFileOptions::default())
            .unwrap();
        writer.write_all(manifest.as_bytes()).unwrap();
        writer.finish().unwrap().into_inner()
    }

    #[test]
    fn test_registry_routes_archive_by_signature() {
        let registry = DecoderRegistry::default();
        let payload = zipped_manifest(r#"{"name": "zipped", "command": "node"}"#);

        let record = registry.decode(&payload, None).unwrap();
        assert_eq!(record.name, "zipped");
    }

    #[test]
    fn test_registry_routes_json_by_sniff() {
        let registry = DecoderRegistry::default();

        let record = registry
            .decode(br#"  {"name": "plain", "command": "uvx"}"#, Some("upload"))
            .unwrap();
        assert_eq!(record.name, "plain");
    }

    #[test]
    fn test_registry_honours_extension_hint() {
        let registry = DecoderRegistry::default();

        // JSON body but an archive extension: the archive decoder gets it and fails
        let err = registry
            .decode(br#"{"name": "plain", "command": "uvx"}"#, Some("bundle.dxt"))
            .unwrap_err();
        assert!(matches!(err, ConvertError::Archive(_)));
    }

    #[test]
    fn test_registry_applies_defaults() {
        let registry = DecoderRegistry::new(RecordDefaults {
            auto_start: true,
            ..RecordDefaults::default()
        });

        let record = registry
            .decode(br#"{"name": "auto", "command": "srv"}"#, None)
            .unwrap();
        assert!(record.auto_start);
    }

    #[tokio::test]
    async fn test_convert_runs_off_thread() {
        let registry = DecoderRegistry::default();

        let record = registry
            .convert(
                Bytes::from_static(br#"{"name": "async", "command": "srv"}"#),
                Some("async.json".to_string()),
            )
            .await
            .unwrap();
        assert_eq!(record.name, "async");
    }
}
