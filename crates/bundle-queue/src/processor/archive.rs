use std::io::{Cursor, Read, Seek};

use crate::config::RecordDefaults;
use crate::error::ConvertError;
use crate::processor::manifest::BundleManifest;
use crate::processor::{BundleDecoder, BundleFormat};
use crate::record::ServerConfig;

const MANIFEST_NAME: &str = "manifest.json";

/// Decodes zip-packaged bundles (`.dxt`, `.mcpb`, `.zip`).
pub struct ArchiveDecoder {
    defaults: RecordDefaults,
}

impl ArchiveDecoder {
    pub fn new(defaults: RecordDefaults) -> Self {
        Self { defaults }
    }
}

impl Default for ArchiveDecoder {
    fn default() -> Self {
        Self::new(RecordDefaults::default())
    }
}

impl BundleDecoder for ArchiveDecoder {
    fn decode(
        &self,
        payload: &[u8],
        _file_name: Option<&str>,
    ) -> Result<ServerConfig, ConvertError> {
        let mut archive = zip::ZipArchive::new(Cursor::new(payload))?;

        let manifest = read_manifest(&mut archive)?;
        let value: serde_json::Value = serde_json::from_str(&manifest)?;

        BundleManifest::from_value(value)?.into_server_config(&self.defaults)
    }

    fn supports(&self, format: BundleFormat) -> bool {
        matches!(format, BundleFormat::Archive)
    }
}

/// Reads `manifest.json` from the archive root, or from the shallowest
/// directory holding one when the bundle was zipped with a wrapping folder.
fn read_manifest<R: Read + Seek>(
    archive: &mut zip::ZipArchive<R>,
) -> Result<String, ConvertError> {
    let entry_name = archive
        .file_names()
        .filter(|name| *name == MANIFEST_NAME || name.ends_with("/manifest.json"))
        .min_by_key(|name| name.matches('/').count())
        .map(|name| name.to_string())
        .ok_or(ConvertError::ManifestNotFound)?;

    let mut entry = archive.by_name(&entry_name)?;
    let mut content = String::new();
    entry
        .read_to_string(&mut content)
        .map_err(|e| ConvertError::Archive(format!("Failed to read {}: {}", entry_name, e)))?;

    Ok(content)
}
