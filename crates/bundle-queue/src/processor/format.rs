use std::path::Path;

use serde::{Deserialize, Serialize};

/// Zip local file header magic.
const ARCHIVE_SIGNATURE: &[u8; 2] = b"PK";

/// Encoding family of an uploaded bundle.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BundleFormat {
    /// Zip container carrying a `manifest.json`.
    Archive,
    /// Plain JSON document.
    Json,
}

impl BundleFormat {
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "zip" | "dxt" | "mcpb" => Some(Self::Archive),
            "json" => Some(Self::Json),
            _ => None,
        }
    }

    /// Resolves the format hinted by a file name: the extension table first,
    /// then the structured-syntax suffix (`+json`, `+zip`) of the MIME type
    /// guessed from the name, so `.jsonld` or `.webmanifest` read as JSON.
    pub fn from_file_name(file_name: &str) -> Option<Self> {
        let path = Path::new(file_name);
        if let Some(format) = path
            .extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
        {
            return Some(format);
        }

        mime_guess::from_path(path)
            .iter()
            .find_map(|mime| match mime.suffix().map(|suffix| suffix.as_str()) {
                Some("json") => Some(Self::Json),
                Some("zip") => Some(Self::Archive),
                _ => None,
            })
    }

    /// Classifies a payload by its leading bytes. Anything that is neither
    /// zip-signed nor a JSON object falls back to [`BundleFormat::Archive`].
    pub fn sniff(payload: &[u8]) -> Self {
        if payload.starts_with(ARCHIVE_SIGNATURE) {
            return Self::Archive;
        }

        let first = payload.iter().find(|b| !b.is_ascii_whitespace());
        if first == Some(&b'{') {
            Self::Json
        } else {
            Self::Archive
        }
    }

    pub fn detect(payload: &[u8], file_name: Option<&str>) -> Self {
        file_name
            .and_then(Self::from_file_name)
            .unwrap_or_else(|| Self::sniff(payload))
    }
}

impl std::fmt::Display for BundleFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BundleFormat::Archive => write!(f, "archive"),
            BundleFormat::Json => write!(f, "json"),
        }
    }
}
