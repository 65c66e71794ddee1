use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BundleQueueError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Conversion error: {0}")]
    Convert(#[from] ConvertError),

    #[error("Queue error: {0}")]
    Queue(#[from] QueueError),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config JSON: {0}")]
    ParseJson(#[from] serde_json::Error),

    #[error("Config validation failed: {message}")]
    Validation { message: String },

    #[error("Failed to initialise logging: {0}")]
    Logging(String),
}

/// Failures raised while turning a bundle payload into a [`crate::ServerConfig`].
#[derive(Error, Debug)]
pub enum ConvertError {
    #[error("Unsupported bundle format: {0}")]
    UnsupportedFormat(String),

    #[error("Failed to read bundle archive: {0}")]
    Archive(String),

    #[error("Bundle archive does not contain a manifest.json")]
    ManifestNotFound,

    #[error("Invalid bundle JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("Invalid bundle manifest: {0}")]
    InvalidManifest(String),

    #[error("missing {field}")]
    MissingField { field: &'static str },

    #[error("{0}")]
    Internal(String),
}

impl From<zip::result::ZipError> for ConvertError {
    fn from(err: zip::result::ZipError) -> Self {
        ConvertError::Archive(err.to_string())
    }
}

#[derive(Error, Debug)]
pub enum QueueError {
    /// The job reached `failed`; `message` is the error stored on the job.
    #[error("Job {job_id} failed: {message}")]
    JobFailed { job_id: String, message: String },

    #[error("Job not found: {0}")]
    JobNotFound(String),

    #[error("Update channel closed before the job finished")]
    Closed,
}

pub type Result<T> = std::result::Result<T, BundleQueueError>;
