use serde::{Deserialize, Serialize};

use crate::record::ServerType;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueConfig {
    /// Advisory progress reported when a job moves to `processing`.
    #[serde(default = "default_processing_progress")]
    pub processing_progress: u8,
    #[serde(default)]
    pub defaults: RecordDefaults,
    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_processing_progress() -> u8 {
    10
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            processing_progress: default_processing_progress(),
            defaults: RecordDefaults::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// Values applied to record fields a bundle leaves unspecified.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordDefaults {
    #[serde(default)]
    pub server_type: ServerType,
    #[serde(default)]
    pub disabled: bool,
    #[serde(default)]
    pub auto_start: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_level")]
    pub level: String,
    #[serde(default)]
    pub json: bool,
}

fn default_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            json: false,
        }
    }
}
