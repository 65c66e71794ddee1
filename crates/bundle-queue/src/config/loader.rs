use std::path::Path;

use tracing_subscriber::EnvFilter;

use crate::config::schema::QueueConfig;
use crate::error::ConfigError;

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<QueueConfig, ConfigError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source: e,
    })?;

    load_config_from_str(&content)
}

pub fn load_config_from_str(content: &str) -> Result<QueueConfig, ConfigError> {
    let config: QueueConfig = serde_json::from_str(content)?;

    validate_config(&config)?;

    Ok(config)
}

pub(crate) fn validate_config(config: &QueueConfig) -> Result<(), ConfigError> {
    // 100 is only ever reported by a completed job
    if config.processing_progress >= 100 {
        return Err(ConfigError::Validation {
            message: format!(
                "processingProgress must be below 100, got {}",
                config.processing_progress
            ),
        });
    }

    if let Err(e) = EnvFilter::try_new(&config.logging.level) {
        return Err(ConfigError::Validation {
            message: format!("Invalid log level '{}': {}", config.logging.level, e),
        });
    }

    Ok(())
}
