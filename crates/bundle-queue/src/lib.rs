//! Sequential conversion of uploaded server bundles into configuration records.
//!
//! [`ConversionQueue`] accepts raw bundle bytes, converts them one at a time
//! through a [`BundleConverter`], and reports every job transition to any
//! number of listeners.

pub mod broadcast;
pub mod config;
pub mod error;
pub mod processor;
pub mod queue;
pub mod record;
pub mod telemetry;

pub use broadcast::{ListenerGuard, ListenerId, UpdateBus, UpdateStream};
pub use config::{load_config, LoggingConfig, QueueConfig, RecordDefaults};
pub use error::{BundleQueueError, ConfigError, ConvertError, QueueError, Result};
pub use processor::{BundleConverter, BundleDecoder, BundleFormat, DecoderRegistry};
pub use queue::{ConversionJob, ConversionQueue, JobCounts, JobStatus, JobUpdates};
pub use record::{ServerConfig, ServerType, VerificationStatus};
pub use telemetry::init_tracing;
