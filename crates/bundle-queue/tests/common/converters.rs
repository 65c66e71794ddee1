//! Scripted converters standing in for the format layer.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;

use bundle_queue::{BundleConverter, ConvertError, ServerConfig};

/// A payload instruction understood by [`ScriptedConverter`].
///
/// Encoded as `ok:<name>:<delay ms>`, `fail:<message>:<delay ms>` or
/// `panic:<message>:<delay ms>`.
pub fn ok_payload(name: &str, delay_ms: u64) -> Vec<u8> {
    format!("ok:{}:{}", name, delay_ms).into_bytes()
}

pub fn fail_payload(message: &str, delay_ms: u64) -> Vec<u8> {
    format!("fail:{}:{}", message, delay_ms).into_bytes()
}

pub fn panic_payload(message: &str) -> Vec<u8> {
    format!("panic:{}:0", message).into_bytes()
}

/// The record [`ScriptedConverter`] returns for `ok:<name>`.
pub fn expected_record(name: &str) -> ServerConfig {
    let mut record = ServerConfig::new(name).with_command("scripted-server");
    record.args = vec!["--name".to_string(), name.to_string()];
    record
}

/// Converter driven by the payload text. Tracks how many conversions run at
/// once and the order in which payloads arrive.
#[derive(Default)]
pub struct ScriptedConverter {
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    calls: Mutex<Vec<String>>,
}

impl ScriptedConverter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    /// Instruction names, in the order the converter was invoked.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl BundleConverter for ScriptedConverter {
    async fn convert(
        &self,
        payload: Bytes,
        _file_name: Option<String>,
    ) -> Result<ServerConfig, ConvertError> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        let _in_flight = InFlight(&self.in_flight);
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        let text = String::from_utf8_lossy(&payload).to_string();
        let mut parts = text.splitn(3, ':');
        let kind = parts.next().unwrap_or_default().to_string();
        let arg = parts.next().unwrap_or_default().to_string();
        let delay: u64 = parts.next().and_then(|d| d.parse().ok()).unwrap_or(0);

        self.calls.lock().unwrap().push(arg.clone());

        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        } else {
            tokio::task::yield_now().await;
        }

        match kind.as_str() {
            "ok" => Ok(expected_record(&arg)),
            "fail" if arg == "missing name" => Err(ConvertError::MissingField { field: "name" }),
            "fail" => Err(ConvertError::InvalidManifest(arg)),
            "panic" => panic!("{}", arg),
            other => Err(ConvertError::UnsupportedFormat(other.to_string())),
        }
    }
}
