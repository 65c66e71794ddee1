use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::record::ServerConfig;

/// Lifecycle state of a conversion job.
///
/// `Queued -> Processing -> Completed | Failed`; the last two are terminal.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Queued,
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    pub fn can_transition_to(&self, next: JobStatus) -> bool {
        matches!(
            (self, next),
            (JobStatus::Queued, JobStatus::Processing)
                | (JobStatus::Processing, JobStatus::Completed)
                | (JobStatus::Processing, JobStatus::Failed)
        )
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobStatus::Queued => write!(f, "queued"),
            JobStatus::Processing => write!(f, "processing"),
            JobStatus::Completed => write!(f, "completed"),
            JobStatus::Failed => write!(f, "failed"),
        }
    }
}

/// One submitted bundle and everything known about its conversion.
///
/// Values handed out by the queue are snapshots; changing them has no effect
/// on the queue's own record.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversionJob {
    pub id: String,
    pub status: JobStatus,
    /// Advisory, 0..=100. Reaches 100 only on completion.
    pub progress: u8,
    #[serde(skip)]
    pub payload: Bytes,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<ServerConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ConversionJob {
    pub(crate) fn new(id: String, payload: Bytes, file_name: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            id,
            status: JobStatus::Queued,
            progress: 0,
            payload,
            file_name,
            result: None,
            error: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.status.is_terminal()
    }

    /// Moves the job to `next` if the state machine allows it.
    fn advance(&mut self, next: JobStatus) -> bool {
        if !self.status.can_transition_to(next) {
            log::warn!(
                "Ignoring invalid transition {} -> {} for job {}",
                self.status,
                next,
                self.id
            );
            return false;
        }
        self.status = next;
        self.updated_at = Utc::now();
        true
    }

    pub(crate) fn begin(&mut self, progress: u8) -> bool {
        if !self.advance(JobStatus::Processing) {
            return false;
        }
        self.progress = self.progress.max(progress.min(99));
        true
    }

    pub(crate) fn complete(&mut self, result: ServerConfig) -> bool {
        if !self.advance(JobStatus::Completed) {
            return false;
        }
        self.progress = 100;
        self.result = Some(result);
        true
    }

    pub(crate) fn fail(&mut self, error: String) -> bool {
        if !self.advance(JobStatus::Failed) {
            return false;
        }
        self.error = Some(error);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job() -> ConversionJob {
        ConversionJob::new(
            "job-1".to_string(),
            Bytes::from_static(b"{}"),
            Some("server.json".to_string()),
        )
    }

    #[test]
    fn test_new_job_is_queued() {
        let job = job();
        assert_eq!(job.status, JobStatus::Queued);
        assert_eq!(job.progress, 0);
        assert!(job.result.is_none());
        assert!(job.error.is_none());
        assert_eq!(job.created_at, job.updated_at);
    }

    #[test]
    fn test_success_path() {
        let mut job = job();
        assert!(job.begin(10));
        assert_eq!(job.status, JobStatus::Processing);
        assert_eq!(job.progress, 10);

        assert!(job.complete(ServerConfig::new("srv").with_command("srv")));
        assert_eq!(job.status, JobStatus::Completed);
        assert_eq!(job.progress, 100);
        assert!(job.result.is_some());
        assert!(job.error.is_none());
    }

    #[test]
    fn test_failure_keeps_progress_below_100() {
        let mut job = job();
        job.begin(10);
        assert!(job.fail("missing name".to_string()));

        assert_eq!(job.status, JobStatus::Failed);
        assert_eq!(job.progress, 10);
        assert_eq!(job.error.as_deref(), Some("missing name"));
        assert!(job.result.is_none());
    }

    #[test]
    fn test_cannot_skip_processing() {
        let mut job = job();
        assert!(!job.complete(ServerConfig::new("srv")));
        assert!(!job.fail("nope".to_string()));
        assert_eq!(job.status, JobStatus::Queued);
    }

    #[test]
    fn test_terminal_states_are_final() {
        let mut job = job();
        job.begin(10);
        job.fail("boom".to_string());

        assert!(!job.begin(10));
        assert!(!job.complete(ServerConfig::new("srv")));
        assert_eq!(job.status, JobStatus::Failed);
        assert_eq!(job.error.as_deref(), Some("boom"));
    }

    #[test]
    fn test_processing_progress_never_reaches_100() {
        let mut job = job();
        job.begin(100);
        assert_eq!(job.progress, 99);
    }

    #[test]
    fn test_snapshot_serialization_skips_payload() {
        let job = job();
        let json = serde_json::to_value(&job).unwrap();
        assert_eq!(json["status"], "queued");
        assert_eq!(json["fileName"], "server.json");
        assert!(json.get("payload").is_none());
        assert!(json.get("result").is_none());
    }
}
