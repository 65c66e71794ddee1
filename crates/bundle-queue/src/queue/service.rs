//! The conversion queue: strictly sequential, one job in flight at a time.

use std::collections::VecDeque;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;

use bytes::Bytes;
use futures_util::FutureExt;
use tokio::runtime::Handle;
use tokio::sync::oneshot;
use tracing::{debug, error, info, info_span, warn, Instrument};

use crate::broadcast::{ListenerId, UpdateBus, UpdateStream};
use crate::config::QueueConfig;
use crate::error::QueueError;
use crate::processor::{BundleConverter, DecoderRegistry};
use crate::queue::job::{ConversionJob, JobStatus};
use crate::queue::store::{JobCounts, JobStore};
use crate::record::ServerConfig;

/// Error stored on a job when the converter gave no usable description.
pub const GENERIC_FAILURE: &str = "Conversion failed";

/// Stream of job snapshots, one per state transition.
pub type JobUpdates = UpdateStream<ConversionJob>;

#[derive(Default)]
struct DrainState {
    pending: VecDeque<String>,
    /// Set while a drain task is alive. Only the task itself clears it, and
    /// only under the same lock that observed the queue empty.
    draining: bool,
}

struct QueueInner {
    store: JobStore,
    drain: Mutex<DrainState>,
    bus: UpdateBus<ConversionJob>,
    converter: Arc<dyn BundleConverter>,
    processing_progress: u8,
    runtime: Handle,
}

/// FIFO conversion queue with live job updates.
///
/// Cloning is cheap and every clone drives the same queue.
#[derive(Clone)]
pub struct ConversionQueue {
    inner: Arc<QueueInner>,
}

impl ConversionQueue {
    /// Creates a queue that hands every job to `converter`.
    ///
    /// # Panics
    /// Panics when called outside a Tokio runtime; the drain task is spawned
    /// on the runtime current at construction.
    pub fn new(converter: Arc<dyn BundleConverter>, config: &QueueConfig) -> Self {
        Self {
            inner: Arc::new(QueueInner {
                store: JobStore::new(),
                drain: Mutex::new(DrainState::default()),
                bus: UpdateBus::new(),
                converter,
                processing_progress: config.processing_progress.min(99),
                runtime: Handle::current(),
            }),
        }
    }

    /// Creates a queue backed by the built-in archive and JSON decoders.
    pub fn with_decoders(config: &QueueConfig) -> Self {
        let registry = DecoderRegistry::new(config.defaults.clone());
        Self::new(Arc::new(registry), config)
    }

    /// Submits a bundle and returns its job id without waiting for it to run.
    pub fn enqueue(&self, payload: impl Into<Bytes>, file_name: Option<&str>) -> String {
        let job = ConversionJob::new(
            uuid::Uuid::new_v4().to_string(),
            payload.into(),
            file_name.map(str::to_string),
        );
        let job_id = job.id.clone();

        info!(
            job_id = %job_id,
            file_name = file_name.unwrap_or("<unnamed>"),
            size = job.payload.len(),
            "Bundle queued for conversion"
        );

        // The queued event goes out before the id becomes visible to the
        // drain task, so no subscriber can see `processing` first.
        self.inner.store.insert(job.clone());
        self.inner.bus.publish(&job);

        let start_drain = {
            let mut state = self.inner.lock_drain();
            self.inner.store.mark_submitted(&job_id);
            state.pending.push_back(job_id.clone());
            !std::mem::replace(&mut state.draining, true)
        };

        if start_drain {
            let inner = Arc::clone(&self.inner);
            self.inner.runtime.spawn(inner.drain());
        }

        job_id
    }

    /// Submits a bundle and waits for its conversion to finish.
    pub async fn enqueue_and_wait(
        &self,
        payload: impl Into<Bytes>,
        file_name: Option<&str>,
    ) -> Result<ServerConfig, QueueError> {
        let job_id = self.enqueue(payload, file_name);
        self.wait_for(&job_id).await
    }

    /// Waits until the given job reaches a terminal state.
    ///
    /// Resolves immediately for a job that has already finished. Events for
    /// other jobs are ignored, and the temporary listener is removed when this
    /// future completes or is dropped.
    pub async fn wait_for(&self, job_id: &str) -> Result<ServerConfig, QueueError> {
        let (sender, receiver) = oneshot::channel();
        let slot = Mutex::new(Some(sender));
        let watched = job_id.to_string();

        let _guard = self.inner.bus.listen(move |job: &ConversionJob| {
            if job.id != watched || !job.status.is_terminal() {
                return;
            }
            if let Ok(mut slot) = slot.lock() {
                if let Some(sender) = slot.take() {
                    let _ = sender.send(job.clone());
                }
            }
        });

        // The store is written before every broadcast, so a job that finished
        // before the listener existed is already terminal here.
        match self.inner.store.get(job_id) {
            None => return Err(QueueError::JobNotFound(job_id.to_string())),
            Some(job) if job.is_finished() => return settle(job),
            Some(_) => {}
        }

        let job = receiver.await.map_err(|_| QueueError::Closed)?;
        settle(job)
    }

    /// Returns a snapshot of the job, or `None` if the id was never issued.
    pub fn get_job(&self, job_id: &str) -> Option<ConversionJob> {
        self.inner.store.get(job_id)
    }

    /// Snapshots of every job, in the order they are processed.
    ///
    /// A job whose `enqueue` call has not returned yet may still be listed
    /// ahead of jobs submitted concurrently with it. `created_at` records when
    /// the job was created and does not decide its position.
    pub fn jobs(&self) -> Vec<ConversionJob> {
        self.inner.store.all()
    }

    pub fn counts(&self) -> JobCounts {
        self.inner.store.counts()
    }

    /// Number of jobs waiting behind the one currently running.
    pub fn pending_len(&self) -> usize {
        self.inner.lock_drain().pending.len()
    }

    /// True when nothing is running and nothing is waiting.
    pub fn is_idle(&self) -> bool {
        let state = self.inner.lock_drain();
        !state.draining && state.pending.is_empty()
    }

    /// Registers a callback for every job transition, including `queued`.
    ///
    /// Callbacks run on the task performing the transition and must not block.
    pub fn on_update<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&ConversionJob) + Send + Sync + 'static,
    {
        self.inner.bus.on_update(listener)
    }

    pub fn off_update(&self, id: ListenerId) -> bool {
        self.inner.bus.off_update(id)
    }

    /// Stream of every job transition from now on. Dropping it unsubscribes.
    pub fn subscribe(&self) -> JobUpdates {
        self.inner.bus.subscribe()
    }
}

impl QueueInner {
    fn lock_drain(&self) -> MutexGuard<'_, DrainState> {
        match self.drain.lock() {
            Ok(g) => g,
            Err(poisoned) => {
                warn!("Drain state lock was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    fn next_pending(&self) -> Option<String> {
        let mut state = self.lock_drain();
        let next = state.pending.pop_front();
        if next.is_none() {
            state.draining = false;
        }
        next
    }

    async fn drain(self: Arc<Self>) {
        debug!("Drain loop started");

        while let Some(job_id) = self.next_pending() {
            let span = info_span!("conversion", job_id = %job_id);
            self.process(&job_id).instrument(span).await;
        }

        debug!("Drain loop idle");
    }

    async fn process(&self, job_id: &str) {
        let progress = self.processing_progress;
        let Some(job) = self.store.update(job_id, |job| job.begin(progress)) else {
            warn!("Pending job has no queued record, skipping");
            return;
        };
        self.bus.publish(&job);

        let started = Instant::now();
        let conversion = self
            .converter
            .convert(job.payload.clone(), job.file_name.clone());
        let outcome = AssertUnwindSafe(conversion).catch_unwind().await;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        let finished = match outcome {
            Ok(Ok(record)) => {
                info!(elapsed_ms, name = %record.name, "Bundle converted");
                self.store.update(job_id, |job| job.complete(record))
            }
            Ok(Err(e)) => {
                let message = failure_message(e.to_string());
                warn!(elapsed_ms, error = %message, "Bundle conversion failed");
                self.store.update(job_id, |job| job.fail(message))
            }
            Err(panic) => {
                let message = failure_message(panic_message(panic.as_ref()));
                error!(elapsed_ms, error = %message, "Converter panicked");
                self.store.update(job_id, |job| job.fail(message))
            }
        };

        match finished {
            Some(job) => self.bus.publish(&job),
            None => warn!("Job left processing unexpectedly"),
        }
    }
}

fn settle(job: ConversionJob) -> Result<ServerConfig, QueueError> {
    match (job.status, job.result) {
        (JobStatus::Completed, Some(record)) => Ok(record),
        _ => Err(QueueError::JobFailed {
            job_id: job.id,
            message: job.error.unwrap_or_else(|| GENERIC_FAILURE.to_string()),
        }),
    }
}

fn failure_message(message: String) -> String {
    if message.trim().is_empty() {
        GENERIC_FAILURE.to_string()
    } else {
        message
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        String::new()
    }
}
