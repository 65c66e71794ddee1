//! In-memory job table.

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::Serialize;

use crate::queue::job::{ConversionJob, JobStatus};

/// Number of jobs in each state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct JobCounts {
    pub queued: usize,
    pub processing: usize,
    pub completed: usize,
    pub failed: usize,
}

impl JobCounts {
    pub fn total(&self) -> usize {
        self.queued + self.processing + self.completed + self.failed
    }
}

#[derive(Default)]
struct Table {
    jobs: HashMap<String, ConversionJob>,
    /// Ids in listing order, which tracks the pending queue.
    order: Vec<String>,
}

/// Owns every job record for the lifetime of the queue. Readers only ever
/// get clones.
///
/// Records are never evicted.
#[derive(Default)]
pub struct JobStore {
    table: RwLock<Table>,
}

impl JobStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, Table> {
        match self.table.read() {
            Ok(g) => g,
            Err(poisoned) => {
                log::warn!("Job store lock was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    fn write(&self) -> RwLockWriteGuard<'_, Table> {
        match self.table.write() {
            Ok(g) => g,
            Err(poisoned) => {
                log::warn!("Job store lock was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    pub fn insert(&self, job: ConversionJob) {
        let id = job.id.clone();
        let mut table = self.write();
        if table.jobs.insert(id.clone(), job).is_none() {
            table.order.push(id);
        }
    }

    /// Moves the job to the end of the listing order. Called while the id is
    /// pushed onto the pending queue, so listing order and processing order
    /// agree even when submitters interleave.
    pub fn mark_submitted(&self, job_id: &str) {
        let mut table = self.write();
        if let Some(pos) = table.order.iter().rposition(|id| id == job_id) {
            let id = table.order.remove(pos);
            table.order.push(id);
        }
    }

    pub fn get(&self, job_id: &str) -> Option<ConversionJob> {
        self.read().jobs.get(job_id).cloned()
    }

    /// Applies `mutate` to the stored job and returns a snapshot of the
    /// result, or `None` when no job has that id. A mutation that reports
    /// `false` (rejected transition) also yields `None`.
    pub fn update<F>(&self, job_id: &str, mutate: F) -> Option<ConversionJob>
    where
        F: FnOnce(&mut ConversionJob) -> bool,
    {
        let mut table = self.write();
        let job = table.jobs.get_mut(job_id)?;
        if mutate(job) {
            Some(job.clone())
        } else {
            None
        }
    }

    /// All jobs, in the order they entered the pending queue.
    pub fn all(&self) -> Vec<ConversionJob> {
        let table = self.read();
        table
            .order
            .iter()
            .filter_map(|id| table.jobs.get(id).cloned())
            .collect()
    }

    pub fn counts(&self) -> JobCounts {
        let table = self.read();
        let mut counts = JobCounts::default();
        for job in table.jobs.values() {
            match job.status {
                JobStatus::Queued => counts.queued += 1,
                JobStatus::Processing => counts.processing += 1,
                JobStatus::Completed => counts.completed += 1,
                JobStatus::Failed => counts.failed += 1,
            }
        }
        counts
    }

    pub fn len(&self) -> usize {
        self.read().jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
