//! Tracks long-running background jobs such as batch invoice generation.
//!
//! - `JobsState`: clonable, shared map of job id to `JobStatus`, stored in the
//!   application state.
//! - `JobUpdate`: a status change pushed by a worker.
//! - `start_job_updater`: the single task that applies `JobUpdate`s to the map.
//!
//! Workers run on the blocking pool and only ever talk to the map through the
//! channel, so they never hold the lock.

use common::jobs::JobStatus;
use std::{collections::HashMap, sync::Arc};
use tokio::sync::{mpsc, RwLock};
use uuid::Uuid;

const CHANNEL_CAPACITY: usize = 100;

#[derive(Clone)]
pub struct JobsState {
    /// Job id to its latest status. Read by the status endpoint, written by
    /// `start_job_updater` and when a job is registered.
    pub jobs: Arc<RwLock<HashMap<String, JobStatus>>>,

    /// Sender side of the update channel; cloned into each worker.
    pub tx: mpsc::Sender<JobUpdate>,
}

#[derive(Debug)]
pub struct JobUpdate {
    pub(crate) job_id: String,
    pub(crate) status: JobStatus,
}

impl JobUpdate {
    pub fn new(job_id: impl Into<String>, status: JobStatus) -> Self {
        Self {
            job_id: job_id.into(),
            status,
        }
    }
}

impl JobsState {
    /// Creates the state and spawns its updater task on the current runtime.
    pub fn start() -> Self {
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        let state = JobsState {
            jobs: Arc::new(RwLock::new(HashMap::new())),
            tx,
        };
        let updater_state = state.clone();
        tokio::spawn(async move {
            start_job_updater(updater_state, rx).await;
        });
        state
    }

    /// Registers a new job as `Pending` and returns its id.
    pub async fn register(&self) -> String {
        let job_id = Uuid::new_v4().to_string();
        self.jobs
            .write()
            .await
            .insert(job_id.clone(), JobStatus::Pending);
        job_id
    }

    pub async fn set(&self, job_id: &str, status: JobStatus) {
        self.jobs.write().await.insert(job_id.to_string(), status);
    }

    pub async fn get(&self, job_id: &str) -> Option<JobStatus> {
        self.jobs.read().await.get(job_id).cloned()
    }
}

/// Applies `JobUpdate` messages until every sender is dropped.
///
/// A finished job is never moved back to a running state by a late update.
pub async fn start_job_updater(state: JobsState, mut rx: mpsc::Receiver<JobUpdate>) {
    while let Some(update) = rx.recv().await {
        let mut jobs = state.jobs.write().await;
        if jobs.get(&update.job_id).is_some_and(JobStatus::is_finished)
            && !update.status.is_finished()
        {
            log::debug!("Ignoring late update for finished job {}", update.job_id);
            continue;
        }
        jobs.insert(update.job_id, update.status);
    }
}
