use serde::Serialize;

/// Status of a background job as reported by `GET /api/jobs/{job_id}`.
///
/// `InProgress` carries a completion percentage, `Completed` a short summary
/// and `Failed` the error message.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub enum JobStatus {
    Pending,
    InProgress(u32),
    Completed(String),
    Failed(String),
}

impl JobStatus {
    /// True once the job can no longer change state.
    pub fn is_finished(&self) -> bool {
        matches!(self, JobStatus::Completed(_) | JobStatus::Failed(_))
    }
}
