//! Job types for the manager's asynchronous mutation protocol.
//!
//! Every mutating call answers with `{id: {value: jobId}}`; the job is then
//! observed via `Job/{id}` until `summaryDone` flips true.

use crate::core::domain::model::resource::ObjectId;
use serde::{Deserialize, Serialize};

/// The run states a job reports. The manager's vocabulary is open-ended;
/// anything we do not recognize is carried as `Other` and, once the job is
/// done, treated as benign completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobRunState {
    Running,
    Success,
    Failure,
    Other(String),
}

impl From<&str> for JobRunState {
    fn from(raw: &str) -> Self {
        match raw {
            "RUNNING" => JobRunState::Running,
            "SUCCESS" => JobRunState::Success,
            "FAILURE" => JobRunState::Failure,
            other => JobRunState::Other(other.to_string()),
        }
    }
}

/// A job as returned by `Job/{id}`.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub id: ObjectId,
    /// True once the job has reached a terminal state.
    pub summary_done: bool,
    pub job_run_state: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Present only on SUCCESS when the operation produced a new resource.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result_id: Option<ObjectId>,
}

impl Job {
    pub fn run_state(&self) -> JobRunState {
        JobRunState::from(self.job_run_state.as_str())
    }
}

/// The `{id: {value}}` envelope every mutating call answers with.
#[derive(Debug, Clone, Deserialize)]
pub struct JobSubmission {
    pub id: ObjectId,
}
