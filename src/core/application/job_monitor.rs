//! The single synchronization primitive of the whole system.
//!
//! Every mutating manager call answers with a job handle; nothing that
//! depends on the mutation may run before that job reaches a terminal
//! state. The monitor polls `Job/{id}` at a fixed interval, bounded by a
//! configured timeout, and suspends on the runtime timer rather than
//! spinning. A raised cancellation token aborts the wait immediately.

use crate::core::domain::{
    error::{OvmError, OvmResult},
    model::config::PollConfig,
    model::job::{Job, JobRunState},
};
use crate::core::infrastructure::api_client::ApiClient;
use tokio::time::{Instant, sleep};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Polls submitted jobs to completion.
pub struct JobMonitor<'a> {
    api: &'a ApiClient,
    config: &'a PollConfig,
    cancel: CancellationToken,
}

impl<'a> JobMonitor<'a> {
    pub fn new(api: &'a ApiClient, config: &'a PollConfig, cancel: CancellationToken) -> Self {
        Self {
            api,
            config,
            cancel,
        }
    }

    /// Waits for `job_id` to reach a terminal state.
    ///
    /// Returns the job's `resultId` value when SUCCESS produced a new
    /// resource, `None` on SUCCESS without one. A done summary that still
    /// reports RUNNING is not terminal and is polled again; any other
    /// non-SUCCESS, non-FAILURE state counts as benign completion.
    ///
    /// # Errors
    /// - `OvmError::JobFailed` carrying the manager's `error` verbatim on
    ///   a FAILURE run state.
    /// - `OvmError::Timeout` once the configured job timeout elapses.
    /// - `OvmError::Cancelled` if the token is raised during a wait.
    pub async fn await_job(&self, job_id: &str) -> OvmResult<Option<String>> {
        let started = Instant::now();

        loop {
            if self.cancel.is_cancelled() {
                return Err(OvmError::Cancelled);
            }

            let job: Job = self.api.get_as(&format!("Job/{job_id}")).await?;

            if job.summary_done {
                match job.run_state() {
                    JobRunState::Failure => {
                        return Err(OvmError::JobFailed {
                            message: job.error.unwrap_or_default(),
                        });
                    }
                    JobRunState::Success => {
                        debug!(job_id, elapsed = ?started.elapsed(), "job succeeded");
                        return Ok(job.result_id.map(|id| id.value));
                    }
                    // The manager flips summaryDone before the run state
                    // settles on some jobs; RUNNING is not terminal.
                    JobRunState::Running => {
                        debug!(job_id, "summary done but state still RUNNING, polling again");
                    }
                    JobRunState::Other(state) => {
                        warn!(job_id, state = %state, "job finished in non-SUCCESS terminal state");
                        return Ok(None);
                    }
                }
            }

            if started.elapsed() >= self.config.job_timeout {
                return Err(OvmError::Timeout {
                    job_id: job_id.to_string(),
                    waited: started.elapsed(),
                });
            }

            tokio::select! {
                _ = self.cancel.cancelled() => return Err(OvmError::Cancelled),
                _ = sleep(self.config.interval) => {}
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::domain::model::connection::OvmConnection;
    use crate::core::domain::value_object::manager_url::ManagerUrl;
    use std::time::Duration;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_client(server_uri: &str) -> ApiClient {
        let url = ManagerUrl::new(server_uri).unwrap();
        ApiClient::new(OvmConnection::new(url, "admin", "secret", true)).unwrap()
    }

    fn fast_config() -> PollConfig {
        PollConfig {
            interval: Duration::from_millis(10),
            job_timeout: Duration::from_millis(500),
            ..PollConfig::default()
        }
    }

    #[tokio::test]
    async fn success_with_result_returns_result_id() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/ovm/core/wsapi/rest/Job/job-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": {"value": "job-1"},
                "summaryDone": true,
                "jobRunState": "SUCCESS",
                "resultId": {"value": "vm-9"}
            })))
            .mount(&server)
            .await;

        let api = test_client(&server.uri());
        let config = fast_config();
        let monitor = JobMonitor::new(&api, &config, CancellationToken::new());
        assert_eq!(
            monitor.await_job("job-1").await.unwrap(),
            Some("vm-9".to_string())
        );
    }

    #[tokio::test]
    async fn success_without_result_returns_none() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/ovm/core/wsapi/rest/Job/job-2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": {"value": "job-2"},
                "summaryDone": true,
                "jobRunState": "SUCCESS"
            })))
            .mount(&server)
            .await;

        let api = test_client(&server.uri());
        let config = fast_config();
        let monitor = JobMonitor::new(&api, &config, CancellationToken::new());
        assert_eq!(monitor.await_job("job-2").await.unwrap(), None);
    }

    #[tokio::test]
    async fn failure_carries_manager_error_verbatim() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/ovm/core/wsapi/rest/Job/job-3"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": {"value": "job-3"},
                "summaryDone": true,
                "jobRunState": "FAILURE",
                "error": "OVMAPI_4010E Attempt to send command failed"
            })))
            .mount(&server)
            .await;

        let api = test_client(&server.uri());
        let config = fast_config();
        let monitor = JobMonitor::new(&api, &config, CancellationToken::new());
        let err = monitor.await_job("job-3").await.unwrap_err();
        assert!(matches!(
            err,
            OvmError::JobFailed { ref message } if message == "OVMAPI_4010E Attempt to send command failed"
        ));
    }

    #[tokio::test]
    async fn pending_job_is_polled_until_done() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/ovm/core/wsapi/rest/Job/job-4"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": {"value": "job-4"},
                "summaryDone": false,
                "jobRunState": "RUNNING"
            })))
            .up_to_n_times(3)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/ovm/core/wsapi/rest/Job/job-4"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": {"value": "job-4"},
                "summaryDone": true,
                "jobRunState": "SUCCESS"
            })))
            .mount(&server)
            .await;

        let api = test_client(&server.uri());
        let config = fast_config();
        let monitor = JobMonitor::new(&api, &config, CancellationToken::new());
        assert_eq!(monitor.await_job("job-4").await.unwrap(), None);
    }

    #[tokio::test]
    async fn never_finishing_job_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/ovm/core/wsapi/rest/Job/job-5"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": {"value": "job-5"},
                "summaryDone": false,
                "jobRunState": "RUNNING"
            })))
            .mount(&server)
            .await;

        let api = test_client(&server.uri());
        let config = PollConfig {
            interval: Duration::from_millis(10),
            job_timeout: Duration::from_millis(50),
            ..PollConfig::default()
        };
        let monitor = JobMonitor::new(&api, &config, CancellationToken::new());
        let err = monitor.await_job("job-5").await.unwrap_err();
        assert!(matches!(err, OvmError::Timeout { ref job_id, .. } if job_id == "job-5"));
    }

    #[tokio::test]
    async fn cancellation_aborts_the_wait() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/ovm/core/wsapi/rest/Job/job-6"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": {"value": "job-6"},
                "summaryDone": false,
                "jobRunState": "RUNNING"
            })))
            .mount(&server)
            .await;

        let api = test_client(&server.uri());
        let config = PollConfig {
            interval: Duration::from_secs(30),
            job_timeout: Duration::from_secs(600),
            ..PollConfig::default()
        };
        let cancel = CancellationToken::new();
        let monitor = JobMonitor::new(&api, &config, cancel.clone());

        let wait = monitor.await_job("job-6");
        tokio::pin!(wait);

        // Let the first fetch land, then raise the token mid-sleep.
        tokio::select! {
            _ = &mut wait => panic!("wait resolved before cancellation"),
            _ = sleep(Duration::from_millis(50)) => cancel.cancel(),
        }
        let err = wait.await.unwrap_err();
        assert!(matches!(err, OvmError::Cancelled));
    }

    #[tokio::test]
    async fn done_summary_with_running_state_is_polled_again() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/ovm/core/wsapi/rest/Job/job-8"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": {"value": "job-8"},
                "summaryDone": true,
                "jobRunState": "RUNNING"
            })))
            .up_to_n_times(2)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/ovm/core/wsapi/rest/Job/job-8"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": {"value": "job-8"},
                "summaryDone": true,
                "jobRunState": "SUCCESS",
                "resultId": {"value": "vm-8"}
            })))
            .mount(&server)
            .await;

        let api = test_client(&server.uri());
        let config = fast_config();
        let monitor = JobMonitor::new(&api, &config, CancellationToken::new());
        assert_eq!(
            monitor.await_job("job-8").await.unwrap(),
            Some("vm-8".to_string())
        );
        assert_eq!(server.received_requests().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn unknown_terminal_state_is_benign() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/ovm/core/wsapi/rest/Job/job-7"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": {"value": "job-7"},
                "summaryDone": true,
                "jobRunState": "ABORTED"
            })))
            .mount(&server)
            .await;

        let api = test_client(&server.uri());
        let config = fast_config();
        let monitor = JobMonitor::new(&api, &config, CancellationToken::new());
        assert_eq!(monitor.await_job("job-7").await.unwrap(), None);
    }
}
