use std::time::Duration;

use tokio::time::Instant;

use crate::client::ServiceClient;
use crate::error::AnalyticsError;

/// Location of a long-running operation on the service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationHandle(String);

impl OperationHandle {
    pub fn new(location: impl Into<String>) -> Self {
        Self(location.into())
    }

    /// Handle for an operation id issued by an earlier submission.
    pub fn for_operation_id(endpoint: &str, operation_id: &str) -> Self {
        Self(format!("{}/operations/{operation_id}", endpoint.trim_end_matches('/')))
    }

    pub fn location(&self) -> &str {
        &self.0
    }
}

/// Parsed state of an operation status document.
#[derive(Debug, Clone, PartialEq)]
pub enum OperationStatus {
    /// Not terminal yet (`notStarted`, `running`, anything unrecognized).
    Running,
    /// Terminal success; carries the full status document.
    Succeeded(serde_json::Value),
    /// Terminal failure; carries the full status document.
    Failed(serde_json::Value),
}

impl OperationStatus {
    pub fn parse(body: serde_json::Value) -> Result<Self, AnalyticsError> {
        let status = match body.get("status").and_then(|s| s.as_str()) {
            Some(s) => s.to_ascii_lowercase(),
            None => return Err(AnalyticsError::malformed("operation status missing 'status'", &body)),
        };
        Ok(match status.as_str() {
            "succeeded" => OperationStatus::Succeeded(body),
            "failed" => OperationStatus::Failed(body),
            _ => OperationStatus::Running,
        })
    }
}

/// Sleep schedule between status checks.
///
/// The default polls every 60 s forever.
#[derive(Debug, Clone, PartialEq)]
pub struct PollPolicy {
    pub interval: Duration,
    /// Interval multiplier applied after each check; 1.0 keeps it fixed.
    pub backoff: f64,
    pub max_interval: Option<Duration>,
    /// Give up once the next sleep would pass this much total waiting.
    pub max_wait: Option<Duration>,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(60),
            backoff: 1.0,
            max_interval: None,
            max_wait: None,
        }
    }
}

impl PollPolicy {
    fn next_interval(&self, current: Duration) -> Duration {
        // Saturates instead of overflowing on large backoff factors.
        let next = Duration::try_from_secs_f64(current.as_secs_f64() * self.backoff)
            .unwrap_or(Duration::MAX);
        match self.max_interval {
            Some(max) => next.min(max),
            None => next,
        }
    }
}

/// Polls an operation until it reaches a terminal state.
pub struct OperationPoller<'a> {
    client: &'a dyn ServiceClient,
    policy: &'a PollPolicy,
}

impl<'a> OperationPoller<'a> {
    pub fn new(client: &'a dyn ServiceClient, policy: &'a PollPolicy) -> Self {
        Self { client, policy }
    }

    /// Wait for `handle` to succeed and return its status document.
    ///
    /// `Failed` aborts immediately with the raw document.
    pub async fn wait(&self, handle: &OperationHandle) -> Result<serde_json::Value, AnalyticsError> {
        tracing::info!(operation_location = %handle.location(), "polling operation");
        let started = Instant::now();
        let mut interval = self.policy.interval;
        let mut checks: u64 = 0;

        loop {
            checks += 1;
            let body = self.client.get(handle.location()).await?.json()?;
            match OperationStatus::parse(body)? {
                OperationStatus::Succeeded(body) => {
                    tracing::info!(status = "Succeeded", checks, "operation finished");
                    tracing::debug!(response = %body, "operation result");
                    return Ok(body);
                }
                OperationStatus::Failed(body) => {
                    tracing::error!(status = "Failed", checks, response = %body, "operation failed");
                    return Err(AnalyticsError::OperationFailed { payload: body });
                }
                OperationStatus::Running => {
                    tracing::info!(status = "Running", checks, next_check_in = ?interval, "operation not finished");
                }
            }

            let waited = started.elapsed();
            if let Some(max_wait) = self.policy.max_wait {
                if waited.checked_add(interval).is_none_or(|deadline| deadline > max_wait) {
                    return Err(AnalyticsError::PollTimeout {
                        location: handle.location().to_string(),
                        waited,
                    });
                }
            }
            tokio::time::sleep(interval).await;
            interval = self.policy.next_interval(interval);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::scripted::{ScriptedClient, json, status};
    use serde_json::json;

    const LOCATION: &str = "https://svc.test/text/v2.0/operations/op-1";

    #[tokio::test(start_paused = true)]
    async fn returns_payload_after_two_intervals() {
        let done = json!({"status": "Succeeded", "operationProcessingResult": {"topics": []}});
        let client = ScriptedClient::new(vec![status("Running"), status("Running"), json(done.clone())]);
        let policy = PollPolicy::default();

        let started = Instant::now();
        let payload = OperationPoller::new(&client, &policy)
            .wait(&OperationHandle::new(LOCATION))
            .await
            .unwrap();

        assert_eq!(payload, done);
        assert_eq!(started.elapsed(), Duration::from_secs(120));
        let calls = client.calls();
        assert_eq!(calls.len(), 3);
        assert!(calls.iter().all(|c| c.method == "GET" && c.url == LOCATION));
    }

    #[tokio::test(start_paused = true)]
    async fn failed_stops_polling() {
        let client = ScriptedClient::new(vec![
            status("notStarted"),
            status("Failed"),
            status("Succeeded"),
        ]);
        let policy = PollPolicy::default();

        let err = OperationPoller::new(&client, &policy)
            .wait(&OperationHandle::new(LOCATION))
            .await
            .unwrap_err();

        match err {
            AnalyticsError::OperationFailed { payload } => assert_eq!(payload["status"], "Failed"),
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(client.calls().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn max_wait_gives_up() {
        let client = ScriptedClient::new((0..10).map(|_| status("running")).collect());
        let policy = PollPolicy {
            max_wait: Some(Duration::from_secs(150)),
            ..PollPolicy::default()
        };

        let err = OperationPoller::new(&client, &policy)
            .wait(&OperationHandle::new(LOCATION))
            .await
            .unwrap_err();

        match err {
            AnalyticsError::PollTimeout { waited, .. } => assert_eq!(waited, Duration::from_secs(120)),
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(client.calls().len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn backoff_grows_until_capped() {
        let client = ScriptedClient::new(vec![
            status("running"),
            status("running"),
            status("running"),
            status("succeeded"),
        ]);
        let policy = PollPolicy {
            interval: Duration::from_secs(10),
            backoff: 2.0,
            max_interval: Some(Duration::from_secs(30)),
            max_wait: None,
        };

        let started = Instant::now();
        OperationPoller::new(&client, &policy)
            .wait(&OperationHandle::new(LOCATION))
            .await
            .unwrap();
        // 10 + 20 + 30
        assert_eq!(started.elapsed(), Duration::from_secs(60));
    }

    #[tokio::test(start_paused = true)]
    async fn huge_backoff_saturates_at_max_interval() {
        let client = ScriptedClient::new(vec![
            status("running"),
            status("running"),
            status("succeeded"),
        ]);
        let policy = PollPolicy {
            interval: Duration::from_secs(60),
            backoff: 1e300,
            max_interval: Some(Duration::from_secs(600)),
            max_wait: None,
        };

        let started = Instant::now();
        OperationPoller::new(&client, &policy)
            .wait(&OperationHandle::new(LOCATION))
            .await
            .unwrap();
        assert_eq!(started.elapsed(), Duration::from_secs(660));
    }

    #[test]
    fn next_interval_without_cap_saturates() {
        let policy = PollPolicy { backoff: 1e300, ..PollPolicy::default() };
        assert_eq!(policy.next_interval(Duration::from_secs(60)), Duration::MAX);
    }

    #[tokio::test(start_paused = true)]
    async fn huge_interval_with_max_wait_times_out() {
        let client = ScriptedClient::new(vec![status("running"), status("running")]);
        let policy = PollPolicy {
            interval: Duration::MAX,
            max_wait: Some(Duration::from_secs(3600)),
            ..PollPolicy::default()
        };

        let err = OperationPoller::new(&client, &policy)
            .wait(&OperationHandle::new(LOCATION))
            .await
            .unwrap_err();
        assert!(matches!(err, AnalyticsError::PollTimeout { .. }));
        assert_eq!(client.calls().len(), 1);
    }

    #[tokio::test]
    async fn missing_status_is_malformed() {
        let client = ScriptedClient::new(vec![json(json!({"error": "nope"}))]);
        let policy = PollPolicy::default();
        let err = OperationPoller::new(&client, &policy)
            .wait(&OperationHandle::new(LOCATION))
            .await
            .unwrap_err();
        assert!(matches!(err, AnalyticsError::MalformedResponse { .. }));
    }

    #[test]
    fn handle_from_operation_id() {
        let handle = OperationHandle::for_operation_id("https://svc.test/v2.0/", "abc");
        assert_eq!(handle.location(), "https://svc.test/v2.0/operations/abc");
    }
}
