use crate::client::ServiceClient;
use crate::config::Operation;
use crate::document::Document;
use crate::error::AnalyticsError;
use crate::poller::OperationHandle;

/// Result of submitting one batch.
#[derive(Debug, Clone, PartialEq)]
pub enum DispatchOutcome {
    /// The response body already holds the result.
    Completed(serde_json::Value),
    /// The service accepted the batch as a long-running operation.
    Pending(OperationHandle),
}

/// Serializes batches into request bodies and submits them.
#[derive(Debug)]
pub struct RequestDispatcher {
    submit_url: String,
    body_params: serde_json::Map<String, serde_json::Value>,
    stop_words: Option<Vec<String>>,
    stop_phrases: Option<Vec<String>>,
    follow_operations: bool,
}

impl RequestDispatcher {
    pub fn new(
        endpoint: &str,
        operation: Operation,
        query: &[(String, String)],
        body_params: serde_json::Map<String, serde_json::Value>,
    ) -> Result<Self, AnalyticsError> {
        let base = format!("{}/{}", endpoint.trim_end_matches('/'), operation.path());
        let url = if query.is_empty() {
            reqwest::Url::parse(&base)
        } else {
            reqwest::Url::parse_with_params(&base, query)
        }
        .map_err(|e| AnalyticsError::Config(format!("invalid endpoint '{endpoint}': {e}")))?;

        Ok(Self {
            submit_url: url.into(),
            body_params,
            stop_words: None,
            stop_phrases: None,
            follow_operations: false,
        })
    }

    /// Attach `stopWords` / `stopPhrases` to every request body.
    pub fn with_stop_lists(mut self, words: Option<Vec<String>>, phrases: Option<Vec<String>>) -> Self {
        self.stop_words = words;
        self.stop_phrases = phrases;
        self
    }

    /// Treat an `operation-location` header as a pending operation.
    pub fn follow_operations(mut self, follow: bool) -> Self {
        self.follow_operations = follow;
        self
    }

    pub fn submit_url(&self) -> &str {
        &self.submit_url
    }

    /// `body_params` with the document list and stop lists laid over it.
    pub fn request_body(&self, documents: &[Document]) -> Result<serde_json::Value, AnalyticsError> {
        let mut body = self.body_params.clone();
        let documents = serde_json::to_value(documents)
            .map_err(|e| AnalyticsError::Config(format!("cannot serialize documents: {e}")))?;
        body.insert("documents".into(), documents);
        if let Some(words) = &self.stop_words {
            body.insert("stopWords".into(), words.clone().into());
        }
        if let Some(phrases) = &self.stop_phrases {
            body.insert("stopPhrases".into(), phrases.clone().into());
        }
        Ok(serde_json::Value::Object(body))
    }

    /// Issue one POST for the whole batch.
    pub async fn dispatch(
        &self,
        client: &dyn ServiceClient,
        documents: &[Document],
    ) -> Result<DispatchOutcome, AnalyticsError> {
        let body = self.request_body(documents)?;
        tracing::debug!(url = %self.submit_url, request = %body, "submitting batch");

        let response = client.post(&self.submit_url, &body).await?;
        if self.follow_operations {
            if let Some(location) = &response.operation_location {
                tracing::info!(status = response.status, operation_location = %location, "batch accepted as operation");
                return Ok(DispatchOutcome::Pending(OperationHandle::new(location.clone())));
            }
        }
        Ok(DispatchOutcome::Completed(response.json()?))
    }
}
