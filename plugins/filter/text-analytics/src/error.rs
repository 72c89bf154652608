use std::time::Duration;

use enrich_api::error::PluginError;

#[derive(Debug, thiserror::Error)]
pub enum AnalyticsError {
    #[error("config error: {0}")]
    Config(String),

    #[error("operation failed: {payload}")]
    OperationFailed { payload: serde_json::Value },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("malformed response: {detail}: {body}")]
    MalformedResponse { detail: String, body: String },

    #[error("record {row}: column '{column}' has no text")]
    MissingText { row: usize, column: String },

    #[error("record {row}: id template: {detail}")]
    IdTemplate { row: usize, detail: String },

    #[error("operation {location} still running after {waited:?}")]
    PollTimeout { location: String, waited: Duration },
}

impl AnalyticsError {
    pub fn malformed(detail: impl Into<String>, body: &serde_json::Value) -> Self {
        AnalyticsError::MalformedResponse {
            detail: detail.into(),
            body: body.to_string(),
        }
    }
}

impl From<reqwest::Error> for AnalyticsError {
    fn from(e: reqwest::Error) -> Self {
        AnalyticsError::Transport(e.to_string())
    }
}

impl From<AnalyticsError> for PluginError {
    fn from(e: AnalyticsError) -> Self {
        match e {
            AnalyticsError::Config(_) => PluginError::config(e.to_string()),
            AnalyticsError::Transport(_) => PluginError::io(e.to_string()),
            AnalyticsError::MalformedResponse { .. }
            | AnalyticsError::MissingText { .. }
            | AnalyticsError::IdTemplate { .. } => PluginError::format(e.to_string()),
            AnalyticsError::OperationFailed { .. } | AnalyticsError::PollTimeout { .. } => {
                PluginError::logic(e.to_string())
            }
        }
    }
}
