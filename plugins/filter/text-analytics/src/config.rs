use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;

use crate::error::AnalyticsError;
use crate::poller::PollPolicy;

pub const DEFAULT_ENDPOINT: &str = "https://westus.api.cognitive.microsoft.com/text/analytics/v2.0";

/// Analysis operation requested from the service. The path segment of the
/// submit URL is the operation name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Sentiment,
    KeyPhrases,
    Languages,
    Topics,
}

impl Operation {
    pub fn path(&self) -> &'static str {
        match self {
            Operation::Sentiment => "sentiment",
            Operation::KeyPhrases => "keyPhrases",
            Operation::Languages => "languages",
            Operation::Topics => "topics",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

impl FromStr for Operation {
    type Err = AnalyticsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sentiment" => Ok(Operation::Sentiment),
            "keyPhrases" => Ok(Operation::KeyPhrases),
            "languages" => Ok(Operation::Languages),
            "topics" => Ok(Operation::Topics),
            other => Err(AnalyticsError::Config(format!(
                "unsupported api_type '{other}' (expected sentiment, keyPhrases, languages or topics)"
            ))),
        }
    }
}

/// What the topics operation emits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TopicsOutput {
    /// Input records, each with its topic assignments appended.
    #[default]
    Assignments,
    /// One synthetic record per discovered topic.
    Topics,
}

/// Filter configuration, deserialized from the `[filter.config]` table.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TextAnalyticsConfig {
    /// Operation selector: `sentiment`, `keyPhrases`, `languages` or `topics`.
    pub api_type: String,
    /// Column holding the text to analyze.
    pub key_name: String,
    /// Name of the appended JSON column.
    pub out_key_name: String,
    pub subscription_key: String,
    #[serde(default)]
    pub language: Option<String>,
    /// Base object merged into every request body.
    #[serde(default)]
    pub body_params: serde_json::Map<String, serde_json::Value>,
    /// Query parameters for the submit request.
    #[serde(default)]
    pub params: serde_json::Map<String, serde_json::Value>,
    /// Seconds to wait after each batch.
    #[serde(default)]
    pub delay: u64,
    #[serde(default = "default_per_request")]
    pub per_request: u64,
    /// Records per request. Absent: 100 for per-document operations,
    /// whole stream for topics.
    #[serde(default)]
    pub bulk_size: Option<usize>,
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,

    // Topics only.
    #[serde(default)]
    pub operation_id: Option<String>,
    #[serde(default)]
    pub id_format: Option<String>,
    #[serde(default)]
    pub id_keys: Vec<String>,
    #[serde(default)]
    pub stop_words: Option<Vec<String>>,
    #[serde(default)]
    pub stop_phrases: Option<Vec<String>>,
    #[serde(default)]
    pub topics_output: TopicsOutput,

    // Operation polling.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
    #[serde(default = "default_poll_backoff")]
    pub poll_backoff: f64,
    #[serde(default)]
    pub poll_max_interval_secs: Option<u64>,
    #[serde(default)]
    pub poll_max_wait_secs: Option<u64>,
}

fn default_per_request() -> u64 {
    1
}
fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.into()
}
fn default_poll_interval() -> u64 {
    60
}
fn default_poll_backoff() -> f64 {
    1.0
}

impl TextAnalyticsConfig {
    pub fn operation(&self) -> Result<Operation, AnalyticsError> {
        self.api_type.parse()
    }

    pub fn poll_policy(&self) -> Result<PollPolicy, AnalyticsError> {
        if !self.poll_backoff.is_finite() || self.poll_backoff < 1.0 {
            return Err(AnalyticsError::Config(format!(
                "poll_backoff must be >= 1.0, got {}",
                self.poll_backoff
            )));
        }
        Ok(PollPolicy {
            interval: Duration::from_secs(self.poll_interval_secs),
            backoff: self.poll_backoff,
            max_interval: self.poll_max_interval_secs.map(Duration::from_secs),
            max_wait: self.poll_max_wait_secs.map(Duration::from_secs),
        })
    }

    /// Query parameters flattened to strings, in declaration order.
    pub fn query_params(&self) -> Vec<(String, String)> {
        self.params
            .iter()
            .map(|(k, v)| {
                let v = match v {
                    serde_json::Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                (k.clone(), v)
            })
            .collect()
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }
}
