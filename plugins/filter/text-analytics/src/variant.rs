use std::num::NonZeroUsize;

use crate::config::{Operation, TextAnalyticsConfig, TopicsOutput};
use crate::document::IdPolicy;
use crate::error::AnalyticsError;
use crate::poller::OperationHandle;

pub const DEFAULT_BULK_SIZE: usize = 100;

/// Pipeline flavor. Selects how responses are awaited and merged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Variant {
    /// Per-document operation answered synchronously; results merged by position.
    Documents { operation: Operation },
    /// Topic extraction; assignments joined with topics and merged by document id.
    TopicAssignments { resume: Option<OperationHandle> },
    /// Topic extraction; each discovered topic becomes its own record.
    TopicList { resume: Option<OperationHandle> },
}

impl Variant {
    pub fn from_config(cfg: &TextAnalyticsConfig) -> Result<Self, AnalyticsError> {
        let operation = cfg.operation()?;
        if operation != Operation::Topics {
            for (key, set) in [
                ("operation_id", cfg.operation_id.is_some()),
                ("id_format", cfg.id_format.is_some()),
                ("id_keys", !cfg.id_keys.is_empty()),
                ("stop_words", cfg.stop_words.is_some()),
                ("stop_phrases", cfg.stop_phrases.is_some()),
                ("topics_output", cfg.topics_output != TopicsOutput::Assignments),
            ] {
                if set {
                    return Err(AnalyticsError::Config(format!(
                        "'{key}' is only valid with api_type = \"topics\""
                    )));
                }
            }
            return Ok(Variant::Documents { operation });
        }

        let resume = cfg
            .operation_id
            .as_deref()
            .map(|id| OperationHandle::for_operation_id(&cfg.endpoint, id));
        Ok(match cfg.topics_output {
            TopicsOutput::Assignments => Variant::TopicAssignments { resume },
            TopicsOutput::Topics => Variant::TopicList { resume },
        })
    }

    pub fn operation(&self) -> Operation {
        match self {
            Variant::Documents { operation } => *operation,
            Variant::TopicAssignments { .. } | Variant::TopicList { .. } => Operation::Topics,
        }
    }

    /// Whether a submit may answer with an operation location to poll.
    pub fn follows_operations(&self) -> bool {
        !matches!(self, Variant::Documents { .. })
    }

    /// Already-running operation to poll instead of submitting.
    pub fn resume(&self) -> Option<&OperationHandle> {
        match self {
            Variant::Documents { .. } => None,
            Variant::TopicAssignments { resume } | Variant::TopicList { resume } => resume.as_ref(),
        }
    }

    /// Batch capacity. `None` flushes once, at end of stream.
    pub fn capacity(&self, bulk_size: Option<usize>) -> Result<Option<NonZeroUsize>, AnalyticsError> {
        match bulk_size {
            Some(n) => NonZeroUsize::new(n)
                .map(Some)
                .ok_or_else(|| AnalyticsError::Config("bulk_size must be at least 1".into())),
            None => match self {
                Variant::Documents { .. } => Ok(NonZeroUsize::new(DEFAULT_BULK_SIZE)),
                _ => Ok(None),
            },
        }
    }

    /// Document id policy. Templated ids only make sense where results are
    /// matched by id, so per-document operations always use random ids.
    pub fn id_policy(&self, cfg: &TextAnalyticsConfig) -> IdPolicy {
        match (self, &cfg.id_format) {
            (Variant::Documents { .. }, _) => IdPolicy::Random,
            (_, Some(template)) if !cfg.id_keys.is_empty() => IdPolicy::Templated {
                template: template.clone(),
                keys: cfg.id_keys.clone(),
            },
            _ => IdPolicy::Random,
        }
    }
}
