use enrich_api::error::PluginError;

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("config error: {0}")]
    Config(String),

    #[error("plugin error: {0}")]
    Plugin(#[from] PluginError),

    #[error("unknown filter plugin '{0}'")]
    UnknownFilter(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("input line {line}: {detail}")]
    Input { line: usize, detail: String },
}

impl EngineError {
    /// Add context to the error.
    ///
    /// For `Plugin` variant, context is added to the inner `PluginError`.
    /// For other variants, context is prepended to the message.
    pub fn with_context(self, ctx: impl std::fmt::Display) -> Self {
        match self {
            EngineError::Plugin(e) => EngineError::Plugin(e.with_context(ctx)),
            EngineError::Config(msg) => EngineError::Config(format!("{ctx}: {msg}")),
            EngineError::Input { line, detail } => EngineError::Input {
                line,
                detail: format!("{ctx}: {detail}"),
            },
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_reaches_plugin_error() {
        let err = EngineError::from(PluginError::config("bad key")).with_context("filter 'text_analytics'");
        assert_eq!(err.to_string(), "plugin error: [config] filter 'text_analytics': bad key");
    }

    #[test]
    fn unknown_filter_ignores_context() {
        let err = EngineError::UnknownFilter("nope".into()).with_context("job");
        assert_eq!(err.to_string(), "unknown filter plugin 'nope'");
    }
}
