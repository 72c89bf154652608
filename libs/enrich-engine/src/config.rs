use std::collections::HashSet;
use std::path::PathBuf;

use serde::Deserialize;

use enrich_api::schema::{Column, Schema};

use crate::error::EngineError;

/// Output path meaning "write to stdout".
pub const STDOUT_PATH: &str = "-";

/// Job configuration, parsed from TOML.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct JobConfig {
    pub input: InputConfig,
    pub output: OutputConfig,
    pub filter: FilterConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InputConfig {
    /// JSON-lines file, one object per record.
    pub path: PathBuf,
    /// Records handed to the filter per `add` call.
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    /// Declared input schema; fields are read by name.
    pub columns: Vec<Column>,
}

fn default_page_size() -> usize {
    256
}

impl InputConfig {
    pub fn schema(&self) -> Schema {
        Schema::new(self.columns.clone())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OutputConfig {
    /// JSON-lines output file; `-` writes to stdout.
    pub path: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FilterConfig {
    /// Registered plugin name.
    pub plugin: String,
    /// Plugin-specific table, passed to the factory as JSON.
    #[serde(default)]
    pub config: Option<serde_json::Value>,
}

impl JobConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &str) -> Result<Self, EngineError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| EngineError::Config(format!("{path}: {e}")))?;
        Self::parse(&content).map_err(|e| e.with_context(path))
    }

    /// Parse configuration from a TOML string.
    pub fn parse(toml_str: &str) -> Result<Self, EngineError> {
        let config: JobConfig = toml::from_str(toml_str).map_err(|e| EngineError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), EngineError> {
        if self.input.page_size == 0 {
            return Err(EngineError::Config("input.page_size must be at least 1".into()));
        }
        if self.input.columns.is_empty() {
            return Err(EngineError::Config("input.columns must not be empty".into()));
        }
        let mut seen = HashSet::new();
        for column in &self.input.columns {
            if !seen.insert(column.name.as_str()) {
                return Err(EngineError::Config(format!(
                    "input column '{}' declared twice",
                    column.name
                )));
            }
        }
        Ok(())
    }

    /// Filter config table; an absent table is an empty object.
    pub fn filter_config(&self) -> serde_json::Value {
        self.filter
            .config
            .clone()
            .unwrap_or_else(|| serde_json::Value::Object(serde_json::Map::new()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use enrich_api::schema::ColumnType;

    const JOB: &str = r#"
[input]
path = "reviews.jsonl"
columns = [
  { name = "id",   type = "long" },
  { name = "body", type = "string" },
]

[output]
path = "-"

[filter]
plugin = "text_analytics"

[filter.config]
api_type = "sentiment"
key_name = "body"
bulk_size = 10
body_params = { minDocumentsPerWord = 2 }
"#;

    #[test]
    fn parses_job() {
        let job = JobConfig::parse(JOB).unwrap();
        assert_eq!(job.input.page_size, 256);
        assert_eq!(job.input.schema().index_of("body"), Some(1));
        assert_eq!(job.input.columns[0].column_type, ColumnType::Long);
        assert_eq!(job.output.path, STDOUT_PATH);
        assert_eq!(job.filter.plugin, "text_analytics");

        let filter = job.filter_config();
        assert_eq!(filter["api_type"], "sentiment");
        assert_eq!(filter["bulk_size"], 10);
        assert_eq!(filter["body_params"]["minDocumentsPerWord"], 2);
    }

    #[test]
    fn missing_filter_table_is_empty_object() {
        let minimal = r#"
[input]
path = "in.jsonl"
columns = [{ name = "body", type = "string" }]
[output]
path = "out.jsonl"
[filter]
plugin = "noop"
"#;
        let job = JobConfig::parse(minimal).unwrap();
        assert_eq!(job.filter_config(), serde_json::json!({}));
    }

    #[test]
    fn rejects_duplicate_columns_and_zero_page() {
        let dup = JOB.replace(r#"{ name = "body", type = "string" }"#, r#"{ name = "id", type = "string" }"#);
        assert!(matches!(JobConfig::parse(&dup), Err(EngineError::Config(_))));

        let zero = JOB.replace("[input]\n", "[input]\npage_size = 0\n");
        assert!(matches!(JobConfig::parse(&zero), Err(EngineError::Config(_))));
    }

    #[test]
    fn unknown_column_type_rejected() {
        let bad = JOB.replace(r#"type = "long""#, r#"type = "timestamp""#);
        assert!(JobConfig::parse(&bad).is_err());
    }
}
