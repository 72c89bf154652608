use enrich_api::filter::{Filter, FilterContext};
use enrich_api::schema::Schema;

use crate::config::JobConfig;
use crate::error::EngineError;
use crate::jsonl::{JsonLinesReader, JsonLinesSink};
use crate::registry::FilterRegistry;

/// Counters reported after a job.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct JobSummary {
    pub records: u64,
    pub pages: u64,
}

/// Output schema of the job's filter. Nothing is read or sent.
pub fn output_schema(job: &JobConfig, registry: &FilterRegistry) -> Result<Schema, EngineError> {
    let filter = registry.create(&job.filter.plugin, &job.filter_config())?;
    transaction(filter.as_ref(), job)
}

/// Run one job: read input pages, push them through the filter, write its output.
///
/// The filter's `transaction` runs before any input is read.
pub async fn run_job(job: &JobConfig, registry: &FilterRegistry) -> Result<JobSummary, EngineError> {
    let filter_ctx = format!("filter '{}'", job.filter.plugin);
    let input_schema = job.input.schema();

    let mut filter = registry.create(&job.filter.plugin, &job.filter_config())?;
    let output_schema = transaction(filter.as_ref(), job)?;

    let mut reader = JsonLinesReader::open(&job.input.path, input_schema.clone())?;
    let sink = JsonLinesSink::create(&job.output.path, output_schema.clone())?;
    filter
        .init(FilterContext {
            input_schema,
            output_schema,
            sink: Box::new(sink),
        })
        .map_err(|e| EngineError::Plugin(e).with_context(&filter_ctx))?;

    tracing::info!(
        input = %job.input.path.display(),
        output = %job.output.path,
        plugin = %job.filter.plugin,
        "job started"
    );

    let mut summary = JobSummary::default();
    loop {
        let page = reader.next_page(job.input.page_size)?;
        if page.is_empty() {
            break;
        }
        summary.pages += 1;
        summary.records += page.len() as u64;
        filter
            .add(page)
            .await
            .map_err(|e| EngineError::Plugin(e).with_context(&filter_ctx))?;
    }
    filter
        .finish()
        .await
        .map_err(|e| EngineError::Plugin(e).with_context(&filter_ctx))?;

    tracing::info!(records = summary.records, pages = summary.pages, "job finished");
    Ok(summary)
}

fn transaction(filter: &dyn Filter, job: &JobConfig) -> Result<Schema, EngineError> {
    filter
        .transaction(&job.input.schema())
        .map_err(|e| EngineError::Plugin(e).with_context(format!("filter '{}'", job.filter.plugin)))
}
