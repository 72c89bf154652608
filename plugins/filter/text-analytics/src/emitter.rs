use std::time::Duration;

use enrich_api::error::PluginError;
use enrich_api::filter::RecordSink;
use enrich_api::value::{Record, Value};

/// Forwards finished records to the downstream sink.
pub struct OutputEmitter {
    sink: Box<dyn RecordSink>,
    delay: Duration,
    emitted: u64,
}

impl OutputEmitter {
    pub fn new(sink: Box<dyn RecordSink>, delay: Duration) -> Self {
        Self {
            sink,
            delay,
            emitted: 0,
        }
    }

    /// Emit each record with its enrichment appended, in record order.
    pub fn emit_enriched(
        &mut self,
        records: Vec<Record>,
        enrichments: Vec<serde_json::Value>,
    ) -> Result<(), PluginError> {
        if records.len() != enrichments.len() {
            return Err(PluginError::logic(format!(
                "{} records but {} enrichments",
                records.len(),
                enrichments.len()
            )));
        }
        for (record, enrichment) in records.into_iter().zip(enrichments) {
            self.sink.add(record.with_appended(Value::Json(enrichment)))?;
            self.emitted += 1;
        }
        Ok(())
    }

    /// Emit records as they are (synthetic topic records).
    pub fn emit_records(&mut self, records: Vec<Record>) -> Result<(), PluginError> {
        for record in records {
            self.sink.add(record)?;
            self.emitted += 1;
        }
        Ok(())
    }

    /// Per-batch throttle.
    pub async fn throttle(&mut self) {
        if !self.delay.is_zero() {
            tracing::debug!(delay = ?self.delay, "throttling after batch");
            tokio::time::sleep(self.delay).await;
        }
    }

    pub fn emitted(&self) -> u64 {
        self.emitted
    }

    pub fn finish(&mut self) -> Result<(), PluginError> {
        self.sink.finish()
    }
}
