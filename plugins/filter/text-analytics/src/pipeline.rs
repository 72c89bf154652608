use std::sync::Arc;

use enrich_api::error::PluginError;
use enrich_api::value::Record;

use crate::batch::{BatchAccumulator, RecordBatch};
use crate::client::ServiceClient;
use crate::dispatch::{DispatchOutcome, RequestDispatcher};
use crate::document::{Document, DocumentBuilder};
use crate::emitter::OutputEmitter;
use crate::error::AnalyticsError;
use crate::merge;
use crate::poller::{OperationPoller, PollPolicy};
use crate::variant::Variant;

/// One filter run: accumulate, build, dispatch, await, merge, emit.
///
/// Batches are processed strictly one after another.
pub struct Pipeline {
    variant: Variant,
    accumulator: BatchAccumulator,
    builder: DocumentBuilder,
    dispatcher: RequestDispatcher,
    poll: PollPolicy,
    client: Arc<dyn ServiceClient>,
    emitter: OutputEmitter,
    batches: u64,
}

impl Pipeline {
    pub fn new(
        variant: Variant,
        accumulator: BatchAccumulator,
        builder: DocumentBuilder,
        dispatcher: RequestDispatcher,
        poll: PollPolicy,
        client: Arc<dyn ServiceClient>,
        emitter: OutputEmitter,
    ) -> Self {
        Self {
            variant,
            accumulator,
            builder,
            dispatcher,
            poll,
            client,
            emitter,
            batches: 0,
        }
    }

    pub async fn add(&mut self, record: Record) -> Result<(), PluginError> {
        match self.accumulator.add(record) {
            Some(batch) => self.process(batch).await,
            None => Ok(()),
        }
    }

    /// Flush the final partial batch, then end the output stream.
    pub async fn finish(&mut self) -> Result<(), PluginError> {
        if let Some(batch) = self.accumulator.finish() {
            self.process(batch).await?;
        }
        tracing::info!(
            batches = self.batches,
            records = self.emitter.emitted(),
            "text analytics filter finished"
        );
        self.emitter.finish()
    }

    async fn process(&mut self, batch: RecordBatch) -> Result<(), PluginError> {
        let batch = self.builder.build_batch(batch)?;
        self.batches += 1;
        tracing::info!(
            batch = self.batches,
            first_row = batch.first_row,
            records = batch.len(),
            operation = %self.variant.operation(),
            "processing batch"
        );

        let response = fetch(
            &self.variant,
            &self.dispatcher,
            &self.poll,
            self.client.as_ref(),
            &batch.documents,
        )
        .await
        .map_err(|e| {
            PluginError::from(e).with_context(format!("batch starting at record {}", batch.first_row))
        })?;

        match &self.variant {
            Variant::Documents { .. } => {
                if merge::is_error_payload(&response) {
                    tracing::error!(first_row = batch.first_row, response = %response, "service rejected batch");
                }
                let enrichments = merge::flat_merge(&response, batch.len())?;
                self.emitter.emit_enriched(batch.records, enrichments)?;
            }
            Variant::TopicAssignments { .. } => {
                let enrichments = merge::joined_merge(&response, &batch.documents)?;
                self.emitter.emit_enriched(batch.records, enrichments)?;
            }
            Variant::TopicList { .. } => {
                let topics = merge::topic_records(&response)?;
                tracing::info!(topics = topics.len(), "emitting topic records");
                self.emitter.emit_records(topics)?;
            }
        }

        self.emitter.throttle().await;
        Ok(())
    }
}

/// Response for one batch: polled from a resumed operation, returned by the
/// submit call directly, or polled after the submit was accepted.
async fn fetch(
    variant: &Variant,
    dispatcher: &RequestDispatcher,
    poll: &PollPolicy,
    client: &dyn ServiceClient,
    documents: &[Document],
) -> Result<serde_json::Value, AnalyticsError> {
    let poller = OperationPoller::new(client, poll);
    if let Some(handle) = variant.resume() {
        tracing::info!(operation_location = %handle.location(), "resuming existing operation");
        return poller.wait(handle).await;
    }

    match dispatcher.dispatch(client, documents).await? {
        DispatchOutcome::Completed(response) => Ok(response),
        DispatchOutcome::Pending(handle) => poller.wait(&handle).await,
    }
}
