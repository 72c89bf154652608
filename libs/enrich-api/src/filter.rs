use std::future::Future;
use std::pin::Pin;

use crate::error::PluginError;
use crate::schema::Schema;
use crate::value::Record;

/// Downstream receiver of filter output. Implemented by the host.
pub trait RecordSink: Send {
    /// Accept one output record. Records arrive in emission order.
    fn add(&mut self, record: Record) -> Result<(), PluginError>;

    /// End of stream. Called exactly once, after the last `add`.
    fn finish(&mut self) -> Result<(), PluginError>;
}

/// Context provided to a filter at init time.
pub struct FilterContext {
    /// Schema of records passed to `add`.
    pub input_schema: Schema,
    /// Schema the filter declared in `transaction`.
    pub output_schema: Schema,
    /// Where output records go.
    pub sink: Box<dyn RecordSink>,
}

/// Filter plugin: consumes pages of records, emits records to its sink.
///
/// Lifecycle driven by the host:
/// 1. `transaction()`: declare the output schema before any data flows.
/// 2. `init()`: receive the sink.
/// 3. `add()`: zero or more pages, in input order.
/// 4. `finish()`: flush buffered state, then finish the sink.
///
/// Calls are strictly sequential; the host awaits each future before the next call.
pub trait Filter: Send {
    /// Validate against the input schema and return the output schema.
    fn transaction(&self, input: &Schema) -> Result<Schema, PluginError>;

    /// Initialize with context. Called once, after `transaction()`.
    fn init(&mut self, ctx: FilterContext) -> Result<(), PluginError>;

    /// Process one page of input records.
    fn add(
        &mut self,
        page: Vec<Record>,
    ) -> Pin<Box<dyn Future<Output = Result<(), PluginError>> + Send + '_>>;

    /// Input exhausted.
    fn finish(&mut self) -> Pin<Box<dyn Future<Output = Result<(), PluginError>> + Send + '_>>;
}

/// Constructor registered with the host under a plugin name.
///
/// Receives the filter's config table (format-independent JSON).
pub type FilterFactory = fn(&serde_json::Value) -> Result<Box<dyn Filter>, PluginError>;
