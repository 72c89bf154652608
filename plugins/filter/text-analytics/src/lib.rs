//! Text-analytics enrichment filter.
//!
//! Sends the text column of each record to an external analysis service in
//! batches and appends the result as a JSON column. Topic extraction runs as
//! a long-running operation that is polled until it finishes.

pub mod batch;
pub mod client;
pub mod config;
pub mod dispatch;
pub mod document;
pub mod emitter;
pub mod error;
pub mod merge;
pub mod pipeline;
pub mod poller;
pub mod variant;

use std::future::Future;
use std::num::NonZeroUsize;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use enrich_api::config::parse_plugin_config;
use enrich_api::error::PluginError;
use enrich_api::filter::{Filter, FilterContext};
use enrich_api::schema::{Column, ColumnType, Schema};
use enrich_api::value::Record;

use crate::batch::BatchAccumulator;
use crate::client::{HttpServiceClient, ServiceClient};
use crate::config::TextAnalyticsConfig;
use crate::dispatch::RequestDispatcher;
use crate::document::DocumentBuilder;
use crate::emitter::OutputEmitter;
use crate::error::AnalyticsError;
use crate::pipeline::Pipeline;
use crate::poller::PollPolicy;
use crate::variant::Variant;

/// Name the filter is registered under.
pub const PLUGIN_NAME: &str = "text_analytics";

pub struct TextAnalyticsFilter {
    config: TextAnalyticsConfig,
    variant: Variant,
    capacity: Option<NonZeroUsize>,
    poll: PollPolicy,
    client: Arc<dyn ServiceClient>,
    pipeline: Option<Pipeline>,
}

impl TextAnalyticsFilter {
    /// Validate `config` and bind it to a transport.
    pub fn new(config: TextAnalyticsConfig, client: Arc<dyn ServiceClient>) -> Result<Self, AnalyticsError> {
        let variant = Variant::from_config(&config)?;
        let capacity = variant.capacity(config.bulk_size)?;
        let poll = config.poll_policy()?;

        if config.per_request == 0 {
            return Err(AnalyticsError::Config("per_request must be at least 1".into()));
        }
        if config.per_request != 1 {
            tracing::warn!(
                per_request = config.per_request,
                "per_request has no effect; one request is sent per batch"
            );
        }

        tracing::info!(
            operation = %variant.operation(),
            endpoint = %config.endpoint,
            bulk_size = ?capacity,
            "text analytics filter configured"
        );
        Ok(Self {
            config,
            variant,
            capacity,
            poll,
            client,
            pipeline: None,
        })
    }

    fn document_builder(&self, input: &Schema) -> Result<DocumentBuilder, AnalyticsError> {
        DocumentBuilder::new(
            input,
            &self.config.key_name,
            self.config.language.clone(),
            &self.variant.id_policy(&self.config),
        )
    }

    fn dispatcher(&self) -> Result<RequestDispatcher, AnalyticsError> {
        let dispatcher = RequestDispatcher::new(
            &self.config.endpoint,
            self.variant.operation(),
            &self.config.query_params(),
            self.config.body_params.clone(),
        )?
        .follow_operations(self.variant.follows_operations());

        Ok(match self.variant {
            Variant::Documents { .. } => dispatcher,
            _ => dispatcher.with_stop_lists(self.config.stop_words.clone(), self.config.stop_phrases.clone()),
        })
    }
}

impl Filter for TextAnalyticsFilter {
    fn transaction(&self, input: &Schema) -> Result<Schema, PluginError> {
        // Resolves the text and id columns; fails before any record flows.
        self.document_builder(input)?;

        match self.variant {
            Variant::TopicList { .. } => Ok(merge::topic_schema()),
            _ => input.extend(Column::new(self.config.out_key_name.clone(), ColumnType::Json)),
        }
    }

    fn init(&mut self, ctx: FilterContext) -> Result<(), PluginError> {
        let builder = self.document_builder(&ctx.input_schema)?;
        let dispatcher = self.dispatcher()?;
        let emitter = OutputEmitter::new(ctx.sink, Duration::from_secs(self.config.delay));

        self.pipeline = Some(Pipeline::new(
            self.variant.clone(),
            BatchAccumulator::new(self.capacity),
            builder,
            dispatcher,
            self.poll.clone(),
            Arc::clone(&self.client),
            emitter,
        ));
        Ok(())
    }

    fn add(&mut self, page: Vec<Record>) -> Pin<Box<dyn Future<Output = Result<(), PluginError>> + Send + '_>> {
        Box::pin(async move {
            let pipeline = self
                .pipeline
                .as_mut()
                .ok_or_else(|| PluginError::logic("add() called before init()"))?;
            for record in page {
                pipeline.add(record).await?;
            }
            Ok(())
        })
    }

    fn finish(&mut self) -> Pin<Box<dyn Future<Output = Result<(), PluginError>> + Send + '_>> {
        Box::pin(async move {
            let mut pipeline = self
                .pipeline
                .take()
                .ok_or_else(|| PluginError::logic("finish() called before init()"))?;
            pipeline.finish().await
        })
    }
}

/// Factory registered with the host: config table in, filter out.
pub fn create(config: &serde_json::Value) -> Result<Box<dyn Filter>, PluginError> {
    let config: TextAnalyticsConfig = parse_plugin_config(config)?;
    let client = HttpServiceClient::new(&config.subscription_key, config.request_timeout())?;
    let filter = TextAnalyticsFilter::new(config, Arc::new(client))?;
    Ok(Box::new(filter))
}
