use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use enrich_api::error::PluginError;
use enrich_api::filter::{Filter, FilterContext, RecordSink};
use enrich_api::schema::{Column, ColumnType, Schema};
use enrich_api::value::{Record, Value};
use enrich_filter_text_analytics::client::{ServiceClient, ServiceResponse};
use enrich_filter_text_analytics::error::AnalyticsError;
use enrich_filter_text_analytics::TextAnalyticsFilter;

#[derive(Debug, Clone)]
pub struct Request {
    pub method: &'static str,
    pub url: String,
    pub body: Option<serde_json::Value>,
}

/// Replays canned responses in order and records every request.
#[derive(Default)]
pub struct ScriptedClient {
    responses: Mutex<VecDeque<ServiceResponse>>,
    requests: Mutex<Vec<Request>>,
}

impl ScriptedClient {
    pub fn new(responses: Vec<ServiceResponse>) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(responses.into()),
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn requests(&self) -> Vec<Request> {
        self.requests.lock().unwrap().clone()
    }

    fn respond(&self, request: Request) -> Result<ServiceResponse, AnalyticsError> {
        self.requests.lock().unwrap().push(request);
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| AnalyticsError::Transport("no scripted response left".into()))
    }
}

impl ServiceClient for ScriptedClient {
    fn post<'a>(
        &'a self,
        url: &'a str,
        body: &'a serde_json::Value,
    ) -> Pin<Box<dyn Future<Output = Result<ServiceResponse, AnalyticsError>> + Send + 'a>> {
        let request = Request { method: "POST", url: url.to_string(), body: Some(body.clone()) };
        Box::pin(async move { self.respond(request) })
    }

    fn get<'a>(
        &'a self,
        url: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<ServiceResponse, AnalyticsError>> + Send + 'a>> {
        let request = Request { method: "GET", url: url.to_string(), body: None };
        Box::pin(async move { self.respond(request) })
    }
}

pub fn json(body: serde_json::Value) -> ServiceResponse {
    ServiceResponse { status: 200, operation_location: None, body: body.to_string() }
}

pub fn accepted(location: &str) -> ServiceResponse {
    ServiceResponse {
        status: 202,
        operation_location: Some(location.to_string()),
        body: String::new(),
    }
}

/// Collects output records; clones share the same buffer.
#[derive(Default, Clone)]
pub struct VecSink {
    pub records: Arc<Mutex<Vec<Record>>>,
    pub finished: Arc<Mutex<bool>>,
}

impl RecordSink for VecSink {
    fn add(&mut self, record: Record) -> Result<(), PluginError> {
        self.records.lock().unwrap().push(record);
        Ok(())
    }

    fn finish(&mut self) -> Result<(), PluginError> {
        *self.finished.lock().unwrap() = true;
        Ok(())
    }
}

pub fn input_schema() -> Schema {
    Schema::new(vec![
        Column::new("id", ColumnType::Long),
        Column::new("body", ColumnType::String),
    ])
}

pub fn input(n: i64) -> Vec<Record> {
    (0..n)
        .map(|i| Record::new(vec![Value::Long(i), Value::from(format!("text {i}"))]))
        .collect()
}

pub fn filter(config: serde_json::Value, client: Arc<ScriptedClient>) -> TextAnalyticsFilter {
    let config = serde_json::from_value(config).unwrap();
    TextAnalyticsFilter::new(config, client).unwrap()
}

/// transaction → init → add(page) → finish; returns the output schema and records.
pub async fn run(
    mut filter: TextAnalyticsFilter,
    pages: Vec<Vec<Record>>,
) -> Result<(Schema, Vec<Record>), PluginError> {
    let sink = VecSink::default();
    let output_schema = filter.transaction(&input_schema())?;
    filter.init(FilterContext {
        input_schema: input_schema(),
        output_schema: output_schema.clone(),
        sink: Box::new(sink.clone()),
    })?;
    for page in pages {
        filter.add(page).await?;
    }
    filter.finish().await?;
    assert!(*sink.finished.lock().unwrap());
    let records = sink.records.lock().unwrap().clone();
    Ok((output_schema, records))
}
