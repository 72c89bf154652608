//! Reassembly of service responses onto the records that produced them.
//!
//! Per-document operations are merged positionally. Topic extraction returns
//! two collections that are joined first and then grouped by document id.

use std::collections::{HashMap, HashSet};

use serde_json::{Map, Value};

use enrich_api::schema::{Column, ColumnType, Schema};
use enrich_api::value::{Record, Value as FieldValue};

use crate::document::Document;
use crate::error::AnalyticsError;

/// Whether the service answered the whole batch with an error object.
pub fn is_error_payload(response: &Value) -> bool {
    response.get("innerError").is_some()
}

/// Positional merge: entry `i` of `documents` belongs to record `i`.
///
/// An error payload becomes the enrichment of every record. A short
/// `documents` array pads the tail with `null`.
pub fn flat_merge(response: &Value, len: usize) -> Result<Vec<Value>, AnalyticsError> {
    if is_error_payload(response) {
        return Ok(vec![response.clone(); len]);
    }

    let documents = response
        .get("documents")
        .and_then(Value::as_array)
        .ok_or_else(|| AnalyticsError::malformed("response has no 'documents' array", response))?;

    if documents.len() < len {
        tracing::warn!(
            expected = len,
            returned = documents.len(),
            "service returned fewer documents than submitted, padding with null"
        );
    }

    Ok((0..len)
        .map(|i| documents.get(i).cloned().unwrap_or(Value::Null))
        .collect())
}

/// `topics` and `topicAssignments` of a finished topics operation.
#[derive(Debug)]
pub struct TopicResult<'a> {
    pub topics: &'a [Value],
    pub assignments: &'a [Value],
}

impl<'a> TopicResult<'a> {
    pub fn from_response(response: &'a Value) -> Result<Self, AnalyticsError> {
        let result = response
            .get("operationProcessingResult")
            .ok_or_else(|| AnalyticsError::malformed("missing 'operationProcessingResult'", response))?;
        let array = |key: &str| {
            result
                .get(key)
                .and_then(Value::as_array)
                .map(Vec::as_slice)
                .ok_or_else(|| AnalyticsError::malformed(format!("missing '{key}' array"), response))
        };
        Ok(Self {
            topics: array("topics")?,
            assignments: array("topicAssignments")?,
        })
    }

    /// Topics by id. The first topic wins when ids repeat.
    fn topic_index(&self) -> Result<HashMap<&'a str, &'a Map<String, Value>>, AnalyticsError> {
        let mut index = HashMap::with_capacity(self.topics.len());
        for topic in self.topics {
            let fields = topic
                .as_object()
                .ok_or_else(|| AnalyticsError::malformed("topic is not an object", topic))?;
            let id = fields
                .get("id")
                .and_then(Value::as_str)
                .ok_or_else(|| AnalyticsError::malformed("topic has no 'id'", topic))?;
            index.entry(id).or_insert(fields);
        }
        Ok(index)
    }
}

/// Merge every assignment with the topic it points at.
///
/// The result keeps the assignment's fields and the topic's fields, the
/// topic's taking precedence, without any `topicId` or `id`.
pub fn join_assignments(result: &TopicResult<'_>) -> Result<Vec<Map<String, Value>>, AnalyticsError> {
    let topics = result.topic_index()?;

    result
        .assignments
        .iter()
        .map(|assignment| {
            let fields = assignment
                .as_object()
                .ok_or_else(|| AnalyticsError::malformed("topic assignment is not an object", assignment))?;

            let mut merged: Map<String, Value> = fields
                .iter()
                .filter(|(k, _)| k.as_str() != "topicId" && k.as_str() != "id")
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect();

            let topic_id = fields.get("topicId").and_then(Value::as_str);
            match topic_id.and_then(|id| topics.get(id)) {
                Some(topic) => {
                    for (k, v) in topic.iter().filter(|(k, _)| k.as_str() != "id") {
                        merged.insert(k.clone(), v.clone());
                    }
                }
                None => tracing::warn!(
                    topic_id = topic_id.unwrap_or_default(),
                    "topic assignment refers to an unknown topic"
                ),
            }
            Ok(merged)
        })
        .collect()
}

/// Joined merge: the list of merged assignments for each document, in
/// document order. Documents without assignments get an empty list.
pub fn joined_merge(response: &Value, documents: &[Document]) -> Result<Vec<Value>, AnalyticsError> {
    let result = TopicResult::from_response(response)?;
    let merged = join_assignments(&result)?;

    let mut by_document: HashMap<String, Vec<Value>> = HashMap::new();
    for assignment in merged {
        let document_id = assignment
            .get("documentId")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| {
                AnalyticsError::malformed("topic assignment has no 'documentId'", &Value::Object(assignment.clone()))
            })?;
        by_document
            .entry(document_id)
            .or_default()
            .push(Value::Object(assignment));
    }

    // Templated ids may repeat; every such document sees the same list.
    Ok(documents
        .iter()
        .map(|doc| Value::Array(by_document.get(&doc.id).cloned().unwrap_or_default()))
        .collect())
}

/// Columns of a synthetic topic record.
pub fn topic_schema() -> Schema {
    Schema::new(vec![
        Column::new("id", ColumnType::String),
        Column::new("keyPhrase", ColumnType::String),
        Column::new("score", ColumnType::Double),
    ])
}

/// One record per distinct topic, in response order.
pub fn topic_records(response: &Value) -> Result<Vec<Record>, AnalyticsError> {
    let result = TopicResult::from_response(response)?;
    let schema = topic_schema();

    let mut seen = HashSet::new();
    let mut records = Vec::new();
    for topic in result.topics {
        let id = topic
            .get("id")
            .and_then(Value::as_str)
            .ok_or_else(|| AnalyticsError::malformed("topic has no 'id'", topic))?;
        if !seen.insert(id) {
            continue;
        }

        let values = schema
            .columns
            .iter()
            .map(|column| match topic.get(&column.name) {
                None | Some(Value::Null) => Ok(FieldValue::Null),
                Some(v) => FieldValue::from_json(v, column.column_type)
                    .map_err(|e| AnalyticsError::malformed(format!("topic field '{}': {e}", column.name), topic)),
            })
            .collect::<Result<Vec<_>, _>>()?;
        records.push(Record::new(values));
    }
    Ok(records)
}
