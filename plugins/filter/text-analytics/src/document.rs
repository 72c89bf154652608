use serde::Serialize;

use enrich_api::schema::Schema;
use enrich_api::value::{Record, Value};

use crate::batch::RecordBatch;
use crate::error::AnalyticsError;

/// Per-record unit submitted to the service.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Document {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    pub id: String,
    pub text: String,
}

/// Records paired 1:1 with the documents built from them.
#[derive(Debug)]
pub struct Batch {
    pub first_row: usize,
    pub records: Vec<Record>,
    pub documents: Vec<Document>,
}

impl Batch {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// How document ids are generated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdPolicy {
    /// Fresh UUID v4 per document.
    Random,
    /// `template` formatted with the values of `keys`, in order.
    Templated { template: String, keys: Vec<String> },
}

#[derive(Debug)]
enum IdSource {
    Random,
    Templated { template: String, indexes: Vec<usize> },
}

/// Builds documents from records of a fixed input schema.
#[derive(Debug)]
pub struct DocumentBuilder {
    text_index: usize,
    text_column: String,
    language: Option<String>,
    ids: IdSource,
}

impl DocumentBuilder {
    /// Resolve column names against `schema`. Unknown columns are config errors.
    pub fn new(
        schema: &Schema,
        key_name: &str,
        language: Option<String>,
        policy: &IdPolicy,
    ) -> Result<Self, AnalyticsError> {
        let column_index = |name: &str| {
            schema.index_of(name).ok_or_else(|| {
                AnalyticsError::Config(format!("column '{name}' not found in input schema"))
            })
        };

        let text_index = column_index(key_name)?;
        let ids = match policy {
            IdPolicy::Random => IdSource::Random,
            IdPolicy::Templated { template, keys } => IdSource::Templated {
                template: template.clone(),
                indexes: keys.iter().map(|k| column_index(k.as_str())).collect::<Result<_, _>>()?,
            },
        };

        Ok(Self {
            text_index,
            text_column: key_name.to_string(),
            language,
            ids,
        })
    }

    /// Build the document for the record at stream position `row`.
    pub fn build(&self, row: usize, record: &Record) -> Result<Document, AnalyticsError> {
        let text = record
            .get(self.text_index)
            .and_then(Value::as_str)
            .ok_or_else(|| AnalyticsError::MissingText {
                row,
                column: self.text_column.clone(),
            })?
            .to_string();

        let id = match &self.ids {
            IdSource::Random => uuid::Uuid::new_v4().to_string(),
            IdSource::Templated { template, indexes } => {
                let null = Value::Null;
                let values: Vec<&Value> = indexes
                    .iter()
                    .map(|&i| record.get(i).unwrap_or(&null))
                    .collect();
                format_id(template, &values)
                    .map_err(|detail| AnalyticsError::IdTemplate { row, detail })?
            }
        };

        Ok(Document {
            language: self.language.clone(),
            id,
            text,
        })
    }

    pub fn build_batch(&self, batch: RecordBatch) -> Result<Batch, AnalyticsError> {
        let documents = batch
            .records
            .iter()
            .enumerate()
            .map(|(i, record)| self.build(batch.first_row + i, record))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Batch {
            first_row: batch.first_row,
            records: batch.records,
            documents,
        })
    }
}

/// printf-style id formatting.
///
/// Directives: `%s` (text form), `%d` (integer), `%%` (literal `%`).
/// Surplus values are ignored; missing ones are an error.
pub fn format_id(template: &str, values: &[&Value]) -> Result<String, String> {
    let mut out = String::with_capacity(template.len());
    let mut args = values.iter();
    let mut chars = template.chars();

    while let Some(c) = chars.next() {
        if c != '%' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('%') => out.push('%'),
            Some('s') => {
                let value = args.next().ok_or("too few values for template")?;
                out.push_str(&value.to_string());
            }
            Some('d') => {
                let value = args.next().ok_or("too few values for template")?;
                out.push_str(&integer_of(value)?.to_string());
            }
            Some(other) => return Err(format!("unsupported directive '%{other}'")),
            None => return Err("incomplete directive at end of template".into()),
        }
    }
    Ok(out)
}

fn integer_of(value: &Value) -> Result<i64, String> {
    match value {
        Value::Long(v) => Ok(*v),
        Value::Double(v) if v.is_finite() => Ok(v.trunc() as i64),
        Value::String(s) => s
            .trim()
            .parse()
            .map_err(|_| format!("'{s}' is not an integer")),
        other => Err(format!("{other:?} is not an integer")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use enrich_api::schema::{Column, ColumnType};
    use std::collections::HashSet;

    fn schema() -> Schema {
        Schema::new(vec![
            Column::new("a", ColumnType::String),
            Column::new("b", ColumnType::String),
            Column::new("body", ColumnType::String),
        ])
    }

    fn record(a: &str, b: &str, body: &str) -> Record {
        Record::new(vec![a.into(), b.into(), body.into()])
    }

    #[test]
    fn templated_id_from_fields() {
        let policy = IdPolicy::Templated {
            template: "%s-%s".into(),
            keys: vec!["a".into(), "b".into()],
        };
        let builder = DocumentBuilder::new(&schema(), "body", None, &policy).unwrap();
        let doc = builder.build(0, &record("x", "7", "hello")).unwrap();
        assert_eq!(doc.id, "x-7");
        assert_eq!(doc.text, "hello");
        assert_eq!(doc.language, None);
    }

    #[test]
    fn random_ids_are_distinct_within_batch() {
        let builder = DocumentBuilder::new(&schema(), "body", Some("en".into()), &IdPolicy::Random).unwrap();
        let batch = RecordBatch {
            first_row: 0,
            records: (0..200).map(|i| record("x", "y", &format!("t{i}"))).collect(),
        };
        let batch = builder.build_batch(batch).unwrap();
        let ids: HashSet<_> = batch.documents.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids.len(), 200);
        assert!(batch.documents.iter().all(|d| d.language.as_deref() == Some("en")));
    }

    #[test]
    fn language_omitted_from_json_when_unset() {
        let builder = DocumentBuilder::new(&schema(), "body", None, &IdPolicy::Random).unwrap();
        let doc = builder.build(0, &record("x", "y", "t")).unwrap();
        let json = serde_json::to_value(&doc).unwrap();
        assert!(json.get("language").is_none());
        assert_eq!(json["text"], "t");
    }

    #[test]
    fn unknown_text_column_is_config_error() {
        let err = DocumentBuilder::new(&schema(), "missing", None, &IdPolicy::Random).unwrap_err();
        assert!(matches!(err, AnalyticsError::Config(_)));
    }

    #[test]
    fn unknown_id_key_is_config_error() {
        let policy = IdPolicy::Templated { template: "%s".into(), keys: vec!["zzz".into()] };
        let err = DocumentBuilder::new(&schema(), "body", None, &policy).unwrap_err();
        assert!(matches!(err, AnalyticsError::Config(_)));
    }

    #[test]
    fn null_text_fails_fast_with_row() {
        let builder = DocumentBuilder::new(&schema(), "body", None, &IdPolicy::Random).unwrap();
        let rec = Record::new(vec!["x".into(), "y".into(), Value::Null]);
        let batch = RecordBatch { first_row: 10, records: vec![record("x", "y", "ok"), rec] };
        match builder.build_batch(batch).unwrap_err() {
            AnalyticsError::MissingText { row, column } => {
                assert_eq!(row, 11);
                assert_eq!(column, "body");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn format_id_directives() {
        let seven = Value::Long(7);
        let name = Value::from("doc");
        assert_eq!(format_id("%s/%d", &[&name, &seven]).unwrap(), "doc/7");
        assert_eq!(format_id("100%%-%s", &[&name]).unwrap(), "100%-doc");
        assert_eq!(format_id("%d", &[&Value::from("12")]).unwrap(), "12");
        assert_eq!(format_id("%s", &[&name, &seven]).unwrap(), "doc");
    }

    #[test]
    fn format_id_errors() {
        let name = Value::from("doc");
        assert!(format_id("%s-%s", &[&name]).is_err());
        assert!(format_id("%x", &[&name]).is_err());
        assert!(format_id("abc%", &[]).is_err());
        assert!(format_id("%d", &[&name]).is_err());
    }
}
