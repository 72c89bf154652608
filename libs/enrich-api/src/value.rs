use std::fmt;

use crate::error::PluginError;
use crate::schema::ColumnType;

/// Owned scalar value of a single record field.
///
/// `Json` carries structured payloads; enrichment columns are always `Json`.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Long(i64),
    Double(f64),
    String(String),
    Json(serde_json::Value),
}

impl Value {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Convert a JSON value into a field value of the declared column type.
    ///
    /// `null` converts to `Null` for every type. Integral doubles are not
    /// narrowed into `Long`.
    pub fn from_json(json: &serde_json::Value, column_type: ColumnType) -> Result<Self, PluginError> {
        if json.is_null() {
            return Ok(Value::Null);
        }
        let mismatch = || PluginError::format(format!("expected {column_type}, got {json}"));
        match column_type {
            ColumnType::Boolean => json.as_bool().map(Value::Bool).ok_or_else(mismatch),
            ColumnType::Long => json.as_i64().map(Value::Long).ok_or_else(mismatch),
            ColumnType::Double => json.as_f64().map(Value::Double).ok_or_else(mismatch),
            ColumnType::String => json
                .as_str()
                .map(|s| Value::String(s.to_string()))
                .ok_or_else(mismatch),
            ColumnType::Json => Ok(Value::Json(json.clone())),
        }
    }

    /// JSON representation used by output writers and request bodies.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Long(v) => serde_json::Value::from(*v),
            // Non-finite doubles have no JSON form.
            Value::Double(v) => serde_json::Number::from_f64(*v)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::String(s) => serde_json::Value::String(s.clone()),
            Value::Json(v) => v.clone(),
        }
    }
}

/// Text form: strings verbatim, `Null` as empty, JSON compact.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Long(v) => write!(f, "{v}"),
            Value::Double(v) => write!(f, "{v}"),
            Value::String(s) => f.write_str(s),
            Value::Json(v) => write!(f, "{v}"),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Long(v)
    }
}

/// Positional array of values. Order matches `Schema.columns`.
///
/// Values only, no names or types: all metadata lives in `Schema`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Record(pub Vec<Value>);

impl Record {
    pub fn new(values: Vec<Value>) -> Self {
        Self(values)
    }

    pub fn get(&self, index: usize) -> Option<&Value> {
        self.0.get(index)
    }

    pub fn values(&self) -> &[Value] {
        &self.0
    }

    /// Append one trailing value (the schema must have been extended to match).
    pub fn with_appended(mut self, value: Value) -> Self {
        self.0.push(value);
        self
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
