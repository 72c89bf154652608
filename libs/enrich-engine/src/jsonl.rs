//! JSON-lines record I/O.
//!
//! Input lines are objects read by column name. Output lines are objects
//! with keys in schema order.

use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Lines, Write};
use std::path::Path;

use enrich_api::error::PluginError;
use enrich_api::filter::RecordSink;
use enrich_api::schema::Schema;
use enrich_api::value::{Record, Value};

use crate::config::STDOUT_PATH;
use crate::error::EngineError;

/// Reads records of a declared schema from a JSON-lines source.
///
/// Blank lines are skipped. Line numbers are 1-based.
pub struct JsonLinesReader<R> {
    lines: Lines<R>,
    schema: Schema,
    line: usize,
}

impl JsonLinesReader<BufReader<File>> {
    pub fn open(path: &Path, schema: Schema) -> Result<Self, EngineError> {
        let file = File::open(path).map_err(|e| EngineError::Config(format!("{}: {e}", path.display())))?;
        Ok(Self::new(BufReader::new(file), schema))
    }
}

impl<R: BufRead> JsonLinesReader<R> {
    pub fn new(reader: R, schema: Schema) -> Self {
        Self {
            lines: reader.lines(),
            schema,
            line: 0,
        }
    }

    /// Up to `max` records; an empty page means end of input.
    pub fn next_page(&mut self, max: usize) -> Result<Vec<Record>, EngineError> {
        let mut page = Vec::with_capacity(max);
        while page.len() < max {
            match self.next_record()? {
                Some(record) => page.push(record),
                None => break,
            }
        }
        Ok(page)
    }

    fn next_record(&mut self) -> Result<Option<Record>, EngineError> {
        for line in self.lines.by_ref() {
            self.line += 1;
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            return parse_line(&line, &self.schema)
                .map(Some)
                .map_err(|detail| EngineError::Input { line: self.line, detail });
        }
        Ok(None)
    }
}

fn parse_line(line: &str, schema: &Schema) -> Result<Record, String> {
    let json: serde_json::Value = serde_json::from_str(line).map_err(|e| e.to_string())?;
    let object = json
        .as_object()
        .ok_or_else(|| "expected a JSON object".to_string())?;

    schema
        .columns
        .iter()
        .map(|column| match object.get(&column.name) {
            None => Ok(Value::Null),
            Some(v) => Value::from_json(v, column.column_type)
                .map_err(|e| format!("column '{}': {}", column.name, e.message)),
        })
        .collect::<Result<Vec<_>, _>>()
        .map(Record::new)
}

/// Writes records as JSON lines, keys in schema order.
pub struct JsonLinesSink {
    schema: Schema,
    out: BufWriter<Box<dyn Write + Send>>,
    written: u64,
}

impl JsonLinesSink {
    pub fn new(schema: Schema, out: Box<dyn Write + Send>) -> Self {
        Self {
            schema,
            out: BufWriter::new(out),
            written: 0,
        }
    }

    /// File at `path`, or stdout for `-`.
    pub fn create(path: &str, schema: Schema) -> Result<Self, EngineError> {
        let out: Box<dyn Write + Send> = if path == STDOUT_PATH {
            Box::new(io::stdout())
        } else {
            Box::new(File::create(path).map_err(|e| EngineError::Config(format!("{path}: {e}")))?)
        };
        Ok(Self::new(schema, out))
    }

    fn to_line(&self, record: &Record) -> Result<String, PluginError> {
        if record.len() != self.schema.len() {
            return Err(PluginError::logic(format!(
                "record has {} values, output schema has {} columns",
                record.len(),
                self.schema.len()
            )));
        }
        let object: serde_json::Map<String, serde_json::Value> = self
            .schema
            .names()
            .zip(record.values())
            .map(|(name, value)| (name.to_string(), value.to_json()))
            .collect();
        Ok(serde_json::to_string(&object)?)
    }
}

impl RecordSink for JsonLinesSink {
    fn add(&mut self, record: Record) -> Result<(), PluginError> {
        let line = self.to_line(&record)?;
        writeln!(self.out, "{line}")?;
        self.written += 1;
        Ok(())
    }

    fn finish(&mut self) -> Result<(), PluginError> {
        self.out.flush()?;
        tracing::debug!(records = self.written, "output flushed");
        Ok(())
    }
}
