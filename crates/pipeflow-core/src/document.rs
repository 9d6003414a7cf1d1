//! Pipeline documents: an ordered map from task id to record.

use indexmap::IndexMap;
use serde_json::{Map, Value};

use crate::error::{Error, Result};
use crate::record::{TaskRecord, json_type_name};

/// A parsed pipeline document.
///
/// Top-level entries that are not objects (a `$schema` string, for instance) are not tasks; they
/// are kept in `extras` and written back ahead of the tasks.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Document {
    pub tasks: IndexMap<String, TaskRecord>,
    pub extras: IndexMap<String, Value>,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses document text. JSON5 is accepted since hand-maintained pipelines often carry
    /// comments and trailing commas.
    pub fn parse(text: &str) -> Result<Self> {
        let value: Value = json5::from_str(text).map_err(|e| Error::MalformedDocument {
            message: e.to_string(),
        })?;
        Self::from_value(value)
    }

    pub fn from_value(value: Value) -> Result<Self> {
        let Value::Object(map) = value else {
            return Err(Error::MalformedDocument {
                message: format!("expected an object at the top level, found {}", json_type_name(&value)),
            });
        };
        let mut doc = Self::default();
        for (id, entry) in map {
            match entry {
                Value::Object(record) => {
                    doc.tasks.insert(id, TaskRecord::from_map(record));
                }
                other => {
                    doc.extras.insert(id, other);
                }
            }
        }
        Ok(doc)
    }

    pub fn to_value(&self) -> Value {
        let mut out = Map::new();
        for (k, v) in &self.extras {
            out.insert(k.clone(), v.clone());
        }
        for (id, record) in &self.tasks {
            out.insert(id.clone(), record.to_value());
        }
        Value::Object(out)
    }

    /// Pretty JSON with four-space indentation and a trailing newline.
    pub fn to_pretty_json(&self) -> Result<String> {
        to_pretty_json(&self.to_value())
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty() && self.extras.is_empty()
    }
}

pub fn to_pretty_json(value: &Value) -> Result<String> {
    use serde::Serialize;

    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    value.serialize(&mut ser)?;
    let mut out = String::from_utf8_lossy(&buf).into_owned();
    out.push('\n');
    Ok(out)
}
