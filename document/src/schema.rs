use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::Violation;

const ROOT_PATH: &str = "$";

fn default_true() -> bool {
    true
}

/// The expected JSON type of a field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum FieldKind {
    Any,
    Null,
    Bool,
    Number,
    /// A number without a fractional part.
    Integer,
    String,
    Array {
        /// Kind every element must have; unconstrained when absent.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        items: Option<Box<FieldKind>>,
    },
    Object(Schema),
}

impl FieldKind {
    pub fn array_of(items: FieldKind) -> Self {
        FieldKind::Array {
            items: Some(Box::new(items)),
        }
    }

    fn describe(&self) -> String {
        match self {
            FieldKind::Any => "any value".into(),
            FieldKind::Null => "null".into(),
            FieldKind::Bool => "bool".into(),
            FieldKind::Number => "number".into(),
            FieldKind::Integer => "integer".into(),
            FieldKind::String => "string".into(),
            FieldKind::Array { items: None } => "array".into(),
            FieldKind::Array { items: Some(k) } => format!("array of {}", k.describe()),
            FieldKind::Object(_) => "object".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSpec {
    #[serde(flatten)]
    pub kind: FieldKind,
    #[serde(default = "default_true")]
    pub required: bool,
}

/// The expected shape of a JSON object.
///
/// Can be built in code:
///
/// ```
/// use document::{FieldKind, Schema};
///
/// let schema = Schema::new()
///     .required("value", FieldKind::Number)
///     .optional("label", FieldKind::String);
/// ```
///
/// or loaded from a JSON description such as
/// `{"fields": {"value": {"type": "number"}, "label": {"type": "string", "required": false}}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    #[serde(default)]
    fields: BTreeMap<String, FieldSpec>,
    #[serde(default = "default_true")]
    allow_unknown_fields: bool,
}

impl Default for Schema {
    fn default() -> Self {
        Self {
            fields: BTreeMap::new(),
            allow_unknown_fields: true,
        }
    }
}

impl Schema {
    /// A schema with no declared fields, accepting any JSON object.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn required(mut self, name: impl Into<String>, kind: FieldKind) -> Self {
        self.fields.insert(name.into(), FieldSpec { kind, required: true });
        self
    }

    pub fn optional(mut self, name: impl Into<String>, kind: FieldKind) -> Self {
        self.fields.insert(name.into(), FieldSpec { kind, required: false });
        self
    }

    /// Reject objects carrying fields the schema does not declare.
    pub fn deny_unknown_fields(mut self) -> Self {
        self.allow_unknown_fields = false;
        self
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &FieldSpec)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn from_json(description: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(description)
    }

    /// Check a parsed document against this schema, collecting every violation.
    pub fn validate(&self, value: &Value) -> Result<(), Vec<Violation>> {
        let mut violations = Vec::new();

        match value {
            Value::Object(map) => self.check_object(map, ROOT_PATH, &mut violations),
            other => violations.push(Violation {
                path: ROOT_PATH.into(),
                expected: "object".into(),
                found: type_name(other).into(),
            }),
        }

        if violations.is_empty() { Ok(()) } else { Err(violations) }
    }

    fn check_object(&self, map: &Map<String, Value>, path: &str, out: &mut Vec<Violation>) {
        for (name, spec) in &self.fields {
            let field_path = join_path(path, name);
            match map.get(name) {
                Some(v) => check_value(&spec.kind, v, &field_path, out),
                None if spec.required => out.push(Violation {
                    path: field_path,
                    expected: spec.kind.describe(),
                    found: "missing".into(),
                }),
                None => {},
            }
        }

        if !self.allow_unknown_fields {
            for name in map.keys().filter(|k| !self.fields.contains_key(*k)) {
                out.push(Violation {
                    path: join_path(path, name),
                    expected: "no such field".into(),
                    found: "unknown field".into(),
                });
            }
        }
    }
}

fn check_value(kind: &FieldKind, value: &Value, path: &str, out: &mut Vec<Violation>) {
    let matches = match (kind, value) {
        (FieldKind::Any, _) => true,
        (FieldKind::Null, Value::Null) => true,
        (FieldKind::Bool, Value::Bool(_)) => true,
        (FieldKind::Number, Value::Number(_)) => true,
        (FieldKind::Integer, Value::Number(n)) => n.is_i64() || n.is_u64(),
        (FieldKind::String, Value::String(_)) => true,
        (FieldKind::Array { items }, Value::Array(elements)) => {
            if let Some(items) = items {
                for (i, element) in elements.iter().enumerate() {
                    check_value(items, element, &format!("{path}[{i}]"), out);
                }
            }
            true
        },
        (FieldKind::Object(schema), Value::Object(map)) => {
            schema.check_object(map, path, out);
            true
        },
        _ => false,
    };

    if !matches {
        out.push(Violation {
            path: path.to_owned(),
            expected: kind.describe(),
            found: type_name(value).into(),
        });
    }
}

fn join_path(parent: &str, name: &str) -> String {
    if parent == ROOT_PATH {
        name.to_owned()
    } else {
        format!("{parent}.{name}")
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(n) if n.is_f64() => "non-integer number",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
