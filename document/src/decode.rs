use serde::de::DeserializeOwned;
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::{DocumentError, Result, Violation};
use crate::schema::Schema;

/// A parsed document that passed schema validation.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedDocument {
    fields: Map<String, Value>,
}

impl DecodedDocument {
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.fields)
    }

    /// Convert into a caller-defined type. A type that does not fit the document is reported as a
    /// schema violation, since the bytes themselves were valid.
    pub fn deserialize<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_value(Value::Object(self.fields.clone())).map_err(|e| {
            DocumentError::SchemaViolation(vec![Violation {
                path: "$".into(),
                expected: std::any::type_name::<T>().into(),
                found: e.to_string(),
            }])
        })
    }
}

impl Serialize for DecodedDocument {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.fields.serialize(serializer)
    }
}

/// Parse `payload` as JSON and check it against `schema`.
///
/// Only a document that parsed completely and satisfied the schema is returned.
pub fn decode_and_validate(payload: &[u8], schema: &Schema) -> Result<DecodedDocument> {
    let value: Value = serde_json::from_slice(payload)?;

    if let Err(violations) = schema.validate(&value) {
        debug!(num_violations = violations.len(), "Payload failed schema validation");
        return Err(DocumentError::SchemaViolation(violations));
    }

    match value {
        Value::Object(fields) => Ok(DecodedDocument { fields }),
        // Unreachable: validation rejects non-object roots.
        other => Err(DocumentError::SchemaViolation(vec![Violation {
            path: "$".into(),
            expected: "object".into(),
            found: other.to_string(),
        }])),
    }
}

/// [`decode_and_validate`] followed by conversion into `T`.
pub fn decode_as<T: DeserializeOwned>(payload: &[u8], schema: &Schema) -> Result<T> {
    decode_and_validate(payload, schema)?.deserialize()
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;
    use serde_json::json;

    use super::*;
    use crate::schema::FieldKind;

    fn value_schema() -> Schema {
        Schema::new().required("value", FieldKind::Number)
    }

    #[test]
    fn test_decode_value_document() {
        let doc = decode_and_validate(br#"{"value": 42}"#, &value_schema()).unwrap();
        assert_eq!(doc.get("value"), Some(&json!(42)));
        assert_eq!(doc.into_value(), json!({"value": 42}));
    }

    #[test]
    fn test_missing_required_field() {
        let err = decode_and_validate(br#"{"other": 42}"#, &value_schema()).unwrap_err();
        let DocumentError::SchemaViolation(violations) = err else {
            panic!("expected schema violation, got {err:?}");
        };
        assert_eq!(violations[0].path, "value");
        assert_eq!(violations[0].found, "missing");
    }

    #[test]
    fn test_invalid_bytes() {
        let payloads: [&[u8]; 5] = [b"", b"{\"value\": ", b"\xff\xfe{}", b"{\"value\": 42} trailing", b"bat country"];
        for payload in payloads {
            let err = decode_and_validate(payload, &value_schema()).unwrap_err();
            assert!(matches!(err, DocumentError::DecodeError { .. }), "{payload:?}: {err:?}");
        }
    }

    #[test]
    fn test_non_object_root() {
        let err = decode_and_validate(b"42", &Schema::new()).unwrap_err();
        assert!(matches!(err, DocumentError::SchemaViolation(_)));
    }

    #[derive(Debug, Deserialize, PartialEq)]
    struct Profile {
        name: String,
        age: u32,
    }

    #[test]
    fn test_typed_decode() {
        let schema = Schema::new()
            .required("name", FieldKind::String)
            .required("age", FieldKind::Integer);

        let p: Profile = decode_as(br#"{"name": "ada", "age": 36}"#, &schema).unwrap();
        assert_eq!(
            p,
            Profile {
                name: "ada".into(),
                age: 36
            }
        );

        // Valid against the schema, but out of range for the target type.
        let err = decode_as::<Profile>(br#"{"name": "ada", "age": -1}"#, &schema).unwrap_err();
        assert!(matches!(err, DocumentError::SchemaViolation(_)));
    }

    #[test]
    fn test_document_serializes_as_object() {
        let doc = decode_and_validate(br#"{"b": [1], "a": "x"}"#, &Schema::new()).unwrap();
        assert_eq!(serde_json::to_value(&doc).unwrap(), json!({"a": "x", "b": [1]}));
    }
}
