use std::fmt;

use thiserror::Error;

/// One mismatch between a document and its schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// Dotted path to the offending value; `$` is the document root.
    pub path: String,
    pub expected: String,
    /// What was found instead; "missing" for absent required fields.
    pub found: String,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: expected {}, found {}", self.path, self.expected, self.found)
    }
}

#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DocumentError {
    #[error("Payload is not valid JSON: {message} (line {line}, column {column})")]
    DecodeError { message: String, line: usize, column: usize },

    #[error("Document does not match schema: {}", format_violations(.0))]
    SchemaViolation(Vec<Violation>),
}

fn format_violations(violations: &[Violation]) -> String {
    violations.iter().map(|v| v.to_string()).collect::<Vec<_>>().join("; ")
}

impl From<serde_json::Error> for DocumentError {
    fn from(e: serde_json::Error) -> Self {
        DocumentError::DecodeError {
            message: e.to_string(),
            line: e.line(),
            column: e.column(),
        }
    }
}

pub type Result<T> = std::result::Result<T, DocumentError>;
