//! Error types for rekord-core

use thiserror::Error;

/// Core error type
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("Schema not found for entity: {0}")]
    SchemaNotFound(String),

    #[error("Attribute {attribute} not found on entity {entity}")]
    AttributeNotFound { entity: String, attribute: String },

    #[error("Argument count mismatch: format expects {expected}, got {got}")]
    ArgumentCountMismatch { expected: usize, got: usize },

    #[error("Predicate syntax error: {0}")]
    PredicateSyntax(String),

    #[error("Type error: expected {expected}, got {got}")]
    TypeError { expected: String, got: String },

    #[error("Predicate template evaluated before binding: {0}")]
    UnboundTemplate(String),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
