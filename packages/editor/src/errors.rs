//! Error types for the editor

use std::fmt;

use thiserror::Error;

use crate::schema::SchemaViolation;

/// The four cross-referencing collections of a story
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Section,
    Resource,
    Contextualizer,
    Contextualization,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EntityKind::Section => "section",
            EntityKind::Resource => "resource",
            EntityKind::Contextualizer => "contextualizer",
            EntityKind::Contextualization => "contextualization",
        };
        f.write_str(name)
    }
}

/// Referential integrity violations.
///
/// These are programming errors on the caller's side: the operation that
/// raised one is aborted and no partial snapshot is produced.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IntegrityError {
    #[error("Duplicate {kind} id: {id}")]
    DuplicateId { kind: EntityKind, id: String },

    #[error("{kind} not found: {id}")]
    NotFound { kind: EntityKind, id: String },

    #[error("{kind} payload id '{payload}' does not match key '{key}'")]
    IdMismatch {
        kind: EntityKind,
        key: String,
        payload: String,
    },

    #[error("Sections order mismatch (missing: {missing:?}, unexpected: {unexpected:?})")]
    OrderMismatch {
        missing: Vec<String>,
        unexpected: Vec<String>,
    },

    #[error("{kind} {id} references missing {target_kind} {target_id}")]
    DanglingReference {
        kind: EntityKind,
        id: String,
        target_kind: EntityKind,
        target_id: String,
    },

    #[error("Index {index} out of bounds for order of length {len}")]
    IndexOutOfBounds { index: usize, len: usize },

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },
}

impl IntegrityError {
    pub(crate) fn not_found(kind: EntityKind, id: &str) -> Self {
        IntegrityError::NotFound {
            kind,
            id: id.to_string(),
        }
    }
}

/// Errors raised while importing a serialized story
#[derive(Error, Debug)]
pub enum ImportError {
    #[error("Malformed story document: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Story document violates {} schema constraint(s)", .0.len())]
    Validation(Vec<SchemaViolation>),
}

impl ImportError {
    /// Violated constraints, empty when the document was not even JSON
    pub fn violations(&self) -> &[SchemaViolation] {
        match self {
            ImportError::Validation(violations) => violations,
            ImportError::Json(_) => &[],
        }
    }
}
