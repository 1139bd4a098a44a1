//! Error types for model persistence.
//!
//! Provides a unified error type covering driver failures, field validation,
//! schema validation and relation misuse.

use ormlet_core::{FieldError, SchemaError};
use thiserror::Error;

/// Errors that can occur while persisting or querying models.
#[derive(Debug, Error)]
pub enum SqliteError {
    /// Statement execution failure, propagated unchanged from SQLite.
    #[error("database error: {0}")]
    DatabaseError(#[from] rusqlite::Error),

    /// A value violated a field constraint; no SQL was executed.
    #[error("validation error: {0}")]
    ValidationError(#[from] FieldError),

    /// The model schema cannot be rendered to DDL.
    #[error("invalid schema for {table}: {}", join_errors(.errors))]
    InvalidSchema {
        table: String,
        errors: Vec<SchemaError>,
    },

    /// Update, delete or relation access on a record that was never saved.
    #[error("{table} record has no primary key assigned")]
    MissingPrimaryKey { table: String },

    /// The named field is not the kind of relation the operation needs.
    #[error("{table}.{field} is not a {expected} field")]
    NotARelation {
        table: String,
        field: String,
        expected: &'static str,
    },

    /// A record of one model was passed where another model was expected.
    #[error("expected a {expected} record, got {found}")]
    WrongModel { expected: String, found: String },

    /// A raw SQLite value has no counterpart in the value model.
    #[error("conversion error: {0}")]
    ConversionError(String),
}

fn join_errors(errors: &[SchemaError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Convenience alias for results with [`SqliteError`].
pub type Result<T> = std::result::Result<T, SqliteError>;
