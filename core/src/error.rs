//! Field-level error types.
//!
//! Every constraint a field enforces has its own variant so callers can
//! match on the violated rule instead of parsing messages.

use thiserror::Error;

/// Errors raised by a [`Field`](crate::Field) or a [`Record`](crate::Record)
/// before any SQL is composed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FieldError {
    /// The field was asked for a column definition before a model bound its name.
    #[error("field has no name; register it on a model before rendering SQL")]
    Unbound,

    /// A bounded text value is longer than the column allows.
    #[error("maximum length exceeded: {field} allows {max_length} characters, got {length}")]
    LengthExceeded {
        field: String,
        max_length: usize,
        length: usize,
    },

    /// The value does not match the email address grammar.
    #[error("invalid email address for {field}: {value:?}")]
    InvalidEmail { field: String, value: String },

    /// The value kind does not fit the field (e.g. text given to a date field).
    #[error("{field} expects {expected}, got {found}")]
    TypeMismatch {
        field: String,
        expected: &'static str,
        found: &'static str,
    },

    /// `NULL` given to a non-nullable field.
    #[error("{field} does not accept NULL")]
    NullNotAllowed { field: String },

    /// NaN or infinity given to a float field.
    #[error("{field} cannot store non-finite float {value}")]
    NonFinite { field: String, value: String },

    /// A raw column value read from storage could not be converted back.
    #[error("cannot decode stored value for {field}: {reason}")]
    Decode { field: String, reason: String },

    /// Many-to-many fields live in a join table and have no column value.
    #[error("{field} is a many-to-many relation and has no column")]
    NoColumn { field: String },

    /// The model has no field with this name.
    #[error("{table} has no field named {field}")]
    UnknownField { table: String, field: String },
}

/// Convenience alias for results with [`FieldError`].
pub type Result<T> = std::result::Result<T, FieldError>;
