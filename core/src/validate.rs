//! Model schema validation and value grammars.
//!
//! Validates structural invariants of a [`ModelSchema`] before any DDL is
//! generated from it: identifiers must be plain SQL identifiers (they are
//! inlined unquoted), field names must be unique and at most one primary key
//! may be declared.
//!
//! # Examples
//!
//! ```
//! use ormlet_core::*;
//!
//! let schema = ModelSchema::builder("question")
//!     .field("question_text", Field::char(200))
//!     .build();
//! assert!(validate_schema(&schema).is_empty());
//!
//! let bad = ModelSchema::builder("question")
//!     .field("text", Field::text())
//!     .field("text", Field::text())
//!     .build();
//! assert!(!validate_schema(&bad).is_empty());
//! ```

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

use crate::field::FieldType;
use crate::model::ModelSchema;

/// Structural problems in a model schema.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    /// Table name is empty or whitespace-only.
    #[error("table name cannot be empty")]
    EmptyTableName,
    /// A table or column name is not a plain SQL identifier.
    #[error("invalid identifier: {0}")]
    InvalidIdentifier(String),
    /// Two fields of the same model share a name.
    #[error("duplicate field in {table}: {field}")]
    DuplicateField { table: String, field: String },
    /// More than one primary key field was registered.
    #[error("{0} declares more than one primary key")]
    MultiplePrimaryKeys(String),
    /// A bounded text field was declared with a zero length.
    #[error("{0} must allow at least one character")]
    ZeroLength(String),
    /// A custom field was declared without a column type.
    #[error("{0} has an empty column type")]
    EmptyColumnType(String),
    /// Two many-to-many fields of one model resolve to the same join table.
    #[error("{table}.{field} would reuse join table {join_table}")]
    DuplicateJoinTable {
        table: String,
        field: String,
        join_table: String,
    },
}

static IDENTIFIER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("static regex must compile")
});

// RFC 5322 derived: dotted atoms or a quoted local part, then a dotted
// domain or a bracketed IPv4 / general address literal.
static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(concat!(
        r##"(?i)^(?:[a-z0-9!#$%&'*+/=?^_`{|}~-]+(?:\.[a-z0-9!#$%&'*+/=?^_`{|}~-]+)*"##,
        r##"|"(?:[\x01-\x08\x0b\x0c\x0e-\x1f\x21\x23-\x5b\x5d-\x7f]|\\[\x01-\x09\x0b\x0c\x0e-\x7f])*")"##,
        r##"@(?:(?:[a-z0-9](?:[a-z0-9-]*[a-z0-9])?\.)+[a-z0-9](?:[a-z0-9-]*[a-z0-9])?"##,
        r##"|\[(?:(?:25[0-5]|2[0-4][0-9]|[01]?[0-9][0-9]?)\.){3}"##,
        r##"(?:25[0-5]|2[0-4][0-9]|[01]?[0-9][0-9]?"##,
        r##"|[a-z0-9-]*[a-z0-9]:(?:[\x01-\x08\x0b\x0c\x0e-\x1f\x21-\x5a\x5d-\x7f]|\\[\x01-\x09\x0b\x0c\x0e-\x7f])+)\])$"##,
    ))
    .expect("static regex must compile")
});

/// Returns `true` if `value` is a plain, unquoted SQL identifier.
pub fn is_valid_identifier(value: &str) -> bool {
    IDENTIFIER_RE.is_match(value)
}

/// Returns `true` if `value` is a syntactically valid email address.
///
/// # Examples
///
/// ```
/// use ormlet_core::is_valid_email;
///
/// assert!(is_valid_email("mgurdal@protonmail.com"));
/// assert!(is_valid_email("\"john..doe\"@example.org"));
/// assert!(is_valid_email("root@[192.168.0.1]"));
/// assert!(!is_valid_email("no-at-sign.example.com"));
/// assert!(!is_valid_email("user@example..com"));
/// ```
pub fn is_valid_email(value: &str) -> bool {
    EMAIL_RE.is_match(value)
}

/// Validates a model schema.
///
/// Returns every problem found; an empty vector means the schema can be
/// rendered to DDL.
pub fn validate_schema(schema: &ModelSchema) -> Vec<SchemaError> {
    let mut errors = Vec::new();
    let table = schema.table_name();

    if table.trim().is_empty() {
        errors.push(SchemaError::EmptyTableName);
        return errors;
    }
    if !is_valid_identifier(table) {
        errors.push(SchemaError::InvalidIdentifier(table.to_string()));
    }

    let mut seen: HashSet<&str> = HashSet::new();
    let mut primary_keys = 0usize;

    for field in schema.fields() {
        let Some(name) = field.name() else {
            errors.push(SchemaError::InvalidIdentifier(String::new()));
            continue;
        };
        if !is_valid_identifier(name) {
            errors.push(SchemaError::InvalidIdentifier(name.to_string()));
        }
        if !seen.insert(name) {
            errors.push(SchemaError::DuplicateField {
                table: table.to_string(),
                field: name.to_string(),
            });
        }
        if field.is_primary_key() {
            primary_keys += 1;
        }
        match field.field_type() {
            FieldType::Char { max_length: 0 }
            | FieldType::Varchar { max_length: 0 }
            | FieldType::Email { max_length: 0 } => {
                errors.push(SchemaError::ZeroLength(format!("{table}.{name}")));
            }
            FieldType::Custom { column_type } if column_type.trim().is_empty() => {
                errors.push(SchemaError::EmptyColumnType(format!("{table}.{name}")));
            }
            _ => {}
        }
    }

    if primary_keys > 1 {
        errors.push(SchemaError::MultiplePrimaryKeys(table.to_string()));
    }

    let mut join_tables: HashSet<String> = HashSet::new();
    for field in schema.many_to_many() {
        let Some(name) = field.name() else { continue };
        let Some(join) = schema.join_table(name) else { continue };
        if !join_tables.insert(join.name.clone()) {
            errors.push(SchemaError::DuplicateJoinTable {
                table: table.to_string(),
                field: name.to_string(),
                join_table: join.name,
            });
        }
    }

    errors
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Field;

    #[test]
    fn test_identifiers() {
        assert!(is_valid_identifier("question"));
        assert!(is_valid_identifier("_choice_2"));
        assert!(!is_valid_identifier("2fast"));
        assert!(!is_valid_identifier("drop;--"));
        assert!(!is_valid_identifier("has space"));
        assert!(!is_valid_identifier(""));
    }

    #[test]
    fn test_email_accepts_common_forms() {
        assert!(is_valid_email("mgurdal@protonmail.com"));
        assert!(is_valid_email("first.last+tag@sub.example.co"));
        assert!(is_valid_email("O'Reilly@example.com"));
        assert!(is_valid_email("MGURDAL@PROTONMAIL.COM"));
    }

    #[test]
    fn test_email_rejects_malformed() {
        assert!(!is_valid_email("mgurdal"));
        assert!(!is_valid_email("@protonmail.com"));
        assert!(!is_valid_email("mgurdal@"));
        assert!(!is_valid_email("mgurdal@protonmail"));
        assert!(!is_valid_email("mgurdal@protonmail-.com"));
        assert!(!is_valid_email(".mgurdal@protonmail.com"));
        assert!(!is_valid_email("mgurdal@protonmail.com trailing"));
        assert!(!is_valid_email("root@[300.1.1.1]"));
    }

    #[test]
    fn test_valid_schema() {
        let schema = ModelSchema::builder("choice")
            .field("choice_text", Field::char(200))
            .field("votes", Field::integer())
            .build();
        assert!(validate_schema(&schema).is_empty());
    }

    #[test]
    fn test_invalid_names() {
        let schema = ModelSchema::builder("bad table")
            .field("ok", Field::text())
            .field("not ok", Field::text())
            .build();
        let errors = validate_schema(&schema);
        assert!(errors.contains(&SchemaError::InvalidIdentifier("bad table".into())));
        assert!(errors.contains(&SchemaError::InvalidIdentifier("not ok".into())));
    }

    #[test]
    fn test_empty_table_name() {
        let schema = ModelSchema::builder("  ").build();
        assert_eq!(validate_schema(&schema), vec![SchemaError::EmptyTableName]);
    }

    #[test]
    fn test_duplicate_and_multiple_primary_keys() {
        let schema = ModelSchema::builder("t")
            .field("id", Field::primary_key())
            .field("other_id", Field::primary_key())
            .field("name", Field::text())
            .field("name", Field::varchar(3))
            .build();
        let errors = validate_schema(&schema);
        assert!(errors.contains(&SchemaError::MultiplePrimaryKeys("t".into())));
        assert!(errors.iter().any(|e| matches!(e, SchemaError::DuplicateField { field, .. } if field == "name")));
    }

    #[test]
    fn test_zero_length_and_empty_custom_type() {
        let schema = ModelSchema::builder("t")
            .field("code", Field::char(0))
            .field("blob", Field::custom(" "))
            .build();
        let errors = validate_schema(&schema);
        assert!(errors.contains(&SchemaError::ZeroLength("t.code".into())));
        assert!(errors.contains(&SchemaError::EmptyColumnType("t.blob".into())));
    }

    #[test]
    fn test_many_to_many_fields_sharing_a_join_table() {
        let user = ModelSchema::builder("user").field("name", Field::text()).build();
        let user = crate::ModelRef::from(user);
        let schema = ModelSchema::builder("post")
            .field("likes", Field::many_to_many(&user))
            .field("shares", Field::many_to_many(&user))
            .build();
        assert_eq!(
            validate_schema(&schema),
            vec![SchemaError::DuplicateJoinTable {
                table: "post".into(),
                field: "shares".into(),
                join_table: "post_user".into(),
            }]
        );

        let single = ModelSchema::builder("post")
            .field("likes", Field::many_to_many(&user))
            .build();
        assert!(validate_schema(&single).is_empty());
    }
}
