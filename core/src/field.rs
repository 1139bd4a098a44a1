//! Field type definitions and SQL rendering.
//!
//! A [`Field`] describes one column: its [`FieldType`] decides the SQL column
//! type, which runtime values it accepts, how those values are rendered as
//! inline SQL literals and how they are converted to and from the storage
//! representation handed to the driver.
//!
//! # Examples
//!
//! ```
//! use ormlet_core::{Field, Value};
//!
//! let mut title = Field::char(4);
//! title.set_name("title");
//! assert_eq!(title.create_sql().unwrap(), "title CHAR(4)");
//! assert_eq!(title.sql_format(&Value::from("test")).unwrap(), "'test'");
//! assert!(title.sql_format(&Value::from("test_ex")).is_err());
//! ```

use chrono::{NaiveDate, NaiveDateTime};

use crate::error::{FieldError, Result};
use crate::model::ModelRef;
use crate::validate::is_valid_email;
use crate::value::{DATE_FORMAT, DATETIME_FORMAT, Value};

/// The closed set of column kinds.
///
/// Relationship variants hold a [`ModelRef`] to their target, which is only
/// resolved when SQL is rendered.
#[derive(Debug, Clone)]
pub enum FieldType {
    /// Store-assigned integer key.
    PrimaryKey,
    /// 64-bit integer.
    Integer,
    /// Double precision float.
    Float,
    /// Fixed-width text.
    Char { max_length: usize },
    /// Bounded variable-width text.
    Varchar { max_length: usize },
    /// Unbounded text.
    Text,
    /// Bounded text that must be an email address.
    Email { max_length: usize },
    /// Calendar date.
    Date,
    /// Date and time.
    Datetime,
    /// Many-to-one reference to another model's primary key.
    ForeignKey { to: ModelRef },
    /// Relation stored in a join table.
    ManyToMany { to: ModelRef },
    /// Any other column type, with no validation.
    Custom { column_type: String },
}

impl FieldType {
    /// SQL column type, or `None` for relations that own no column.
    ///
    /// Foreign keys look up the target's table and primary key on every call.
    pub fn column_type(&self) -> Option<String> {
        let column_type = match self {
            FieldType::PrimaryKey => "INTEGER NOT NULL PRIMARY KEY".to_string(),
            FieldType::Integer => "INTEGER".to_string(),
            FieldType::Float => "DOUBLE".to_string(),
            FieldType::Char { max_length } => format!("CHAR({max_length})"),
            FieldType::Varchar { max_length } | FieldType::Email { max_length } => {
                format!("VARCHAR({max_length})")
            }
            FieldType::Text => "TEXT".to_string(),
            FieldType::Date => "DATE".to_string(),
            FieldType::Datetime => "DATETIME".to_string(),
            FieldType::ForeignKey { to } => {
                let target = to.resolve();
                format!(
                    "INTEGER NOT NULL REFERENCES {} ({})",
                    target.table_name(),
                    target.primary_key_name()
                )
            }
            FieldType::ManyToMany { .. } => return None,
            FieldType::Custom { column_type } => column_type.clone(),
        };
        Some(column_type)
    }

    /// Stable snake_case name of the variant, used in metadata and manifests.
    pub fn kind_name(&self) -> &'static str {
        match self {
            FieldType::PrimaryKey => "primary_key",
            FieldType::Integer => "integer",
            FieldType::Float => "float",
            FieldType::Char { .. } => "char",
            FieldType::Varchar { .. } => "varchar",
            FieldType::Text => "text",
            FieldType::Email { .. } => "email",
            FieldType::Date => "date",
            FieldType::Datetime => "datetime",
            FieldType::ForeignKey { .. } => "foreign_key",
            FieldType::ManyToMany { .. } => "many_to_many",
            FieldType::Custom { .. } => "custom",
        }
    }

    pub fn max_length(&self) -> Option<usize> {
        match self {
            FieldType::Char { max_length }
            | FieldType::Varchar { max_length }
            | FieldType::Email { max_length } => Some(*max_length),
            _ => None,
        }
    }

    /// Target model of a relationship variant.
    pub fn target(&self) -> Option<&ModelRef> {
        match self {
            FieldType::ForeignKey { to } | FieldType::ManyToMany { to } => Some(to),
            _ => None,
        }
    }

    /// Scalar columns may be marked `NOT NULL` explicitly; keys already are.
    fn is_scalar(&self) -> bool {
        !matches!(
            self,
            FieldType::PrimaryKey | FieldType::ForeignKey { .. } | FieldType::ManyToMany { .. }
        )
    }
}

/// A typed column descriptor.
///
/// Fields are created unnamed and bound to a column name when registered on a
/// [`ModelSchema`](crate::ModelSchema). Rendering is a pure function of the
/// field and its argument.
#[derive(Debug, Clone)]
pub struct Field {
    name: Option<String>,
    field_type: FieldType,
    nullable: bool,
}

impl Field {
    /// Creates an unnamed field. Scalars are nullable; keys and relations are not.
    pub fn new(field_type: FieldType) -> Self {
        let nullable = field_type.is_scalar();
        Self {
            name: None,
            field_type,
            nullable,
        }
    }

    pub fn primary_key() -> Self {
        Self::new(FieldType::PrimaryKey)
    }

    pub fn integer() -> Self {
        Self::new(FieldType::Integer)
    }

    pub fn float() -> Self {
        Self::new(FieldType::Float)
    }

    pub fn char(max_length: usize) -> Self {
        Self::new(FieldType::Char { max_length })
    }

    pub fn varchar(max_length: usize) -> Self {
        Self::new(FieldType::Varchar { max_length })
    }

    pub fn text() -> Self {
        Self::new(FieldType::Text)
    }

    pub fn email(max_length: usize) -> Self {
        Self::new(FieldType::Email { max_length })
    }

    pub fn date() -> Self {
        Self::new(FieldType::Date)
    }

    pub fn datetime() -> Self {
        Self::new(FieldType::Datetime)
    }

    pub fn foreign_key(to: impl Into<ModelRef>) -> Self {
        Self::new(FieldType::ForeignKey { to: to.into() })
    }

    pub fn many_to_many(to: impl Into<ModelRef>) -> Self {
        Self::new(FieldType::ManyToMany { to: to.into() })
    }

    pub fn custom(column_type: impl Into<String>) -> Self {
        Self::new(FieldType::Custom {
            column_type: column_type.into(),
        })
    }

    /// Marks a scalar column `NOT NULL` and rejects `NULL` values.
    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    /// Binds the column name, consuming the field.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.set_name(name);
        self
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = Some(name.into());
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn field_type(&self) -> &FieldType {
        &self.field_type
    }

    pub fn is_nullable(&self) -> bool {
        self.nullable
    }

    pub fn is_primary_key(&self) -> bool {
        matches!(self.field_type, FieldType::PrimaryKey)
    }

    /// Whether the field is stored as a column on its own table.
    pub fn has_column(&self) -> bool {
        !matches!(self.field_type, FieldType::ManyToMany { .. })
    }

    /// Full SQL column type, including an explicit `NOT NULL` on scalars.
    pub fn column_type(&self) -> Option<String> {
        let base = self.field_type.column_type()?;
        if !self.nullable && self.field_type.is_scalar() {
            Some(format!("{base} NOT NULL"))
        } else {
            Some(base)
        }
    }

    /// Column definition for `CREATE TABLE`: `"<name> <column_type>"`.
    ///
    /// # Errors
    ///
    /// [`FieldError::Unbound`] when no name is bound, [`FieldError::NoColumn`]
    /// for many-to-many fields.
    pub fn create_sql(&self) -> Result<String> {
        let name = self.name.as_deref().ok_or(FieldError::Unbound)?;
        let column_type = self.column_type().ok_or_else(|| FieldError::NoColumn {
            field: name.to_string(),
        })?;
        Ok(format!("{name} {column_type}"))
    }

    /// Renders `value` as an inline SQL literal.
    ///
    /// Numbers are bare, text and temporal values are single-quoted with
    /// embedded quotes doubled, and `NULL` is only produced for nullable
    /// fields. The value is validated first, exactly as
    /// [`serialize`](Self::serialize) does.
    pub fn sql_format(&self, value: &Value) -> Result<String> {
        Ok(literal(self.serialize(value)?))
    }

    /// Converts a runtime value into its storage form for parameter binding.
    ///
    /// # Examples
    ///
    /// ```
    /// use chrono::NaiveDate;
    /// use ormlet_core::{Field, Value};
    ///
    /// let date = NaiveDate::from_ymd_opt(2017, 7, 7).unwrap();
    /// assert_eq!(
    ///     Field::date().serialize(&Value::Date(date)).unwrap(),
    ///     Value::Text("2017-07-07".into())
    /// );
    /// assert_eq!(Field::float().serialize(&Value::Float(20.5)).unwrap(), Value::Float(20.5));
    /// ```
    pub fn serialize(&self, value: &Value) -> Result<Value> {
        if value.is_null() {
            return match self.field_type {
                FieldType::ManyToMany { .. } => Err(self.no_column()),
                _ if self.nullable => Ok(Value::Null),
                _ => Err(FieldError::NullNotAllowed {
                    field: self.label(),
                }),
            };
        }

        match (&self.field_type, value) {
            (FieldType::PrimaryKey | FieldType::Integer | FieldType::ForeignKey { .. }, Value::Integer(i)) => {
                Ok(Value::Integer(*i))
            }
            (FieldType::Float, Value::Float(f)) => self.finite(*f),
            (FieldType::Float, Value::Integer(i)) => Ok(Value::Float(*i as f64)),
            (FieldType::Char { max_length } | FieldType::Varchar { max_length }, Value::Text(s)) => {
                self.check_length(s, *max_length)?;
                Ok(Value::Text(s.clone()))
            }
            (FieldType::Email { max_length }, Value::Text(s)) => {
                self.check_length(s, *max_length)?;
                if !is_valid_email(s) {
                    return Err(FieldError::InvalidEmail {
                        field: self.label(),
                        value: s.clone(),
                    });
                }
                Ok(Value::Text(s.clone()))
            }
            (FieldType::Text, Value::Text(s)) => Ok(Value::Text(s.clone())),
            (FieldType::Date, Value::Date(d)) => Ok(Value::Text(d.format(DATE_FORMAT).to_string())),
            (FieldType::Datetime, Value::DateTime(dt)) => {
                Ok(Value::Text(dt.format(DATETIME_FORMAT).to_string()))
            }
            (FieldType::ManyToMany { .. }, _) => Err(self.no_column()),
            (FieldType::Custom { .. }, Value::Float(f)) => self.finite(*f),
            (FieldType::Custom { .. }, Value::Date(d)) => {
                Ok(Value::Text(d.format(DATE_FORMAT).to_string()))
            }
            (FieldType::Custom { .. }, Value::DateTime(dt)) => {
                Ok(Value::Text(dt.format(DATETIME_FORMAT).to_string()))
            }
            (FieldType::Custom { .. }, other) => Ok(other.clone()),
            (field_type, other) => Err(FieldError::TypeMismatch {
                field: self.label(),
                expected: expected_kind(field_type),
                found: other.kind(),
            }),
        }
    }

    /// Converts a raw column value read from storage back into a runtime value.
    pub fn deserialize(&self, raw: Value) -> Result<Value> {
        if raw.is_null() {
            return match self.field_type {
                FieldType::ManyToMany { .. } => Err(self.no_column()),
                _ => Ok(Value::Null),
            };
        }

        match (&self.field_type, raw) {
            (FieldType::PrimaryKey | FieldType::Integer | FieldType::ForeignKey { .. }, Value::Integer(i)) => {
                Ok(Value::Integer(i))
            }
            (FieldType::Float, Value::Float(f)) => Ok(Value::Float(f)),
            (FieldType::Float, Value::Integer(i)) => Ok(Value::Float(i as f64)),
            (
                FieldType::Char { .. }
                | FieldType::Varchar { .. }
                | FieldType::Email { .. }
                | FieldType::Text,
                Value::Text(s),
            ) => Ok(Value::Text(s)),
            (FieldType::Date, Value::Text(s)) => NaiveDate::parse_from_str(&s, DATE_FORMAT)
                .map(Value::Date)
                .map_err(|e| self.decode(format!("{s:?} is not a date: {e}"))),
            (FieldType::Date, Value::Date(d)) => Ok(Value::Date(d)),
            (FieldType::Datetime, Value::Text(s)) => {
                NaiveDateTime::parse_from_str(&s, DATETIME_FORMAT)
                    .map(Value::DateTime)
                    .map_err(|e| self.decode(format!("{s:?} is not a datetime: {e}")))
            }
            (FieldType::Datetime, Value::DateTime(dt)) => Ok(Value::DateTime(dt)),
            (FieldType::ManyToMany { .. }, _) => Err(self.no_column()),
            (FieldType::Custom { .. }, other) => Ok(other),
            (field_type, other) => Err(self.decode(format!(
                "expected {}, found {}",
                expected_kind(field_type),
                other.kind()
            ))),
        }
    }

    /// Name used in error messages.
    fn label(&self) -> String {
        self.name.clone().unwrap_or_else(|| "<unbound>".to_string())
    }

    fn check_length(&self, value: &str, max_length: usize) -> Result<()> {
        let length = value.chars().count();
        if length > max_length {
            return Err(FieldError::LengthExceeded {
                field: self.label(),
                max_length,
                length,
            });
        }
        Ok(())
    }

    fn finite(&self, value: f64) -> Result<Value> {
        if value.is_finite() {
            Ok(Value::Float(value))
        } else {
            Err(FieldError::NonFinite {
                field: self.label(),
                value: value.to_string(),
            })
        }
    }

    fn no_column(&self) -> FieldError {
        FieldError::NoColumn {
            field: self.label(),
        }
    }

    fn decode(&self, reason: String) -> FieldError {
        FieldError::Decode {
            field: self.label(),
            reason,
        }
    }
}

fn expected_kind(field_type: &FieldType) -> &'static str {
    match field_type {
        FieldType::PrimaryKey | FieldType::Integer | FieldType::ForeignKey { .. } => "integer",
        FieldType::Float => "float",
        FieldType::Char { .. }
        | FieldType::Varchar { .. }
        | FieldType::Text
        | FieldType::Email { .. } => "text",
        FieldType::Date => "date",
        FieldType::Datetime => "datetime",
        FieldType::ManyToMany { .. } => "related record",
        FieldType::Custom { .. } => "any value",
    }
}

/// Renders a storage value as a SQL literal.
fn literal(value: Value) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        Value::Integer(i) => i.to_string(),
        Value::Float(f) => format!("{f:?}"),
        Value::Text(s) => quote(&s),
        Value::Date(d) => quote(&d.format(DATE_FORMAT).to_string()),
        Value::DateTime(dt) => quote(&dt.format(DATETIME_FORMAT).to_string()),
    }
}

/// Wraps text in single quotes, doubling any embedded quote.
fn quote(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('\'');
    for c in text.chars() {
        if c == '\'' {
            out.push('\'');
        }
        out.push(c);
    }
    out.push('\'');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ModelSchema;

    fn named(field: Field, name: &str) -> Field {
        field.with_name(name)
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2017, 7, 7).unwrap()
    }

    #[test]
    fn test_custom_field_create_sql() {
        let field = named(Field::custom("COLUMN_TYPE"), "COLUMN_NAME");
        assert_eq!(field.create_sql().unwrap(), "COLUMN_NAME COLUMN_TYPE");
    }

    #[test]
    fn test_custom_field_passes_text_through() {
        let field = Field::custom("BLOB");
        assert_eq!(
            field.serialize(&Value::from("test")).unwrap(),
            Value::Text("test".into())
        );
    }

    #[test]
    fn test_unbound_field_cannot_render() {
        assert_eq!(Field::integer().create_sql(), Err(FieldError::Unbound));
    }

    #[test]
    fn test_create_sql_is_name_and_column_type() {
        let fields = [
            (Field::integer(), "INTEGER"),
            (Field::float(), "DOUBLE"),
            (Field::char(4), "CHAR(4)"),
            (Field::varchar(4), "VARCHAR(4)"),
            (Field::text(), "TEXT"),
            (Field::email(200), "VARCHAR(200)"),
            (Field::date(), "DATE"),
            (Field::datetime(), "DATETIME"),
        ];
        for (field, column_type) in fields {
            let field = named(field, "col");
            assert_eq!(field.create_sql().unwrap(), format!("col {column_type}"));
            assert_eq!(field.column_type().unwrap(), column_type);
        }
    }

    #[test]
    fn test_not_null_extends_column_type() {
        let field = named(Field::text().not_null(), "body");
        assert_eq!(field.create_sql().unwrap(), "body TEXT NOT NULL");
        assert!(matches!(
            field.sql_format(&Value::Null),
            Err(FieldError::NullNotAllowed { .. })
        ));
    }

    #[test]
    fn test_primary_key_create_sql() {
        let mut pk = Field::primary_key();
        pk.set_name("test");
        assert_eq!(pk.create_sql().unwrap(), "test INTEGER NOT NULL PRIMARY KEY");
        assert!(!pk.is_nullable());
    }

    #[test]
    fn test_integer_sql_format_is_unquoted() {
        let field = Field::integer();
        assert_eq!(field.sql_format(&Value::Integer(20)).unwrap(), "20");
        assert_eq!(field.serialize(&Value::Integer(20)).unwrap(), Value::Integer(20));
    }

    #[test]
    fn test_integer_rejects_text() {
        let field = named(Field::integer(), "votes");
        assert_eq!(
            field.sql_format(&Value::from("20")),
            Err(FieldError::TypeMismatch {
                field: "votes".into(),
                expected: "integer",
                found: "text",
            })
        );
    }

    #[test]
    fn test_float_format_and_serialize() {
        let field = Field::float();
        assert_eq!(field.sql_format(&Value::Float(20.6)).unwrap(), "20.6");
        assert_eq!(field.sql_format(&Value::Integer(20)).unwrap(), "20.0");
        assert_eq!(field.serialize(&Value::Float(20.5)).unwrap(), Value::Float(20.5));
        assert!(matches!(
            field.serialize(&Value::Float(f64::NAN)),
            Err(FieldError::NonFinite { .. })
        ));
    }

    #[test]
    fn test_char_length_boundary() {
        let field = Field::char(4);
        assert_eq!(field.sql_format(&Value::from("test")).unwrap(), "'test'");
        let err = field.sql_format(&Value::from("test_ex")).unwrap_err();
        assert!(err.to_string().starts_with("maximum length exceeded"));
        assert!(field.sql_format(&Value::from("tests")).is_err());
    }

    #[test]
    fn test_varchar_shares_length_error() {
        let field = named(Field::varchar(4), "code");
        assert_eq!(field.sql_format(&Value::from("test")).unwrap(), "'test'");
        assert_eq!(
            field.sql_format(&Value::from("test_ex")),
            Err(FieldError::LengthExceeded {
                field: "code".into(),
                max_length: 4,
                length: 7,
            })
        );
    }

    #[test]
    fn test_length_counts_characters_not_bytes() {
        let field = Field::char(4);
        assert!(field.sql_format(&Value::from("çğüş")).is_ok());
    }

    #[test]
    fn test_text_quotes_and_escapes() {
        let field = Field::text();
        assert_eq!(field.sql_format(&Value::from("test")).unwrap(), "'test'");
        assert_eq!(
            field.sql_format(&Value::from("it's'; DROP TABLE x; --")).unwrap(),
            "'it''s''; DROP TABLE x; --'"
        );
    }

    #[test]
    fn test_email_validation() {
        let field = named(Field::email(200), "email");
        assert_eq!(
            field.sql_format(&Value::from("mgurdal@protonmail.com")).unwrap(),
            "'mgurdal@protonmail.com'"
        );
        assert!(matches!(
            field.sql_format(&Value::from("mgurdal.protonmail.com")),
            Err(FieldError::InvalidEmail { .. })
        ));
        assert!(matches!(
            field.serialize(&Value::from("mgurdal@-protonmail.com")),
            Err(FieldError::InvalidEmail { .. })
        ));
        assert!(matches!(
            Field::email(5).serialize(&Value::from("a@b.co")),
            Err(FieldError::LengthExceeded { .. })
        ));
    }

    #[test]
    fn test_datetime_format_and_serialize() {
        let field = Field::datetime();
        let dt = date().and_hms_opt(0, 0, 0).unwrap();
        assert_eq!(
            field.sql_format(&Value::DateTime(dt)).unwrap(),
            "'2017-07-07 00:00:00'"
        );
        assert_eq!(
            field.serialize(&Value::DateTime(dt)).unwrap(),
            Value::Text("2017-07-07 00:00:00".into())
        );
    }

    #[test]
    fn test_date_format_and_serialize() {
        let field = Field::date();
        assert_eq!(field.sql_format(&Value::Date(date())).unwrap(), "'2017-07-07'");
        assert_eq!(
            field.serialize(&Value::Date(date())).unwrap(),
            Value::Text("2017-07-07".into())
        );
    }

    #[test]
    fn test_temporal_fields_reject_strings_and_other_kinds() {
        assert!(matches!(
            Field::date().sql_format(&Value::from("2017-07-07")),
            Err(FieldError::TypeMismatch { .. })
        ));
        let dt = date().and_hms_opt(1, 2, 3).unwrap();
        assert!(matches!(
            Field::date().sql_format(&Value::DateTime(dt)),
            Err(FieldError::TypeMismatch { .. })
        ));
        assert!(matches!(
            Field::datetime().sql_format(&Value::Date(date())),
            Err(FieldError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_deserialize_restores_temporal_values() {
        let dt = date().and_hms_opt(13, 45, 9).unwrap();
        assert_eq!(
            Field::datetime()
                .deserialize(Value::Text("2017-07-07 13:45:09".into()))
                .unwrap(),
            Value::DateTime(dt)
        );
        assert_eq!(
            Field::date().deserialize(Value::Text("2017-07-07".into())).unwrap(),
            Value::Date(date())
        );
        assert!(matches!(
            Field::date().deserialize(Value::Text("July 7th".into())),
            Err(FieldError::Decode { .. })
        ));
    }

    #[test]
    fn test_foreign_key_create_sql_and_format() {
        let target = ModelRef::from(ModelSchema::builder("test_table").build());
        let fk = named(Field::foreign_key(&target), "test_fk");
        assert_eq!(
            fk.create_sql().unwrap(),
            "test_fk INTEGER NOT NULL REFERENCES test_table (id)"
        );
        assert_eq!(fk.sql_format(&Value::Integer(1)).unwrap(), "1");

        let mut instance = crate::Record::new(target);
        assert!(matches!(
            fk.sql_format(&Value::from(&instance)),
            Err(FieldError::NullNotAllowed { .. })
        ));
        instance.set_id(1);
        assert_eq!(fk.sql_format(&Value::from(&instance)).unwrap(), "1");
        assert_eq!(fk.serialize(&Value::from(&instance)).unwrap(), Value::Integer(1));
        assert!(matches!(
            fk.sql_format(&Value::Null),
            Err(FieldError::NullNotAllowed { .. })
        ));
    }

    #[test]
    fn test_many_to_many_has_no_column() {
        let target = ModelSchema::builder("tag").build();
        let field = named(Field::many_to_many(target), "tags");
        assert!(!field.has_column());
        assert!(matches!(field.create_sql(), Err(FieldError::NoColumn { .. })));
        assert!(matches!(
            field.sql_format(&Value::Integer(1)),
            Err(FieldError::NoColumn { .. })
        ));
    }

    #[test]
    fn test_rendering_is_idempotent() {
        let field = named(Field::varchar(10), "name");
        let value = Value::from("O'Brien");
        assert_eq!(field.create_sql(), field.create_sql());
        assert_eq!(field.sql_format(&value), field.sql_format(&value));
    }
}
