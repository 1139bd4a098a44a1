//! Rows of a model.

use std::collections::HashMap;

use crate::error::{FieldError, Result};
use crate::field::Field;
use crate::model::{ModelRef, ModelSchema};
use crate::value::Value;

static NULL: Value = Value::Null;

/// One row of one model.
///
/// Attribute values are typed runtime [`Value`]s; unset attributes read as
/// `NULL`. Values are only validated when the record is written or a field
/// formats them, never on assignment.
///
/// # Examples
///
/// ```
/// use ormlet_core::{Field, ModelSchema, Record, Value};
///
/// let schema = ModelSchema::builder("person").field("name", Field::varchar(40)).build();
/// let mut person = Record::new(schema.into());
/// person.set("name", "Ada").unwrap();
/// assert_eq!(person.value("name"), &Value::from("Ada"));
/// assert_eq!(person.id(), None);
/// assert!(person.set("nickname", "A").is_err());
/// ```
#[derive(Debug, Clone)]
pub struct Record {
    model: ModelRef,
    values: HashMap<String, Value>,
}

impl Record {
    pub fn new(model: ModelRef) -> Self {
        Self {
            model,
            values: HashMap::new(),
        }
    }

    /// Rebuilds a record from a raw storage row laid out in column order.
    ///
    /// # Errors
    ///
    /// [`FieldError::Decode`] if a column value cannot be converted back, or
    /// if the row length does not match the model's column count.
    pub fn from_storage(model: ModelRef, row: Vec<Value>) -> Result<Self> {
        let schema = model.resolve();
        let columns: Vec<&Field> = schema.columns().collect();
        if columns.len() != row.len() {
            return Err(FieldError::Decode {
                field: schema.table_name().to_string(),
                reason: format!("expected {} columns, got {}", columns.len(), row.len()),
            });
        }

        let mut values = HashMap::with_capacity(row.len());
        for (field, raw) in columns.into_iter().zip(row) {
            let name = field.name().unwrap_or_default().to_string();
            values.insert(name, field.deserialize(raw)?);
        }

        Ok(Self { model, values })
    }

    pub fn model(&self) -> &ModelRef {
        &self.model
    }

    pub fn schema(&self) -> &ModelSchema {
        self.model.resolve()
    }

    /// Assigns an attribute.
    ///
    /// # Errors
    ///
    /// [`FieldError::UnknownField`] if the model has no such field,
    /// [`FieldError::NoColumn`] for many-to-many fields, which are managed
    /// through their join table instead.
    pub fn set(&mut self, field: &str, value: impl Into<Value>) -> Result<&mut Self> {
        let descriptor = self.column(field)?;
        if !descriptor.has_column() {
            return Err(FieldError::NoColumn {
                field: field.to_string(),
            });
        }
        self.values.insert(field.to_string(), value.into());
        Ok(self)
    }

    /// Builder form of [`set`](Self::set).
    pub fn with(mut self, field: &str, value: impl Into<Value>) -> Result<Self> {
        self.set(field, value)?;
        Ok(self)
    }

    /// The assigned value, or `None` when the attribute was never set.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.values.get(field)
    }

    /// The attribute value, `NULL` when unset.
    pub fn value(&self, field: &str) -> &Value {
        self.values.get(field).unwrap_or(&NULL)
    }

    /// Primary key, if one has been assigned.
    pub fn id(&self) -> Option<i64> {
        let pk = self.schema().primary_key_name();
        self.values.get(pk).and_then(Value::as_i64)
    }

    /// Stores a key assigned by the store.
    pub fn set_id(&mut self, id: i64) {
        let pk = self.schema().primary_key_name().to_string();
        self.values.insert(pk, Value::Integer(id));
    }

    /// Column fields paired with their current values, in column order.
    pub fn columns(&self) -> impl Iterator<Item = (&Field, &Value)> {
        self.schema()
            .columns()
            .map(|field| (field, self.value(field.name().unwrap_or_default())))
    }

    fn column(&self, field: &str) -> Result<&Field> {
        self.schema()
            .field(field)
            .ok_or_else(|| FieldError::UnknownField {
                table: self.schema().table_name().to_string(),
                field: field.to_string(),
            })
    }
}
