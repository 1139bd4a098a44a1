//! Lazy, restartable `SELECT` queries.
//!
//! A [`Query`] only records what to select. Every call to [`Query::all`],
//! [`Query::first`] or [`Query::count`] composes fresh SQL and runs it, so the
//! same query observes every change made to the store in between.
//!
//! # Example
//!
//! ```
//! use ormlet_core::{Field, ModelSchema, Record};
//! use ormlet_sqlite::Database;
//!
//! let db = Database::open_in_memory().unwrap();
//! let person = ModelSchema::builder("person").field("name", Field::varchar(40)).build();
//! db.create_table(&person).unwrap();
//!
//! let model = ormlet_core::ModelRef::from(person);
//! let mut ada = Record::new(model.clone()).with("name", "Ada").unwrap();
//! db.save(&mut ada).unwrap();
//!
//! let query = db.select(&model).filter("name", "Ada").unwrap();
//! assert_eq!(query.to_sql(), "SELECT id, name FROM person WHERE name = 'Ada' ORDER BY id");
//! assert_eq!(query.count().unwrap(), 1);
//! ```

use ormlet_core::{FieldError, ModelRef, Record, Value};

use crate::database::Database;
use crate::driver::Driver;
use crate::error::{Result, SqliteError};

/// A rendered `WHERE` condition.
#[derive(Debug, Clone)]
enum Predicate {
    /// `<column> = <literal>`, or `<column> IS NULL`.
    Equals { column: String, literal: Option<String> },
    /// `<column> IN (<subquery>)`, used by relation handles.
    In { column: String, subquery: String },
}

impl Predicate {
    fn render(&self) -> String {
        match self {
            Predicate::Equals {
                column,
                literal: Some(literal),
            } => format!("{column} = {literal}"),
            Predicate::Equals {
                column,
                literal: None,
            } => format!("{column} IS NULL"),
            Predicate::In { column, subquery } => format!("{column} IN ({subquery})"),
        }
    }
}

/// A selection of records of one model.
///
/// Predicates are AND-combined. Results are ordered by primary key.
#[derive(Debug)]
pub struct Query<'db, D: Driver> {
    db: &'db Database<D>,
    model: ModelRef,
    predicates: Vec<Predicate>,
    limit: Option<usize>,
}

impl<D: Driver> Clone for Query<'_, D> {
    fn clone(&self) -> Self {
        Self {
            db: self.db,
            model: self.model.clone(),
            predicates: self.predicates.clone(),
            limit: self.limit,
        }
    }
}

impl<'db, D: Driver> Query<'db, D> {
    pub(crate) fn new(db: &'db Database<D>, model: ModelRef) -> Self {
        Self {
            db,
            model,
            predicates: Vec::new(),
            limit: None,
        }
    }

    /// Restricts the selection to rows whose `field` equals `value`.
    ///
    /// The value is validated and rendered by the field's
    /// [`sql_format`](ormlet_core::Field::sql_format); a `NULL` value matches
    /// rows where the column is unset.
    ///
    /// # Errors
    ///
    /// [`FieldError::UnknownField`] if the model has no such field,
    /// [`FieldError::NoColumn`] for many-to-many fields, or any validation
    /// error of the value.
    pub fn filter(mut self, field: &str, value: impl Into<Value>) -> Result<Self> {
        let schema = self.model.resolve();
        let descriptor = schema.field(field).ok_or_else(|| FieldError::UnknownField {
            table: schema.table_name().to_string(),
            field: field.to_string(),
        })?;
        if !descriptor.has_column() {
            return Err(FieldError::NoColumn {
                field: field.to_string(),
            }
            .into());
        }

        let value = value.into();
        let literal = if value.is_null() {
            None
        } else {
            Some(descriptor.sql_format(&value)?)
        };
        self.predicates.push(Predicate::Equals {
            column: field.to_string(),
            literal,
        });
        Ok(self)
    }

    pub(crate) fn filter_in(mut self, column: impl Into<String>, subquery: String) -> Self {
        self.predicates.push(Predicate::In {
            column: column.into(),
            subquery,
        });
        self
    }

    /// Returns at most `n` records.
    pub fn limit(mut self, n: usize) -> Self {
        self.limit = Some(n);
        self
    }

    pub fn model(&self) -> &ModelRef {
        &self.model
    }

    /// The `SELECT` statement [`all`](Self::all) would run.
    pub fn to_sql(&self) -> String {
        self.render(self.limit)
    }

    /// Runs the query and decodes every row.
    pub fn all(&self) -> Result<Vec<Record>> {
        self.fetch(&self.to_sql())
    }

    /// The first record by primary key, if any.
    pub fn first(&self) -> Result<Option<Record>> {
        let limit = self.limit.map_or(1, |n| n.min(1));
        Ok(self.fetch(&self.render(Some(limit)))?.into_iter().next())
    }

    /// Number of matching records, honoring the limit.
    pub fn count(&self) -> Result<usize> {
        let schema = self.model.resolve();
        let sql = match self.limit {
            Some(_) => format!("SELECT COUNT(*) FROM ({})", self.to_sql()),
            None => format!(
                "SELECT COUNT(*) FROM {}{}",
                schema.table_name(),
                self.where_clause()
            ),
        };
        let rows = self.db.driver().query(&sql, &[])?;
        let count = rows
            .first()
            .and_then(|row| row.first())
            .and_then(Value::as_i64)
            .unwrap_or(0);
        Ok(usize::try_from(count).unwrap_or(0))
    }

    fn fetch(&self, sql: &str) -> Result<Vec<Record>> {
        self.db
            .driver()
            .query(sql, &[])?
            .into_iter()
            .map(|row| Record::from_storage(self.model.clone(), row).map_err(SqliteError::from))
            .collect()
    }

    fn render(&self, limit: Option<usize>) -> String {
        let schema = self.model.resolve();
        let mut sql = format!(
            "SELECT {} FROM {}{} ORDER BY {}",
            schema.column_names().join(", "),
            schema.table_name(),
            self.where_clause(),
            schema.primary_key_name()
        );
        if let Some(n) = limit {
            sql.push_str(&format!(" LIMIT {n}"));
        }
        sql
    }

    fn where_clause(&self) -> String {
        if self.predicates.is_empty() {
            return String::new();
        }
        let conditions: Vec<String> = self.predicates.iter().map(Predicate::render).collect();
        format!(" WHERE {}", conditions.join(" AND "))
    }
}

#[cfg(test)]
mod tests {
    use ormlet_core::{Field, ModelSchema};

    use super::*;

    fn entry() -> ModelRef {
        ModelSchema::builder("entry")
            .field("title", Field::varchar(10))
            .field("rating", Field::float())
            .field("related", Field::many_to_many(ModelSchema::builder("tag").build()))
            .build()
            .into()
    }

    #[test]
    fn test_predicates_are_and_combined() {
        let db = Database::open_in_memory().unwrap();
        let query = db
            .select(entry())
            .filter("title", "it's")
            .unwrap()
            .filter("rating", 20.0)
            .unwrap()
            .limit(5);
        assert_eq!(
            query.to_sql(),
            "SELECT id, title, rating FROM entry WHERE title = 'it''s' AND rating = 20.0 \
             ORDER BY id LIMIT 5"
        );
    }

    #[test]
    fn test_null_filter_renders_is_null() {
        let db = Database::open_in_memory().unwrap();
        let query = db.select(entry()).filter("rating", Value::Null).unwrap();
        assert_eq!(
            query.to_sql(),
            "SELECT id, title, rating FROM entry WHERE rating IS NULL ORDER BY id"
        );
    }

    #[test]
    fn test_filter_rejects_bad_fields_and_values() {
        let db = Database::open_in_memory().unwrap();
        assert!(matches!(
            db.select(entry()).filter("missing", 1),
            Err(SqliteError::ValidationError(FieldError::UnknownField { .. }))
        ));
        assert!(matches!(
            db.select(entry()).filter("related", 1),
            Err(SqliteError::ValidationError(FieldError::NoColumn { .. }))
        ));
        assert!(matches!(
            db.select(entry()).filter("title", "far too long"),
            Err(SqliteError::ValidationError(FieldError::LengthExceeded { .. }))
        ));
    }

    #[test]
    fn test_subquery_predicate() {
        let db = Database::open_in_memory().unwrap();
        let query = db
            .select(entry())
            .filter_in("id", "SELECT entry_id FROM x WHERE y = 1".to_string());
        assert_eq!(
            query.to_sql(),
            "SELECT id, title, rating FROM entry WHERE id IN (SELECT entry_id FROM x WHERE y = 1) \
             ORDER BY id"
        );
    }
}
