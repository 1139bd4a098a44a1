//! Model persistence on top of a [`Driver`].
//!
//! [`Database`] turns schemas into DDL and records into `INSERT`, `UPDATE` and
//! `DELETE` statements. Every value is serialized through its field before any
//! SQL is composed, so a validation failure never leaves a partial write.

use std::path::Path;

use ormlet_core::{
    FieldError, FieldType, JoinTable, ModelRef, ModelSchema, Record, Value, validate_schema,
};
use tracing::{debug, info};

use crate::driver::{Driver, SqliteDriver};
use crate::error::{Result, SqliteError};
use crate::query::Query;
use crate::relation::{ManyToMany, ManyToManyReverse, ReverseSet};

/// Entry point for creating tables and reading and writing records.
///
/// # Examples
///
/// ```
/// use ormlet_core::{Field, ModelSchema, Record};
/// use ormlet_sqlite::Database;
///
/// let db = Database::open_in_memory().unwrap();
/// let author = ModelSchema::builder("author")
///     .field("name", Field::varchar(40).not_null())
///     .build();
/// db.create_table(&author).unwrap();
///
/// let mut ada = Record::new(author.into()).with("name", "Ada").unwrap();
/// db.save(&mut ada).unwrap();
/// assert_eq!(ada.id(), Some(1));
///
/// ada.set("name", "Ada Lovelace").unwrap();
/// db.save(&mut ada).unwrap();
/// assert_eq!(db.delete(&ada).unwrap(), 1);
/// ```
#[derive(Debug)]
pub struct Database<D: Driver = SqliteDriver> {
    driver: D,
}

impl Database<SqliteDriver> {
    /// Opens (or creates) a SQLite database file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self::new(SqliteDriver::open(path)?))
    }

    pub fn open_in_memory() -> Result<Self> {
        Ok(Self::new(SqliteDriver::open_in_memory()?))
    }
}

impl<D: Driver> Database<D> {
    pub fn new(driver: D) -> Self {
        Self { driver }
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    /// Creates the model's table, then one join table per many-to-many field.
    ///
    /// Referenced tables must exist already. An existing table is reported by
    /// the store as an error; use [`table_exists`](Self::table_exists) to make
    /// setup idempotent.
    ///
    /// # Errors
    ///
    /// [`SqliteError::InvalidSchema`] listing every structural problem, before
    /// any SQL runs.
    pub fn create_table(&self, schema: &ModelSchema) -> Result<()> {
        let errors = validate_schema(schema);
        if !errors.is_empty() {
            return Err(SqliteError::InvalidSchema {
                table: schema.table_name().to_string(),
                errors,
            });
        }

        for sql in schema.create_table_sql()? {
            self.driver.execute(&sql, &[])?;
        }
        info!(table = schema.table_name(), "created table");
        Ok(())
    }

    /// Drops the model's join tables, then its table.
    pub fn drop_table(&self, schema: &ModelSchema) -> Result<()> {
        for sql in schema.drop_table_sql() {
            self.driver.execute(&sql, &[])?;
        }
        info!(table = schema.table_name(), "dropped table");
        Ok(())
    }

    pub fn table_exists(&self, table: &str) -> Result<bool> {
        self.driver.table_exists(table)
    }

    /// Writes a record.
    ///
    /// A record without a primary key is inserted and receives the key the
    /// store assigns. A record with a key updates that row.
    pub fn save(&self, record: &mut Record) -> Result<()> {
        match record.id() {
            None => self.insert_row(record, false),
            Some(id) => self.update_row(record, id),
        }
    }

    /// Inserts a record, including its primary key when one is assigned.
    pub fn insert(&self, record: &mut Record) -> Result<()> {
        self.insert_row(record, true)
    }

    /// Deletes the record's row and returns the number of rows removed.
    ///
    /// Join rows referencing the record are not touched.
    ///
    /// # Errors
    ///
    /// [`SqliteError::MissingPrimaryKey`] if the record was never saved.
    pub fn delete(&self, record: &Record) -> Result<usize> {
        let schema = record.schema();
        let id = require_id(record)?;
        let sql = format!(
            "DELETE FROM {} WHERE {} = ?1",
            schema.table_name(),
            schema.primary_key_name()
        );
        self.driver.execute(&sql, &[Value::Integer(id)])
    }

    /// Starts a query over every record of `model`.
    pub fn select(&self, model: impl Into<ModelRef>) -> Query<'_, D> {
        Query::new(self, model.into())
    }

    /// Records of `owner` whose foreign key `field` points at `target`.
    ///
    /// # Errors
    ///
    /// [`SqliteError::NotARelation`] if `field` is not a foreign key,
    /// [`SqliteError::WrongModel`] if it references another model than
    /// `target`'s, [`SqliteError::MissingPrimaryKey`] if `target` is unsaved.
    pub fn reverse(
        &self,
        target: &Record,
        owner: impl Into<ModelRef>,
        field: &str,
    ) -> Result<ReverseSet<'_, D>> {
        let owner = owner.into();
        let to = relation_target(&owner, field, "foreign_key")?;
        check_model(&to, target)?;
        let id = require_id(target)?;
        let query = self.select(owner).filter(field, id)?;
        Ok(ReverseSet::new(query))
    }

    /// The join-table handle of `record`'s many-to-many field `field`.
    ///
    /// # Errors
    ///
    /// [`SqliteError::NotARelation`] if `field` is not many-to-many,
    /// [`SqliteError::MissingPrimaryKey`] if `record` is unsaved.
    pub fn many_to_many(&self, record: &Record, field: &str) -> Result<ManyToMany<'_, D>> {
        let owner = record.model().clone();
        let target = relation_target(&owner, field, "many_to_many")?;
        let owner_id = require_id(record)?;
        let join = join_table(&owner, field)?;
        Ok(ManyToMany::new(self, join, owner_id, target))
    }

    /// Records of `owner` linked to `target` through the many-to-many field
    /// `field`, read from the target side.
    pub fn many_to_many_reverse(
        &self,
        target: &Record,
        owner: impl Into<ModelRef>,
        field: &str,
    ) -> Result<ManyToManyReverse<'_, D>> {
        let owner = owner.into();
        let to = relation_target(&owner, field, "many_to_many")?;
        check_model(&to, target)?;
        let target_id = require_id(target)?;
        let join = join_table(&owner, field)?;
        Ok(ManyToManyReverse::new(self, owner, join, target_id))
    }

    fn insert_row(&self, record: &mut Record, with_key: bool) -> Result<()> {
        let model = record.model().clone();
        let schema = model.resolve();

        let mut columns = Vec::new();
        let mut params = Vec::new();
        for field in schema.columns() {
            let name = field.name().unwrap_or_default();
            let value = record.value(name);
            if field.is_primary_key() && (!with_key || value.is_null()) {
                continue;
            }
            params.push(field.serialize(value)?);
            columns.push(name);
        }

        let sql = if columns.is_empty() {
            format!("INSERT INTO {} DEFAULT VALUES", schema.table_name())
        } else {
            format!(
                "INSERT INTO {} ({}) VALUES ({})",
                schema.table_name(),
                columns.join(", "),
                placeholders(columns.len())
            )
        };
        self.driver.execute(&sql, &params)?;

        if record.id().is_none() {
            record.set_id(self.driver.last_insert_id());
        }
        Ok(())
    }

    fn update_row(&self, record: &Record, id: i64) -> Result<()> {
        let schema = record.schema();

        let mut assignments = Vec::new();
        let mut params = Vec::new();
        for field in schema.columns().filter(|f| !f.is_primary_key()) {
            let name = field.name().unwrap_or_default();
            params.push(field.serialize(record.value(name))?);
            assignments.push(format!("{name} = ?{}", params.len()));
        }
        if assignments.is_empty() {
            return Ok(());
        }

        params.push(Value::Integer(id));
        let sql = format!(
            "UPDATE {} SET {} WHERE {} = ?{}",
            schema.table_name(),
            assignments.join(", "),
            schema.primary_key_name(),
            params.len()
        );
        let affected = self.driver.execute(&sql, &params)?;
        if affected == 0 {
            debug!(table = schema.table_name(), id, "update matched no row");
        }
        Ok(())
    }
}

fn placeholders(count: usize) -> String {
    (1..=count)
        .map(|i| format!("?{i}"))
        .collect::<Vec<_>>()
        .join(", ")
}

fn require_id(record: &Record) -> Result<i64> {
    record.id().ok_or_else(|| SqliteError::MissingPrimaryKey {
        table: record.schema().table_name().to_string(),
    })
}

fn check_model(expected: &ModelRef, record: &Record) -> Result<()> {
    if expected != record.model() {
        return Err(SqliteError::WrongModel {
            expected: expected.table_name().to_string(),
            found: record.model().table_name().to_string(),
        });
    }
    Ok(())
}

/// Target of the relation `field` on `owner`, which must be of kind `expected`.
fn relation_target(owner: &ModelRef, field: &str, expected: &'static str) -> Result<ModelRef> {
    let schema = owner.resolve();
    let descriptor = schema
        .field(field)
        .ok_or_else(|| FieldError::UnknownField {
            table: schema.table_name().to_string(),
            field: field.to_string(),
        })?;
    match descriptor.field_type() {
        FieldType::ForeignKey { to } if expected == "foreign_key" => Ok(to.clone()),
        FieldType::ManyToMany { to } if expected == "many_to_many" => Ok(to.clone()),
        _ => Err(SqliteError::NotARelation {
            table: schema.table_name().to_string(),
            field: field.to_string(),
            expected,
        }),
    }
}

fn join_table(owner: &ModelRef, field: &str) -> Result<JoinTable> {
    let schema = owner.resolve();
    schema
        .join_table(field)
        .ok_or_else(|| SqliteError::NotARelation {
            table: schema.table_name().to_string(),
            field: field.to_string(),
            expected: "many_to_many",
        })
}
