//! Model schemas: explicit, ordered registration of fields on a table.
//!
//! A [`ModelSchema`] is built once with [`ModelSchema::builder`] and is
//! read-only afterwards, so it can be shared freely across threads. Field
//! order is registration order and becomes column order.
//!
//! # Example
//!
//! ```
//! use std::sync::OnceLock;
//! use ormlet_core::{Field, Model, ModelSchema};
//!
//! struct Question;
//!
//! impl Model for Question {
//!     fn schema() -> &'static ModelSchema {
//!         static SCHEMA: OnceLock<ModelSchema> = OnceLock::new();
//!         SCHEMA.get_or_init(|| {
//!             ModelSchema::builder("question")
//!                 .field("id", Field::primary_key())
//!                 .field("question_text", Field::char(200))
//!                 .field("pub_date", Field::datetime())
//!                 .build()
//!         })
//!     }
//! }
//!
//! struct Choice;
//!
//! impl Model for Choice {
//!     fn schema() -> &'static ModelSchema {
//!         static SCHEMA: OnceLock<ModelSchema> = OnceLock::new();
//!         SCHEMA.get_or_init(|| {
//!             ModelSchema::builder("choice")
//!                 .field("question", Field::foreign_key(Question::model_ref()))
//!                 .field("choice_text", Field::char(200))
//!                 .field("votes", Field::integer())
//!                 .build()
//!         })
//!     }
//! }
//!
//! let ddl = Choice::schema().create_table_sql().unwrap();
//! assert_eq!(
//!     ddl[0],
//!     "CREATE TABLE choice (id INTEGER NOT NULL PRIMARY KEY, \
//!      question INTEGER NOT NULL REFERENCES question (id), \
//!      choice_text CHAR(200), votes INTEGER)"
//! );
//! ```

use std::fmt;
use std::sync::Arc;

use crate::error::Result;
use crate::field::{Field, FieldType};
use crate::metadata::{FieldInfo, ModelInfo, RelationInfo, RelationKind};
use crate::record::Record;

/// Column assumed to be the key of a model that registers no primary key.
pub const DEFAULT_PRIMARY_KEY: &str = "id";

/// A handle to a model schema, used by relationship fields and records.
///
/// Resolution happens on use, not on construction, so a foreign key may
/// point at a model whose schema is only initialized later (including the
/// model that declares it).
#[derive(Clone)]
pub enum ModelRef {
    /// Resolved through a static accessor, usually [`Model::schema`].
    Deferred(fn() -> &'static ModelSchema),
    /// An already built schema, e.g. one assembled from a manifest.
    Shared(Arc<ModelSchema>),
}

impl ModelRef {
    /// Refers to the schema of a statically declared model.
    pub fn of<M: Model>() -> Self {
        ModelRef::Deferred(M::schema)
    }

    pub fn resolve(&self) -> &ModelSchema {
        match self {
            ModelRef::Deferred(schema) => schema(),
            ModelRef::Shared(schema) => schema.as_ref(),
        }
    }

    pub fn table_name(&self) -> &str {
        self.resolve().table_name()
    }
}

// Only the table name: printing the whole schema would recurse through
// self-referencing foreign keys.
impl fmt::Debug for ModelRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ModelRef").field(&self.table_name()).finish()
    }
}

/// Two references are equal when they name the same table.
impl PartialEq for ModelRef {
    fn eq(&self, other: &Self) -> bool {
        self.table_name() == other.table_name()
    }
}

impl Eq for ModelRef {}

impl From<ModelSchema> for ModelRef {
    fn from(schema: ModelSchema) -> Self {
        ModelRef::Shared(Arc::new(schema))
    }
}

impl From<Arc<ModelSchema>> for ModelRef {
    fn from(schema: Arc<ModelSchema>) -> Self {
        ModelRef::Shared(schema)
    }
}

impl From<&ModelRef> for ModelRef {
    fn from(model: &ModelRef) -> Self {
        model.clone()
    }
}

/// A statically declared model.
///
/// Implementors return a schema that lives for the whole program, typically
/// from a `OnceLock`. See the [module documentation](self) for an example.
pub trait Model {
    fn schema() -> &'static ModelSchema;

    fn model_ref() -> ModelRef
    where
        Self: Sized,
    {
        ModelRef::Deferred(Self::schema)
    }

    /// An empty row of this model.
    fn record() -> Record
    where
        Self: Sized,
    {
        Record::new(Self::model_ref())
    }
}

/// The join table backing a many-to-many field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinTable {
    /// Table name, `<owner>_<target>`.
    pub name: String,
    pub owner_table: String,
    /// Join column holding the owner's key.
    pub owner_column: String,
    pub owner_key: String,
    pub target_table: String,
    /// Join column holding the target's key.
    pub target_column: String,
    pub target_key: String,
}

impl JoinTable {
    fn new(owner: &ModelSchema, target: &ModelSchema) -> Self {
        let owner_table = owner.table_name().to_string();
        let target_table = target.table_name().to_string();
        let (owner_column, target_column) = if owner_table == target_table {
            (format!("from_{owner_table}_id"), format!("to_{target_table}_id"))
        } else {
            (format!("{owner_table}_id"), format!("{target_table}_id"))
        };
        Self {
            name: format!("{owner_table}_{target_table}"),
            owner_column,
            owner_key: owner.primary_key_name().to_string(),
            target_column,
            target_key: target.primary_key_name().to_string(),
            owner_table,
            target_table,
        }
    }

    pub fn create_sql(&self) -> String {
        format!(
            "CREATE TABLE {name} ({oc} INTEGER NOT NULL REFERENCES {ot} ({ok}), \
             {tc} INTEGER NOT NULL REFERENCES {tt} ({tk}), PRIMARY KEY ({oc}, {tc}))",
            name = self.name,
            oc = self.owner_column,
            ot = self.owner_table,
            ok = self.owner_key,
            tc = self.target_column,
            tt = self.target_table,
            tk = self.target_key,
        )
    }

    pub fn drop_sql(&self) -> String {
        format!("DROP TABLE {}", self.name)
    }
}

/// A table and its ordered fields.
#[derive(Debug, Clone)]
pub struct ModelSchema {
    table: String,
    fields: Vec<Field>,
}

impl ModelSchema {
    pub fn builder(table: impl Into<String>) -> ModelSchemaBuilder {
        ModelSchemaBuilder {
            table: table.into(),
            fields: Vec::new(),
        }
    }

    pub fn table_name(&self) -> &str {
        &self.table
    }

    /// All fields in registration order, relations included.
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name() == Some(name))
    }

    pub fn primary_key(&self) -> Option<&Field> {
        self.fields.iter().find(|f| f.is_primary_key())
    }

    /// Name of the key column, [`DEFAULT_PRIMARY_KEY`] if none is registered.
    pub fn primary_key_name(&self) -> &str {
        self.primary_key()
            .and_then(Field::name)
            .unwrap_or(DEFAULT_PRIMARY_KEY)
    }

    /// Fields stored as columns of this table, in column order.
    pub fn columns(&self) -> impl Iterator<Item = &Field> {
        self.fields.iter().filter(|f| f.has_column())
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns().filter_map(Field::name).collect()
    }

    pub fn many_to_many(&self) -> impl Iterator<Item = &Field> {
        self.fields.iter().filter(|f| !f.has_column())
    }

    /// Join table of the many-to-many field `field`, if it is one.
    pub fn join_table(&self, field: &str) -> Option<JoinTable> {
        match self.field(field)?.field_type() {
            FieldType::ManyToMany { to } => Some(JoinTable::new(self, to.resolve())),
            _ => None,
        }
    }

    pub fn join_tables(&self) -> Vec<JoinTable> {
        self.many_to_many()
            .filter_map(|f| match f.field_type() {
                FieldType::ManyToMany { to } => Some(JoinTable::new(self, to.resolve())),
                _ => None,
            })
            .collect()
    }

    /// `CREATE TABLE` for this model followed by one per join table.
    ///
    /// # Errors
    ///
    /// Propagates [`Field::create_sql`] failures.
    pub fn create_table_sql(&self) -> Result<Vec<String>> {
        let columns = self
            .columns()
            .map(Field::create_sql)
            .collect::<Result<Vec<_>>>()?;

        let mut statements = vec![format!(
            "CREATE TABLE {} ({})",
            self.table,
            columns.join(", ")
        )];
        statements.extend(self.join_tables().iter().map(JoinTable::create_sql));
        Ok(statements)
    }

    /// `DROP TABLE` for every join table, then for this model.
    pub fn drop_table_sql(&self) -> Vec<String> {
        let mut statements: Vec<String> =
            self.join_tables().iter().map(JoinTable::drop_sql).collect();
        statements.push(format!("DROP TABLE {}", self.table));
        statements
    }

    /// Field metadata for building request/response schemas.
    pub fn metadata(&self) -> ModelInfo {
        let fields = self
            .fields
            .iter()
            .map(|field| {
                let name = field.name().unwrap_or_default().to_string();
                let relation = match field.field_type() {
                    FieldType::ForeignKey { to } => Some(RelationInfo {
                        kind: RelationKind::ForeignKey,
                        target: to.table_name().to_string(),
                        join_table: None,
                    }),
                    FieldType::ManyToMany { .. } => {
                        self.join_table(&name).map(|join| RelationInfo {
                            kind: RelationKind::ManyToMany,
                            target: join.target_table,
                            join_table: Some(join.name),
                        })
                    }
                    _ => None,
                };
                FieldInfo {
                    kind: field.field_type().kind_name().to_string(),
                    column_type: field.column_type(),
                    nullable: field.is_nullable(),
                    primary_key: field.is_primary_key(),
                    max_length: field.field_type().max_length(),
                    relation,
                    name,
                }
            })
            .collect();

        ModelInfo {
            table: self.table.clone(),
            fields,
        }
    }
}

/// Registers fields on a table in order.
#[derive(Debug)]
pub struct ModelSchemaBuilder {
    table: String,
    fields: Vec<Field>,
}

impl ModelSchemaBuilder {
    /// Appends a field, binding `name` as its column name.
    pub fn field(mut self, name: impl Into<String>, field: Field) -> Self {
        self.fields.push(field.with_name(name));
        self
    }

    /// Finishes the schema. A model that registered no primary key gets an
    /// implicit `id` key as its first column.
    pub fn build(mut self) -> ModelSchema {
        if !self.fields.iter().any(Field::is_primary_key) {
            self.fields
                .insert(0, Field::primary_key().with_name(DEFAULT_PRIMARY_KEY));
        }
        ModelSchema {
            table: self.table,
            fields: self.fields,
        }
    }
}
