//! Field types, model schemas and SQL rendering.
//!
//! This crate is the storage-independent heart of ormlet:
//!
//! - [`Field`] / [`FieldType`]: typed column descriptors. Every field
//!   renders its column definition ([`Field::create_sql`]), formats runtime
//!   values as inline SQL literals ([`Field::sql_format`]) and converts them
//!   to and from the storage representation ([`Field::serialize`],
//!   [`Field::deserialize`]).
//! - [`ModelSchema`]: an explicitly registered, ordered set of fields bound
//!   to a table, with DDL generation for the table and its many-to-many join
//!   tables.
//! - [`Record`]: one row of a model, holding typed [`Value`]s.
//! - [`ModelInfo`]: serializable field metadata for HTTP layers.
//!
//! Validation ([`validate_schema`]) catches structural problems such as
//! duplicate fields and invalid identifiers before DDL is generated. Value
//! problems surface as [`FieldError`]s before any SQL is composed.
//!
//! # Example
//!
//! ```
//! use ormlet_core::*;
//!
//! let person = ModelSchema::builder("person")
//!     .field("name", Field::varchar(40))
//!     .field("email", Field::email(200))
//!     .build();
//! assert!(validate_schema(&person).is_empty());
//!
//! let email = person.field("email").unwrap();
//! assert_eq!(email.create_sql().unwrap(), "email VARCHAR(200)");
//! assert_eq!(
//!     email.sql_format(&Value::from("ada@example.com")).unwrap(),
//!     "'ada@example.com'"
//! );
//! assert!(matches!(
//!     email.sql_format(&Value::from("not-an-email")),
//!     Err(FieldError::InvalidEmail { .. })
//! ));
//! ```

mod error;
mod field;
mod metadata;
mod model;
mod record;
mod validate;
mod value;

pub use error::{FieldError, Result};
pub use field::{Field, FieldType};
pub use metadata::{FieldInfo, ModelInfo, RelationInfo, RelationKind};
pub use model::{DEFAULT_PRIMARY_KEY, JoinTable, Model, ModelRef, ModelSchema, ModelSchemaBuilder};
pub use record::Record;
pub use validate::{SchemaError, is_valid_email, is_valid_identifier, validate_schema};
pub use value::{DATE_FORMAT, DATETIME_FORMAT, Value};
