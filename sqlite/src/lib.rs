//! SQLite persistence for ormlet models.
//!
//! This crate stores [`Record`](ormlet_core::Record)s of
//! [`ModelSchema`](ormlet_core::ModelSchema)s in SQLite. Table DDL comes from
//! the field definitions, writes bind values produced by each field's
//! `serialize`, and filters render values through each field's `sql_format`.
//!
//! # Architecture
//!
//! - **`driver`**: the [`Driver`] contract and its `rusqlite` implementation
//! - **`database`**: table lifecycle and record writes ([`Database`])
//! - **`query`**: lazy `SELECT` composition ([`Query`])
//! - **`relation`**: reverse foreign key and many-to-many handles
//! - **`convert`**: value conversion between the value model and SQLite
//!
//! Foreign key enforcement is switched on for every connection.
//!
//! # Quick start
//!
//! ```
//! use ormlet_core::{Field, ModelRef, ModelSchema, Record};
//! use ormlet_sqlite::Database;
//!
//! let db = Database::open_in_memory().unwrap();
//!
//! let question: ModelRef = ModelSchema::builder("question")
//!     .field("question_text", Field::char(200))
//!     .build()
//!     .into();
//! let choice: ModelRef = ModelSchema::builder("choice")
//!     .field("question", Field::foreign_key(&question))
//!     .field("votes", Field::integer())
//!     .build()
//!     .into();
//! db.create_table(question.resolve()).unwrap();
//! db.create_table(choice.resolve()).unwrap();
//!
//! let mut q = Record::new(question.clone()).with("question_text", "What's up?").unwrap();
//! db.save(&mut q).unwrap();
//!
//! let mut c = Record::new(choice.clone())
//!     .with("question", &q).unwrap()
//!     .with("votes", 0).unwrap();
//! db.save(&mut c).unwrap();
//!
//! let choices = db.reverse(&q, &choice, "question").unwrap();
//! assert_eq!(choices.count().unwrap(), 1);
//! ```

mod convert;
mod database;
mod driver;
mod error;
mod query;
mod relation;

pub use database::Database;
pub use driver::{Driver, Row, SqliteDriver};
pub use error::{Result, SqliteError};
pub use query::Query;
pub use relation::{ManyToMany, ManyToManyReverse, ReverseSet};
