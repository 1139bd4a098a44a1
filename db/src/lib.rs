//! Configuration and model manifests for ormlet.
//!
//! This crate describes models as data instead of code: a YAML
//! [`OrmConfig`] lists database files and [`ModelDecl`]s, and
//! [`build_schemas`] turns the declarations into shared
//! [`ModelSchema`](ormlet_core::ModelSchema)s ready for DDL generation.
//!
//! # Quick start
//!
//! ```no_run
//! use ormlet_db::OrmConfig;
//!
//! let config = OrmConfig::load("ormlet.yml").unwrap();
//! for schema in config.schemas().unwrap() {
//!     for statement in schema.create_table_sql().unwrap() {
//!         println!("{statement};");
//!     }
//! }
//! ```

mod config;
mod error;
mod manifest;

pub use config::OrmConfig;
pub use error::{ConfigError, Result};
pub use manifest::{FieldDecl, FieldKind, ModelDecl, build_schemas};
