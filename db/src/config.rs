//! Project configuration for the ormlet command line.
//!
//! Lists the database files to manage and the models to create in each of
//! them.
//!
//! # Example YAML
//!
//! ```yaml
//! version: "1.0"
//! databases:
//!   - polls.db
//!   - polls-staging.db
//! models:
//!   - table: question
//!     fields:
//!       - { name: question_text, type: char, max_length: 200 }
//!       - { name: pub_date, type: datetime }
//!   - table: choice
//!     fields:
//!       - { name: question, type: foreign_key, to: question }
//!       - { name: choice_text, type: char, max_length: 200 }
//!       - { name: votes, type: integer }
//! ```

use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use ormlet_core::ModelSchema;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::manifest::{ModelDecl, build_schemas};

fn default_version() -> String {
    "1.0".to_string()
}

/// Top-level project configuration.
///
/// # Examples
///
/// ```no_run
/// use ormlet_db::OrmConfig;
///
/// let config = OrmConfig::load("ormlet.yml").unwrap();
/// for schema in config.schemas().unwrap() {
///     println!("{}", schema.table_name());
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrmConfig {
    /// Configuration format version (e.g., `"1.0"`).
    #[serde(default = "default_version")]
    pub version: String,
    /// SQLite database files, relative paths resolved against the
    /// configuration file's directory by [`database_paths`](Self::database_paths).
    #[serde(default)]
    pub databases: Vec<PathBuf>,
    /// Models in creation order.
    #[serde(default)]
    pub models: Vec<ModelDecl>,
}

impl OrmConfig {
    /// Loads configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns [`IoError`](crate::ConfigError::IoError) if the file cannot
    /// be read, or [`YamlError`](crate::ConfigError::YamlError) if parsing
    /// fails.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let file = std::fs::File::open(path)?;
        let reader = BufReader::new(file);
        let config = serde_yaml::from_reader(reader)?;
        Ok(config)
    }

    /// Saves the configuration as YAML.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let file = std::fs::File::create(path)?;
        let writer = BufWriter::new(file);
        serde_yaml::to_writer(writer, self)?;
        Ok(())
    }

    /// Builds the declared model schemas, in declaration order.
    pub fn schemas(&self) -> Result<Vec<Arc<ModelSchema>>> {
        build_schemas(&self.models)
    }

    /// Database paths with relative entries joined onto `base`.
    pub fn database_paths(&self, base: &Path) -> Vec<PathBuf> {
        self.databases
            .iter()
            .map(|path| {
                if path.is_absolute() {
                    path.clone()
                } else {
                    base.join(path)
                }
            })
            .collect()
    }
}
