//! Model declarations and schema assembly.
//!
//! A manifest is an ordered list of [`ModelDecl`]s. Relations name their
//! target by table, and a target must be declared before the model that
//! refers to it, which is also the order tables have to be created in.
//!
//! # Examples
//!
//! ```
//! use ormlet_db::{ModelDecl, build_schemas};
//!
//! let yaml = r#"
//! - table: question
//!   fields:
//!     - { name: question_text, type: char, max_length: 200 }
//!     - { name: pub_date, type: datetime }
//! - table: choice
//!   fields:
//!     - { name: question, type: foreign_key, to: question }
//!     - { name: votes, type: integer, not_null: true }
//! "#;
//! let models: Vec<ModelDecl> = serde_yaml::from_str(yaml).unwrap();
//! let schemas = build_schemas(&models).unwrap();
//! assert_eq!(
//!     schemas[1].create_table_sql().unwrap()[0],
//!     "CREATE TABLE choice (id INTEGER NOT NULL PRIMARY KEY, \
//!      question INTEGER NOT NULL REFERENCES question (id), votes INTEGER NOT NULL)"
//! );
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use ormlet_core::{Field, FieldType, ModelSchema, validate_schema};
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};

/// Column kind of a declared field, tagged by `type`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FieldKind {
    PrimaryKey,
    Integer,
    Float,
    Char { max_length: usize },
    Varchar { max_length: usize },
    Text,
    Email { max_length: usize },
    Date,
    Datetime,
    ForeignKey { to: String },
    ManyToMany { to: String },
    Custom { column_type: String },
}

/// One declared field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDecl {
    pub name: String,
    #[serde(flatten)]
    pub kind: FieldKind,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub not_null: bool,
}

/// One declared model: a table and its fields in column order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelDecl {
    pub table: String,
    #[serde(default)]
    pub fields: Vec<FieldDecl>,
}

/// Builds one schema per declaration, in declaration order.
///
/// # Errors
///
/// - [`ConfigError::UnknownTarget`] if a relation names a table that is not
///   declared earlier in the list.
/// - [`ConfigError::InvalidManifest`] for repeated tables and for schemas that
///   fail validation.
pub fn build_schemas(models: &[ModelDecl]) -> Result<Vec<Arc<ModelSchema>>> {
    let mut built: HashMap<&str, Arc<ModelSchema>> = HashMap::new();
    let mut schemas = Vec::with_capacity(models.len());

    for model in models {
        if built.contains_key(model.table.as_str()) {
            return Err(ConfigError::InvalidManifest(format!(
                "table '{}' is declared more than once",
                model.table
            )));
        }

        let mut builder = ModelSchema::builder(&model.table);
        for decl in &model.fields {
            builder = builder.field(&decl.name, field(model, decl, &built)?);
        }
        let schema = builder.build();

        let errors = validate_schema(&schema);
        if !errors.is_empty() {
            let details: Vec<String> = errors.iter().map(ToString::to_string).collect();
            return Err(ConfigError::InvalidManifest(format!(
                "{}: {}",
                model.table,
                details.join("; ")
            )));
        }

        let schema = Arc::new(schema);
        built.insert(model.table.as_str(), Arc::clone(&schema));
        schemas.push(schema);
    }

    Ok(schemas)
}

fn field(
    model: &ModelDecl,
    decl: &FieldDecl,
    built: &HashMap<&str, Arc<ModelSchema>>,
) -> Result<Field> {
    let target = |to: &str| {
        built
            .get(to)
            .map(Arc::clone)
            .ok_or_else(|| ConfigError::UnknownTarget {
                table: model.table.clone(),
                field: decl.name.clone(),
                target: to.to_string(),
            })
    };

    let field_type = match &decl.kind {
        FieldKind::PrimaryKey => FieldType::PrimaryKey,
        FieldKind::Integer => FieldType::Integer,
        FieldKind::Float => FieldType::Float,
        FieldKind::Char { max_length } => FieldType::Char {
            max_length: *max_length,
        },
        FieldKind::Varchar { max_length } => FieldType::Varchar {
            max_length: *max_length,
        },
        FieldKind::Text => FieldType::Text,
        FieldKind::Email { max_length } => FieldType::Email {
            max_length: *max_length,
        },
        FieldKind::Date => FieldType::Date,
        FieldKind::Datetime => FieldType::Datetime,
        FieldKind::ForeignKey { to } => FieldType::ForeignKey {
            to: target(to.as_str())?.into(),
        },
        FieldKind::ManyToMany { to } => FieldType::ManyToMany {
            to: target(to.as_str())?.into(),
        },
        FieldKind::Custom { column_type } => FieldType::Custom {
            column_type: column_type.clone(),
        },
    };

    let field = Field::new(field_type);
    Ok(if decl.not_null { field.not_null() } else { field })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decl(name: &str, kind: FieldKind) -> FieldDecl {
        FieldDecl {
            name: name.to_string(),
            kind,
            not_null: false,
        }
    }

    fn model(table: &str, fields: Vec<FieldDecl>) -> ModelDecl {
        ModelDecl {
            table: table.to_string(),
            fields,
        }
    }

    #[test]
    fn test_field_kinds_parse_from_yaml() {
        let yaml = r#"
name: contact
type: email
max_length: 120
not_null: true
"#;
        let parsed: FieldDecl = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(parsed.kind, FieldKind::Email { max_length: 120 });
        assert!(parsed.not_null);

        let parsed: FieldDecl = serde_yaml::from_str("{ name: body, type: text }").unwrap();
        assert_eq!(parsed.kind, FieldKind::Text);
        assert!(!parsed.not_null);
    }

    #[test]
    fn test_relations_resolve_to_earlier_models() {
        let models = vec![
            model("tag", vec![decl("label", FieldKind::Varchar { max_length: 20 })]),
            model(
                "post",
                vec![
                    decl("title", FieldKind::Text),
                    decl("tags", FieldKind::ManyToMany { to: "tag".into() }),
                ],
            ),
        ];
        let schemas = build_schemas(&models).unwrap();
        let post = &schemas[1];
        assert_eq!(post.join_table("tags").unwrap().name, "post_tag");
    }

    #[test]
    fn test_forward_references_are_rejected() {
        let models = vec![
            model("post", vec![decl("author", FieldKind::ForeignKey { to: "author".into() })]),
            model("author", vec![decl("name", FieldKind::Text)]),
        ];
        let err = build_schemas(&models).unwrap_err();
        match err {
            ConfigError::UnknownTarget {
                table,
                field,
                target,
            } => {
                assert_eq!((table.as_str(), field.as_str()), ("post", "author"));
                assert_eq!(target, "author");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_invalid_declarations_are_reported() {
        let repeated = vec![model("a", vec![]), model("a", vec![])];
        assert!(matches!(
            build_schemas(&repeated),
            Err(ConfigError::InvalidManifest(_))
        ));

        let zero = vec![model("a", vec![decl("code", FieldKind::Char { max_length: 0 })])];
        let err = build_schemas(&zero).unwrap_err();
        assert!(err.to_string().contains("a.code"));
    }

    #[test]
    fn test_not_null_is_applied() {
        let mut name = decl("name", FieldKind::Varchar { max_length: 10 });
        name.not_null = true;
        let schemas = build_schemas(&[model("person", vec![name])]).unwrap();
        assert_eq!(
            schemas[0].field("name").unwrap().column_type().as_deref(),
            Some("VARCHAR(10) NOT NULL")
        );
    }
}
