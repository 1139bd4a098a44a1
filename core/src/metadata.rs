//! Serializable field metadata.
//!
//! [`ModelInfo`] is what an HTTP layer needs to build request and response
//! schemas for a model without depending on the field types themselves.

use serde::{Deserialize, Serialize};

/// Kind of relationship a field represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationKind {
    ForeignKey,
    ManyToMany,
}

/// Target of a relationship field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationInfo {
    pub kind: RelationKind,
    /// Table name of the related model.
    pub target: String,
    /// Join table name, for many-to-many relations.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub join_table: Option<String>,
}

/// Metadata of a single field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldInfo {
    pub name: String,
    /// Variant name, e.g. `"varchar"` or `"foreign_key"`.
    pub kind: String,
    /// SQL column type; absent for many-to-many fields.
    pub column_type: Option<String>,
    pub nullable: bool,
    pub primary_key: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relation: Option<RelationInfo>,
}

/// Metadata of a model: its table and ordered fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelInfo {
    pub table: String,
    pub fields: Vec<FieldInfo>,
}

impl ModelInfo {
    pub fn field(&self, name: &str) -> Option<&FieldInfo> {
        self.fields.iter().find(|f| f.name == name)
    }
}

#[cfg(test)]
mod tests {
    use crate::{Field, ModelSchema};

    #[test]
    fn test_metadata_serializes_to_json() {
        let question = ModelSchema::builder("question")
            .field("question_text", Field::char(200))
            .build();
        let choice = ModelSchema::builder("choice")
            .field("question", Field::foreign_key(question))
            .field("votes", Field::integer())
            .build();

        let json = serde_json::to_value(choice.metadata()).unwrap();
        assert_eq!(json["table"], "choice");
        assert_eq!(json["fields"][0]["name"], "id");
        assert_eq!(json["fields"][0]["primary_key"], true);
        assert_eq!(json["fields"][1]["kind"], "foreign_key");
        assert_eq!(json["fields"][1]["relation"]["kind"], "foreign_key");
        assert_eq!(json["fields"][1]["relation"]["target"], "question");
        assert!(json["fields"][2].get("relation").is_none());
        assert!(json["fields"][2].get("max_length").is_none());
    }

    #[test]
    fn test_field_lookup() {
        let info = ModelSchema::builder("t").field("a", Field::text()).build().metadata();
        assert_eq!(info.field("a").unwrap().kind, "text");
        assert!(info.field("b").is_none());
    }
}
