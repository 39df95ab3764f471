use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// A web page surfaced by a search request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub url: String,
    pub title: String,
    pub raw_content: String,
    pub source: String,
}

/// A named thing mentioned in a document, as returned by the service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityMention {
    pub name: String,
    #[serde(rename = "type")]
    pub entity_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationshipTriple {
    pub source: String,
    pub relationship: String,
    pub target: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResults {
    pub results: Vec<Document>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityList {
    pub entities: Vec<EntityMention>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelationshipList {
    pub relationships: Vec<RelationshipTriple>,
}

/// The fixed set of output shapes the service can be asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultShape {
    Documents,
    Entities,
    Relationships,
}

impl ResultShape {
    pub fn name(&self) -> &'static str {
        match self {
            ResultShape::Documents => "documents",
            ResultShape::Entities => "entities",
            ResultShape::Relationships => "relationships",
        }
    }

    /// Top-level key that must hold the result array.
    pub fn root_key(&self) -> &'static str {
        match self {
            ResultShape::Documents => "results",
            ResultShape::Entities => "entities",
            ResultShape::Relationships => "relationships",
        }
    }

    pub fn schema(&self) -> &'static str {
        match self {
            ResultShape::Documents => {
                r#"{
  "results": [
    {"url": "https://...", "title": "page title", "raw_content": "full page text", "source": "site or publisher name"}
  ]
}"#
            }
            ResultShape::Entities => {
                r#"{
  "entities": [
    {"name": "Entity Name", "type": "Person|Company|Location"}
  ]
}"#
            }
            ResultShape::Relationships => {
                r#"{
  "relationships": [
    {"source": "Entity Name", "relationship": "RELATIONSHIP_TYPE", "target": "Entity Name"}
  ]
}"#
            }
        }
    }
}

/// A Rust type that a [`ResultShape`] response deserializes into.
pub trait Shaped: DeserializeOwned {
    const SHAPE: ResultShape;
}

impl Shaped for SearchResults {
    const SHAPE: ResultShape = ResultShape::Documents;
}

impl Shaped for EntityList {
    const SHAPE: ResultShape = ResultShape::Entities;
}

impl Shaped for RelationshipList {
    const SHAPE: ResultShape = ResultShape::Relationships;
}
