use serde::{Deserialize, Serialize};
use std::fmt;

pub use extract::Document;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubjectKind {
    Person,
    #[serde(alias = "company")]
    Organization,
}

/// Who is being investigated. Fixed for the whole run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubjectProfile {
    pub name: String,
    pub entity_type: SubjectKind,
    #[serde(default)]
    pub dob: Option<String>,
    #[serde(default)]
    pub locations: Vec<String>,
    #[serde(default)]
    pub keywords: Vec<String>,
}

impl SubjectProfile {
    pub fn new(name: impl Into<String>, entity_type: SubjectKind) -> Self {
        Self {
            name: name.into(),
            entity_type,
            dob: None,
            locations: Vec::new(),
            keywords: Vec::new(),
        }
    }

    pub fn with_dob(mut self, dob: impl Into<String>) -> Self {
        self.dob = Some(dob.into());
        self
    }

    pub fn with_locations<I, S>(mut self, locations: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.locations = locations.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.keywords = keywords.into_iter().map(Into::into).collect();
        self
    }
}

/// A raw entity mention, traced back to the document it came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedEntity {
    pub name: String,
    #[serde(rename = "type")]
    pub entity_type: String,
    pub source_document_url: String,
}

impl ExtractedEntity {
    pub fn new(
        name: impl Into<String>,
        entity_type: impl Into<String>,
        source_document_url: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            entity_type: entity_type.into(),
            source_document_url: source_document_url.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummarizedEntity {
    pub name: String,
    #[serde(rename = "type")]
    pub entity_type: String,
    pub count: usize,
    pub source_urls: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relationship {
    pub source: String,
    pub relationship: String,
    pub target: String,
    pub source_document_url: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RiskCategory {
    Legal,
    Financial,
    Reputational,
}

impl fmt::Display for RiskCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RiskCategory::Legal => "Legal",
            RiskCategory::Financial => "Financial",
            RiskCategory::Reputational => "Reputational",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Risk {
    pub category: RiskCategory,
    pub detail: String,
    pub source_document_url: String,
}

/// Keys of the investigation record that stages write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StateField {
    Documents,
    ExtractedEntities,
    SummarizedEntities,
    Relationships,
    Risks,
}

impl StateField {
    pub fn as_str(&self) -> &'static str {
        match self {
            StateField::Documents => "documents",
            StateField::ExtractedEntities => "extracted_entities",
            StateField::SummarizedEntities => "summarized_entities",
            StateField::Relationships => "relationships",
            StateField::Risks => "risks",
        }
    }
}

impl fmt::Display for StateField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The record every stage reads and one stage at a time writes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvestigationState {
    pub subject: SubjectProfile,
    #[serde(default)]
    pub documents: Vec<Document>,
    #[serde(default)]
    pub extracted_entities: Vec<ExtractedEntity>,
    #[serde(default)]
    pub summarized_entities: Vec<SummarizedEntity>,
    #[serde(default)]
    pub relationships: Vec<Relationship>,
    #[serde(default)]
    pub risks: Vec<Risk>,
}

impl InvestigationState {
    pub fn new(subject: SubjectProfile) -> Self {
        Self {
            subject,
            documents: Vec::new(),
            extracted_entities: Vec::new(),
            summarized_entities: Vec::new(),
            relationships: Vec::new(),
            risks: Vec::new(),
        }
    }

    /// Merge a partial update key by key. Present keys replace the whole
    /// field; absent keys leave it alone.
    pub fn apply(&mut self, update: StateUpdate) {
        let StateUpdate {
            documents,
            extracted_entities,
            summarized_entities,
            relationships,
            risks,
        } = update;

        if let Some(documents) = documents {
            self.documents = documents;
        }
        if let Some(extracted_entities) = extracted_entities {
            self.extracted_entities = extracted_entities;
        }
        if let Some(summarized_entities) = summarized_entities {
            self.summarized_entities = summarized_entities;
        }
        if let Some(relationships) = relationships {
            self.relationships = relationships;
        }
        if let Some(risks) = risks {
            self.risks = risks;
        }
    }
}

/// The fields a stage computed, and nothing else.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub documents: Option<Vec<Document>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extracted_entities: Option<Vec<ExtractedEntity>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summarized_entities: Option<Vec<SummarizedEntity>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relationships: Option<Vec<Relationship>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub risks: Option<Vec<Risk>>,
}

impl StateUpdate {
    pub fn documents(documents: Vec<Document>) -> Self {
        Self { documents: Some(documents), ..Default::default() }
    }

    pub fn extracted_entities(entities: Vec<ExtractedEntity>) -> Self {
        Self { extracted_entities: Some(entities), ..Default::default() }
    }

    pub fn summarized_entities(entities: Vec<SummarizedEntity>) -> Self {
        Self { summarized_entities: Some(entities), ..Default::default() }
    }

    pub fn relationships(relationships: Vec<Relationship>) -> Self {
        Self { relationships: Some(relationships), ..Default::default() }
    }

    pub fn risks(risks: Vec<Risk>) -> Self {
        Self { risks: Some(risks), ..Default::default() }
    }

    /// Keys carried by this update, in record order.
    pub fn fields(&self) -> Vec<StateField> {
        let mut fields = Vec::new();
        if self.documents.is_some() {
            fields.push(StateField::Documents);
        }
        if self.extracted_entities.is_some() {
            fields.push(StateField::ExtractedEntities);
        }
        if self.summarized_entities.is_some() {
            fields.push(StateField::SummarizedEntities);
        }
        if self.relationships.is_some() {
            fields.push(StateField::Relationships);
        }
        if self.risks.is_some() {
            fields.push(StateField::Risks);
        }
        fields
    }

    pub fn is_empty(&self) -> bool {
        self.fields().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn doc(url: &str) -> Document {
        Document {
            url: url.to_string(),
            title: "title".to_string(),
            raw_content: "content".to_string(),
            source: "test".to_string(),
        }
    }

    fn state() -> InvestigationState {
        InvestigationState::new(SubjectProfile::new("Acme Corp", SubjectKind::Organization))
    }

    #[test]
    fn test_apply_replaces_present_fields() {
        let mut state = state();
        state.documents = vec![doc("https://old.example")];

        state.apply(StateUpdate::documents(vec![doc("https://new.example")]));

        assert_eq!(state.documents, vec![doc("https://new.example")]);
    }

    #[test]
    fn test_apply_leaves_absent_fields_untouched() {
        let mut state = state();
        state.documents = vec![doc("https://a.example")];
        let entities = vec![ExtractedEntity::new("Beta Inc", "Company", "https://a.example")];

        state.apply(StateUpdate::extracted_entities(entities.clone()));

        assert_eq!(state.documents, vec![doc("https://a.example")]);
        assert_eq!(state.extracted_entities, entities);
        assert!(state.risks.is_empty());
    }

    #[test]
    fn test_empty_update_is_a_no_op() {
        let mut state = state();
        state.documents = vec![doc("https://a.example")];
        let before = state.clone();

        state.apply(StateUpdate::default());

        assert_eq!(state, before);
    }

    #[test]
    fn test_update_fields() {
        let update = StateUpdate {
            documents: Some(Vec::new()),
            risks: Some(Vec::new()),
            ..Default::default()
        };

        assert_eq!(update.fields(), vec![StateField::Documents, StateField::Risks]);
        assert!(StateUpdate::default().is_empty());
    }

    #[test]
    fn test_subject_accepts_company_alias() {
        let subject: SubjectProfile = serde_json::from_str(
            r#"{"name": "Acme Corp", "entity_type": "company", "locations": ["NY"]}"#,
        )
        .unwrap();

        assert_eq!(subject.entity_type, SubjectKind::Organization);
        assert_eq!(subject.locations, vec!["NY".to_string()]);
        assert!(subject.dob.is_none());
    }

    #[test]
    fn test_state_deserializes_with_empty_collections() {
        let state: InvestigationState = serde_json::from_str(
            r#"{"subject": {"name": "Jane Doe", "entity_type": "person"}}"#,
        )
        .unwrap();

        assert!(state.documents.is_empty());
        assert!(state.summarized_entities.is_empty());
    }
}
