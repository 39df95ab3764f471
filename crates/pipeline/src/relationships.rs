use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

use extract::{ExtractionClient, RelationshipList, extract_as, prompt};

use crate::normalizer::normalize_name;
use crate::stage::{Stage, StageName};
use crate::state::{Document, InvestigationState, Relationship, StateUpdate};

/// Names relationships may connect: the subject plus every summarized entity.
#[derive(Debug, Clone)]
pub struct EntityVocabulary {
    names: Vec<String>,
    by_key: HashMap<String, usize>,
}

impl EntityVocabulary {
    pub fn from_state(state: &InvestigationState) -> Self {
        let mut vocabulary = Self {
            names: Vec::new(),
            by_key: HashMap::new(),
        };
        vocabulary.insert(&state.subject.name);
        for entity in &state.summarized_entities {
            vocabulary.insert(&entity.name);
        }
        vocabulary
    }

    fn insert(&mut self, name: &str) {
        let key = normalize_name(name);
        if key.is_empty() || self.by_key.contains_key(&key) {
            return;
        }
        self.by_key.insert(key, self.names.len());
        self.names.push(name.trim().to_string());
    }

    /// The vocabulary spelling of `name`, if it is a known entity.
    pub fn resolve(&self, name: &str) -> Option<&str> {
        self.by_key
            .get(&normalize_name(name))
            .map(|&i| self.names[i].as_str())
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }
}

/// Finds directed relationships between known entities, one document at a time.
pub struct RelationshipExtractionStage {
    client: Arc<dyn ExtractionClient>,
}

impl RelationshipExtractionStage {
    pub fn new(client: Arc<dyn ExtractionClient>) -> Self {
        Self { client }
    }

    async fn extract_document(
        &self,
        document: &Document,
        vocabulary: &EntityVocabulary,
    ) -> Result<Vec<Relationship>> {
        let instruction = prompt::build_relationship_prompt(document, vocabulary.names());
        let response: RelationshipList = extract_as(self.client.as_ref(), &instruction).await?;

        let mut relationships = Vec::new();
        for triple in response.relationships {
            let relationship = triple.relationship.trim();
            let source = vocabulary.resolve(&triple.source);
            let target = vocabulary.resolve(&triple.target);

            match (source, target) {
                (Some(source), Some(target)) if !relationship.is_empty() => {
                    relationships.push(Relationship {
                        source: source.to_string(),
                        relationship: relationship.to_string(),
                        target: target.to_string(),
                        source_document_url: document.url.clone(),
                    });
                }
                _ => {
                    debug!(
                        url = %document.url,
                        source = %triple.source,
                        relationship = %triple.relationship,
                        target = %triple.target,
                        "Dropping relationship outside known entities"
                    );
                }
            }
        }

        Ok(relationships)
    }
}

#[async_trait]
impl Stage for RelationshipExtractionStage {
    fn name(&self) -> StageName {
        StageName::RelationshipExtraction
    }

    async fn run(&self, state: &InvestigationState) -> Result<StateUpdate> {
        let vocabulary = EntityVocabulary::from_state(state);
        info!(
            documents = state.documents.len(),
            known_entities = vocabulary.names().len(),
            "Extracting relationships"
        );

        let mut all_relationships = Vec::new();

        for document in &state.documents {
            match self.extract_document(document, &vocabulary).await {
                Ok(relationships) => {
                    debug!(url = %document.url, relationships = relationships.len(), "Extracted relationships");
                    all_relationships.extend(relationships);
                }
                Err(e) => {
                    warn!(url = %document.url, error = %e, "Relationship extraction failed, skipping document");
                }
            }
        }

        info!(relationships = all_relationships.len(), "Relationship extraction finished");
        Ok(StateUpdate::relationships(all_relationships))
    }
}
