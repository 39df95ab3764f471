use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info, warn};

use extract::{EntityList, ExtractionClient, extract_as, prompt};

use crate::config::{PipelineConfig, validate_max_documents};
use crate::error::PipelineError;
use crate::stage::{Stage, StageName};
use crate::state::{Document, ExtractedEntity, InvestigationState, StateUpdate};

/// Pulls people, companies and locations out of each discovered document.
pub struct EntityExtractionStage {
    client: Arc<dyn ExtractionClient>,
    max_documents: usize,
}

impl EntityExtractionStage {
    pub fn new(
        client: Arc<dyn ExtractionClient>,
        config: &PipelineConfig,
    ) -> Result<Self, PipelineError> {
        validate_max_documents(config.max_documents)?;
        Ok(Self {
            client,
            max_documents: config.max_documents,
        })
    }

    async fn extract_document(&self, document: &Document, subject_name: &str) -> Result<Vec<ExtractedEntity>> {
        let instruction = prompt::build_entity_prompt(document, subject_name);
        let response: EntityList = extract_as(self.client.as_ref(), &instruction).await?;

        let entities = response
            .entities
            .into_iter()
            .filter(|mention| {
                let keep = !mention.name.trim().is_empty();
                if !keep {
                    debug!(url = %document.url, "Dropping entity with blank name");
                }
                keep
            })
            .map(|mention| ExtractedEntity {
                name: mention.name,
                entity_type: mention.entity_type,
                source_document_url: document.url.clone(),
            })
            .collect();

        Ok(entities)
    }
}

#[async_trait]
impl Stage for EntityExtractionStage {
    fn name(&self) -> StageName {
        StageName::EntityExtraction
    }

    async fn run(&self, state: &InvestigationState) -> Result<StateUpdate> {
        let documents = &state.documents;
        let limit = documents.len().min(self.max_documents);
        info!(
            documents = documents.len(),
            processing = limit,
            "Extracting entities"
        );

        let mut all_entities = Vec::new();

        for (i, document) in documents.iter().take(limit).enumerate() {
            match self.extract_document(document, &state.subject.name).await {
                Ok(entities) => {
                    info!(
                        index = i + 1,
                        total = limit,
                        url = %document.url,
                        entities = entities.len(),
                        "Extracted entities from document"
                    );
                    all_entities.extend(entities);
                }
                Err(e) => {
                    warn!(url = %document.url, error = %e, "Entity extraction failed, skipping document");
                }
            }
        }

        info!(entities = all_entities.len(), "Entity extraction finished");
        Ok(StateUpdate::extracted_entities(all_entities))
    }
}
