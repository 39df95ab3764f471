use anyhow::Result;
use async_trait::async_trait;
use indexmap::{IndexMap, IndexSet};
use tracing::info;

use crate::normalizer::{EntityKey, title_case};
use crate::stage::{Stage, StageName};
use crate::state::{ExtractedEntity, InvestigationState, StateUpdate, SummarizedEntity};

#[derive(Debug, Default)]
struct Tally {
    count: usize,
    urls: IndexSet<String>,
}

/// Collapse raw mentions into one record per normalized (name, type).
///
/// Output is ordered by mention count, most mentioned first. Ties keep the
/// order in which each entity was first seen.
pub fn summarize_entities(raw_entities: &[ExtractedEntity]) -> Vec<SummarizedEntity> {
    let mut tallies: IndexMap<EntityKey, Tally> = IndexMap::new();

    for entity in raw_entities {
        let tally = tallies
            .entry(EntityKey::new(&entity.name, &entity.entity_type))
            .or_default();
        tally.count += 1;
        tally.urls.insert(entity.source_document_url.clone());
    }

    let mut summarized: Vec<SummarizedEntity> = tallies
        .into_iter()
        .map(|(key, tally)| SummarizedEntity {
            name: title_case(&key.name),
            entity_type: title_case(&key.entity_type),
            count: tally.count,
            source_urls: tally.urls.into_iter().collect(),
        })
        .collect();

    // stable: ties stay in first-seen order
    summarized.sort_by(|a, b| b.count.cmp(&a.count));
    summarized
}

pub struct EntitySummarizationStage;

#[async_trait]
impl Stage for EntitySummarizationStage {
    fn name(&self) -> StageName {
        StageName::EntitySummarization
    }

    async fn run(&self, state: &InvestigationState) -> Result<StateUpdate> {
        let summarized = summarize_entities(&state.extracted_entities);

        info!(
            raw = state.extracted_entities.len(),
            unique = summarized.len(),
            "Summarized entities"
        );

        Ok(StateUpdate::summarized_entities(summarized))
    }
}
