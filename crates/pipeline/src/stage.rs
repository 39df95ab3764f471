use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::state::{InvestigationState, StateField, StateUpdate};

/// Pipeline stages, declared in the only order they may run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageName {
    WebSearch,
    EntityExtraction,
    EntitySummarization,
    RelationshipExtraction,
    RiskAnalysis,
}

impl StageName {
    pub const ALL: [StageName; 5] = [
        StageName::WebSearch,
        StageName::EntityExtraction,
        StageName::EntitySummarization,
        StageName::RelationshipExtraction,
        StageName::RiskAnalysis,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StageName::WebSearch => "web_search",
            StageName::EntityExtraction => "entity_extraction",
            StageName::EntitySummarization => "entity_summarization",
            StageName::RelationshipExtraction => "relationship_extraction",
            StageName::RiskAnalysis => "risk_analysis",
        }
    }

    /// The one record field this stage is allowed to write.
    pub fn field(&self) -> StateField {
        match self {
            StageName::WebSearch => StateField::Documents,
            StageName::EntityExtraction => StateField::ExtractedEntities,
            StageName::EntitySummarization => StateField::SummarizedEntities,
            StageName::RelationshipExtraction => StateField::Relationships,
            StageName::RiskAnalysis => StateField::Risks,
        }
    }
}

impl fmt::Display for StageName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One step of an investigation: read the record, return what changed.
///
/// Stages absorb their own per-item failures. An `Err` from `run` means the
/// stage as a whole could not produce a result and aborts the run.
#[async_trait]
pub trait Stage: Send + Sync {
    fn name(&self) -> StageName;

    async fn run(&self, state: &InvestigationState) -> Result<StateUpdate>;
}
