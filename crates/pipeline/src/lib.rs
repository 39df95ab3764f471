//! Subject investigation pipeline.
//!
//! A subject profile goes through document discovery, entity extraction,
//! entity summarization, relationship extraction and risk analysis. Every
//! stage reads the whole [`InvestigationState`] and hands back a
//! [`StateUpdate`] for the one field it owns; the [`Pipeline`] merges it
//! before moving on.

pub mod config;
pub mod entities;
pub mod error;
pub mod normalizer;
pub mod orchestrator;
pub mod relationships;
pub mod risk;
pub mod search;
pub mod stage;
pub mod state;
pub mod summarizer;

pub use config::{PipelineConfig, RiskKeywords};
pub use entities::EntityExtractionStage;
pub use error::PipelineError;
pub use orchestrator::{InvestigationRun, Pipeline, PipelineBuilder, PipelineEvent, StageOutput};
pub use relationships::RelationshipExtractionStage;
pub use risk::RiskAnalysisStage;
pub use search::SearchStage;
pub use stage::{Stage, StageName};
pub use state::{
    Document, ExtractedEntity, InvestigationState, Relationship, Risk, RiskCategory, StateField,
    StateUpdate, SubjectKind, SubjectProfile, SummarizedEntity,
};
pub use summarizer::{EntitySummarizationStage, summarize_entities};
