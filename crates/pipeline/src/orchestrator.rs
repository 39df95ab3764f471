use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;
use tracing::{info, info_span, Instrument};

use extract::ExtractionClient;

use crate::config::PipelineConfig;
use crate::entities::EntityExtractionStage;
use crate::error::PipelineError;
use crate::relationships::RelationshipExtractionStage;
use crate::risk::RiskAnalysisStage;
use crate::search::SearchStage;
use crate::stage::{Stage, StageName};
use crate::state::{InvestigationState, StateUpdate};
use crate::summarizer::EntitySummarizationStage;

/// What one stage produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageOutput {
    pub stage: StageName,
    pub update: StateUpdate,
    pub elapsed_ms: u64,
}

#[derive(Debug, Clone)]
pub enum PipelineEvent {
    StageCompleted(StageOutput),
    /// Terminal state reached.
    Finished,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvestigationRun {
    pub state: InvestigationState,
    pub stages: Vec<StageOutput>,
}

/// Runs stages one after another over a single investigation record.
pub struct Pipeline {
    stages: Vec<Box<dyn Stage>>,
}

#[derive(Default)]
pub struct PipelineBuilder {
    stages: Vec<Box<dyn Stage>>,
}

impl PipelineBuilder {
    pub fn stage(mut self, stage: impl Stage + 'static) -> Self {
        self.stages.push(Box::new(stage));
        self
    }

    /// Stages must be a subsequence of the canonical order, each at most once.
    pub fn build(self) -> Result<Pipeline, PipelineError> {
        if self.stages.is_empty() {
            return Err(PipelineError::InvalidConfig(
                "a pipeline needs at least one stage".to_string(),
            ));
        }

        for pair in self.stages.windows(2) {
            let (previous, next) = (pair[0].name(), pair[1].name());
            if next <= previous {
                return Err(PipelineError::InvalidStageOrder {
                    stage: next,
                    after: previous,
                });
            }
        }

        Ok(Pipeline { stages: self.stages })
    }
}

impl Pipeline {
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::default()
    }

    /// Search, entity extraction, summarization, relationships, risk.
    pub fn standard(
        client: Arc<dyn ExtractionClient>,
        config: &PipelineConfig,
    ) -> Result<Self, PipelineError> {
        config.validate()?;

        Self::builder()
            .stage(SearchStage::new(client.clone(), config))
            .stage(EntityExtractionStage::new(client.clone(), config)?)
            .stage(EntitySummarizationStage)
            .stage(RelationshipExtractionStage::new(client))
            .stage(RiskAnalysisStage::new(config)?)
            .build()
    }

    pub fn stage_names(&self) -> Vec<StageName> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    pub async fn run(&self, state: InvestigationState) -> Result<InvestigationRun, PipelineError> {
        self.execute(state, None).await
    }

    /// Like [`Pipeline::run`], also sending an event after every stage and at
    /// the end. A dropped receiver does not stop the run.
    pub async fn run_with_events(
        &self,
        state: InvestigationState,
        events: mpsc::Sender<PipelineEvent>,
    ) -> Result<InvestigationRun, PipelineError> {
        self.execute(state, Some(&events)).await
    }

    async fn execute(
        &self,
        mut state: InvestigationState,
        events: Option<&mpsc::Sender<PipelineEvent>>,
    ) -> Result<InvestigationRun, PipelineError> {
        if state.subject.name.trim().is_empty() {
            return Err(PipelineError::InvalidSubject(
                "subject name must not be empty".to_string(),
            ));
        }

        info!(subject = %state.subject.name, stages = self.stages.len(), "Starting investigation");
        let mut outputs = Vec::with_capacity(self.stages.len());

        for stage in &self.stages {
            let name = stage.name();
            let started = Instant::now();

            let update = stage
                .run(&state)
                .instrument(info_span!("stage", stage = %name))
                .await
                .map_err(|source| PipelineError::StageFailed { stage: name, source })?;

            if let Some(field) = update.fields().into_iter().find(|f| *f != name.field()) {
                return Err(PipelineError::OwnershipViolation { stage: name, field });
            }

            state.apply(update.clone());

            let output = StageOutput {
                stage: name,
                update,
                elapsed_ms: started.elapsed().as_millis() as u64,
            };
            info!(stage = %name, elapsed_ms = output.elapsed_ms, "Stage completed");

            if let Some(events) = events {
                let _ = events.send(PipelineEvent::StageCompleted(output.clone())).await;
            }
            outputs.push(output);
        }

        if let Some(events) = events {
            let _ = events.send(PipelineEvent::Finished).await;
        }
        info!(
            documents = state.documents.len(),
            entities = state.summarized_entities.len(),
            relationships = state.relationships.len(),
            risks = state.risks.len(),
            "Investigation finished"
        );

        Ok(InvestigationRun { state, stages: outputs })
    }
}
