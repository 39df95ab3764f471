use thiserror::Error;

use crate::stage::StageName;
use crate::state::StateField;

/// Run-level failures. Per-document and per-angle failures never reach here.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("invalid subject: {0}")]
    InvalidSubject(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("stage {stage} cannot run after {after}")]
    InvalidStageOrder { stage: StageName, after: StageName },

    #[error("stage {stage} wrote {field}, which it does not own")]
    OwnershipViolation { stage: StageName, field: StateField },

    #[error("stage {stage} failed: {source:#}")]
    StageFailed {
        stage: StageName,
        #[source]
        source: anyhow::Error,
    },
}
