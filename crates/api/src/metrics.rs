use pipeline::{InvestigationRun, StageName, StageOutput};
use serde::Serialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

pub struct Metrics {
    // Counters
    investigations_started: AtomicUsize,
    investigations_succeeded: AtomicUsize,
    investigations_failed: AtomicUsize,

    // Timing (in milliseconds), indexed like StageName::ALL
    stage_time_ms: [AtomicU64; 5],
    stage_runs: [AtomicUsize; 5],

    // Counts
    documents_found: AtomicUsize,
    entities_found: AtomicUsize,
    relationships_found: AtomicUsize,
    risks_found: AtomicUsize,
}

impl Metrics {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            investigations_started: AtomicUsize::new(0),
            investigations_succeeded: AtomicUsize::new(0),
            investigations_failed: AtomicUsize::new(0),
            stage_time_ms: Default::default(),
            stage_runs: Default::default(),
            documents_found: AtomicUsize::new(0),
            entities_found: AtomicUsize::new(0),
            relationships_found: AtomicUsize::new(0),
            risks_found: AtomicUsize::new(0),
        })
    }

    pub fn record_started(&self) {
        self.investigations_started.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_stage(&self, output: &StageOutput) {
        let i = stage_index(output.stage);
        self.stage_time_ms[i].fetch_add(output.elapsed_ms, Ordering::Relaxed);
        self.stage_runs[i].fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_success(&self, run: &InvestigationRun) {
        self.investigations_succeeded.fetch_add(1, Ordering::Relaxed);
        let state = &run.state;
        self.documents_found.fetch_add(state.documents.len(), Ordering::Relaxed);
        self.entities_found.fetch_add(state.summarized_entities.len(), Ordering::Relaxed);
        self.relationships_found.fetch_add(state.relationships.len(), Ordering::Relaxed);
        self.risks_found.fetch_add(state.risks.len(), Ordering::Relaxed);
    }

    pub fn record_failure(&self) {
        self.investigations_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let stages = StageName::ALL
            .iter()
            .enumerate()
            .map(|(i, &stage)| {
                let runs = self.stage_runs[i].load(Ordering::Relaxed);
                let total_ms = self.stage_time_ms[i].load(Ordering::Relaxed);
                StageTiming {
                    stage,
                    runs,
                    total_ms,
                    avg_ms: if runs > 0 { total_ms as f64 / runs as f64 } else { 0.0 },
                }
            })
            .collect();

        MetricsSnapshot {
            investigations_started: self.investigations_started.load(Ordering::Relaxed),
            investigations_succeeded: self.investigations_succeeded.load(Ordering::Relaxed),
            investigations_failed: self.investigations_failed.load(Ordering::Relaxed),
            stages,
            documents_found: self.documents_found.load(Ordering::Relaxed),
            entities_found: self.entities_found.load(Ordering::Relaxed),
            relationships_found: self.relationships_found.load(Ordering::Relaxed),
            risks_found: self.risks_found.load(Ordering::Relaxed),
        }
    }
}

fn stage_index(stage: StageName) -> usize {
    StageName::ALL
        .iter()
        .position(|s| *s == stage)
        .unwrap_or_default()
}

#[derive(Debug, Serialize)]
pub struct StageTiming {
    pub stage: StageName,
    pub runs: usize,
    pub total_ms: u64,
    pub avg_ms: f64,
}

#[derive(Debug, Serialize)]
pub struct MetricsSnapshot {
    pub investigations_started: usize,
    pub investigations_succeeded: usize,
    pub investigations_failed: usize,
    pub stages: Vec<StageTiming>,
    pub documents_found: usize,
    pub entities_found: usize,
    pub relationships_found: usize,
    pub risks_found: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pipeline::StateUpdate;

    #[test]
    fn test_stage_timings_accumulate() {
        let metrics = Metrics::new();
        for elapsed_ms in [10, 30] {
            metrics.record_stage(&StageOutput {
                stage: StageName::EntityExtraction,
                update: StateUpdate::default(),
                elapsed_ms,
            });
        }

        let snapshot = metrics.snapshot();
        let timing = snapshot
            .stages
            .iter()
            .find(|t| t.stage == StageName::EntityExtraction)
            .unwrap();

        assert_eq!(timing.runs, 2);
        assert_eq!(timing.total_ms, 40);
        assert_eq!(timing.avg_ms, 20.0);
        assert_eq!(snapshot.stages.len(), 5);
    }
}
