use anyhow::Result;
use async_trait::async_trait;
use tracing::info;

use crate::config::{PipelineConfig, RiskKeywords, validate_risk_keywords};
use crate::error::PipelineError;
use crate::stage::{Stage, StageName};
use crate::state::{Document, InvestigationState, Risk, StateUpdate};

/// Flags documents whose text contains risk keywords. Purely local.
pub struct RiskAnalysisStage {
    table: Vec<RiskKeywords>,
}

impl RiskAnalysisStage {
    pub fn new(config: &PipelineConfig) -> Result<Self, PipelineError> {
        Self::with_table(config.risk_keywords.clone())
    }

    pub fn with_table(table: Vec<RiskKeywords>) -> Result<Self, PipelineError> {
        validate_risk_keywords(&table)?;
        let table = table
            .into_iter()
            .map(|entry| RiskKeywords {
                category: entry.category,
                keywords: entry.keywords.iter().map(|k| k.to_lowercase()).collect(),
            })
            .collect();
        Ok(Self { table })
    }

    /// At most one risk per category: the first keyword that matches wins.
    pub fn scan_document(&self, document: &Document) -> Vec<Risk> {
        let text = document.raw_content.to_lowercase();

        self.table
            .iter()
            .filter_map(|entry| {
                entry
                    .keywords
                    .iter()
                    .find(|keyword| text.contains(keyword.as_str()))
                    .map(|keyword| Risk {
                        category: entry.category,
                        detail: format!("Document mentions '{}'", keyword),
                        source_document_url: document.url.clone(),
                    })
            })
            .collect()
    }
}

#[async_trait]
impl Stage for RiskAnalysisStage {
    fn name(&self) -> StageName {
        StageName::RiskAnalysis
    }

    async fn run(&self, state: &InvestigationState) -> Result<StateUpdate> {
        let risks: Vec<Risk> = state
            .documents
            .iter()
            .flat_map(|document| self.scan_document(document))
            .collect();

        info!(
            documents = state.documents.len(),
            risks = risks.len(),
            "Risk analysis finished"
        );

        Ok(StateUpdate::risks(risks))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{RiskCategory, SubjectKind, SubjectProfile};
    use pretty_assertions::assert_eq;

    fn doc(url: &str, content: &str) -> Document {
        Document {
            url: url.to_string(),
            title: String::new(),
            raw_content: content.to_string(),
            source: "web".to_string(),
        }
    }

    fn categories(risks: &[Risk]) -> Vec<RiskCategory> {
        risks.iter().map(|r| r.category).collect()
    }

    #[test]
    fn test_one_risk_per_category() {
        let stage = RiskAnalysisStage::new(&PipelineConfig::default()).unwrap();

        let risks = stage.scan_document(&doc("u1", "The lawsuit claims the firm was sued twice."));

        assert_eq!(
            risks,
            vec![Risk {
                category: RiskCategory::Legal,
                detail: "Document mentions 'lawsuit'".to_string(),
                source_document_url: "u1".to_string(),
            }]
        );
    }

    #[test]
    fn test_keyword_order_decides_detail() {
        let stage = RiskAnalysisStage::with_table(vec![RiskKeywords::new(
            RiskCategory::Legal,
            ["court", "sued"],
        )])
        .unwrap();

        let risks = stage.scan_document(&doc("u1", "They sued and went to court."));

        assert_eq!(risks.len(), 1);
        assert_eq!(risks[0].detail, "Document mentions 'court'");
    }

    #[test]
    fn test_matching_is_case_insensitive() {
        let stage = RiskAnalysisStage::with_table(vec![RiskKeywords::new(
            RiskCategory::Financial,
            ["Bankruptcy"],
        )])
        .unwrap();

        let risks = stage.scan_document(&doc("u1", "FILED FOR BANKRUPTCY"));

        assert_eq!(categories(&risks), vec![RiskCategory::Financial]);
    }

    #[test]
    fn test_categories_follow_table_order() {
        let stage = RiskAnalysisStage::new(&PipelineConfig::default()).unwrap();

        let risks = stage.scan_document(&doc(
            "u1",
            "A scandal erupted over unpaid debt and a pending lawsuit.",
        ));

        assert_eq!(
            categories(&risks),
            vec![RiskCategory::Legal, RiskCategory::Financial, RiskCategory::Reputational]
        );
    }

    #[test]
    fn test_clean_document_has_no_risks() {
        let stage = RiskAnalysisStage::new(&PipelineConfig::default()).unwrap();

        assert!(stage.scan_document(&doc("u1", "Quarterly results were strong.")).is_empty());
    }

    #[test]
    fn test_blank_keyword_table_is_rejected() {
        let result = RiskAnalysisStage::with_table(vec![RiskKeywords::new(RiskCategory::Legal, [""])]);

        assert!(matches!(result, Err(PipelineError::InvalidConfig(_))));
    }

    #[test]
    fn test_custom_config_table_is_validated() {
        let config = PipelineConfig {
            risk_keywords: vec![RiskKeywords::new(RiskCategory::Financial, ["debt", " "])],
            ..Default::default()
        };

        assert!(RiskAnalysisStage::new(&config).is_err());
    }

    #[tokio::test]
    async fn test_stage_scans_every_document() {
        let mut state =
            InvestigationState::new(SubjectProfile::new("Acme Corp", SubjectKind::Organization));
        state.documents = vec![
            doc("u1", "Acme Corp sued by Beta Inc"),
            doc("u2", "Nothing to see"),
            doc("u3", "Acme faces criticism"),
        ];

        let update = RiskAnalysisStage::new(&PipelineConfig::default())
            .unwrap()
            .run(&state)
            .await
            .unwrap();

        let risks = update.risks.unwrap();
        let found: Vec<_> = risks
            .iter()
            .map(|r| (r.source_document_url.as_str(), r.category))
            .collect();
        assert_eq!(found, vec![("u1", RiskCategory::Legal), ("u3", RiskCategory::Reputational)]);
    }
}
