use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Duration;

use crate::error::PipelineError;
use crate::state::RiskCategory;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Documents handed to entity extraction, in discovery order.
    pub max_documents: usize,
    /// Wait before every deep-search request.
    pub deep_search_delay_ms: u64,
    /// Names that get a deep search even when the broad search finds nothing.
    pub high_profile_subjects: Vec<String>,
    pub risk_keywords: Vec<RiskKeywords>,
}

/// Keywords for one risk category, matched as lower-case substrings in order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskKeywords {
    pub category: RiskCategory,
    pub keywords: Vec<String>,
}

impl RiskKeywords {
    pub fn new<I, S>(category: RiskCategory, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            category,
            keywords: keywords.into_iter().map(Into::into).collect(),
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_documents: 5,
            deep_search_delay_ms: 2000,
            high_profile_subjects: Vec::new(),
            risk_keywords: default_risk_keywords(),
        }
    }
}

pub fn default_risk_keywords() -> Vec<RiskKeywords> {
    vec![
        RiskKeywords::new(
            RiskCategory::Legal,
            [
                "lawsuit",
                "sued",
                "litigation",
                "court",
                "indictment",
                "fraud",
                "settlement",
                "investigation",
            ],
        ),
        RiskKeywords::new(
            RiskCategory::Financial,
            [
                "bankruptcy",
                "insolvency",
                "debt",
                "foreclosure",
                "liquidation",
                "financial distress",
            ],
        ),
        RiskKeywords::new(
            RiskCategory::Reputational,
            [
                "scandal",
                "controversy",
                "criticism",
                "complaint",
                "misconduct",
                "allegation",
            ],
        ),
    ]
}

impl PipelineConfig {
    pub fn deep_search_delay(&self) -> Duration {
        Duration::from_millis(self.deep_search_delay_ms)
    }

    pub fn validate(&self) -> Result<(), PipelineError> {
        validate_max_documents(self.max_documents)?;
        validate_risk_keywords(&self.risk_keywords)
    }
}

pub(crate) fn validate_max_documents(max_documents: usize) -> Result<(), PipelineError> {
    if max_documents == 0 {
        return Err(PipelineError::InvalidConfig(
            "max_documents must be at least 1".to_string(),
        ));
    }
    Ok(())
}

/// Each category at most once, and no blank keyword: a blank one matches every document.
pub(crate) fn validate_risk_keywords(table: &[RiskKeywords]) -> Result<(), PipelineError> {
    let mut categories = HashSet::new();
    for entry in table {
        if !categories.insert(entry.category) {
            return Err(PipelineError::InvalidConfig(format!(
                "risk category {} is listed more than once",
                entry.category
            )));
        }
        if entry.keywords.iter().any(|k| k.trim().is_empty()) {
            return Err(PipelineError::InvalidConfig(format!(
                "risk category {} has an empty keyword",
                entry.category
            )));
        }
    }
    Ok(())
}
