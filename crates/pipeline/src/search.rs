use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use extract::{ExtractionClient, SearchResults, extract_as, prompt};

use crate::config::PipelineConfig;
use crate::stage::{Stage, StageName};
use crate::state::{Document, InvestigationState, StateUpdate, SubjectProfile};

/// A named, keyword-scoped deep-search query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchAngle {
    pub name: &'static str,
    pub query: String,
}

/// Documents found so far, deduplicated by url. First occurrence wins.
#[derive(Debug, Default)]
struct DocumentSet {
    documents: Vec<Document>,
    seen_urls: HashSet<String>,
}

impl DocumentSet {
    /// Returns how many of `found` were new.
    fn merge(&mut self, found: Vec<Document>) -> usize {
        let before = self.documents.len();
        for doc in found {
            if self.seen_urls.insert(doc.url.clone()) {
                self.documents.push(doc);
            }
        }
        self.documents.len() - before
    }

    fn len(&self) -> usize {
        self.documents.len()
    }

    fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    fn into_documents(self) -> Vec<Document> {
        self.documents
    }
}

/// Discovers documents in two phases: one broad query, then, if the subject
/// has a footprint, a targeted query per risk angle.
pub struct SearchStage {
    client: Arc<dyn ExtractionClient>,
    delay: Duration,
    high_profile: HashSet<String>,
}

impl SearchStage {
    pub fn new(client: Arc<dyn ExtractionClient>, config: &PipelineConfig) -> Self {
        Self {
            client,
            delay: config.deep_search_delay(),
            high_profile: config
                .high_profile_subjects
                .iter()
                .map(|name| name.trim().to_lowercase())
                .collect(),
        }
    }

    /// Quoted name, plus birth date and the first known location when present.
    pub fn broad_query(subject: &SubjectProfile) -> String {
        let mut parts = vec![format!("\"{}\"", subject.name)];
        if let Some(dob) = &subject.dob {
            parts.push(format!("born {}", dob));
        }
        if let Some(location) = subject.locations.first() {
            parts.push(format!("\"{}\"", location));
        }
        parts.join(" ")
    }

    pub fn search_angles(subject: &SubjectProfile) -> Vec<SearchAngle> {
        let name = &subject.name;
        vec![
            SearchAngle {
                name: "legal_issues",
                query: format!(
                    "\"{}\" lawsuit OR legal OR court OR settlement OR investigation",
                    name
                ),
            },
            SearchAngle {
                name: "negative_press",
                query: format!("\"{}\" controversy OR scandal OR criticism OR complaint", name),
            },
            SearchAngle {
                name: "financial_distress",
                query: format!("\"{}\" bankruptcy OR debt OR financial issues", name),
            },
        ]
    }

    fn is_high_profile(&self, subject: &SubjectProfile) -> bool {
        self.high_profile.contains(&subject.name.trim().to_lowercase())
    }

    async fn search(&self, query: &str) -> Result<Vec<Document>> {
        let instruction = prompt::build_search_prompt(query);
        let response: SearchResults = extract_as(self.client.as_ref(), &instruction).await?;
        Ok(response.results)
    }
}

#[async_trait]
impl Stage for SearchStage {
    fn name(&self) -> StageName {
        StageName::WebSearch
    }

    async fn run(&self, state: &InvestigationState) -> Result<StateUpdate> {
        let subject = &state.subject;
        let mut found = DocumentSet::default();

        let broad_query = Self::broad_query(subject);
        info!(subject = %subject.name, query = %broad_query, "Phase 1: broad search");

        match self.search(&broad_query).await {
            Ok(results) => {
                let returned = results.len();
                let added = found.merge(results);
                info!(returned, added, "Broad search finished");
            }
            Err(e) => {
                warn!(query = %broad_query, error = %e, "Broad search failed");
            }
        }

        if found.is_empty() && !self.is_high_profile(subject) {
            info!(
                subject = %subject.name,
                "Skipping deep search: no footprint found in broad search"
            );
            return Ok(StateUpdate::documents(found.into_documents()));
        }

        info!(subject = %subject.name, "Phase 2: deep search");
        for angle in Self::search_angles(subject) {
            if !self.delay.is_zero() {
                info!(delay_ms = self.delay.as_millis() as u64, "Waiting before next search request");
            }
            tokio::time::sleep(self.delay).await;

            match self.search(&angle.query).await {
                Ok(results) => {
                    let returned = results.len();
                    let added = found.merge(results);
                    info!(angle = angle.name, returned, added, "Deep search angle finished");
                }
                Err(e) => {
                    warn!(angle = angle.name, error = %e, "Deep search angle failed, continuing");
                }
            }
        }

        info!(documents = found.len(), "Search finished");
        Ok(StateUpdate::documents(found.into_documents()))
    }
}
