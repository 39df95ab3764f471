pub mod schema;
pub mod llm;
pub mod prompt;
pub mod retry;
#[cfg(feature = "testing")]
pub mod testing;

pub use schema::{
    Document, EntityList, EntityMention, RelationshipList, RelationshipTriple, ResultShape,
    SearchResults, Shaped,
};
pub use llm::OllamaClient;
pub use retry::RetryPolicy;

use anyhow::{Context, Result};
use async_trait::async_trait;

/// Turns a natural-language instruction into structured JSON of a requested shape.
///
/// Implementations fail with an error on transport problems, malformed
/// responses, or output that cannot be coerced into the shape. Callers only
/// care that a call failed, never why.
#[async_trait]
pub trait ExtractionClient: Send + Sync {
    async fn extract(&self, instruction: &str, shape: ResultShape) -> Result<serde_json::Value>;
}

/// Run `instruction` and deserialize the answer into `S`.
///
/// Anything that does not fit the shape exactly is a call failure; partially
/// typed data never leaks out.
pub async fn extract_as<S: Shaped>(client: &dyn ExtractionClient, instruction: &str) -> Result<S> {
    let shape = S::SHAPE;
    let value = client.extract(instruction, shape).await?;

    let root = shape.root_key();
    if !value.get(root).is_some_and(|v| v.is_array()) {
        anyhow::bail!("{} response is missing the '{}' array", shape.name(), root);
    }

    serde_json::from_value(value)
        .with_context(|| format!("{} response does not match the expected schema", shape.name()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct Fixed(serde_json::Value);

    #[async_trait]
    impl ExtractionClient for Fixed {
        async fn extract(&self, _instruction: &str, _shape: ResultShape) -> Result<serde_json::Value> {
            Ok(self.0.clone())
        }
    }

    #[tokio::test]
    async fn test_extract_as_parses_matching_shape() {
        let client = Fixed(json!({
            "entities": [{"name": "Beta Inc", "type": "Company"}]
        }));

        let list: EntityList = extract_as(&client, "extract").await.unwrap();

        assert_eq!(list.entities.len(), 1);
        assert_eq!(list.entities[0].name, "Beta Inc");
        assert_eq!(list.entities[0].entity_type, "Company");
    }

    #[tokio::test]
    async fn test_extract_as_rejects_missing_root() {
        let client = Fixed(json!({"items": []}));

        let result: Result<SearchResults> = extract_as(&client, "search").await;

        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_extract_as_rejects_incomplete_records() {
        // raw_content and source are required
        let client = Fixed(json!({
            "results": [{"url": "https://a.example", "title": "A"}]
        }));

        let result: Result<SearchResults> = extract_as(&client, "search").await;

        assert!(result.is_err());
    }
}
