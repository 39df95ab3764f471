use crate::schema::{Document, ResultShape};

pub fn build_search_prompt(search_query: &str) -> String {
    format!(
        r#"You are a researcher. Your goal is to find the most authoritative web pages
(official profiles, LinkedIn, company pages, top-tier news coverage) for the given subject.
Return every relevant page you find with its full text content.

Perform a web search for: {}"#,
        search_query
    )
}

pub fn build_entity_prompt(document: &Document, subject_name: &str) -> String {
    format!(
        r#"You are an expert data analyst. Extract all named entities from the text below.

INSTRUCTIONS:
1. Extract People, Companies and Locations only
2. Give each entity its name and its type (Person, Company or Location)
3. The main subject of the investigation is '{}'. Do NOT include them in the output
4. Only extract entities that appear in the text

SOURCE URL: {}

TEXT:
---
{}
---"#,
        subject_name, document.url, document.raw_content
    )
}

pub fn build_relationship_prompt(document: &Document, known_entities: &[String]) -> String {
    let vocabulary = known_entities
        .iter()
        .map(|name| format!("- {}", name))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        r#"You are an investigative analyst. Identify directed relationships between known entities.

KNOWN ENTITIES:
{}

RULES:
- Source and target must both be taken from the KNOWN ENTITIES list, spelled exactly as listed
- Relationship types are short uppercase verbs: FOUNDED, SUED, EMPLOYS, OWNS, INVESTED_IN, ACQUIRED, PARTNERED_WITH
- Only report relationships stated in the text below; do not use outside knowledge
- Return an empty list if the text states none

SOURCE URL: {}

TEXT:
---
{}
---"#,
        vocabulary, document.url, document.raw_content
    )
}

/// Append the JSON contract for `shape` to an instruction.
pub fn with_output_schema(instruction: &str, shape: ResultShape) -> String {
    format!(
        "{}\n\nOUTPUT FORMAT:\nRespond with ONLY a JSON object matching this schema, no markdown, no explanations:\n{}\n\nJSON OUTPUT:",
        instruction,
        shape.schema()
    )
}

pub fn build_retry_prompt(invalid_json: &str) -> String {
    format!(
        r#"The following JSON is invalid:

{}

Fix this JSON. Output only valid JSON with no markdown formatting, no code blocks, no explanations. Just the raw JSON object."#,
        invalid_json
    )
}
