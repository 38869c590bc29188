//! Corpus loading.
//!
//! The knowledge source is a JSON document of the shape
//! `{ "knowledge_base": { <category>: [ <record>, ... ], ... } }`.
//! Every record becomes one [`Document`]: a labeled-line rendering of its
//! fields plus retrieval metadata. Chunking happens downstream.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::core::errors::AssistantError;

const ROOT_KEY: &str = "knowledge_base";
const RESERVED_KEYS: [&str; 4] = ["title", "category", "content", "id"];

/// Retrieval metadata carried by a document and inherited unchanged by
/// every chunk cut from it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocMetadata {
    pub id: String,
    pub title: String,
    pub category: String,
    /// The key of the knowledge section the record came from, which may
    /// differ from the record's own `category` field.
    pub source_category: String,
}

/// A normalized textual rendering of one knowledge record.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub text: String,
    pub metadata: DocMetadata,
}

/// Read and parse the corpus file, then load its documents.
///
/// An unreadable or non-JSON file is malformed corpus data and therefore
/// fatal, like a non-mapping top level.
pub fn load_documents_from_file(path: &Path) -> Result<Vec<Document>, AssistantError> {
    let raw = fs::read_to_string(path).map_err(|e| {
        AssistantError::CorpusFormat(format!("cannot read {}: {}", path.display(), e))
    })?;
    let corpus: Value = serde_json::from_str(&raw).map_err(|e| {
        AssistantError::CorpusFormat(format!("invalid JSON in {}: {}", path.display(), e))
    })?;
    load_documents(&corpus)
}

/// Convert the corpus into one document per record.
///
/// Sections whose value is not a list are skipped silently, as are
/// records that are not mappings; the only hard failure is a top level
/// that is not a mapping.
pub fn load_documents(corpus: &Value) -> Result<Vec<Document>, AssistantError> {
    let root = corpus
        .as_object()
        .ok_or_else(|| AssistantError::CorpusFormat("top-level corpus must be a mapping".into()))?;

    let mut documents = Vec::new();

    let sections = match root.get(ROOT_KEY).and_then(Value::as_object) {
        Some(sections) => sections,
        None => {
            tracing::warn!("corpus has no '{}' section", ROOT_KEY);
            return Ok(documents);
        }
    };

    for (category, items) in sections {
        let Some(items) = items.as_array() else {
            tracing::debug!("skipping non-list knowledge section '{}'", category);
            continue;
        };

        for item in items {
            let Some(record) = item.as_object() else {
                tracing::debug!("skipping non-mapping record in '{}'", category);
                continue;
            };
            documents.push(render_record(category, record));
        }
    }

    tracing::info!("loaded {} documents from corpus", documents.len());
    Ok(documents)
}

fn render_record(source_category: &str, record: &Map<String, Value>) -> Document {
    let field = |key: &str| {
        record
            .get(key)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    };

    let mut text = String::new();
    text.push_str(&format!("Title: {}\n", field("title")));
    text.push_str(&format!("Category: {}\n", field("category")));
    text.push_str(&format!("Content: {}\n", field("content")));

    // Remaining fields keep their original order (serde_json preserve_order).
    for (key, value) in record {
        if RESERVED_KEYS.contains(&key.as_str()) {
            continue;
        }
        text.push_str(&format!("{}: {}\n", title_case(key), render_value(value)));
    }

    Document {
        text,
        metadata: DocMetadata {
            id: field("id"),
            title: field("title"),
            category: field("category"),
            source_category: source_category.to_string(),
        },
    }
}

/// Uppercase each letter that follows a non-letter, lowercase the rest:
/// `phone_number` becomes `Phone_Number`.
fn title_case(key: &str) -> String {
    let mut out = String::with_capacity(key.len());
    let mut prev_alpha = false;
    for ch in key.chars() {
        if ch.is_alphabetic() {
            if prev_alpha {
                out.extend(ch.to_lowercase());
            } else {
                out.extend(ch.to_uppercase());
            }
            prev_alpha = true;
        } else {
            out.push(ch);
            prev_alpha = false;
        }
    }
    out
}

fn render_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
