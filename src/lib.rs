//! Urbia backend — a municipal services question-answering service.
//!
//! A structured knowledge corpus is rendered into documents, chunked,
//! embedded, and persisted into a sqlite-backed vector index. Incoming
//! questions are enhanced with domain vocabulary, answered from retrieved
//! evidence with a confidence score, and escalated to a multi-perspective
//! agent pipeline when retrieval confidence is low.

pub mod core;
pub mod escalation;
pub mod index;
pub mod knowledge;
pub mod llm;
pub mod retrieval;
pub mod server;
pub mod state;
