//! The escalation gate.
//!
//! Decides per question whether the direct retrieval answer is
//! trustworthy or the agent pipeline should be consulted. Escalation is
//! expensive — several generation calls — so the confidence threshold is
//! the cost/latency dial. Whatever happens below it, the gate always
//! returns a valid answer: a pipeline failure falls back to the direct
//! result.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::time::timeout;

use crate::core::config::Settings;
use crate::retrieval::{QueryEngine, QueryResult};

use super::pipeline::EscalationPipeline;

/// How the answer was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AnswerMethod {
    #[serde(rename = "direct")]
    Direct,
    #[serde(rename = "delegated")]
    Delegated,
    #[serde(rename = "fallback-to-direct")]
    FallbackToDirect,
}

impl std::fmt::Display for AnswerMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            AnswerMethod::Direct => "direct",
            AnswerMethod::Delegated => "delegated",
            AnswerMethod::FallbackToDirect => "fallback-to-direct",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct GateAnswer {
    pub answer: String,
    /// Always the direct result's confidence: the pipeline is not itself
    /// confidence-scored, so the direct metadata stands in for it.
    pub confidence: f64,
    pub sources: Vec<String>,
    pub method: AnswerMethod,
}

pub struct EscalationGate {
    engine: Arc<QueryEngine>,
    pipeline: Arc<dyn EscalationPipeline>,
    escalation_threshold: f64,
    escalation_timeout: Duration,
}

impl EscalationGate {
    pub fn new(
        engine: Arc<QueryEngine>,
        pipeline: Arc<dyn EscalationPipeline>,
        settings: &Settings,
    ) -> Self {
        Self {
            engine,
            pipeline,
            escalation_threshold: settings.escalation_threshold,
            escalation_timeout: settings.escalation_timeout(),
        }
    }

    pub async fn answer(&self, question: &str) -> GateAnswer {
        let direct = self.engine.query(question).await;

        if direct.confidence >= self.escalation_threshold {
            return Self::from_direct(direct, AnswerMethod::Direct);
        }

        tracing::info!(
            "confidence {:.2} below threshold {:.2}, escalating",
            direct.confidence,
            self.escalation_threshold
        );

        // The pipeline gets the original question, not a reformulation.
        let delegated = timeout(self.escalation_timeout, self.pipeline.run(question)).await;

        match delegated {
            Ok(Ok(text)) => GateAnswer {
                answer: text,
                confidence: direct.confidence,
                sources: direct.sources,
                method: AnswerMethod::Delegated,
            },
            Ok(Err(err)) => {
                tracing::warn!("escalation failed ({}), falling back to direct answer", err);
                Self::from_direct(direct, AnswerMethod::FallbackToDirect)
            }
            Err(_) => {
                tracing::warn!("escalation timed out, falling back to direct answer");
                Self::from_direct(direct, AnswerMethod::FallbackToDirect)
            }
        }
    }

    fn from_direct(direct: QueryResult, method: AnswerMethod) -> GateAnswer {
        GateAnswer {
            answer: direct.answer,
            confidence: direct.confidence,
            sources: direct.sources,
            method,
        }
    }
}
