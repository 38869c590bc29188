//! Multi-perspective agent pipeline.
//!
//! When direct retrieval is not confident enough, the question is walked
//! through a fixed sequence of role-prompted passes: an information
//! retriever, a policy expert, and a service coordinator. Each stage sees
//! the knowledge-base search result and the output of earlier stages,
//! and each retries once on failure. The pipeline's answer is the last
//! successful stage's output; only a total failure of every stage
//! surfaces as an error, which the gate absorbs.

use std::sync::Arc;

use async_trait::async_trait;

use crate::core::errors::AssistantError;
use crate::llm::LlmProvider;
use crate::retrieval::QueryEngine;

/// Black-box boundary for the escalation fallback: a question in, an
/// answer out, failure allowed.
#[async_trait]
pub trait EscalationPipeline: Send + Sync {
    async fn run(&self, question: &str) -> Result<String, AssistantError>;
}

struct Stage {
    role: &'static str,
    goal: &'static str,
    task: &'static str,
    expected: &'static str,
}

const STAGES: [Stage; 3] = [
    Stage {
        role: "Information Retriever",
        goal: "find accurate information from the city knowledge base",
        task: "Search for information about",
        expected: "Detailed factual information about the question",
    },
    Stage {
        role: "Policy Expert",
        goal: "provide guidance on city policies, ordinances, and compliance requirements",
        task: "Check whether there are policy or regulatory aspects to",
        expected: "Policy and regulatory information related to the question",
    },
    Stage {
        role: "Service Coordinator",
        goal: "help citizens navigate city services and connect with the right department",
        task: "Provide comprehensive guidance for",
        expected: "Step-by-step guidance addressing the citizen's question",
    },
];

const STAGE_ATTEMPTS: usize = 2;

pub struct AgentPipeline {
    provider: Arc<dyn LlmProvider>,
    engine: Arc<QueryEngine>,
}

impl AgentPipeline {
    pub fn new(provider: Arc<dyn LlmProvider>, engine: Arc<QueryEngine>) -> Self {
        Self { provider, engine }
    }

    fn stage_prompt(stage: &Stage, question: &str, search_result: &str, notes: &[String]) -> String {
        let mut prompt = format!(
            "You are the {}. Your goal is to {}.\n\
             \n\
             City knowledge base search result:\n\
             {}\n",
            stage.role, stage.goal, search_result
        );

        if !notes.is_empty() {
            prompt.push_str("\nFindings from earlier specialists:\n");
            for note in notes {
                prompt.push_str(note);
                prompt.push('\n');
            }
        }

        prompt.push_str(&format!(
            "\n{}: {}\n\nExpected output: {}\n",
            stage.task, question, stage.expected
        ));
        prompt
    }
}

#[async_trait]
impl EscalationPipeline for AgentPipeline {
    async fn run(&self, question: &str) -> Result<String, AssistantError> {
        // The search tool each stage consults is the direct retrieval
        // answer for the original question.
        let search_result = self.engine.query(question).await.answer;

        let mut notes: Vec<String> = Vec::new();
        let mut last_output: Option<String> = None;

        for stage in &STAGES {
            let prompt = Self::stage_prompt(stage, question, &search_result, &notes);

            for attempt in 1..=STAGE_ATTEMPTS {
                match self.provider.generate(&prompt).await {
                    Ok(output) => {
                        notes.push(format!("[{}] {}", stage.role, output));
                        last_output = Some(output);
                        break;
                    }
                    Err(err) => {
                        tracing::warn!(
                            "{} stage failed (attempt {}/{}): {}",
                            stage.role,
                            attempt,
                            STAGE_ATTEMPTS,
                            err
                        );
                    }
                }
            }
        }

        last_output.ok_or_else(|| {
            AssistantError::Escalation("every pipeline stage failed".to_string())
        })
    }
}
