pub mod gate;
pub mod pipeline;

pub use gate::{AnswerMethod, EscalationGate, GateAnswer};
pub use pipeline::{AgentPipeline, EscalationPipeline};
