pub mod latency;
pub mod models;
pub mod orchestrator;
pub mod rag;
pub mod safety;

pub use orchestrator::{
    AnswerDetails, AssistOutcome, AssistRequest, AssistantPipeline, PipelineConfig, PipelineError,
};
