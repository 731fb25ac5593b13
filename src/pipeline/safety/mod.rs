pub mod types;
pub mod language;
pub mod disclaimers;
pub mod grounding;
pub mod crisis;
pub mod validation;
pub mod guardrail;

pub use guardrail::{GuardrailPass, SafetyGuardrail, FRIENDLY_ERROR_MESSAGE, MEDICAL_SYSTEM_PROMPT};
pub use types::{
    CrisisAssessment, CrisisPolicy, GuardedResponse, GuardrailAnnotations, GuardrailStage,
    InputPresence, InputRejection,
};
