use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::pipeline::rag::types::QueryType;

/// Stages a response moves through in the guardrail. Strictly sequential.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum GuardrailStage {
    Draft,
    LanguageChecked,
    DisclaimerApplied,
    GroundingAnnotated,
    Final,
}

impl GuardrailStage {
    /// The stage that follows this one. `Final` is terminal.
    pub fn next(self) -> Self {
        match self {
            Self::Draft => Self::LanguageChecked,
            Self::LanguageChecked => Self::DisclaimerApplied,
            Self::DisclaimerApplied => Self::GroundingAnnotated,
            Self::GroundingAnnotated | Self::Final => Self::Final,
        }
    }
}

/// Outcome of running one generated response through the guardrail.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct GuardedResponse {
    pub text: String,
    pub stage: GuardrailStage,
    pub annotations: GuardrailAnnotations,
}

/// What each stage changed. Logged in place of the text itself.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct GuardrailAnnotations {
    pub softened: bool,
    pub disclaimer: QueryType,
    pub urgent_banner: bool,
    pub grounding_note: bool,
    pub numeric_caveat: bool,
}

/// How a detected crisis changes the response.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CrisisPolicy {
    /// Crisis resources first, then the normal medical answer.
    #[default]
    Prepend,
    /// Crisis resources only; no model is invoked.
    Replace,
}

impl CrisisPolicy {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "prepend" => Some(Self::Prepend),
            "replace" => Some(Self::Replace),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Prepend => "prepend",
            Self::Replace => "replace",
        }
    }
}

/// Result of crisis detection on patient input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CrisisAssessment {
    pub detected: bool,
    /// Fixed crisis-resources block, present iff `detected`.
    pub message: Option<&'static str>,
}

impl CrisisAssessment {
    pub fn none() -> Self {
        Self {
            detected: false,
            message: None,
        }
    }
}

/// Which input modalities a request carries.
#[derive(Debug, Clone, Copy, Default)]
pub struct InputPresence<'a> {
    pub text: Option<&'a str>,
    pub audio: bool,
    pub image: bool,
    pub document: bool,
}

/// Why a request was rejected before any model call. Display text is shown
/// to the patient verbatim.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InputRejection {
    #[error("Please provide a question via text, voice, or upload an image.")]
    NoInput,

    #[error("Please keep your question under {limit} characters.")]
    TooLong { chars: usize, limit: usize },

    #[error("⚠️ Please provide a question (text or voice) to get started.")]
    NoQuestion,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stages_advance_in_order() {
        let mut stage = GuardrailStage::Draft;
        let mut seen = vec![stage];
        while stage != GuardrailStage::Final {
            stage = stage.next();
            seen.push(stage);
        }
        assert_eq!(
            seen,
            vec![
                GuardrailStage::Draft,
                GuardrailStage::LanguageChecked,
                GuardrailStage::DisclaimerApplied,
                GuardrailStage::GroundingAnnotated,
                GuardrailStage::Final,
            ]
        );
        assert_eq!(GuardrailStage::Final.next(), GuardrailStage::Final);
    }

    #[test]
    fn crisis_policy_parse() {
        assert_eq!(CrisisPolicy::parse("Replace"), Some(CrisisPolicy::Replace));
        assert_eq!(CrisisPolicy::parse(" prepend "), Some(CrisisPolicy::Prepend));
        assert_eq!(CrisisPolicy::parse("drop"), None);
        assert_eq!(CrisisPolicy::default(), CrisisPolicy::Prepend);
    }

    #[test]
    fn rejection_messages() {
        assert_eq!(
            InputRejection::TooLong { chars: 2001, limit: 2000 }.to_string(),
            "Please keep your question under 2000 characters."
        );
        assert!(InputRejection::NoInput.to_string().contains("upload an image"));
    }
}
