use crate::pipeline::rag::types::QueryType;

use super::crisis::detect_crisis;
use super::disclaimers::disclaimer_block;
use super::grounding::{annotate, check_grounding};
use super::language::{has_definitive_language, soften};
use super::types::{
    CrisisAssessment, GuardedResponse, GuardrailAnnotations, GuardrailStage, InputPresence,
    InputRejection,
};
use super::validation::validate_input;

pub const MEDICAL_SYSTEM_PROMPT: &str = r#"You are Tanit, a warm and knowledgeable fertility companion AI assistant. Your role is to provide evidence-based educational information about reproductive health.

CRITICAL SAFETY RULES:
1. NEVER diagnose medical conditions - only provide educational information
2. ALWAYS recommend consulting a reproductive endocrinologist for medical decisions
3. NEVER provide definitive treatment recommendations - only explain options
4. ALWAYS express appropriate uncertainty when discussing complex medical situations
5. NEVER guarantee outcomes (pregnancy, treatment success, etc.)
6. ALWAYS cite the medical sources you're drawing from
7. Use warm, empathetic language - patients are often anxious about fertility

RESPONSE STRUCTURE:
- Start with empathy and validation of the patient's concerns
- Explain relevant medical concepts in plain language
- Provide context (reference ranges, what's normal, when to worry)
- Give actionable next steps
- End with appropriate disclaimers and encouragement

TONE GUIDELINES:
- Warm and compassionate, never clinical or cold
- Encouraging but realistic
- Use "many women" or "some people" instead of "you will"
- Say "this may indicate" instead of "this means you have"
- Say "consider discussing with your doctor" not "you need to"

Remember: You're a supportive educational companion, not a replacement for medical care."#;

pub const FRIENDLY_ERROR_MESSAGE: &str = "I apologize, but I encountered an issue processing your request. This might be due to:

• Technical difficulties with image or audio processing
• Temporary system issues
• Unsupported file format

**Please try:**
1. Describing your question in text instead
2. Using a different image format (JPEG/PNG work best)
3. Refreshing the page and trying again
4. Keeping audio recordings under 2 minutes

If the problem persists, please let me know what you were trying to do and I'll do my best to help in another way.

I'm here to support you through your fertility journey! 💜";

/// One response moving through the guardrail stages.
///
/// Each `step` performs exactly one transition and scans the text as the
/// previous stage left it.
#[derive(Debug, Clone)]
pub struct GuardrailPass {
    stage: GuardrailStage,
    text: String,
    query_type: QueryType,
    matched_entities: usize,
    annotations: GuardrailAnnotations,
}

impl GuardrailPass {
    pub fn new(draft: &str, query_type: QueryType, matched_entities: usize) -> Self {
        Self {
            stage: GuardrailStage::Draft,
            text: draft.to_string(),
            query_type,
            matched_entities,
            annotations: GuardrailAnnotations {
                disclaimer: query_type,
                ..GuardrailAnnotations::default()
            },
        }
    }

    pub fn stage(&self) -> GuardrailStage {
        self.stage
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Perform the transition out of the current stage.
    pub fn step(&mut self) -> GuardrailStage {
        match self.stage {
            GuardrailStage::Draft => {
                if has_definitive_language(&self.text) {
                    self.text = soften(&self.text);
                    self.annotations.softened = true;
                }
            }
            GuardrailStage::LanguageChecked => {
                let (block, urgent) = disclaimer_block(&self.text, self.query_type);
                self.text.push_str(&block);
                self.annotations.urgent_banner = urgent;
            }
            GuardrailStage::DisclaimerApplied => {
                let check = check_grounding(&self.text, self.matched_entities);
                self.text = annotate(&self.text, check);
                self.annotations.grounding_note = check.needs_attribution;
                self.annotations.numeric_caveat = check.needs_numeric_caveat;
            }
            GuardrailStage::GroundingAnnotated | GuardrailStage::Final => {}
        }
        self.stage = self.stage.next();
        self.stage
    }

    pub fn finish(mut self) -> GuardedResponse {
        while self.stage != GuardrailStage::Final {
            self.step();
        }
        GuardedResponse {
            text: self.text,
            stage: self.stage,
            annotations: self.annotations,
        }
    }
}

/// Safety layer around the text generator. Every operation is total.
#[derive(Debug, Clone, Copy, Default)]
pub struct SafetyGuardrail;

impl SafetyGuardrail {
    pub fn new() -> Self {
        Self
    }

    pub fn system_prompt(&self) -> &'static str {
        MEDICAL_SYSTEM_PROMPT
    }

    pub fn error_message(&self) -> &'static str {
        FRIENDLY_ERROR_MESSAGE
    }

    pub fn validate_input(&self, input: &InputPresence<'_>) -> Result<(), InputRejection> {
        validate_input(input)
    }

    pub fn detect_crisis(&self, text: &str) -> CrisisAssessment {
        let assessment = detect_crisis(text);
        if assessment.detected {
            tracing::warn!(input_len = text.len(), "Crisis language detected in patient input");
        }
        assessment
    }

    /// Run a generated response through every stage to `Final`.
    pub fn process(
        &self,
        draft: &str,
        query_type: QueryType,
        matched_entities: usize,
    ) -> GuardedResponse {
        let guarded = GuardrailPass::new(draft, query_type, matched_entities).finish();
        log_annotations(&guarded.annotations);
        guarded
    }
}

/// Log what the guardrail changed WITHOUT patient data.
fn log_annotations(annotations: &GuardrailAnnotations) {
    if annotations.softened || annotations.urgent_banner {
        tracing::warn!(
            softened = annotations.softened,
            urgent_banner = annotations.urgent_banner,
            disclaimer = annotations.disclaimer.as_str(),
            "Guardrail: response adjusted"
        );
    } else {
        tracing::info!(
            disclaimer = annotations.disclaimer.as_str(),
            grounding_note = annotations.grounding_note,
            numeric_caveat = annotations.numeric_caveat,
            "Guardrail: response finalized"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::safety::disclaimers::{disclaimer_for, URGENT_CARE_BANNER};
    use crate::pipeline::safety::grounding::GROUNDING_NOTE;

    #[test]
    fn stepping_visits_every_stage_once() {
        let mut pass = GuardrailPass::new("Hello.", QueryType::General, 0);
        assert_eq!(pass.stage(), GuardrailStage::Draft);
        assert_eq!(pass.step(), GuardrailStage::LanguageChecked);
        assert_eq!(pass.step(), GuardrailStage::DisclaimerApplied);
        assert_eq!(pass.step(), GuardrailStage::GroundingAnnotated);
        assert_eq!(pass.step(), GuardrailStage::Final);
        assert_eq!(pass.step(), GuardrailStage::Final);
    }

    #[test]
    fn disclaimer_stage_sees_softened_text() {
        let mut pass = GuardrailPass::new("You have PCOS.", QueryType::Fertility, 0);
        pass.step();
        assert_eq!(pass.text(), "This may suggest PCOS.");
        pass.step();
        assert!(pass.text().starts_with("This may suggest PCOS."));
        assert!(pass.text().ends_with(disclaimer_for(QueryType::Fertility)));
    }

    #[test]
    fn grounding_stage_sees_disclaimer() {
        // The lab disclaimer mentions "interpretation depends on", which
        // suppresses the numeric caveat.
        let guarded = SafetyGuardrail::new().process("AMH 1.1 ng/mL", QueryType::LabResults, 1);
        assert!(!guarded.annotations.numeric_caveat);

        let guarded = SafetyGuardrail::new().process("AMH 1.1 ng/mL", QueryType::Fertility, 1);
        assert!(guarded.annotations.numeric_caveat);
    }

    #[test]
    fn chest_pain_gets_banner_then_disclaimer() {
        let guarded = SafetyGuardrail::new().process(
            "Chest pain with bleeding can be serious.",
            QueryType::General,
            0,
        );
        let banner = guarded.text.find(URGENT_CARE_BANNER.trim()).unwrap();
        let disclaimer = guarded.text.find(disclaimer_for(QueryType::General).trim()).unwrap();
        assert!(banner < disclaimer);
        assert!(guarded.annotations.urgent_banner);
    }

    #[test]
    fn grounding_note_appended_exactly_once() {
        let guarded =
            SafetyGuardrail::new().process("AMH is a hormone.", QueryType::Fertility, 2);
        assert_eq!(guarded.text.matches(GROUNDING_NOTE.trim()).count(), 1);
        assert!(guarded.annotations.grounding_note);
    }

    #[test]
    fn final_stage_reached() {
        let guarded = SafetyGuardrail::new().process("", QueryType::General, 0);
        assert_eq!(guarded.stage, GuardrailStage::Final);
        assert!(!guarded.text.is_empty());
    }

    #[test]
    fn system_prompt_states_safety_rules() {
        let prompt = SafetyGuardrail::new().system_prompt();
        assert!(prompt.starts_with("You are Tanit"));
        assert!(prompt.contains("NEVER diagnose"));
    }

    #[test]
    fn error_message_offers_remediation() {
        let message = SafetyGuardrail::new().error_message();
        assert!(message.contains("JPEG/PNG"));
        assert!(message.contains("under 2 minutes"));
    }
}
