use super::types::RetrievalResult;

/// Instruction sent with a single uploaded image (lab report, ultrasound, chart).
pub const IMAGE_EXTRACTION_PROMPT: &str = "You are analyzing a medical document. \
Extract all visible information including: hormone values with units, reference ranges, \
dates, patient age, and any medical measurements. Be precise and complete.";

/// Instruction sent with each image embedded in an uploaded PDF.
pub const PDF_IMAGE_EXTRACTION_PROMPT: &str = "Extract all visible medical data: \
hormone values, dates, reference ranges, measurements.";

/// Text handed to the retriever: the question plus any extracted visual data.
pub fn retrieval_query(question: &str, visual_context: &str) -> String {
    if visual_context.trim().is_empty() {
        question.to_string()
    } else {
        format!("{question} {visual_context}")
    }
}

/// Build the user prompt for the text generator.
pub fn build_user_prompt(
    question: &str,
    visual_context: &str,
    retrieval: &RetrievalResult,
) -> String {
    let mut prompt = String::new();

    prompt.push_str(&format!("Patient Query: {question}\n\n"));

    if !visual_context.trim().is_empty() {
        prompt.push_str(&format!(
            "Visual Analysis (VLM extracted data): {}\n\n",
            visual_context.trim()
        ));
    }

    prompt.push_str("Relevant Medical Knowledge:\n");
    prompt.push_str(&retrieval.formatted_context);
    prompt.push_str("\n\n");

    prompt.push_str(
        "Instructions:\n\
         - Provide a warm, empathetic, evidence-based response\n\
         - Explain medical terms in plain language\n\
         - Reference the knowledge sources you're drawing from\n\
         - Give actionable next steps when appropriate\n\
         - Include appropriate medical disclaimers\n\
         - Be encouraging and supportive",
    );

    prompt
}

#[cfg(test)]
mod tests {
    use super::*;

    fn retrieval(context: &str) -> RetrievalResult {
        RetrievalResult {
            formatted_context: context.to_string(),
            ..RetrievalResult::default()
        }
    }

    #[test]
    fn retrieval_query_appends_visual_context() {
        assert_eq!(retrieval_query("Is this ok?", "AMH: 1.1 ng/mL"), "Is this ok? AMH: 1.1 ng/mL");
        assert_eq!(retrieval_query("Is this ok?", "  "), "Is this ok?");
    }

    #[test]
    fn prompt_contains_query_and_knowledge() {
        let prompt = build_user_prompt("What is AMH?", "", &retrieval("### AMH Levels"));
        assert!(prompt.starts_with("Patient Query: What is AMH?"));
        assert!(prompt.contains("### AMH Levels"));
        assert!(prompt.contains("Instructions:"));
    }

    #[test]
    fn visual_section_only_when_present() {
        let without = build_user_prompt("q", "", &retrieval("ctx"));
        assert!(!without.contains("Visual Analysis"));

        let with = build_user_prompt("q", "FSH: 8.2 mIU/mL", &retrieval("ctx"));
        assert!(with.contains("Visual Analysis (VLM extracted data): FSH: 8.2 mIU/mL"));
    }

    #[test]
    fn extraction_prompts_ask_for_reference_ranges() {
        assert!(IMAGE_EXTRACTION_PROMPT.contains("reference ranges"));
        assert!(PDF_IMAGE_EXTRACTION_PROMPT.contains("reference ranges"));
    }
}
