use crate::pipeline::rag::types::QueryType;

/// Words in a response that warrant the urgent-care banner.
pub static EMERGENCY_KEYWORDS: &[&str] = &[
    "severe pain",
    "heavy bleeding",
    "hemorrhage",
    "ectopic",
    "emergency",
    "can't breathe",
    "chest pain",
    "suicidal",
];

pub const URGENT_CARE_BANNER: &str = "\n\n🚨 **IMPORTANT:** If you're experiencing severe symptoms like heavy bleeding, severe pain, or other emergency symptoms, please seek immediate medical attention by calling emergency services or going to the nearest emergency room.\n";

const FERTILITY_DISCLAIMER: &str = "\n\n💡 **Important Note:** This information is for educational purposes. Your individual situation requires personalized evaluation by a reproductive endocrinologist who can review your complete medical history, perform examinations, and order appropriate tests.";

const LAB_RESULTS_DISCLAIMER: &str = "\n\n⚕️ **Medical Disclaimer:** Lab value interpretation depends on your specific medical context, testing methods, and complete hormonal profile. Please discuss these results with your healthcare provider for personalized guidance.";

const TREATMENT_DISCLAIMER: &str = "\n\n⚠️ **Treatment Information:** Treatment decisions should be made with your reproductive endocrinologist based on your complete medical evaluation. This information helps you understand options, not choose treatment.";

const GENERAL_DISCLAIMER: &str = "\n\n💡 **Important:** This is educational information only. Always consult with your reproductive endocrinologist for medical advice specific to your situation.";

pub fn disclaimer_for(query_type: QueryType) -> &'static str {
    match query_type {
        QueryType::Fertility => FERTILITY_DISCLAIMER,
        QueryType::LabResults => LAB_RESULTS_DISCLAIMER,
        QueryType::Treatment => TREATMENT_DISCLAIMER,
        QueryType::General => GENERAL_DISCLAIMER,
    }
}

/// Case-insensitive scan for any emergency keyword.
pub fn mentions_emergency(text: &str) -> bool {
    let lower = text.to_lowercase();
    EMERGENCY_KEYWORDS.iter().any(|k| lower.contains(k))
}

/// The block appended to a response: banner (when warranted) then disclaimer.
pub fn disclaimer_block(response: &str, query_type: QueryType) -> (String, bool) {
    let urgent = mentions_emergency(response);
    let mut block = String::new();
    if urgent {
        block.push_str(URGENT_CARE_BANNER);
    }
    block.push_str(disclaimer_for(query_type));
    (block, urgent)
}
