use super::types::CrisisAssessment;

pub static CRISIS_KEYWORDS: &[&str] = &[
    "want to die",
    "kill myself",
    "end it all",
    "suicide",
    "no reason to live",
    "better off dead",
];

pub const CRISIS_RESOURCES: &str = "

🆘 **Crisis Support:**

If you're having thoughts of suicide or self-harm, please reach out for immediate help:

**United States:**
- National Suicide Prevention Lifeline: 988 or 1-800-273-8255
- Crisis Text Line: Text HOME to 741741

**International:**
- Find your country's helpline: https://findahelpline.com

You don't have to go through this alone. Please talk to someone who can help right now.

For fertility-related emotional support, consider:
- RESOLVE: The National Infertility Association
- Fertility counseling services
- Support groups in your area

Your life matters. Please reach out for help. 💜";

/// Case-insensitive crisis scan. Total: empty input is simply not a crisis.
pub fn detect_crisis(text: &str) -> CrisisAssessment {
    let lower = text.to_lowercase();
    if CRISIS_KEYWORDS.iter().any(|k| lower.contains(k)) {
        CrisisAssessment {
            detected: true,
            message: Some(CRISIS_RESOURCES),
        }
    } else {
        CrisisAssessment::none()
    }
}
