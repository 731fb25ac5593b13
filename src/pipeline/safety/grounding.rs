/// Phrases that count as the response citing its sources.
pub static CITATION_INDICATORS: &[&str] = &[
    "according to",
    "studies show",
    "research indicates",
    "guidelines recommend",
    "asrm",
    "eshre",
    "clinical",
];

pub const GROUNDING_NOTE: &str = "\n\n📚 *This response is based on established clinical guidelines and medical research from reproductive health organizations.*";

pub const NUMERIC_CAVEAT: &str = "\n\n📊 *Note: Interpretation of hormone values depends on age, cycle day, testing method, and individual circumstances.*";

const HORMONE_UNITS: &[&str] = &["ng/ml", "miu/ml"];
const RANGE_MENTIONS: &[&str] = &["reference range", "normal range"];
const INTERPRETATION_MENTION: &str = "interpretation depends on";

/// Annotations decided for one response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GroundingCheck {
    pub needs_attribution: bool,
    pub needs_numeric_caveat: bool,
}

/// Decide which notes `response` needs given how many entities were
/// retrieved for it. Both checks read the response as it stands before
/// either note is added.
pub fn check_grounding(response: &str, matched_entities: usize) -> GroundingCheck {
    let lower = response.to_lowercase();

    let cites_source = CITATION_INDICATORS.iter().any(|i| lower.contains(i));
    let needs_attribution = !cites_source && matched_entities > 0;

    let needs_numeric_caveat = response.chars().any(|c| c.is_ascii_digit())
        && HORMONE_UNITS.iter().any(|u| lower.contains(u))
        && !RANGE_MENTIONS.iter().any(|r| lower.contains(r))
        && !lower.contains(INTERPRETATION_MENTION);

    GroundingCheck {
        needs_attribution,
        needs_numeric_caveat,
    }
}

/// Append the notes selected by `check` in fixed order.
pub fn annotate(response: &str, check: GroundingCheck) -> String {
    let mut out = response.to_string();
    if check.needs_attribution {
        out.push_str(GROUNDING_NOTE);
    }
    if check.needs_numeric_caveat {
        out.push_str(NUMERIC_CAVEAT);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uncited_response_with_entities_gets_note() {
        let check = check_grounding("AMH reflects egg quantity.", 1);
        assert!(check.needs_attribution);
        let annotated = annotate("AMH reflects egg quantity.", check);
        assert!(annotated.ends_with(GROUNDING_NOTE));
    }

    #[test]
    fn no_entities_means_no_note() {
        assert!(!check_grounding("AMH reflects egg quantity.", 0).needs_attribution);
    }

    #[test]
    fn cited_response_is_left_alone() {
        for text in [
            "According to ASRM, AMH declines.",
            "ESHRE says so",
            "Studies show improvement",
            "a clinical view",
        ] {
            assert!(!check_grounding(text, 3).needs_attribution, "{text}");
        }
    }

    #[test]
    fn note_is_added_exactly_once() {
        let first = annotate("Plain answer.", check_grounding("Plain answer.", 2));
        let second = annotate(&first, check_grounding(&first, 2));
        assert_eq!(first, second);
        assert_eq!(second.matches("📚").count(), 1);
    }

    #[test]
    fn bare_hormone_value_gets_caveat() {
        let check = check_grounding("Your AMH of 1.1 ng/mL is noted.", 0);
        assert!(check.needs_numeric_caveat);
    }

    #[test]
    fn caveat_suppressed_by_range_or_interpretation_text() {
        assert!(!check_grounding("AMH 1.1 ng/mL, reference range 1.0-3.0", 0).needs_numeric_caveat);
        assert!(!check_grounding("FSH 9 mIU/mL; normal range varies", 0).needs_numeric_caveat);
        assert!(
            !check_grounding("AMH 1.1 ng/mL. Interpretation depends on age.", 0).needs_numeric_caveat
        );
    }

    #[test]
    fn caveat_needs_digit_and_unit() {
        assert!(!check_grounding("measured in ng/mL", 0).needs_numeric_caveat);
        assert!(!check_grounding("AMH is 1.1", 0).needs_numeric_caveat);
    }

    #[test]
    fn notes_appear_in_fixed_order() {
        let text = "AMH 1.1 ng/mL";
        let annotated = annotate(text, check_grounding(text, 1));
        let note = annotated.find("📚").unwrap();
        let caveat = annotated.find("📊").unwrap();
        assert!(note < caveat);
    }
}
