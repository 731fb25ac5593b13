use std::sync::LazyLock;

use regex::Regex;

/// Definitive phrasing and its softer replacement.
pub static SOFTENING_TABLE: &[(&str, &str)] = &[
    ("you have", "this may suggest"),
    ("you are diagnosed", "you may have been diagnosed"),
    ("you definitely", "this could indicate"),
    ("this is", "this may be"),
    ("you need to take", "your doctor might recommend"),
    ("you must", "it's often recommended to"),
];

/// One alternation over every definitive phrase, so distinct phrases are
/// replaced in a single left-to-right pass regardless of table order.
static DEFINITIVE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    let alternation = SOFTENING_TABLE
        .iter()
        .map(|(phrase, _)| regex::escape(phrase))
        .collect::<Vec<_>>()
        .join("|");
    Regex::new(&format!("(?i)(?:{alternation})")).unwrap()
});

/// True if the text contains any definitive phrase, in any case.
pub fn has_definitive_language(text: &str) -> bool {
    DEFINITIVE_PATTERN.is_match(text)
}

/// Replace every definitive phrase with its softer counterpart.
///
/// Matching is a literal, case-insensitive substring search. A match that
/// begins with an uppercase letter gets a capitalized replacement. Applying
/// this twice yields the same text as applying it once.
pub fn soften(text: &str) -> String {
    DEFINITIVE_PATTERN
        .replace_all(text, |caps: &regex::Captures| {
            let matched = &caps[0];
            let lower = matched.to_lowercase();
            let Some((_, softer)) = SOFTENING_TABLE.iter().find(|(phrase, _)| *phrase == lower)
            else {
                return matched.to_string();
            };
            if matched.chars().next().is_some_and(char::is_uppercase) {
                capitalize(softer)
            } else {
                (*softer).to_string()
            }
        })
        .into_owned()
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn softens_each_phrase() {
        assert_eq!(soften("you have low AMH"), "this may suggest low AMH");
        assert_eq!(soften("you must rest"), "it's often recommended to rest");
        assert_eq!(soften("you need to take folic acid"), "your doctor might recommend folic acid");
        assert_eq!(soften("you are diagnosed with PCOS"), "you may have been diagnosed with PCOS");
        assert_eq!(soften("you definitely ovulated"), "this could indicate ovulated");
        assert_eq!(soften("this is normal"), "this may be normal");
    }

    #[test]
    fn matching_ignores_case() {
        assert_eq!(soften("You have PCOS."), "This may suggest PCOS.");
        assert_eq!(soften("THIS IS fine"), "This may be fine");
        assert!(has_definitive_language("YOU MUST"));
    }

    #[test]
    fn replaces_every_occurrence() {
        assert_eq!(
            soften("this is low and this is common"),
            "this may be low and this may be common"
        );
    }

    #[test]
    fn softening_is_idempotent() {
        let samples = [
            "You have PCOS. This is common, and you must see a doctor.",
            "you are diagnosed; you definitely need to take it; you need to take iron",
            "Nothing definitive here.",
            "this isthis is you haveyou have",
        ];
        for sample in samples {
            let once = soften(sample);
            assert_eq!(soften(&once), once, "{sample}");
            assert!(!has_definitive_language(&once), "{once}");
        }
    }

    #[test]
    fn clean_text_is_untouched() {
        let text = "Many women with PCOS conceive. Consider discussing with your doctor.";
        assert!(!has_definitive_language(text));
        assert_eq!(soften(text), text);
    }
}
