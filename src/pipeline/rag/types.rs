use serde::{Deserialize, Serialize};

use crate::knowledge::KnowledgeEntity;

/// Query classification; selects the disclaimer template.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum QueryType {
    Fertility,
    LabResults,
    Treatment,
    #[default]
    General,
}

impl QueryType {
    /// Total parse: anything unrecognized is `General`.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_lowercase().replace('-', "_").as_str() {
            "fertility" => Self::Fertility,
            "lab_results" | "labs" | "lab" => Self::LabResults,
            "treatment" => Self::Treatment,
            _ => Self::General,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fertility => "fertility",
            Self::LabResults => "lab_results",
            Self::Treatment => "treatment",
            Self::General => "general",
        }
    }
}

/// One entry of the declarative keyword table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeywordRule {
    /// Lowercase keyword or phrase, matched as a substring.
    pub keyword: &'static str,
    pub entity_keys: &'static [&'static str],
}

/// Knowledge retrieved for one query. Never cached across queries.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RetrievalResult {
    /// Matched entities, deduplicated, in keyword-table order.
    pub entities: Vec<KnowledgeEntity>,
    /// Union of entity citations, deduplicated, first-seen order.
    pub sources: Vec<String>,
    /// Rendering ready for prompt injection.
    pub formatted_context: String,
    /// True when no keyword matched and the default entities were used.
    pub used_fallback: bool,
}

impl RetrievalResult {
    pub fn has_matches(&self) -> bool {
        !self.entities.is_empty()
    }

    pub fn entity_keys(&self) -> Vec<&str> {
        self.entities.iter().map(|e| e.key.as_str()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_type_parse_is_total() {
        assert_eq!(QueryType::parse("fertility"), QueryType::Fertility);
        assert_eq!(QueryType::parse("Lab-Results"), QueryType::LabResults);
        assert_eq!(QueryType::parse(" treatment "), QueryType::Treatment);
        assert_eq!(QueryType::parse("astrology"), QueryType::General);
        assert_eq!(QueryType::parse(""), QueryType::General);
    }

    #[test]
    fn query_type_serializes_snake_case() {
        let json = serde_json::to_string(&QueryType::LabResults).unwrap();
        assert_eq!(json, "\"lab_results\"");
        assert_eq!(QueryType::LabResults.as_str(), "lab_results");
    }

    #[test]
    fn default_query_type_is_general() {
        assert_eq!(QueryType::default(), QueryType::General);
    }

    #[test]
    fn empty_result_has_no_matches() {
        let result = RetrievalResult::default();
        assert!(!result.has_matches());
        assert!(result.entity_keys().is_empty());
    }
}
