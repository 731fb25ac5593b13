use std::sync::Arc;

use super::context::format_context;
use super::keywords::FERTILITY_KEYWORDS;
use super::types::{KeywordRule, RetrievalResult};
use crate::knowledge::KnowledgeStore;

/// Number of store entities returned when no keyword matches.
pub const FALLBACK_ENTITY_COUNT: usize = 2;

/// Keyword-driven lookup over the knowledge store.
///
/// Matching is a plain substring union; there is no scoring and no graph
/// traversal, whatever `top_k`/`include_subgraph` say.
#[derive(Debug, Clone)]
pub struct KnowledgeRetriever {
    store: Arc<KnowledgeStore>,
    table: &'static [KeywordRule],
}

impl KnowledgeRetriever {
    pub fn new(store: Arc<KnowledgeStore>) -> Self {
        Self::with_table(store, FERTILITY_KEYWORDS)
    }

    pub fn with_table(store: Arc<KnowledgeStore>, table: &'static [KeywordRule]) -> Self {
        Self { store, table }
    }

    pub fn store(&self) -> &KnowledgeStore {
        &self.store
    }

    /// Retrieve the entities relevant to `query_text`.
    ///
    /// `top_k` and `include_subgraph` are accepted for interface
    /// compatibility with graph retrievers and do not affect the result.
    pub fn retrieve(
        &self,
        query_text: &str,
        _top_k: usize,
        _include_subgraph: bool,
    ) -> RetrievalResult {
        let normalized = query_text.to_lowercase();

        let mut candidates = match_keywords(self.table, &normalized);
        let used_fallback = candidates.is_empty();
        if used_fallback {
            candidates = self
                .store
                .keys()
                .take(FALLBACK_ENTITY_COUNT)
                .map(str::to_string)
                .collect();
        }

        let mut entities = Vec::with_capacity(candidates.len());
        let mut sources: Vec<String> = Vec::new();
        for key in &candidates {
            let Some(entity) = self.store.get(key) else {
                tracing::debug!(entity = %key, "Keyword maps to entity absent from store, skipping");
                continue;
            };
            for source in entity.sources() {
                if !sources.contains(source) {
                    sources.push(source.clone());
                }
            }
            entities.push(entity.clone());
        }

        let formatted_context = format_context(&entities, &sources);

        tracing::debug!(
            matched = entities.len(),
            sources = sources.len(),
            fallback = used_fallback,
            "Knowledge retrieval complete"
        );

        RetrievalResult {
            entities,
            sources,
            formatted_context,
            used_fallback,
        }
    }
}

/// Union of the entity keys of every rule whose keyword occurs in
/// `normalized`, in first-mention order.
fn match_keywords(table: &[KeywordRule], normalized: &str) -> Vec<String> {
    let mut keys: Vec<String> = Vec::new();
    for rule in table.iter().filter(|r| normalized.contains(r.keyword)) {
        for key in rule.entity_keys {
            if !keys.iter().any(|k| k == key) {
                keys.push((*key).to_string());
            }
        }
    }
    keys
}
