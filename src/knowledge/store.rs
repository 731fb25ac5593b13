use std::collections::HashMap;
use std::path::Path;

use super::entity::{KnowledgeEntity, OrderedMap};
use super::KnowledgeError;
use crate::config::KNOWLEDGE_BASE_FILE;

/// Immutable entity store, loaded once at startup.
///
/// Iteration order is the order of the persisted document; the retriever's
/// no-match fallback depends on it.
#[derive(Debug, Clone, Default)]
pub struct KnowledgeStore {
    entities: Vec<KnowledgeEntity>,
    index: HashMap<String, usize>,
}

impl KnowledgeStore {
    /// Load the knowledge base from a `knowledge_base.json` file, or from an
    /// index directory containing one.
    pub fn load(source: &Path) -> Result<Self, KnowledgeError> {
        let path = if source.is_dir() {
            source.join(KNOWLEDGE_BASE_FILE)
        } else {
            source.to_path_buf()
        };

        if !path.exists() {
            return Err(KnowledgeError::NotFound { path });
        }

        let json = std::fs::read_to_string(&path).map_err(|source| KnowledgeError::Io {
            path: path.clone(),
            source,
        })?;

        let store = Self::from_json_str(&json)?;
        tracing::info!(
            entities = store.len(),
            path = %path.display(),
            "Knowledge base loaded"
        );
        Ok(store)
    }

    /// Parse a knowledge base document keyed by entity id.
    pub fn from_json_str(json: &str) -> Result<Self, KnowledgeError> {
        let document: OrderedMap<KnowledgeEntity> =
            serde_json::from_str(json).map_err(|e| KnowledgeError::Parse(e.to_string()))?;

        Ok(Self::from_entities(
            document
                .0
                .into_iter()
                .map(|(key, entity)| entity.with_key(&key)),
        ))
    }

    /// Build a store from entities in the given order. A repeated key keeps
    /// its first position and the last definition.
    pub fn from_entities<I>(entities: I) -> Self
    where
        I: IntoIterator<Item = KnowledgeEntity>,
    {
        let mut store = Self::default();
        for entity in entities {
            match store.index.get(&entity.key) {
                Some(&pos) => store.entities[pos] = entity,
                None => {
                    store.index.insert(entity.key.clone(), store.entities.len());
                    store.entities.push(entity);
                }
            }
        }
        store
    }

    /// An explicitly empty store, for demo runs without a built index.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&KnowledgeEntity> {
        self.index.get(key).map(|&pos| &self.entities[pos])
    }

    pub fn contains(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    /// Entity keys in document order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entities.iter().map(|e| e.key.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = &KnowledgeEntity> {
        self.entities.iter()
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Store for tests (no file I/O).
    #[cfg(test)]
    pub fn load_test() -> Self {
        Self::from_json_str(include_str!("../../data/knowledge_base.json"))
            .expect("bundled knowledge base must parse")
    }
}
