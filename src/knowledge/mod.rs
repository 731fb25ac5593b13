pub mod entity;
pub mod store;

pub use entity::{display_name, title_case, KnowledgeEntity, OrderedMap};
pub use store::KnowledgeStore;

use std::path::PathBuf;

use thiserror::Error;

/// Remediation shown whenever the persisted knowledge base cannot be found.
pub const INDEX_BUILD_HINT: &str =
    "Build the knowledge index first, or point TANIT_KB_PATH at an existing knowledge_base.json";

#[derive(Error, Debug)]
pub enum KnowledgeError {
    #[error("Knowledge base not found at {}. {}", path.display(), INDEX_BUILD_HINT)]
    NotFound { path: PathBuf },

    #[error("Failed to read knowledge base {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed knowledge base: {0}")]
    Parse(String),
}
