pub mod types;
pub mod keywords;
pub mod retrieval;
pub mod context;
pub mod prompt;
pub mod conversation;

pub use types::{KeywordRule, QueryType, RetrievalResult};
pub use retrieval::KnowledgeRetriever;
pub use conversation::{ConversationSession, ConversationTurn, SessionRegistry, TurnRole};
