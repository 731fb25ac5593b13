use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Who produced a conversation turn.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    User,
    Assistant,
}

impl TurnRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConversationTurn {
    pub role: TurnRole,
    pub content: String,
    pub at: DateTime<Utc>,
}

impl ConversationTurn {
    /// Build a turn, cutting `content` to at most `max_chars` characters.
    pub fn truncated(role: TurnRole, content: &str, max_chars: usize) -> Self {
        Self {
            role,
            content: truncate_chars(content, max_chars),
            at: Utc::now(),
        }
    }
}

/// One user's conversation. Owned by the caller and passed into each request.
///
/// Append-only; prompts see only the trailing window.
#[derive(Debug, Clone, Serialize)]
pub struct ConversationSession {
    pub id: Uuid,
    turns: Vec<ConversationTurn>,
}

impl ConversationSession {
    pub fn new() -> Self {
        Self::with_id(Uuid::new_v4())
    }

    pub fn with_id(id: Uuid) -> Self {
        Self {
            id,
            turns: Vec::new(),
        }
    }

    pub fn push(&mut self, turn: ConversationTurn) {
        self.turns.push(turn);
    }

    /// Record one exchange: the query as asked and the final response.
    pub fn record_exchange(&mut self, query: &str, response: &str, max_chars: usize) {
        self.push(ConversationTurn::truncated(TurnRole::User, query, max_chars));
        self.push(ConversationTurn::truncated(TurnRole::Assistant, response, max_chars));
    }

    /// The last `n` turns, oldest first.
    pub fn window(&self, n: usize) -> &[ConversationTurn] {
        let start = self.turns.len().saturating_sub(n);
        &self.turns[start..]
    }

    pub fn turns(&self) -> &[ConversationTurn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}

impl Default for ConversationSession {
    fn default() -> Self {
        Self::new()
    }
}

/// Default idle lifetime of a server-side session: 30 minutes.
pub const DEFAULT_SESSION_IDLE_SECS: u64 = 30 * 60;
/// Default cap on live sessions.
pub const DEFAULT_MAX_SESSIONS: usize = 256;

struct RegistryEntry {
    session: Arc<Mutex<ConversationSession>>,
    last_used: Instant,
}

/// Session registry for a multi-client server: one history per session id,
/// each behind its own lock so concurrent sessions never contend.
///
/// Sessions idle longer than `idle_ttl` are dropped on the next lookup. At
/// `max_sessions` the least recently used session is evicted.
pub struct SessionRegistry {
    sessions: Mutex<HashMap<Uuid, RegistryEntry>>,
    max_sessions: usize,
    idle_ttl: Duration,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::with_limits(
            DEFAULT_MAX_SESSIONS,
            Duration::from_secs(DEFAULT_SESSION_IDLE_SECS),
        )
    }

    pub fn with_limits(max_sessions: usize, idle_ttl: Duration) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            max_sessions: max_sessions.max(1),
            idle_ttl,
        }
    }

    /// Fetch the session for `id`, creating it (or a fresh id) if needed.
    pub fn get_or_create(&self, id: Option<Uuid>) -> Arc<Mutex<ConversationSession>> {
        self.get_or_create_at(id, Instant::now())
    }

    fn get_or_create_at(
        &self,
        id: Option<Uuid>,
        now: Instant,
    ) -> Arc<Mutex<ConversationSession>> {
        let mut sessions = lock(&self.sessions);
        let ttl = self.idle_ttl;
        let before = sessions.len();
        sessions.retain(|_, entry| now.saturating_duration_since(entry.last_used) < ttl);
        if sessions.len() < before {
            tracing::debug!(expired = before - sessions.len(), "Expired idle sessions");
        }

        let id = id.unwrap_or_else(Uuid::new_v4);
        if let Some(entry) = sessions.get_mut(&id) {
            entry.last_used = now;
            return entry.session.clone();
        }

        while sessions.len() >= self.max_sessions {
            let Some(oldest) = sessions
                .iter()
                .min_by_key(|(_, entry)| entry.last_used)
                .map(|(id, _)| *id)
            else {
                break;
            };
            sessions.remove(&oldest);
            tracing::debug!(session = %oldest, "Evicted least recently used session");
        }

        let session = Arc::new(Mutex::new(ConversationSession::with_id(id)));
        sessions.insert(
            id,
            RegistryEntry {
                session: session.clone(),
                last_used: now,
            },
        );
        session
    }

    /// Drop a session. Returns whether it existed.
    pub fn remove(&self, id: &Uuid) -> bool {
        lock(&self.sessions).remove(id).is_some()
    }

    /// Drop every session.
    pub fn clear(&self) {
        lock(&self.sessions).clear();
    }

    pub fn contains(&self, id: &Uuid) -> bool {
        lock(&self.sessions).contains_key(id)
    }

    pub fn len(&self) -> usize {
        lock(&self.sessions).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SessionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionRegistry")
            .field("len", &self.len())
            .field("max_sessions", &self.max_sessions)
            .field("idle_ttl", &self.idle_ttl)
            .finish()
    }
}

/// Lock a mutex, recovering the data if a previous holder panicked.
pub fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => text[..byte_idx].to_string(),
        None => text.to_string(),
    }
}
