use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Chat-scoped session key.
///
/// One session per Telegram chat: a private DM and a group each get their
/// own history regardless of who is talking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionKey(pub i64);

impl SessionKey {
    pub fn chat(chat_id: i64) -> Self {
        Self(chat_id)
    }

    pub fn chat_id(&self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for SessionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "chat:{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// One message exchanged in a conversation. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Turn {
    role: Role,
    content: String,
    created_at: DateTime<Utc>,
}

impl Turn {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            created_at: Utc::now(),
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

/// Per-chat conversational state: greeting flag plus ordered history.
///
/// History grows for the life of the session unless `max_stored` is set, in
/// which case the oldest turns are dropped. What gets sent to the model is
/// always bounded separately via [`Session::window`].
#[derive(Debug, Clone)]
pub struct Session {
    key: SessionKey,
    greeted: bool,
    history: Vec<Turn>,
    max_stored: Option<usize>,
    created_at: DateTime<Utc>,
}

impl Session {
    pub fn new(key: SessionKey, max_stored: Option<usize>) -> Self {
        Self {
            key,
            greeted: false,
            history: Vec::new(),
            max_stored,
            created_at: Utc::now(),
        }
    }

    pub fn key(&self) -> SessionKey {
        self.key
    }

    pub fn greeted(&self) -> bool {
        self.greeted
    }

    pub fn history(&self) -> &[Turn] {
        &self.history
    }

    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Time of the newest stored turn, or of creation when there is none.
    pub fn last_activity(&self) -> DateTime<Utc> {
        self.history
            .last()
            .map(Turn::created_at)
            .unwrap_or(self.created_at)
    }

    /// The trailing `n` turns (all of them when fewer are stored).
    pub fn window(&self, n: usize) -> &[Turn] {
        let start = self.history.len().saturating_sub(n);
        &self.history[start..]
    }

    pub fn record_user_turn(&mut self, text: impl Into<String>) {
        self.push(Turn::new(Role::User, text));
    }

    pub fn record_assistant_turn(&mut self, text: impl Into<String>) {
        self.push(Turn::new(Role::Assistant, text));
    }

    pub fn mark_greeted(&mut self) {
        self.greeted = true;
    }

    /// Enter the active state after an explicit start: greeted, no history.
    pub fn restart(&mut self) {
        self.greeted = true;
        self.history.clear();
    }

    fn push(&mut self, turn: Turn) {
        self.history.push(turn);
        if let Some(max) = self.max_stored {
            if self.history.len() > max {
                let excess = self.history.len() - max;
                self.history.drain(..excess);
            }
        }
    }
}
