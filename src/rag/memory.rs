//! Conversation memory.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::debug;

/// Who said a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    /// Label used when rendering history into a prompt.
    pub fn label(&self) -> &'static str {
        match self {
            Role::User => "User",
            Role::Assistant => "Assistant",
        }
    }
}

/// A single message in a conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl ConversationTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Ordered turns of one conversation, bounded to the most recent `max_turns`.
#[derive(Debug, Clone)]
pub struct ConversationState {
    turns: VecDeque<ConversationTurn>,
    max_turns: usize,
}

impl ConversationState {
    /// Create an empty conversation that keeps at most `max_turns` turns.
    pub fn new(max_turns: usize) -> Self {
        Self {
            turns: VecDeque::new(),
            max_turns: max_turns.max(1),
        }
    }

    /// Append a turn, evicting the oldest ones beyond the bound.
    pub fn push(&mut self, turn: ConversationTurn) {
        self.turns.push_back(turn);
        while self.turns.len() > self.max_turns {
            self.turns.pop_front();
        }
    }

    /// Turns in chronological order.
    pub fn turns(&self) -> impl Iterator<Item = &ConversationTurn> {
        self.turns.iter()
    }

    pub fn clear(&mut self) {
        self.turns.clear();
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn max_turns(&self) -> usize {
        self.max_turns
    }
}

/// Conversations keyed by session id.
///
/// Each session has its own lock, so concurrent requests for one session are
/// serialized while different sessions proceed independently. At most
/// `max_sessions` sessions are kept; the least recently used one is evicted
/// to make room for a new one.
pub struct SessionMemory {
    sessions: Mutex<Sessions>,
    max_turns: usize,
    max_sessions: usize,
}

#[derive(Default)]
struct Sessions {
    entries: HashMap<String, SessionEntry>,
    clock: u64,
}

struct SessionEntry {
    state: Arc<Mutex<ConversationState>>,
    /// Per-session memory switch, `None` when the session follows the default.
    enabled: Option<bool>,
    last_used: u64,
}

impl Sessions {
    fn touch(&mut self, session_id: &str, max_turns: usize, max_sessions: usize) -> &mut SessionEntry {
        self.clock += 1;
        let now = self.clock;

        if !self.entries.contains_key(session_id) {
            while self.entries.len() >= max_sessions.max(1) {
                let oldest = self
                    .entries
                    .iter()
                    .min_by_key(|(_, entry)| entry.last_used)
                    .map(|(id, _)| id.clone());
                match oldest {
                    Some(id) => {
                        debug!("Evicting idle session {}", id);
                        self.entries.remove(&id);
                    }
                    None => break,
                }
            }
        }

        let entry = self
            .entries
            .entry(session_id.to_string())
            .or_insert_with(|| SessionEntry {
                state: Arc::new(Mutex::new(ConversationState::new(max_turns))),
                enabled: None,
                last_used: now,
            });
        entry.last_used = now;
        entry
    }
}

impl SessionMemory {
    pub fn new(max_turns: usize, max_sessions: usize) -> Self {
        Self {
            sessions: Mutex::new(Sessions::default()),
            max_turns,
            max_sessions,
        }
    }

    /// The conversation for `session_id`, created empty on first use.
    pub async fn session(&self, session_id: &str) -> Arc<Mutex<ConversationState>> {
        self.sessions
            .lock()
            .await
            .touch(session_id, self.max_turns, self.max_sessions)
            .state
            .clone()
    }

    /// Forget a session's history. An explicit memory switch is kept.
    pub async fn clear(&self, session_id: &str) {
        let mut sessions = self.sessions.lock().await;
        let keep_switch = sessions
            .entries
            .get(session_id)
            .is_some_and(|entry| entry.enabled.is_some());

        if keep_switch {
            if let Some(entry) = sessions.entries.get_mut(session_id) {
                entry.state = Arc::new(Mutex::new(ConversationState::new(self.max_turns)));
            }
        } else {
            sessions.entries.remove(session_id);
        }
    }

    /// Switch memory on or off for a session. Disabling forgets its history.
    ///
    /// A switch equal to `default` is not stored.
    pub async fn set_enabled(&self, session_id: &str, enable: bool, default: bool) {
        let mut sessions = self.sessions.lock().await;

        if enable == default {
            if enable {
                if let Some(entry) = sessions.entries.get_mut(session_id) {
                    entry.enabled = None;
                }
            } else {
                sessions.entries.remove(session_id);
            }
            return;
        }

        let entry = sessions.touch(session_id, self.max_turns, self.max_sessions);
        entry.enabled = Some(enable);
        if !enable {
            entry.state = Arc::new(Mutex::new(ConversationState::new(self.max_turns)));
        }
    }

    /// The explicit memory switch of a session, if one was set.
    pub async fn enabled(&self, session_id: &str) -> Option<bool> {
        self.sessions
            .lock()
            .await
            .entries
            .get(session_id)
            .and_then(|entry| entry.enabled)
    }

    /// Number of turns stored for a session.
    pub async fn turn_count(&self, session_id: &str) -> usize {
        let session = self
            .sessions
            .lock()
            .await
            .entries
            .get(session_id)
            .map(|entry| entry.state.clone());
        match session {
            Some(state) => state.lock().await.len(),
            None => 0,
        }
    }

    /// Number of sessions currently held.
    pub async fn len(&self) -> usize {
        self.sessions.lock().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fifo_eviction() {
        let mut state = ConversationState::new(3);
        for i in 0..5 {
            state.push(ConversationTurn::user(format!("message {}", i)));
        }

        assert_eq!(state.len(), 3);
        let contents: Vec<&str> = state.turns().map(|t| t.content.as_str()).collect();
        assert_eq!(contents, vec!["message 2", "message 3", "message 4"]);

        state.clear();
        assert!(state.is_empty());
    }

    #[tokio::test]
    async fn test_sessions_are_isolated() {
        let memory = SessionMemory::new(10, 100);

        {
            let alice = memory.session("alice").await;
            let mut alice = alice.lock().await;
            alice.push(ConversationTurn::user("hello"));
            alice.push(ConversationTurn::assistant("hi"));
        }

        assert_eq!(memory.turn_count("alice").await, 2);
        assert_eq!(memory.turn_count("bob").await, 0);
        assert!(memory.session("bob").await.lock().await.is_empty());

        memory.clear("alice").await;
        assert_eq!(memory.turn_count("alice").await, 0);
    }

    #[tokio::test]
    async fn test_least_recently_used_session_is_evicted() {
        let memory = SessionMemory::new(10, 2);

        memory.session("a").await.lock().await.push(ConversationTurn::user("one"));
        memory.session("b").await.lock().await.push(ConversationTurn::user("two"));
        // Touch "a" so "b" becomes the oldest.
        memory.session("a").await;
        memory.session("c").await;

        assert_eq!(memory.len().await, 2);
        assert_eq!(memory.turn_count("a").await, 1);
        assert_eq!(memory.turn_count("b").await, 0);
    }

    #[tokio::test]
    async fn test_switch_matching_default_is_not_stored() {
        let memory = SessionMemory::new(10, 100);

        memory.set_enabled("s", true, false).await;
        assert_eq!(memory.enabled("s").await, Some(true));
        memory.session("s").await.lock().await.push(ConversationTurn::user("hi"));

        memory.set_enabled("s", false, false).await;
        assert_eq!(memory.enabled("s").await, None);
        assert_eq!(memory.turn_count("s").await, 0);
        assert!(memory.is_empty().await);

        // Opting out of default-on memory is remembered, with history dropped.
        memory.session("t").await.lock().await.push(ConversationTurn::user("hi"));
        memory.set_enabled("t", false, true).await;
        assert_eq!(memory.enabled("t").await, Some(false));
        assert_eq!(memory.turn_count("t").await, 0);

        memory.clear("t").await;
        assert_eq!(memory.enabled("t").await, Some(false));
    }
}
