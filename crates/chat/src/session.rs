//! Bounded in-memory conversation store.
//!
//! Each session keeps a sliding window of the most recent exchanges. History
//! is formatted into the system prompt for follow-up questions; it is never
//! persisted across process restarts.

use lectern_core::{AppError, AppResult};
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use uuid::Uuid;

/// Who said a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    User,
    Assistant,
}

impl TurnRole {
    fn label(self) -> &'static str {
        match self {
            TurnRole::User => "User",
            TurnRole::Assistant => "Assistant",
        }
    }
}

/// One utterance in a conversation.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ConversationTurn {
    pub role: TurnRole,
    pub content: String,
}

/// In-memory session store with a per-session turn cap.
///
/// A "turn" here is a single utterance, so a cap of 4 retains the last two
/// question-and-answer exchanges.
pub struct SessionStore {
    sessions: Mutex<HashMap<String, VecDeque<ConversationTurn>>>,
    max_turns: usize,
}

impl SessionStore {
    pub fn new(max_turns: usize) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            max_turns,
        }
    }

    fn lock(
        &self,
    ) -> AppResult<std::sync::MutexGuard<'_, HashMap<String, VecDeque<ConversationTurn>>>> {
        self.sessions
            .lock()
            .map_err(|_| AppError::Other("Session store lock poisoned".to_string()))
    }

    /// Create a new empty session and return its id.
    pub fn create_session(&self) -> AppResult<String> {
        let id = Uuid::new_v4().to_string();
        self.lock()?.insert(id.clone(), VecDeque::new());
        tracing::debug!("Created session {}", id);
        Ok(id)
    }

    /// Turns recorded for a session, oldest first. Unknown ids read as empty.
    pub fn history(&self, session_id: &str) -> AppResult<Vec<ConversationTurn>> {
        Ok(self
            .lock()?
            .get(session_id)
            .map(|turns| turns.iter().cloned().collect())
            .unwrap_or_default())
    }

    /// Append a turn, evicting the oldest once the window is full.
    ///
    /// Appending to an unknown id creates the session, so a caller-supplied
    /// id works the same as a generated one.
    pub fn add_turn(
        &self,
        session_id: &str,
        role: TurnRole,
        content: impl Into<String>,
    ) -> AppResult<()> {
        let mut sessions = self.lock()?;
        let turns = sessions.entry(session_id.to_string()).or_default();

        turns.push_back(ConversationTurn {
            role,
            content: content.into(),
        });
        while turns.len() > self.max_turns {
            turns.pop_front();
        }

        Ok(())
    }

    /// Render a history as prompt text, or `None` when there is none.
    pub fn format_history(turns: &[ConversationTurn]) -> Option<String> {
        if turns.is_empty() {
            return None;
        }

        let lines: Vec<String> = turns
            .iter()
            .map(|t| format!("{}: {}", t.role.label(), t.content))
            .collect();
        Some(lines.join("\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_and_read_session() {
        let store = SessionStore::new(2);
        let id = store.create_session().unwrap();

        assert!(store.history(&id).unwrap().is_empty());

        store.add_turn(&id, TurnRole::User, "hello").unwrap();
        store.add_turn(&id, TurnRole::Assistant, "hi").unwrap();

        let history = store.history(&id).unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].role, TurnRole::User);
        assert_eq!(history[1].content, "hi");
    }

    #[test]
    fn test_unknown_session_reads_empty() {
        let store = SessionStore::new(2);
        assert!(store.history("missing").unwrap().is_empty());
    }

    #[test]
    fn test_window_evicts_oldest() {
        let store = SessionStore::new(4);
        let id = store.create_session().unwrap();

        for i in 0..3 {
            store
                .add_turn(&id, TurnRole::User, format!("q{}", i))
                .unwrap();
            store
                .add_turn(&id, TurnRole::Assistant, format!("a{}", i))
                .unwrap();
        }

        let history = store.history(&id).unwrap();
        assert_eq!(history.len(), 4);
        assert_eq!(history[0].content, "q1");
        assert_eq!(history[3].content, "a2");
    }

    #[test]
    fn test_add_turn_creates_unknown_session() {
        let store = SessionStore::new(2);
        store.add_turn("external-id", TurnRole::User, "hi").unwrap();
        assert_eq!(store.history("external-id").unwrap().len(), 1);
    }

    #[test]
    fn test_format_history() {
        let turns = vec![
            ConversationTurn {
                role: TurnRole::User,
                content: "What is MCP?".to_string(),
            },
            ConversationTurn {
                role: TurnRole::Assistant,
                content: "A context protocol.".to_string(),
            },
        ];

        assert_eq!(
            SessionStore::format_history(&turns).unwrap(),
            "User: What is MCP?\nAssistant: A context protocol."
        );
        assert!(SessionStore::format_history(&[]).is_none());
    }

    #[test]
    fn test_sessions_are_isolated() {
        let store = SessionStore::new(2);
        let a = store.create_session().unwrap();
        let b = store.create_session().unwrap();

        store.add_turn(&a, TurnRole::User, "only in a").unwrap();

        assert_eq!(store.history(&a).unwrap().len(), 1);
        assert!(store.history(&b).unwrap().is_empty());
    }
}
