//! Per-session conversation memory
//!
//! Keeps the most recent question/answer turns of each session in memory so
//! follow-up questions to the knowledge base carry their context.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::RwLock;
use tracing::debug;

const DEFAULT_MAX_SESSIONS: usize = 1000;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub question: String,
    pub answer: String,
    pub timestamp: DateTime<Utc>,
}

struct Session {
    turns: VecDeque<ConversationTurn>,
    /// Tick of the last read or write
    last_used: u64,
}

/// Bounded per-session history. Each session keeps its newest `max_turns`
/// turns; past `max_sessions` sessions the least recently used one is
/// dropped.
pub struct SessionMemory {
    max_turns: usize,
    max_sessions: usize,
    sessions: RwLock<HashMap<String, Session>>,
    clock: AtomicU64,
}

impl SessionMemory {
    pub fn new(max_turns: usize) -> Self {
        Self {
            max_turns,
            max_sessions: DEFAULT_MAX_SESSIONS,
            sessions: RwLock::new(HashMap::new()),
            clock: AtomicU64::new(0),
        }
    }

    pub fn with_max_sessions(mut self, max_sessions: usize) -> Self {
        self.max_sessions = max_sessions.max(1);
        self
    }

    fn tick(&self) -> u64 {
        self.clock.fetch_add(1, Ordering::Relaxed)
    }

    pub async fn history(&self, session_id: &str) -> Vec<ConversationTurn> {
        let now = self.tick();
        let mut sessions = self.sessions.write().await;
        match sessions.get_mut(session_id) {
            Some(session) => {
                session.last_used = now;
                session.turns.iter().cloned().collect()
            }
            None => Vec::new(),
        }
    }

    pub async fn record(&self, session_id: &str, question: &str, answer: &str) {
        if self.max_turns == 0 {
            return;
        }

        let now = self.tick();
        let mut sessions = self.sessions.write().await;

        if !sessions.contains_key(session_id) && sessions.len() >= self.max_sessions {
            let idle = sessions
                .iter()
                .min_by_key(|(_, session)| session.last_used)
                .map(|(id, _)| id.clone());
            if let Some(idle) = idle {
                debug!(session_id = %idle, "Evicting least recently used session");
                sessions.remove(&idle);
            }
        }

        let session = sessions
            .entry(session_id.to_string())
            .or_insert_with(|| Session {
                turns: VecDeque::new(),
                last_used: now,
            });
        session.last_used = now;

        session.turns.push_back(ConversationTurn {
            question: question.to_string(),
            answer: answer.to_string(),
            timestamp: Utc::now(),
        });

        while session.turns.len() > self.max_turns {
            session.turns.pop_front();
        }
    }

    pub async fn clear(&self, session_id: &str) {
        self.sessions.write().await.remove(session_id);
    }

    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }
}

impl Default for SessionMemory {
    fn default() -> Self {
        Self::new(10)
    }
}
