//! In-memory conversation sessions
//!
//! Sessions are keyed by an opaque id, created lazily and seeded with the
//! system message, and bounded to `capacity` raw messages. Reads always go
//! through [`sanitize`] so callers never see an orphaned tool message.
//!
//! Nothing is persisted: sessions disappear on [`SessionStore::clear`] or when
//! the process exits.

use std::sync::{Arc, Mutex, PoisonError};

use dashmap::DashMap;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tracing::debug;

use super::message::Message;
use super::sanitize::sanitize;
use crate::metrics::{SANITIZER_DROPS, SESSIONS_ACTIVE};

/// Default number of retained messages, system message included
pub const DEFAULT_SESSION_CAPACITY: usize = 20;

/// Default system prompt for the financial assistant
pub const DEFAULT_SYSTEM_PROMPT: &str = r#"You are a specialized Financial Orchestrator AI.

You assist users with:
- Investment planning
- Expense tracking
- Financial projections
- Retirement planning
- Financial math calculations

RULES:
1. ONLY answer finance-related questions.
2. Use available tools when precision is required.
3. Be professional, concise, and data-driven.
4. Never guarantee returns.
5. Always add a disclaimer for risky investments.

FORMAT:
- Use Markdown.
- Format currency with symbols and commas."#;

/// Session store settings
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Maximum raw messages kept per session, including the system message
    pub capacity: usize,
    /// Content of the seed message every session starts with
    pub system_prompt: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_SESSION_CAPACITY,
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
        }
    }
}

/// Held by the agent for the duration of one turn on a session.
///
/// Dropping it lets the next queued turn on the same session proceed.
pub type TurnGuard = OwnedMutexGuard<()>;

struct SessionSlot {
    history: Mutex<Vec<Message>>,
    turn: Arc<AsyncMutex<()>>,
}

/// Keyed, size-bounded store of raw conversation histories
pub struct SessionStore {
    sessions: DashMap<String, Arc<SessionSlot>>,
    config: SessionConfig,
}

impl SessionStore {
    pub fn new(config: SessionConfig) -> Self {
        Self {
            sessions: DashMap::new(),
            config,
        }
    }

    /// Maximum raw messages per session
    pub fn capacity(&self) -> usize {
        self.config.capacity
    }

    /// Number of live sessions
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Sanitized history for `id`, seeding the session first if it is new.
    pub fn get(&self, id: &str) -> Vec<Message> {
        let slot = self.slot(id);
        let history = lock(&slot.history);
        let clean = sanitize(&history);
        record_drops("read", history.len(), clean.len());
        clean
    }

    /// Append to the raw history of `id`, then trim to capacity.
    pub fn append(&self, id: &str, message: Message) {
        let slot = self.slot(id);
        let mut history = lock(&slot.history);
        history.push(message);
        trim(&mut history, self.config.capacity);
    }

    /// Forget a session. Returns whether it existed.
    pub fn clear(&self, id: &str) -> bool {
        let removed = self.sessions.remove(id).is_some();
        if removed {
            SESSIONS_ACTIVE.dec();
            debug!(session_id = %id, "Session cleared");
        }
        removed
    }

    /// Raw (unsanitized) history, without creating the session.
    pub fn raw_history(&self, id: &str) -> Option<Vec<Message>> {
        let slot = self.sessions.get(id).map(|entry| Arc::clone(entry.value()))?;
        let history = lock(&slot.history);
        Some(history.clone())
    }

    /// Wait for exclusive use of session `id`.
    ///
    /// The agent holds the returned guard for a whole turn so two requests on
    /// one session cannot interleave their appends.
    pub async fn begin_turn(&self, id: &str) -> TurnGuard {
        let turn = Arc::clone(&self.slot(id).turn);
        turn.lock_owned().await
    }

    fn slot(&self, id: &str) -> Arc<SessionSlot> {
        if let Some(entry) = self.sessions.get(id) {
            return Arc::clone(entry.value());
        }

        let entry = self.sessions.entry(id.to_string()).or_insert_with(|| {
            SESSIONS_ACTIVE.inc();
            debug!(session_id = %id, "Session created");
            Arc::new(SessionSlot {
                history: Mutex::new(vec![Message::system(self.config.system_prompt.clone())]),
                turn: Arc::new(AsyncMutex::new(())),
            })
        });
        Arc::clone(entry.value())
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new(SessionConfig::default())
    }
}

/// Keep the system message plus the newest `capacity - 1` messages, then
/// repair anything the cut orphaned.
fn trim(history: &mut Vec<Message>, capacity: usize) {
    if history.len() <= capacity || history.is_empty() {
        return;
    }

    let keep = capacity.saturating_sub(1);
    let tail_start = history.len() - keep;
    let mut trimmed = Vec::with_capacity(capacity);
    trimmed.push(history[0].clone());
    trimmed.extend_from_slice(&history[tail_start..]);

    let repaired = sanitize(&trimmed);
    record_drops("trim", trimmed.len(), repaired.len());
    *history = repaired;
}

fn record_drops(phase: &str, before: usize, after: usize) {
    if before > after {
        SANITIZER_DROPS
            .with_label_values(&[phase])
            .inc_by((before - after) as f64);
    }
}

fn lock(history: &Mutex<Vec<Message>>) -> std::sync::MutexGuard<'_, Vec<Message>> {
    history.lock().unwrap_or_else(PoisonError::into_inner)
}
