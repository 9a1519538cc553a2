//! Agent module for tool-calling chat turns
//!
//! This module provides the agent loop that orchestrates:
//! - a streaming chat model with tool calling
//! - the tool invoker (financial calculators and charts)
//! - per-session conversation history with repair on read
//!
//! # Architecture
//!
//! ```text
//! POST /chat → AgentController.start_turn()
//!                  ↓
//!           SessionStore.begin_turn() (per-session lock)
//!                  ↓
//!           SessionStore.append(user) → get() (sanitized)
//!                  ↓
//!           ChatModel.stream_chat() → token events
//!                  ↓
//!           tool calls? ──no──→ done
//!                  ↓ yes
//!           status → tool_start → ToolInvoker.invoke() → [chart] → tool_end
//!                  ↓
//!           SessionStore.append(tool results) → next round (≤ max_rounds)
//! ```

pub mod controller;
pub mod events;
pub mod message;
pub mod sanitize;
pub mod sessions;

pub use controller::{AgentConfig, AgentController, AgentError, TurnOutcome, CHART_ACKNOWLEDGMENT};
pub use events::AgentEvent;
pub use message::{Message, Role, ToolCall};
pub use sanitize::sanitize;
pub use sessions::{SessionConfig, SessionStore};
