//! finorch - streaming financial chat agent with tool calling
//!
//! A chat turn runs a bounded loop: stream a completion from the model, run
//! any financial tools it asks for, feed the results back, repeat. Progress
//! streams to the client as typed events; chart images bypass the model
//! through a side channel.
//!
//! # Modules
//!
//! - `agent` - round loop, session store, history repair, event protocol
//! - `llm` - `ChatModel` capability and fragment accumulation
//! - `ollama` / `openai` - streaming HTTP back-ends
//! - `tools` - tool registry, invoker, built-in calculators and charts
//! - `server` - axum routes (SSE chat, sessions, metrics, health)
//! - `config` - clap/env configuration
//! - `metrics` - Prometheus metrics for observability
//! - `tracing` - logging and OpenTelemetry export
//!
//! # Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use finorch::{AgentConfig, AgentController, SessionStore, ToolInvoker, ToolRegistry};
//! use finorch::ollama::ChatClient;
//!
//! let controller = Arc::new(AgentController::new(
//!     Arc::new(ChatClient::new("http://localhost:11434", "qwen3")),
//!     ToolInvoker::new(ToolRegistry::with_builtin_tools()),
//!     Arc::new(SessionStore::default()),
//!     AgentConfig::default(),
//! ));
//! let mut events = controller.start_turn("demo", "What EMI on 5 lakh at 9% for 5 years?");
//! while let Some(event) = events.recv().await {
//!     println!("{}", event.to_json());
//! }
//! ```

pub mod agent;
pub mod config;
pub mod llm;
pub mod metrics;
pub mod ollama;
pub mod openai;
pub mod server;
pub mod tools;
pub mod tracing;

// Re-export commonly used types at crate root for convenience
pub use agent::{AgentConfig, AgentController, AgentEvent, Message, SessionConfig, SessionStore};
pub use llm::{ChatError, ChatModel};
pub use tools::{ToolInvoker, ToolRegistry};
