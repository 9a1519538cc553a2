//! Ollama LLM integration module
//!
//! Streams `/api/chat` completions with tool definitions and decodes the
//! newline-delimited JSON response into [`crate::llm::ChatFragment`]s.

pub mod client;
pub mod tool_use;

pub use client::ChatClient;
pub use tool_use::{OllamaMessage, Tool, ToolFunction};
