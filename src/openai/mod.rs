//! OpenAI-compatible chat completions back-end
//!
//! Works against any server that speaks `/chat/completions` with
//! `stream: true` (OpenAI, vLLM, llama.cpp server, LiteLLM). Responses arrive
//! as server-sent events whose `data:` lines carry incremental deltas.

pub mod client;
pub mod wire;

pub use client::CompletionsClient;
