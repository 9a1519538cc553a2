//! Scripted model and tools shared by the integration tests

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures_util::stream;
use serde_json::{json, Map, Value};
use tokio::sync::mpsc;

use finorch::agent::{AgentConfig, AgentController, AgentEvent, Message, SessionConfig, SessionStore};
use finorch::llm::{ChatError, ChatFragment, ChatModel, FragmentStream, ToolCallDelta};
use finorch::tools::{FunctionTool, ToolFault, ToolInvoker, ToolRegistry, ToolReturn, ToolSpec};

/// Small PNG header, base64
pub const PNG_B64: &str = "iVBORw0KGgo=";

/// One scripted model round
#[derive(Clone)]
pub enum Reply {
    /// Fragments to stream; `Err` items become stream faults
    Stream(Vec<Result<ChatFragment, String>>),
    /// Fail before streaming anything
    Refuse(String),
}

impl Reply {
    pub fn text(parts: &[&str]) -> Self {
        Reply::Stream(parts.iter().map(|p| Ok(ChatFragment::text(*p))).collect())
    }

    pub fn calls(calls: &[(&str, &str, Value)]) -> Self {
        Reply::Stream(
            calls
                .iter()
                .enumerate()
                .map(|(index, (id, name, args))| {
                    Ok(ChatFragment::tool_call(ToolCallDelta {
                        index,
                        id: Some(id.to_string()),
                        name: Some(name.to_string()),
                        arguments: args.to_string(),
                    }))
                })
                .collect(),
        )
    }
}

/// Plays back `replies` in order, then repeats `fallback` (if any).
/// Records every history it was called with.
pub struct ScriptedModel {
    replies: Mutex<VecDeque<Reply>>,
    fallback: Option<Reply>,
    seen: Mutex<Vec<Vec<Message>>>,
}

impl ScriptedModel {
    pub fn new(replies: Vec<Reply>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
            fallback: None,
            seen: Mutex::new(Vec::new()),
        })
    }

    pub fn repeating(reply: Reply) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(VecDeque::new()),
            fallback: Some(reply),
            seen: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> usize {
        self.seen.lock().unwrap().len()
    }

    pub fn histories(&self) -> Vec<Vec<Message>> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatModel for ScriptedModel {
    fn model_name(&self) -> &str {
        "scripted"
    }

    async fn stream_chat(
        &self,
        messages: &[Message],
        _tools: &[ToolSpec],
    ) -> Result<FragmentStream, ChatError> {
        self.seen.lock().unwrap().push(messages.to_vec());
        tokio::task::yield_now().await;

        let next = self.replies.lock().unwrap().pop_front();
        let reply = next
            .or_else(|| self.fallback.clone())
            .unwrap_or_else(|| Reply::text(&["(script exhausted)"]));

        match reply {
            Reply::Refuse(message) => Err(ChatError::Upstream(message)),
            Reply::Stream(items) => {
                let items: Vec<Result<ChatFragment, ChatError>> = items
                    .into_iter()
                    .map(|item| item.map_err(ChatError::Stream))
                    .collect();
                Ok(Box::pin(stream::iter(items)))
            }
        }
    }
}

/// Answers with whatever the last message said
pub struct EchoModel;

#[async_trait]
impl ChatModel for EchoModel {
    fn model_name(&self) -> &str {
        "echo"
    }

    async fn stream_chat(
        &self,
        messages: &[Message],
        _tools: &[ToolSpec],
    ) -> Result<FragmentStream, ChatError> {
        tokio::task::yield_now().await;
        let last = messages.last().map(|m| m.content.clone()).unwrap_or_default();
        Ok(Box::pin(stream::iter(vec![Ok(ChatFragment::text(last))])))
    }
}

fn spec(name: &str) -> ToolSpec {
    ToolSpec {
        name: name.to_string(),
        description: format!("test tool {}", name),
        parameters: json!({"type": "object"}),
    }
}

/// `calculate_x` (returns a mapping), `explode` (always faults),
/// `draw` (returns an inline PNG)
pub fn test_registry() -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(FunctionTool::new(spec("calculate_x"), |args: Map<String, Value>| async move {
        let mut out = Map::new();
        out.insert("result".into(), json!(42));
        out.insert("echo".into(), Value::Object(args));
        Ok(ToolReturn::Mapping(out))
    }));
    registry.register(FunctionTool::new(spec("explode"), |_| async {
        Err(ToolFault::Failed("calculator crashed".into()))
    }));
    registry.register(FunctionTool::new(spec("draw"), |_| async {
        Ok(ToolReturn::Text(json!({ "image_base64": PNG_B64 }).to_string()))
    }));
    registry
}

pub fn controller_with(
    model: Arc<dyn ChatModel>,
    max_rounds: usize,
    capacity: usize,
) -> Arc<AgentController> {
    let sessions = Arc::new(SessionStore::new(SessionConfig {
        capacity,
        system_prompt: "You are a test advisor.".into(),
    }));
    Arc::new(AgentController::new(
        model,
        ToolInvoker::new(test_registry()),
        sessions,
        AgentConfig {
            model: "scripted".into(),
            max_rounds,
            temperature: 0.0,
        },
    ))
}

pub async fn collect(mut rx: mpsc::Receiver<AgentEvent>) -> Vec<AgentEvent> {
    let mut events = Vec::new();
    while let Some(event) = rx.recv().await {
        events.push(event);
    }
    events
}

pub fn tool_start(tool: &str) -> AgentEvent {
    AgentEvent::ToolStart { tool: tool.into() }
}

pub fn tool_end(tool: &str) -> AgentEvent {
    AgentEvent::ToolEnd { tool: tool.into() }
}
