//! Language-model capability
//!
//! The agent loop only needs one thing from a model: stream a completion for
//! a history, yielding text and tool-call fragments as they arrive.
//! [`ChatModel`] is that seam; `crate::ollama` and `crate::openai` provide
//! HTTP back-ends and tests plug in scripted models.

pub mod accumulate;

use std::pin::Pin;

use async_trait::async_trait;
use futures_util::stream::Stream;

use crate::agent::message::Message;
use crate::tools::ToolSpec;

pub use accumulate::AssistantAccumulator;

/// Error type for model back-ends
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("Request error: {0}")]
    Request(#[from] reqwest::Error),
    #[error("Model endpoint returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("Parse error: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Stream error: {0}")]
    Stream(String),
    #[error("Model error: {0}")]
    Upstream(String),
}

/// Incremental piece of one tool call.
///
/// Deltas sharing an `index` belong to the same call: the first `id`/`name`
/// seen wins and `arguments` text is concatenated.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToolCallDelta {
    pub index: usize,
    pub id: Option<String>,
    pub name: Option<String>,
    pub arguments: String,
}

/// One streamed piece of an assistant reply
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChatFragment {
    pub content: String,
    pub tool_calls: Vec<ToolCallDelta>,
}

impl ChatFragment {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            tool_calls: Vec::new(),
        }
    }

    pub fn tool_call(delta: ToolCallDelta) -> Self {
        Self {
            content: String::new(),
            tool_calls: vec![delta],
        }
    }
}

/// Boxed stream of fragments returned by [`ChatModel::stream_chat`]
pub type FragmentStream = Pin<Box<dyn Stream<Item = Result<ChatFragment, ChatError>> + Send>>;

/// A streaming chat completion capability
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Model name, used for span fields and metric labels
    fn model_name(&self) -> &str;

    /// Open a completion stream for `messages`, offering `tools` to the model.
    async fn stream_chat(
        &self,
        messages: &[Message],
        tools: &[ToolSpec],
    ) -> Result<FragmentStream, ChatError>;
}
