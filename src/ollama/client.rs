//! Ollama chat client with streaming tool calls

use std::io;

use async_stream::try_stream;
use async_trait::async_trait;
use bytes::Bytes;
use futures_util::stream::{Stream, StreamExt};
use tokio::io::AsyncBufReadExt;
use tokio_util::io::StreamReader;
use tracing::debug;

use super::tool_use::{chat_request_body, ChatChunk};
use crate::agent::message::Message;
use crate::llm::{ChatError, ChatModel, FragmentStream};
use crate::tools::ToolSpec;

/// Client for Ollama's /api/chat endpoint with tool support
#[derive(Clone)]
pub struct ChatClient {
    base_url: String,
    model: String,
    temperature: f32,
    client: reqwest::Client,
}

impl ChatClient {
    /// Create a new chat client
    ///
    /// # Arguments
    /// * `base_url` - The base URL of the Ollama server (e.g., "http://localhost:11434")
    /// * `model` - The model name (e.g., "qwen3")
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            temperature: 0.0,
            client: reqwest::Client::new(),
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }
}

#[async_trait]
impl ChatModel for ChatClient {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn stream_chat(
        &self,
        messages: &[Message],
        tools: &[ToolSpec],
    ) -> Result<FragmentStream, ChatError> {
        let endpoint = format!("{}/api/chat", self.base_url);
        let body = chat_request_body(&self.model, messages, tools, self.temperature);
        debug!(model = %self.model, messages = messages.len(), tools = tools.len(), "Opening Ollama chat stream");

        let response = self.client.post(&endpoint).json(&body).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ChatError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let bytes = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(io::Error::other));
        Ok(decode_ndjson(bytes))
    }
}

/// Decode a newline-delimited JSON response body into fragments.
///
/// Lines are reassembled across network chunks before parsing. The stream
/// ends at the first `"done": true` line or at end of body.
pub fn decode_ndjson<S>(bytes: S) -> FragmentStream
where
    S: Stream<Item = Result<Bytes, io::Error>> + Send + 'static,
{
    Box::pin(try_stream! {
        let mut lines = StreamReader::new(Box::pin(bytes)).lines();
        let mut next_index = 0usize;

        while let Some(line) = lines
            .next_line()
            .await
            .map_err(|e| ChatError::Stream(e.to_string()))?
        {
            if line.trim().is_empty() {
                continue;
            }

            let chunk: ChatChunk = serde_json::from_str(&line)?;
            if let Some(error) = &chunk.error {
                Err::<(), _>(ChatError::Upstream(error.clone()))?;
            }

            let fragment = chunk.to_fragment(&mut next_index);
            if !fragment.content.is_empty() || !fragment.tool_calls.is_empty() {
                yield fragment;
            }
            if chunk.done {
                debug!(eval_count = chunk.eval_count, "Ollama stream finished");
                break;
            }
        }
    })
}
