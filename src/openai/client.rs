//! Streaming client for `/chat/completions`

use std::io;

use async_stream::try_stream;
use async_trait::async_trait;
use bytes::Bytes;
use futures_util::stream::{Stream, StreamExt};
use tokio::io::AsyncBufReadExt;
use tokio_util::io::StreamReader;
use tracing::debug;

use super::wire::{CompletionChunk, CompletionRequest};
use crate::agent::message::Message;
use crate::llm::{ChatError, ChatModel, FragmentStream};
use crate::tools::ToolSpec;

const DONE_SENTINEL: &str = "[DONE]";

#[derive(Clone)]
pub struct CompletionsClient {
    base_url: String,
    api_key: Option<String>,
    model: String,
    temperature: f32,
    client: reqwest::Client,
}

impl CompletionsClient {
    /// `base_url` includes the version prefix, e.g. "https://api.openai.com/v1"
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: None,
            model: model.into(),
            temperature: 0.0,
            client: reqwest::Client::new(),
        }
    }

    pub fn with_api_key(mut self, api_key: Option<String>) -> Self {
        self.api_key = api_key.filter(|k| !k.is_empty());
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }
}

#[async_trait]
impl ChatModel for CompletionsClient {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn stream_chat(
        &self,
        messages: &[Message],
        tools: &[ToolSpec],
    ) -> Result<FragmentStream, ChatError> {
        let endpoint = format!("{}/chat/completions", self.base_url);
        let body = CompletionRequest::new(&self.model, messages, tools, self.temperature);
        debug!(model = %self.model, messages = messages.len(), tools = tools.len(), "Opening completions stream");

        let mut request = self.client.post(&endpoint).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?;
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
        Ok(decode_sse(bytes))
    }
}

/// Decode a server-sent event body into fragments.
///
/// Only `data:` lines are meaningful; comments, `event:` and `id:` lines are
/// skipped. `data: [DONE]` ends the stream.
pub fn decode_sse<S>(bytes: S) -> FragmentStream
where
    S: Stream<Item = Result<Bytes, io::Error>> + Send + 'static,
{
    Box::pin(try_stream! {
        let mut lines = StreamReader::new(Box::pin(bytes)).lines();

        while let Some(line) = lines
            .next_line()
            .await
            .map_err(|e| ChatError::Stream(e.to_string()))?
        {
            let Some(data) = line.strip_prefix("data:") else {
                continue;
            };
            let data = data.trim();
            if data.is_empty() {
                continue;
            }
            if data == DONE_SENTINEL {
                break;
            }

            let chunk: CompletionChunk = serde_json::from_str(data)?;
            if let Some(error) = &chunk.error {
                Err::<(), _>(ChatError::Upstream(error.message.clone()))?;
            }

            let fragment = chunk.into_fragment();
            if !fragment.content.is_empty() || !fragment.tool_calls.is_empty() {
                yield fragment;
            }
        }
    })
}
