//! Folding streamed fragments into a finished assistant message

use std::collections::BTreeMap;

use serde_json::{Map, Value};
use tracing::warn;
use uuid::Uuid;

use super::{ChatFragment, ToolCallDelta};
use crate::agent::message::{Message, ToolCall};

#[derive(Debug, Default)]
struct PartialCall {
    id: Option<String>,
    name: Option<String>,
    arguments: String,
}

/// Running assistant message built from streamed fragments
#[derive(Debug, Default)]
pub struct AssistantAccumulator {
    content: String,
    calls: BTreeMap<usize, PartialCall>,
}

impl AssistantAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one fragment in.
    pub fn push(&mut self, fragment: &ChatFragment) {
        self.content.push_str(&fragment.content);
        for delta in &fragment.tool_calls {
            self.push_delta(delta);
        }
    }

    fn push_delta(&mut self, delta: &ToolCallDelta) {
        let call = self.calls.entry(delta.index).or_default();
        if call.id.is_none() {
            call.id = delta.id.clone().filter(|id| !id.is_empty());
        }
        if call.name.is_none() {
            call.name = delta.name.clone().filter(|name| !name.is_empty());
        }
        call.arguments.push_str(&delta.arguments);
    }

    /// Text received so far
    pub fn content(&self) -> &str {
        &self.content
    }

    /// Finalized assistant message, tool calls in index order.
    pub fn finish(self) -> Message {
        let tool_calls: Vec<ToolCall> = self
            .calls
            .into_iter()
            .filter_map(|(index, call)| {
                let Some(name) = call.name else {
                    warn!(index, "Dropping streamed tool call without a name");
                    return None;
                };
                let id = call
                    .id
                    .unwrap_or_else(|| format!("call_{}", Uuid::now_v7().simple()));
                let args = parse_arguments(&name, &call.arguments);
                Some(ToolCall { id, name, args })
            })
            .collect();

        Message::assistant_with_tools(self.content, tool_calls)
    }
}

/// Parse accumulated argument text into an object.
///
/// Malformed arguments become `{}` so the tool's own validation reports what
/// is missing back to the model.
fn parse_arguments(tool: &str, raw: &str) -> Map<String, Value> {
    if raw.trim().is_empty() {
        return Map::new();
    }
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(map)) => map,
        Ok(other) => {
            warn!(tool, kind = %json_kind(&other), "Tool arguments are not an object");
            Map::new()
        }
        Err(e) => {
            warn!(tool, error = %e, "Tool arguments are not valid JSON");
            Map::new()
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
