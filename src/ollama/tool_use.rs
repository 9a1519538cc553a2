//! Ollama `/api/chat` wire types
//!
//! Requests carry the conversation and tool definitions; streamed responses
//! are one JSON object per line with a partial `message`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::agent::message::{Message, Role};
use crate::llm::{ChatFragment, ToolCallDelta};
use crate::tools::ToolSpec;

/// A message as Ollama expects it
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OllamaMessage {
    pub role: String, // "system", "user", "assistant", "tool"
    #[serde(default)]
    pub content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<OllamaToolCall>,
    /// Name of the tool a "tool" message answers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_name: Option<String>,
}

/// A tool call as emitted by the model
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OllamaToolCall {
    pub function: FunctionCall,
}

/// Function call details
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FunctionCall {
    pub name: String,
    #[serde(default)]
    pub arguments: Value,
}

/// Tool definition for the model
#[derive(Debug, Clone, Serialize)]
pub struct Tool {
    #[serde(rename = "type")]
    pub tool_type: String, // Always "function"
    pub function: ToolFunction,
}

/// Function specification for a tool
#[derive(Debug, Clone, Serialize)]
pub struct ToolFunction {
    pub name: String,
    pub description: String,
    pub parameters: Value, // JSON Schema
}

impl From<&ToolSpec> for Tool {
    fn from(spec: &ToolSpec) -> Self {
        Tool {
            tool_type: "function".to_string(),
            function: ToolFunction {
                name: spec.name.clone(),
                description: spec.description.clone(),
                parameters: spec.parameters.clone(),
            },
        }
    }
}

/// One line of a streamed `/api/chat` response
#[derive(Debug, Clone, Deserialize)]
pub struct ChatChunk {
    #[serde(default)]
    pub message: Option<OllamaMessage>,
    #[serde(default)]
    pub done: bool,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub eval_count: u32,
}

impl ChatChunk {
    /// Convert to a fragment. Ollama sends whole tool calls, so each one gets
    /// the next free index from `next_index`.
    pub fn to_fragment(&self, next_index: &mut usize) -> ChatFragment {
        let Some(message) = &self.message else {
            return ChatFragment::default();
        };

        let tool_calls = message
            .tool_calls
            .iter()
            .map(|call| {
                let index = *next_index;
                *next_index += 1;
                ToolCallDelta {
                    index,
                    id: None,
                    name: Some(call.function.name.clone()),
                    arguments: arguments_text(&call.function.arguments),
                }
            })
            .collect();

        ChatFragment {
            content: message.content.clone(),
            tool_calls,
        }
    }
}

/// Ollama usually sends arguments as an object, some models as a JSON string.
fn arguments_text(arguments: &Value) -> String {
    match arguments {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Convert a conversation to Ollama messages.
///
/// Ollama identifies tool results by tool name rather than call id, so each
/// tool message is matched to the call it answers in the preceding assistant
/// message.
pub fn to_ollama_messages(messages: &[Message]) -> Vec<OllamaMessage> {
    let mut out = Vec::with_capacity(messages.len());
    let mut last_calls: &[crate::agent::message::ToolCall] = &[];

    for message in messages {
        let tool_name = match message.role {
            Role::Tool => message.tool_call_id.as_deref().and_then(|id| {
                last_calls
                    .iter()
                    .find(|call| call.id == id)
                    .map(|call| call.name.clone())
            }),
            _ => None,
        };

        if message.role == Role::Assistant {
            last_calls = &message.tool_calls;
        }

        out.push(OllamaMessage {
            role: message.role.as_str().to_string(),
            content: message.content.clone(),
            tool_calls: message
                .tool_calls
                .iter()
                .map(|call| OllamaToolCall {
                    function: FunctionCall {
                        name: call.name.clone(),
                        arguments: Value::Object(call.args.clone()),
                    },
                })
                .collect(),
            tool_name,
        });
    }

    out
}

/// Build the JSON body for a streaming chat request.
pub fn chat_request_body(
    model: &str,
    messages: &[Message],
    tools: &[ToolSpec],
    temperature: f32,
) -> Value {
    let mut body = Map::new();
    body.insert("model".into(), Value::String(model.to_string()));
    body.insert(
        "messages".into(),
        serde_json::to_value(to_ollama_messages(messages)).unwrap_or(Value::Array(Vec::new())),
    );
    body.insert("stream".into(), Value::Bool(true));
    body.insert("options".into(), serde_json::json!({ "temperature": temperature }));
    if !tools.is_empty() {
        let tools: Vec<Tool> = tools.iter().map(Tool::from).collect();
        body.insert(
            "tools".into(),
            serde_json::to_value(tools).unwrap_or(Value::Array(Vec::new())),
        );
    }
    Value::Object(body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::message::ToolCall;
    use serde_json::json;

    #[test]
    fn test_tool_serialization() {
        let spec = ToolSpec {
            name: "calculate_emi".into(),
            description: "EMI".into(),
            parameters: json!({"type": "object"}),
        };
        let json = serde_json::to_string(&Tool::from(&spec)).unwrap();
        assert!(json.contains("\"type\":\"function\""));
        assert!(json.contains("\"name\":\"calculate_emi\""));
    }

    #[test]
    fn test_tool_messages_carry_tool_name() {
        let mut args = Map::new();
        args.insert("principal".into(), json!(1000));
        let history = vec![
            Message::system("sys"),
            Message::assistant_with_tools("", vec![ToolCall::new("c1", "calculate_emi", args)]),
            Message::tool("c1", "{\"emi\": 10}"),
        ];
        let wire = to_ollama_messages(&history);

        assert_eq!(wire[1].tool_calls[0].function.name, "calculate_emi");
        assert_eq!(wire[1].tool_calls[0].function.arguments["principal"], 1000);
        assert_eq!(wire[2].role, "tool");
        assert_eq!(wire[2].tool_name.as_deref(), Some("calculate_emi"));
        assert!(wire[0].tool_name.is_none());
    }

    #[test]
    fn test_chunk_to_fragment_indexes_calls() {
        let line = r#"{"message":{"role":"assistant","content":"","tool_calls":[
            {"function":{"name":"a","arguments":{"x":1}}},
            {"function":{"name":"b","arguments":"{\"y\":2}"}}]},"done":false}"#;
        let chunk: ChatChunk = serde_json::from_str(line).unwrap();

        let mut next = 3;
        let fragment = chunk.to_fragment(&mut next);
        assert_eq!(next, 5);
        assert_eq!(fragment.tool_calls[0].index, 3);
        assert_eq!(fragment.tool_calls[0].arguments, r#"{"x":1}"#);
        assert_eq!(fragment.tool_calls[1].arguments, r#"{"y":2}"#);
    }

    #[test]
    fn test_request_body_omits_empty_tools() {
        let body = chat_request_body("qwen3", &[Message::user("hi")], &[], 0.0);
        assert_eq!(body["stream"], true);
        assert!(body.get("tools").is_none());
        assert_eq!(body["messages"][0]["role"], "user");
    }
}
