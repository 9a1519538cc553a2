//! Tool Invoker - uniform results from heterogeneous tools
//!
//! Every tool call goes through [`ToolInvoker::invoke`], which never fails:
//! unknown tools, tool faults and tool panics come back as
//! [`ToolOutcome::Error`], so one broken tool cannot take down the rest of a
//! round.
//!
//! ```text
//! ToolReturn::Blocks  ──first block──┐
//! ToolReturn::Mapping ──serialize────┼──► text ──parses?──► StructuredJson
//! ToolReturn::Text    ──as-is────────┘                 └─► Text
//! Err(ToolFault)      ───────────────────────────────────► Error
//! ```

use std::any::Any;
use std::panic::AssertUnwindSafe;

use base64::Engine;
use futures_util::FutureExt;
use serde_json::{Map, Value};
use tracing::{debug, error, warn};

use super::{ToolFault, ToolRegistry, ToolReturn};
use crate::metrics::TOOL_CALLS;

/// Field carrying an inline chart image
pub const IMAGE_FIELD: &str = "image_base64";
/// Optional field naming the image media type
pub const IMAGE_MIME_FIELD: &str = "mime_type";
const DEFAULT_IMAGE_MIME: &str = "image/png";

/// Normalized tool result
#[derive(Debug, Clone, PartialEq)]
pub enum ToolOutcome {
    Text(String),
    /// Text that parsed as JSON. `raw` is what gets stored in the conversation;
    /// `json` is only inspected for side-channel payloads.
    StructuredJson { raw: String, json: Value },
    Error(String),
}

impl ToolOutcome {
    /// Label used for metrics and logs
    pub fn kind(&self) -> &'static str {
        match self {
            ToolOutcome::Text(_) => "text",
            ToolOutcome::StructuredJson { .. } => "json",
            ToolOutcome::Error(_) => "error",
        }
    }

    /// Content for the tool message that goes back to the model
    pub fn message_content(&self) -> String {
        match self {
            ToolOutcome::Text(text) => text.clone(),
            ToolOutcome::StructuredJson { raw, .. } => raw.clone(),
            ToolOutcome::Error(message) => serde_json::json!({ "error": message }).to_string(),
        }
    }

    /// Inline image carried by a structured result, if any
    pub fn chart(&self) -> Option<ChartPayload> {
        match self {
            ToolOutcome::StructuredJson { json, .. } => ChartPayload::from_json(json),
            _ => None,
        }
    }
}

/// Image found in a tool result
#[derive(Debug, Clone, PartialEq)]
pub struct ChartPayload {
    pub mime_type: String,
    /// Base64 image bytes
    pub data: String,
}

impl ChartPayload {
    fn from_json(json: &Value) -> Option<Self> {
        let object = json.as_object()?;
        let data = object.get(IMAGE_FIELD)?.as_str()?.trim();
        if data.is_empty() {
            return None;
        }
        let mime_type = object
            .get(IMAGE_MIME_FIELD)
            .and_then(Value::as_str)
            .filter(|m| m.starts_with("image/"))
            .unwrap_or(DEFAULT_IMAGE_MIME);
        Some(Self {
            mime_type: mime_type.to_string(),
            data: data.to_string(),
        })
    }

    /// Wrap raw image bytes
    pub fn from_bytes(mime_type: impl Into<String>, bytes: &[u8]) -> Self {
        Self {
            mime_type: mime_type.into(),
            data: base64::engine::general_purpose::STANDARD.encode(bytes),
        }
    }

    /// `data:<mime>;base64,<data>`, ready for an `<img src>`
    pub fn data_uri(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.data)
    }
}

/// Looks up tools by name and normalizes whatever they return
#[derive(Clone)]
pub struct ToolInvoker {
    registry: ToolRegistry,
}

impl ToolInvoker {
    pub fn new(registry: ToolRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Run tool `name` with `args`. Never returns an error.
    pub async fn invoke(&self, name: &str, args: &Map<String, Value>) -> ToolOutcome {
        let outcome = match self.registry.get(name) {
            None => {
                warn!(tool = %name, "Model requested an unknown tool");
                ToolOutcome::Error(ToolFault::NotFound.to_string())
            }
            Some(tool) => match AssertUnwindSafe(tool.call(args)).catch_unwind().await {
                Ok(Ok(value)) => normalize(value),
                Ok(Err(e)) => {
                    warn!(tool = %name, error = %e, "Tool invocation failed");
                    ToolOutcome::Error(e.to_string())
                }
                Err(panic) => {
                    let reason = panic_message(panic.as_ref());
                    error!(tool = %name, reason = %reason, "Tool panicked");
                    ToolOutcome::Error(format!("Tool panicked: {}", reason))
                }
            },
        };

        TOOL_CALLS.with_label_values(&[name, outcome.kind()]).inc();
        debug!(tool = %name, kind = outcome.kind(), "Tool finished");
        outcome
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Collapse any accepted return shape into a [`ToolOutcome`].
pub fn normalize(value: ToolReturn) -> ToolOutcome {
    let text = match value {
        ToolReturn::Text(text) => text,
        ToolReturn::Mapping(map) => Value::Object(map).to_string(),
        ToolReturn::Blocks(blocks) => match blocks.into_iter().next() {
            None => Value::Array(Vec::new()).to_string(),
            Some(Value::String(text)) => text,
            Some(Value::Object(block)) => match block.get("text").and_then(Value::as_str) {
                Some(text) => text.to_string(),
                None => Value::Object(block).to_string(),
            },
            Some(other) => other.to_string(),
        },
    };

    match serde_json::from_str::<Value>(&text) {
        Ok(json) if json.is_object() || json.is_array() => ToolOutcome::StructuredJson { raw: text, json },
        _ => ToolOutcome::Text(text),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::{FunctionTool, ToolSpec};
    use serde_json::json;

    fn spec(name: &str) -> ToolSpec {
        ToolSpec {
            name: name.to_string(),
            description: String::new(),
            parameters: json!({"type": "object"}),
        }
    }

    fn invoker() -> ToolInvoker {
        let mut registry = ToolRegistry::new();
        registry.register(FunctionTool::new(spec("echo"), |_| async {
            Ok(ToolReturn::Text("plain answer".into()))
        }));
        registry.register(FunctionTool::new(spec("broken"), |_| async {
            Err(ToolFault::Failed("division by zero".into()))
        }));
        registry.register(FunctionTool::new(spec("panics"), |args| async move {
            let years = args.get("years").and_then(Value::as_u64).unwrap_or(0) as u32;
            let months = years.checked_mul(12).expect("attempt to multiply with overflow");
            Ok(ToolReturn::Text(months.to_string()))
        }));
        ToolInvoker::new(registry)
    }

    #[tokio::test]
    async fn test_unknown_tool() {
        let outcome = invoker().invoke("nope", &Map::new()).await;
        assert_eq!(outcome, ToolOutcome::Error("Tool not found".into()));
        assert_eq!(outcome.message_content(), r#"{"error":"Tool not found"}"#);
    }

    #[tokio::test]
    async fn test_fault_is_captured() {
        let outcome = invoker().invoke("broken", &Map::new()).await;
        assert_eq!(outcome, ToolOutcome::Error("division by zero".into()));
    }

    #[tokio::test]
    async fn test_panic_is_captured() {
        let invoker = invoker();
        let mut args = Map::new();
        args.insert("years".into(), json!(400000000));

        let outcome = invoker.invoke("panics", &args).await;
        assert_eq!(
            outcome,
            ToolOutcome::Error("Tool panicked: attempt to multiply with overflow".into())
        );

        // The invoker stays usable afterwards
        args.insert("years".into(), json!(2));
        assert_eq!(invoker.invoke("panics", &args).await, ToolOutcome::Text("24".into()));
    }

    #[tokio::test]
    async fn test_plain_text() {
        let outcome = invoker().invoke("echo", &Map::new()).await;
        assert_eq!(outcome, ToolOutcome::Text("plain answer".into()));
    }

    #[test]
    fn test_blocks_take_first_text() {
        let outcome = normalize(ToolReturn::Blocks(vec![
            json!({"type": "text", "text": "{\"emi\": 100.5}"}),
            json!({"type": "text", "text": "ignored"}),
        ]));
        match outcome {
            ToolOutcome::StructuredJson { raw, json } => {
                assert_eq!(raw, "{\"emi\": 100.5}");
                assert_eq!(json["emi"], 100.5);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_blocks_string_and_opaque() {
        assert_eq!(
            normalize(ToolReturn::Blocks(vec![json!("hello")])),
            ToolOutcome::Text("hello".into())
        );
        let opaque = normalize(ToolReturn::Blocks(vec![json!({"type": "resource", "uri": "x"})]));
        assert_eq!(opaque.kind(), "json");
    }

    #[test]
    fn test_mapping_is_serialized() {
        let mut map = Map::new();
        map.insert("future_value".into(), json!(1234.5));
        let outcome = normalize(ToolReturn::Mapping(map));
        assert_eq!(outcome.message_content(), r#"{"future_value":1234.5}"#);
        assert!(outcome.chart().is_none());
    }

    #[test]
    fn test_scalar_json_stays_text() {
        assert_eq!(normalize(ToolReturn::Text("42".into())), ToolOutcome::Text("42".into()));
    }

    #[test]
    fn test_chart_detection() {
        let outcome = normalize(ToolReturn::Text(
            r#"{"image_base64": "iVBORw0KGgo="}"#.into(),
        ));
        let chart = outcome.chart().unwrap();
        assert_eq!(chart.data_uri(), "data:image/png;base64,iVBORw0KGgo=");

        let svg = normalize(ToolReturn::Text(
            r#"{"image_base64": "PHN2Zy8+", "mime_type": "image/svg+xml"}"#.into(),
        ));
        assert_eq!(svg.chart().unwrap().mime_type, "image/svg+xml");

        let empty = normalize(ToolReturn::Text(r#"{"image_base64": ""}"#.into()));
        assert!(empty.chart().is_none());
    }

    #[test]
    fn test_from_bytes() {
        let chart = ChartPayload::from_bytes("image/svg+xml", b"<svg/>");
        assert_eq!(chart.data_uri(), "data:image/svg+xml;base64,PHN2Zy8+");
    }
}
