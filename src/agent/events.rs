//! Outbound streaming protocol
//!
//! The agent loop reports progress as a sequence of [`AgentEvent`]s. Each
//! event serializes to a flat JSON object tagged by `type`, which the server
//! writes as one SSE `data:` frame.
//!
//! Per round: `token*`, then at most one `status`, then one
//! `tool_start, [chart], tool_end` group per tool call. A stream always ends
//! with exactly one `done` or one `error`.

use serde::{Deserialize, Serialize};

/// Status text sent once per round before tools run
pub const TOOL_STATUS_TEXT: &str = "Using financial tools...";

/// One event in the outbound stream
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgentEvent {
    /// Partial assistant text
    Token { content: String },
    /// Progress note for the client
    Status { content: String },
    ToolStart { tool: String },
    ToolEnd { tool: String },
    /// Ready-to-display image (data URI)
    Chart { src: String },
    Done,
    Error { content: String },
}

impl AgentEvent {
    pub fn token(content: impl Into<String>) -> Self {
        AgentEvent::Token {
            content: content.into(),
        }
    }

    pub fn status(content: impl Into<String>) -> Self {
        AgentEvent::Status {
            content: content.into(),
        }
    }

    pub fn error(content: impl Into<String>) -> Self {
        AgentEvent::Error {
            content: content.into(),
        }
    }

    /// Whether this event closes the stream
    pub fn is_terminal(&self) -> bool {
        matches!(self, AgentEvent::Done | AgentEvent::Error { .. })
    }

    /// JSON payload for one frame
    pub fn to_json(&self) -> String {
        // A plain enum of strings cannot fail to serialize
        serde_json::to_string(self).unwrap_or_else(|_| String::from("{\"type\":\"error\"}"))
    }

    /// Full SSE frame: `data: <json>\n\n`
    pub fn to_sse_frame(&self) -> String {
        format!("data: {}\n\n", self.to_json())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_wire_shapes() {
        assert_eq!(
            AgentEvent::token("Hel").to_json(),
            r#"{"type":"token","content":"Hel"}"#
        );
        assert_eq!(
            AgentEvent::ToolStart {
                tool: "calculate_emi".into()
            }
            .to_json(),
            r#"{"type":"tool_start","tool":"calculate_emi"}"#
        );
        assert_eq!(
            AgentEvent::Chart {
                src: "data:image/png;base64,AA==".into()
            }
            .to_json(),
            r#"{"type":"chart","src":"data:image/png;base64,AA=="}"#
        );
        assert_eq!(AgentEvent::Done.to_json(), r#"{"type":"done"}"#);
    }

    #[test]
    fn test_sse_frame() {
        let frame = AgentEvent::error("boom").to_sse_frame();
        assert_eq!(frame, "data: {\"type\":\"error\",\"content\":\"boom\"}\n\n");
    }

    #[test]
    fn test_terminal_events() {
        assert!(AgentEvent::Done.is_terminal());
        assert!(AgentEvent::error("x").is_terminal());
        assert!(!AgentEvent::status("x").is_terminal());
    }

    #[test]
    fn test_round_trip_from_client_side() {
        let parsed: AgentEvent = serde_json::from_str(r#"{"type":"tool_end","tool":"x"}"#).unwrap();
        assert_eq!(parsed, AgentEvent::ToolEnd { tool: "x".into() });
    }
}
