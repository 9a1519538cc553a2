//! Prometheus metrics for the chat orchestrator
//!
//! All metrics live in the default registry and are exported in text format
//! by [`encode_metrics`] (served at `GET /metrics`).

use lazy_static::lazy_static;
use prometheus::{
    register_counter_vec, register_gauge, register_histogram, register_histogram_vec,
    CounterVec, Encoder, Gauge, Histogram, HistogramVec, TextEncoder,
};

lazy_static! {
    // ─────────────────────────────────────────────────────────────────────────────
    // Agent Loop Metrics
    // ─────────────────────────────────────────────────────────────────────────────

    /// Finished chat turns, by how they ended.
    ///
    /// Labels:
    /// - outcome: "done", "round_limit", "error" or "cancelled"
    pub static ref AGENT_TURNS: CounterVec = register_counter_vec!(
        "finorch_agent_turns_total",
        "Chat turns processed by the agent loop",
        &["outcome"]
    ).expect("failed to register AGENT_TURNS metric");

    /// Rounds (model stream + tool execution) used per turn.
    pub static ref AGENT_ROUNDS: Histogram = register_histogram!(
        "finorch_agent_rounds",
        "Rounds executed per chat turn",
        vec![1.0, 2.0, 3.0, 4.0, 5.0, 8.0, 10.0]
    ).expect("failed to register AGENT_ROUNDS metric");

    /// Turns currently being processed.
    pub static ref TURNS_IN_FLIGHT: Gauge = register_gauge!(
        "finorch_turns_in_flight",
        "Chat turns currently streaming"
    ).expect("failed to register TURNS_IN_FLIGHT metric");

    /// Time from opening a model stream to its last fragment.
    ///
    /// Labels:
    /// - model: model name passed to the back-end
    pub static ref MODEL_STREAM_DURATION: HistogramVec = register_histogram_vec!(
        "finorch_model_stream_duration_seconds",
        "Duration of one streamed model completion",
        &["model"]
    ).expect("failed to register MODEL_STREAM_DURATION metric");

    // ─────────────────────────────────────────────────────────────────────────────
    // Tool Metrics
    // ─────────────────────────────────────────────────────────────────────────────

    /// Tool invocations.
    ///
    /// Labels:
    /// - tool: tool name as requested by the model
    /// - status: "text", "json" or "error"
    pub static ref TOOL_CALLS: CounterVec = register_counter_vec!(
        "finorch_tool_calls_total",
        "Tool invocations by tool and normalized outcome",
        &["tool", "status"]
    ).expect("failed to register TOOL_CALLS metric");

    /// Chart images routed around the model.
    pub static ref CHART_EVENTS: CounterVec = register_counter_vec!(
        "finorch_chart_events_total",
        "Chart payloads delivered through the side channel",
        &["tool"]
    ).expect("failed to register CHART_EVENTS metric");

    // ─────────────────────────────────────────────────────────────────────────────
    // Session Metrics
    // ─────────────────────────────────────────────────────────────────────────────

    /// Sessions held in memory.
    pub static ref SESSIONS_ACTIVE: Gauge = register_gauge!(
        "finorch_sessions_active",
        "Sessions currently held by the session store"
    ).expect("failed to register SESSIONS_ACTIVE metric");

    /// Tool messages removed by history repair.
    ///
    /// Labels:
    /// - phase: "read" (sanitized view) or "trim" (after capacity trimming)
    pub static ref SANITIZER_DROPS: CounterVec = register_counter_vec!(
        "finorch_sanitizer_dropped_messages_total",
        "Orphaned tool messages dropped by history repair",
        &["phase"]
    ).expect("failed to register SANITIZER_DROPS metric");
}

/// Render every registered metric in Prometheus text exposition format.
pub fn encode_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&families, &mut buffer)?;
    Ok(String::from_utf8_lossy(&buffer).into_owned())
}
