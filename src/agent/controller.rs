//! Agent Controller - bounded tool-calling loop for one chat turn
//!
//! The AgentController streams a completion for the session's history, runs
//! any tools the model asked for, stores their results, and repeats until the
//! model answers without tool calls or the round limit is reached. Progress is
//! reported to the caller as [`AgentEvent`]s over an mpsc channel.

use std::sync::Arc;
use std::time::Instant;

use futures_util::StreamExt;
use tokio::sync::mpsc;
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

use super::events::{AgentEvent, TOOL_STATUS_TEXT};
use super::message::{Message, ToolCall};
use super::sessions::SessionStore;
use crate::llm::{AssistantAccumulator, ChatError, ChatModel};
use crate::metrics::{
    AGENT_ROUNDS, AGENT_TURNS, CHART_EVENTS, MODEL_STREAM_DURATION, TURNS_IN_FLIGHT,
};
use crate::tools::ToolInvoker;

/// Stored in place of an image payload once the chart has been sent to the client
pub const CHART_ACKNOWLEDGMENT: &str = "Chart generated and already displayed to the user. \
Do not repeat, encode, or link the image in your reply; describe the trend in words if useful.";

/// Buffered events per turn before the producer waits on the client
const EVENT_CHANNEL_CAPACITY: usize = 100;

/// Configuration for the agent controller
///
/// Only `max_rounds` is read by the loop itself. `model` and `temperature`
/// are client-construction settings: they are handed to the [`ChatModel`]
/// back-end when it is built, and the loop reports whatever
/// [`ChatModel::model_name`] returns.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Model the back-end client is built for (e.g., "qwen3")
    pub model: String,
    /// Maximum number of rounds (model calls) per turn
    pub max_rounds: usize,
    /// Sampling temperature the back-end client sends with each request
    pub temperature: f32,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            model: "qwen3".to_string(),
            max_rounds: 5,
            temperature: 0.0,
        }
    }
}

/// Error type for loop-fatal faults
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    #[error("{0}")]
    Model(#[from] ChatError),
}

/// How a turn ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnOutcome {
    /// The model answered without requesting tools
    Done,
    /// `max_rounds` rounds ran and the last one still requested tools.
    /// The client sees a normal `done`.
    RoundLimit,
    /// A loop-fatal fault; the client saw one `error` event
    Failed,
    /// The receiver went away mid-turn
    Cancelled,
}

impl TurnOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            TurnOutcome::Done => "done",
            TurnOutcome::RoundLimit => "round_limit",
            TurnOutcome::Failed => "error",
            TurnOutcome::Cancelled => "cancelled",
        }
    }
}

/// Why a turn stopped early
enum Interrupt {
    Cancelled,
    Failed(AgentError),
}

impl From<AgentError> for Interrupt {
    fn from(e: AgentError) -> Self {
        Interrupt::Failed(e)
    }
}

impl From<ChatError> for Interrupt {
    fn from(e: ChatError) -> Self {
        Interrupt::Failed(AgentError::from(e))
    }
}

/// Send one event; a closed channel means the client disconnected.
async fn emit(events: &mpsc::Sender<AgentEvent>, event: AgentEvent) -> Result<(), Interrupt> {
    events.send(event).await.map_err(|_| Interrupt::Cancelled)
}

/// Agent Controller orchestrating model streaming and tool execution
pub struct AgentController {
    model: Arc<dyn ChatModel>,
    invoker: ToolInvoker,
    sessions: Arc<SessionStore>,
    config: AgentConfig,
}

impl AgentController {
    /// Create a new agent controller
    ///
    /// # Arguments
    /// * `model` - Streaming chat back-end
    /// * `invoker` - Tool lookup and result normalization
    /// * `sessions` - Conversation store shared with the HTTP layer
    /// * `config` - Agent configuration
    pub fn new(
        model: Arc<dyn ChatModel>,
        invoker: ToolInvoker,
        sessions: Arc<SessionStore>,
        config: AgentConfig,
    ) -> Self {
        Self {
            model,
            invoker,
            sessions,
            config,
        }
    }

    pub fn sessions(&self) -> &Arc<SessionStore> {
        &self.sessions
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    /// Start a turn on a background task and return its event stream.
    ///
    /// Dropping the receiver cancels the turn at its next emit.
    pub fn start_turn(
        self: &Arc<Self>,
        session_id: impl Into<String>,
        user_message: impl Into<String>,
    ) -> mpsc::Receiver<AgentEvent> {
        let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let controller = Arc::clone(self);
        let session_id = session_id.into();
        let user_message = user_message.into();

        tokio::spawn(async move {
            controller.run_turn(&session_id, &user_message, tx).await;
        });

        rx
    }

    /// Run one chat turn to completion, sending events to `events`.
    ///
    /// Holds the session's turn lock throughout, so turns on one session run
    /// one at a time. The user message is appended before the first round.
    pub async fn run_turn(
        &self,
        session_id: &str,
        user_message: &str,
        events: mpsc::Sender<AgentEvent>,
    ) -> TurnOutcome {
        let turn_id = Uuid::now_v7().to_string();

        // Root span for the whole turn
        let turn_span = info_span!(
            "agent_turn",
            session_id = %session_id,
            turn_id = %turn_id,
            model = %self.model.model_name(),
            otel.name = "agent_turn"
        );

        async {
            let _turn = self.sessions.begin_turn(session_id).await;
            TURNS_IN_FLIGHT.inc();
            info!("Starting chat turn");

            self.sessions.append(session_id, Message::user(user_message));

            let mut rounds = 0;
            let outcome = match self.run_rounds(session_id, &events, &mut rounds).await {
                Ok(outcome) => {
                    // Round-limit exhaustion still ends with `done`
                    let _ = events.send(AgentEvent::Done).await;
                    outcome
                }
                Err(Interrupt::Cancelled) => {
                    info!(rounds, "Client went away, abandoning turn");
                    TurnOutcome::Cancelled
                }
                Err(Interrupt::Failed(e)) => {
                    error!(error = %e, rounds, "Chat turn failed");
                    let _ = events.send(AgentEvent::error(e.to_string())).await;
                    TurnOutcome::Failed
                }
            };

            AGENT_ROUNDS.observe(rounds as f64);
            AGENT_TURNS.with_label_values(&[outcome.label()]).inc();
            TURNS_IN_FLIGHT.dec();
            info!(rounds, outcome = outcome.label(), "Chat turn finished");

            outcome
        }
        .instrument(turn_span)
        .await
    }

    async fn run_rounds(
        &self,
        session_id: &str,
        events: &mpsc::Sender<AgentEvent>,
        rounds: &mut usize,
    ) -> Result<TurnOutcome, Interrupt> {
        for round in 0..self.config.max_rounds {
            *rounds = round + 1;

            let round_span = info_span!("agent_round", round, otel.name = "agent_round");
            let requested_tools = self
                .run_round(session_id, events)
                .instrument(round_span)
                .await?;

            if !requested_tools {
                return Ok(TurnOutcome::Done);
            }
        }

        warn!(
            max_rounds = self.config.max_rounds,
            "Round limit reached while the model was still calling tools"
        );
        Ok(TurnOutcome::RoundLimit)
    }

    /// One round: stream the assistant reply, then run its tool calls.
    /// Returns whether the model requested tools.
    async fn run_round(
        &self,
        session_id: &str,
        events: &mpsc::Sender<AgentEvent>,
    ) -> Result<bool, Interrupt> {
        let history = self.sessions.get(session_id);
        let tools = self.invoker.registry().specs();
        debug!(messages = history.len(), tools = tools.len(), "Calling model");

        let started = Instant::now();
        let mut stream = self.model.stream_chat(&history, &tools).await?;
        let mut reply = AssistantAccumulator::new();

        loop {
            let next = tokio::select! {
                biased;
                _ = events.closed() => return Err(Interrupt::Cancelled),
                next = stream.next() => next,
            };
            let Some(fragment) = next else {
                break;
            };
            let fragment = fragment?;

            if !fragment.content.is_empty() {
                emit(events, AgentEvent::token(fragment.content.clone())).await?;
            }
            reply.push(&fragment);
        }
        drop(stream);

        MODEL_STREAM_DURATION
            .with_label_values(&[self.model.model_name()])
            .observe(started.elapsed().as_secs_f64());

        let assistant = reply.finish();
        let calls = assistant.tool_calls.clone();
        self.sessions.append(session_id, assistant);

        if calls.is_empty() {
            return Ok(false);
        }

        info!(tool_calls = calls.len(), "Model requested tools");
        emit(events, AgentEvent::status(TOOL_STATUS_TEXT)).await?;

        // Sequential, in the order the model produced them
        for call in &calls {
            let tool_span = info_span!(
                "tool_call",
                tool = %call.name,
                call_id = %call.id,
                otel.name = "tool_call"
            );
            self.run_tool(session_id, call, events)
                .instrument(tool_span)
                .await?;
        }

        Ok(true)
    }

    async fn run_tool(
        &self,
        session_id: &str,
        call: &ToolCall,
        events: &mpsc::Sender<AgentEvent>,
    ) -> Result<(), Interrupt> {
        emit(
            events,
            AgentEvent::ToolStart {
                tool: call.name.clone(),
            },
        )
        .await?;

        let outcome = self.invoker.invoke(&call.name, &call.args).await;

        let content = match outcome.chart() {
            Some(chart) => {
                CHART_EVENTS.with_label_values(&[&call.name]).inc();
                debug!(mime = %chart.mime_type, bytes = chart.data.len(), "Routing chart to client");
                emit(events, AgentEvent::Chart { src: chart.data_uri() }).await?;
                CHART_ACKNOWLEDGMENT.to_string()
            }
            None => outcome.message_content(),
        };

        self.sessions
            .append(session_id, Message::tool(call.id.clone(), content));

        emit(
            events,
            AgentEvent::ToolEnd {
                tool: call.name.clone(),
            },
        )
        .await
    }
}
