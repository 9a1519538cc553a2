//! Command-line and environment configuration
//!
//! Every flag falls back to an environment variable, then to a default, so
//! the server runs with no arguments against a local Ollama.

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::agent::sessions::{SessionConfig, DEFAULT_SYSTEM_PROMPT};
use crate::agent::AgentConfig;

/// Which chat back-end serves completions
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Provider {
    /// Ollama `/api/chat`
    Ollama,
    /// Any OpenAI-compatible `/chat/completions` server
    Openai,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("max rounds must be at least 1, got {0}")]
    InvalidMaxRounds(usize),
    #[error("session capacity must be at least 2, got {0}")]
    InvalidCapacity(usize),
    #[error("the openai provider needs an API key (--openai-api-key or OPENAI_API_KEY)")]
    MissingApiKey,
    #[error("failed to read system prompt from {path}: {source}")]
    PromptFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("system prompt file {0} is empty")]
    EmptyPrompt(PathBuf),
}

/// Streaming financial chat agent with tool calling
#[derive(Debug, Clone, Parser)]
#[command(name = "finorch", author, version, about)]
pub struct AppConfig {
    /// Address to bind the HTTP server to
    #[arg(long, env = "FINORCH_BIND", default_value = "0.0.0.0:8000")]
    pub bind: SocketAddr,

    /// Chat back-end
    #[arg(long, env = "FINORCH_PROVIDER", value_enum, default_value_t = Provider::Ollama)]
    pub provider: Provider,

    /// Model name passed to the back-end
    #[arg(long, env = "FINORCH_MODEL", default_value = "qwen3")]
    pub model: String,

    /// Sampling temperature
    #[arg(long, env = "FINORCH_TEMPERATURE", default_value_t = 0.0)]
    pub temperature: f32,

    /// Ollama server URL
    #[arg(long, env = "OLLAMA_URL", default_value = "http://localhost:11434")]
    pub ollama_url: String,

    /// OpenAI-compatible base URL, including the version prefix
    #[arg(long, env = "OPENAI_BASE_URL", default_value = "https://api.openai.com/v1")]
    pub openai_url: String,

    /// Bearer token for the OpenAI-compatible back-end
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    pub openai_api_key: Option<String>,

    /// Maximum model rounds per chat turn
    #[arg(long, env = "FINORCH_MAX_ROUNDS", default_value_t = 5)]
    pub max_rounds: usize,

    /// Messages retained per session, including the system message
    #[arg(long, env = "FINORCH_SESSION_CAPACITY", default_value_t = 20)]
    pub session_capacity: usize,

    /// Replace the built-in system prompt with the contents of this file
    #[arg(long, env = "FINORCH_SYSTEM_PROMPT_FILE")]
    pub system_prompt_file: Option<PathBuf>,

    /// OTLP gRPC endpoint for span export (console logging only when unset)
    #[arg(long, env = "OTEL_EXPORTER_OTLP_ENDPOINT")]
    pub otlp_endpoint: Option<String>,

    /// Log as JSON lines
    #[arg(long, env = "FINORCH_JSON_LOGS")]
    pub json_logs: bool,
}

impl AppConfig {
    /// Check cross-field constraints clap cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_rounds < 1 {
            return Err(ConfigError::InvalidMaxRounds(self.max_rounds));
        }
        if self.session_capacity < 2 {
            return Err(ConfigError::InvalidCapacity(self.session_capacity));
        }
        if self.provider == Provider::Openai
            && self.openai_api_key.as_deref().map_or(true, str::is_empty)
        {
            return Err(ConfigError::MissingApiKey);
        }
        Ok(())
    }

    pub fn agent_config(&self) -> AgentConfig {
        AgentConfig {
            model: self.model.clone(),
            max_rounds: self.max_rounds,
            temperature: self.temperature,
        }
    }

    /// Session settings, reading the system prompt file if one was given.
    pub fn session_config(&self) -> Result<SessionConfig, ConfigError> {
        let system_prompt = match &self.system_prompt_file {
            None => DEFAULT_SYSTEM_PROMPT.to_string(),
            Some(path) => {
                let text = std::fs::read_to_string(path).map_err(|source| ConfigError::PromptFile {
                    path: path.clone(),
                    source,
                })?;
                let text = text.trim().to_string();
                if text.is_empty() {
                    return Err(ConfigError::EmptyPrompt(path.clone()));
                }
                text
            }
        };

        Ok(SessionConfig {
            capacity: self.session_capacity,
            system_prompt,
        })
    }
}
