//! Tools the model can call
//!
//! A tool is anything implementing [`ToolCapability`]: it describes itself
//! with a [`ToolSpec`] (name, description, JSON Schema) and turns an argument
//! map into a [`ToolReturn`]. Tools may answer with content blocks, a mapping
//! or plain text; [`invoker::ToolInvoker`] normalizes all three.
//!
//! Built-in tools:
//! - `finance` - financial calculators (SIP, EMI, inflation, retirement, ...)
//! - `chart` - SVG growth/comparison charts delivered through the side channel

pub mod chart;
pub mod finance;
pub mod invoker;

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::{json, Map, Value};

pub use invoker::{ChartPayload, ToolInvoker, ToolOutcome};

/// Tool definition offered to the model
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    /// JSON Schema for the argument object
    pub parameters: Value,
}

/// What a tool hands back before normalization
#[derive(Debug, Clone, PartialEq)]
pub enum ToolReturn {
    /// Ordered content blocks, e.g. `[{"type":"text","text":"..."}]`
    Blocks(Vec<Value>),
    Mapping(Map<String, Value>),
    Text(String),
}

/// A tool failed to run (as opposed to rejecting its inputs)
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ToolFault {
    #[error("Tool not found")]
    NotFound,
    #[error("{0}")]
    Failed(String),
}

/// Input rejected by a calculator's own checks
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{0}")]
pub struct ValidationError(pub String);

impl ValidationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// A named capability the agent can invoke
#[async_trait]
pub trait ToolCapability: Send + Sync {
    fn spec(&self) -> ToolSpec;

    async fn call(&self, args: &Map<String, Value>) -> Result<ToolReturn, ToolFault>;
}

type BoxedHandler = Arc<
    dyn Fn(Map<String, Value>) -> Pin<Box<dyn Future<Output = Result<ToolReturn, ToolFault>> + Send>>
        + Send
        + Sync,
>;

/// Tool backed by a plain function.
///
/// Use [`FunctionTool::calculator`] for pure calculators that answer with
/// `Result<Value, ValidationError>`: the result is wrapped as
/// `{"success": true, "data": ...}` or `{"success": false, "error": ...}` so
/// the model sees rejected inputs as ordinary tool content.
pub struct FunctionTool {
    spec: ToolSpec,
    handler: BoxedHandler,
}

impl FunctionTool {
    /// Tool from an async handler returning a raw [`ToolReturn`]
    pub fn new<F, Fut>(spec: ToolSpec, handler: F) -> Self
    where
        F: Fn(Map<String, Value>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<ToolReturn, ToolFault>> + Send + 'static,
    {
        Self {
            spec,
            handler: Arc::new(move |args| Box::pin(handler(args))),
        }
    }

    /// Tool from a synchronous calculator with a success/failure envelope
    pub fn calculator<F>(spec: ToolSpec, calculate: F) -> Self
    where
        F: Fn(&Map<String, Value>) -> Result<Value, ValidationError> + Send + Sync + 'static,
    {
        let calculate = Arc::new(calculate);
        Self::new(spec, move |args| {
            let calculate = Arc::clone(&calculate);
            async move { Ok(ToolReturn::Mapping(envelope(calculate(&args)))) }
        })
    }
}

#[async_trait]
impl ToolCapability for FunctionTool {
    fn spec(&self) -> ToolSpec {
        self.spec.clone()
    }

    async fn call(&self, args: &Map<String, Value>) -> Result<ToolReturn, ToolFault> {
        (self.handler)(args.clone()).await
    }
}

fn envelope(result: Result<Value, ValidationError>) -> Map<String, Value> {
    let value = match result {
        Ok(data) => json!({ "success": true, "data": data }),
        Err(e) => json!({ "success": false, "error": e.to_string() }),
    };
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

/// Name → capability lookup
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn ToolCapability>>,
    order: Vec<String>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every built-in calculator and chart tool
    pub fn with_builtin_tools() -> Self {
        let mut registry = Self::new();
        finance::register(&mut registry);
        chart::register(&mut registry);
        registry
    }

    /// Add a tool, replacing any tool of the same name.
    pub fn register(&mut self, tool: impl ToolCapability + 'static) {
        let name = tool.spec().name;
        if !self.tools.contains_key(&name) {
            self.order.push(name.clone());
        }
        self.tools.insert(name, Arc::new(tool));
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn ToolCapability>> {
        self.tools.get(name).cloned()
    }

    /// Specs in registration order
    pub fn specs(&self) -> Vec<ToolSpec> {
        self.order
            .iter()
            .filter_map(|name| self.tools.get(name))
            .map(|tool| tool.spec())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(name: &str) -> ToolSpec {
        ToolSpec {
            name: name.to_string(),
            description: "test".to_string(),
            parameters: json!({"type": "object"}),
        }
    }

    #[tokio::test]
    async fn test_calculator_envelope() {
        let tool = FunctionTool::calculator(spec("double"), |args| {
            let x = args
                .get("x")
                .and_then(Value::as_f64)
                .ok_or_else(|| ValidationError::new("x is required."))?;
            Ok(json!({ "result": x * 2.0 }))
        });

        let mut args = Map::new();
        args.insert("x".into(), json!(21));
        let ok = tool.call(&args).await.unwrap();
        assert_eq!(
            ok,
            ToolReturn::Mapping(envelope(Ok(json!({ "result": 42.0 }))))
        );

        let err = tool.call(&Map::new()).await.unwrap();
        let ToolReturn::Mapping(map) = err else {
            panic!("expected mapping");
        };
        assert_eq!(map["success"], false);
        assert_eq!(map["error"], "x is required.");
    }

    #[test]
    fn test_registry_order_and_replace() {
        let mut registry = ToolRegistry::new();
        registry.register(FunctionTool::calculator(spec("b"), |_| Ok(Value::Null)));
        registry.register(FunctionTool::calculator(spec("a"), |_| Ok(Value::Null)));
        registry.register(FunctionTool::calculator(spec("b"), |_| Ok(Value::Null)));

        let names: Vec<_> = registry.specs().into_iter().map(|s| s.name).collect();
        assert_eq!(names, vec!["b", "a"]);
        assert_eq!(registry.len(), 2);
        assert!(registry.get("missing").is_none());
    }

    #[test]
    fn test_builtin_registry_contents() {
        let registry = ToolRegistry::with_builtin_tools();
        for name in [
            "calculate_sip_future_value",
            "calculate_emi",
            "calculate_savings_rate",
            "simulate_sip_growth",
            "generate_growth_chart_tool",
            "generate_comparison_chart_tool",
        ] {
            assert!(registry.get(name).is_some(), "missing {}", name);
        }
    }
}
