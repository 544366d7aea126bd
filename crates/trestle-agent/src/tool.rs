//! Tool framework for the LLM-facing boundary.
//!
//! This module defines the [`Tool`] trait that every agent tool implements,
//! and the [`ToolRegistry`] through which an agent runtime looks them up.
//!
//! # Example
//!
//! ```rust,ignore
//! use trestle_agent::{Tool, ToolContext, ToolResult, ToolRegistry};
//!
//! let mut registry = ToolRegistry::new();
//! registry.register(RememberTool::new(memory.clone()));
//!
//! let result = registry
//!     .execute("remember", json!({"category": "design", "key": "span", "value": "120 m"}), &ctx)
//!     .await?;
//! ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::error::{AgentError, Result};
use crate::types::{SessionId, TurnId};

// ─────────────────────────────────────────────────────────────────────────────
// Parameter Validation
// ─────────────────────────────────────────────────────────────────────────────

/// Error type for tool parameter validation failures.
///
/// Messages are written for the model: they name the parameter and say how to
/// fix the call.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ParameterValidationError {
    /// A required parameter is missing.
    #[error("missing required parameter '{name}': {hint}")]
    MissingRequired {
        name: &'static str,
        hint: &'static str,
    },

    /// A parameter has an invalid type.
    #[error("invalid type for '{name}': expected {expected}, got {actual}")]
    InvalidType {
        name: &'static str,
        expected: &'static str,
        actual: String,
    },

    /// A parameter value is out of range.
    #[error("'{name}' value {value} is out of range: {constraint}")]
    OutOfRange {
        name: &'static str,
        value: String,
        constraint: String,
    },

    /// A parameter value is not acceptable.
    #[error("'{name}' has invalid value '{value}': {message}")]
    InvalidValue {
        name: &'static str,
        value: String,
        message: String,
    },
}

impl ParameterValidationError {
    /// Create a missing required parameter error.
    pub fn missing(name: &'static str, hint: &'static str) -> Self {
        Self::MissingRequired { name, hint }
    }

    /// Create an invalid type error.
    pub fn invalid_type(
        name: &'static str,
        expected: &'static str,
        actual: impl Into<String>,
    ) -> Self {
        Self::InvalidType {
            name,
            expected,
            actual: actual.into(),
        }
    }

    /// Create an out of range error.
    pub fn out_of_range(
        name: &'static str,
        value: impl ToString,
        constraint: impl Into<String>,
    ) -> Self {
        Self::OutOfRange {
            name,
            value: value.to_string(),
            constraint: constraint.into(),
        }
    }

    /// Create an invalid value error.
    pub fn invalid_value(
        name: &'static str,
        value: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::InvalidValue {
            name,
            value: value.into(),
            message: message.into(),
        }
    }

    /// The parameter this error is about.
    pub fn parameter_name(&self) -> &str {
        match self {
            Self::MissingRequired { name, .. }
            | Self::InvalidType { name, .. }
            | Self::OutOfRange { name, .. }
            | Self::InvalidValue { name, .. } => name,
        }
    }
}

impl From<ParameterValidationError> for AgentError {
    fn from(err: ParameterValidationError) -> Self {
        AgentError::InvalidToolParams(err.to_string())
    }
}

/// Result type for parameter validation.
pub type ParamResult<T> = std::result::Result<T, ParameterValidationError>;

/// Helper trait for extracting and validating parameters from JSON.
pub trait ParamExt {
    /// Get a required, non-blank string parameter.
    fn required_str(&self, name: &'static str, hint: &'static str) -> ParamResult<&str>;

    /// Get an optional string parameter. Blank strings count as absent.
    fn optional_str(&self, name: &str) -> Option<&str>;

    /// Get an optional positive integer parameter.
    fn optional_count(&self, name: &'static str, max: u64) -> ParamResult<Option<usize>>;

    /// Get an optional object parameter as a string map.
    ///
    /// Non-string values are kept in their JSON text form.
    fn optional_string_map(&self, name: &'static str) -> ParamResult<Option<BTreeMap<String, String>>>;
}

impl ParamExt for serde_json::Value {
    fn required_str(&self, name: &'static str, hint: &'static str) -> ParamResult<&str> {
        match self.get(name) {
            None | Some(serde_json::Value::Null) => Err(ParameterValidationError::missing(name, hint)),
            Some(serde_json::Value::String(s)) if s.trim().is_empty() => {
                Err(ParameterValidationError::missing(name, hint))
            }
            Some(serde_json::Value::String(s)) => Ok(s.as_str()),
            Some(other) => Err(ParameterValidationError::invalid_type(
                name,
                "string",
                json_type_name(other),
            )),
        }
    }

    fn optional_str(&self, name: &str) -> Option<&str> {
        self.get(name)
            .and_then(|v| v.as_str())
            .filter(|s| !s.trim().is_empty())
    }

    fn optional_count(&self, name: &'static str, max: u64) -> ParamResult<Option<usize>> {
        match self.get(name) {
            None | Some(serde_json::Value::Null) => Ok(None),
            Some(value) => {
                let n = value.as_u64().ok_or_else(|| {
                    ParameterValidationError::invalid_type(name, "positive integer", value.to_string())
                })?;
                if n == 0 || n > max {
                    return Err(ParameterValidationError::out_of_range(
                        name,
                        n,
                        format!("must be between 1 and {max}"),
                    ));
                }
                Ok(Some(n as usize))
            }
        }
    }

    fn optional_string_map(&self, name: &'static str) -> ParamResult<Option<BTreeMap<String, String>>> {
        match self.get(name) {
            None | Some(serde_json::Value::Null) => Ok(None),
            Some(serde_json::Value::Object(map)) => Ok(Some(
                map.iter()
                    .map(|(k, v)| {
                        let v = match v {
                            serde_json::Value::String(s) => s.clone(),
                            other => other.to_string(),
                        };
                        (k.clone(), v)
                    })
                    .collect(),
            )),
            Some(other) => Err(ParameterValidationError::invalid_type(
                name,
                "object",
                json_type_name(other),
            )),
        }
    }
}

fn json_type_name(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tool Trait
// ─────────────────────────────────────────────────────────────────────────────

/// Trait for agent tools.
///
/// Each tool describes its parameters as a JSON Schema and executes
/// asynchronously. `execute` returns `Err` only for failures the model cannot
/// fix by calling again differently.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Get the unique name of this tool.
    fn name(&self) -> &str;

    /// Get a human-readable description of what this tool does.
    fn description(&self) -> &str;

    /// Get the JSON Schema for this tool's parameters.
    fn parameters(&self) -> serde_json::Value;

    /// Execute the tool with the given parameters.
    async fn execute(&self, params: serde_json::Value, ctx: &ToolContext) -> Result<ToolResult>;
}

// ─────────────────────────────────────────────────────────────────────────────
// Tool Context
// ─────────────────────────────────────────────────────────────────────────────

/// Context provided to tools during execution.
#[derive(Debug, Clone)]
pub struct ToolContext {
    /// ID of the session this tool is running in.
    pub session_id: SessionId,
    /// ID of the turn this tool is running in.
    pub turn_id: TurnId,
    /// Token to check for cancellation.
    pub cancellation: CancellationToken,
}

impl ToolContext {
    /// Create a new tool context.
    pub fn new(session_id: SessionId, turn_id: TurnId) -> Self {
        Self {
            session_id,
            turn_id,
            cancellation: CancellationToken::new(),
        }
    }

    /// Create a context with a cancellation token.
    pub fn with_cancellation(
        session_id: SessionId,
        turn_id: TurnId,
        cancellation: CancellationToken,
    ) -> Self {
        Self {
            session_id,
            turn_id,
            cancellation,
        }
    }

    /// Check if execution has been cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }
}

impl Default for ToolContext {
    fn default() -> Self {
        Self::new(SessionId::new(), TurnId::new())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tool Result
// ─────────────────────────────────────────────────────────────────────────────

/// Result of a tool execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ToolResult {
    /// Successful text output.
    Text { content: String },
    /// Successful JSON output.
    Json { content: serde_json::Value },
    /// Tool execution failed.
    Error {
        message: String,
        /// Whether the model can reasonably try again.
        recoverable: bool,
    },
}

impl ToolResult {
    /// Create a text result.
    pub fn text(content: impl Into<String>) -> Self {
        Self::Text {
            content: content.into(),
        }
    }

    /// Create a JSON result.
    pub fn json(content: serde_json::Value) -> Self {
        Self::Json { content }
    }

    /// Create a recoverable error result.
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
            recoverable: true,
        }
    }

    /// Check if this result is an error.
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error { .. })
    }

    /// Check if this result is successful.
    pub fn is_success(&self) -> bool {
        !self.is_error()
    }

    /// Get the content as a string for LLM consumption.
    pub fn to_llm_content(&self) -> String {
        match self {
            Self::Text { content } => content.clone(),
            Self::Json { content } => {
                serde_json::to_string_pretty(content).unwrap_or_else(|_| content.to_string())
            }
            Self::Error { message, .. } => format!("Error: {}", message),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tool Registry
// ─────────────────────────────────────────────────────────────────────────────

/// Definition of a tool as advertised to a model.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

/// Registry for managing available tools.
#[derive(Default, Clone)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool, replacing any tool with the same name.
    pub fn register<T: Tool + 'static>(&mut self, tool: T) {
        let name = tool.name().to_string();
        self.tools.insert(name, Arc::new(tool));
    }

    /// Get a tool by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    /// Check if a tool exists.
    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// All tool names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tools.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }

    /// Get the number of registered tools.
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Check if the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Definitions of every tool, sorted by name.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        let mut definitions: Vec<ToolDefinition> = self
            .tools
            .values()
            .map(|tool| ToolDefinition {
                name: tool.name().to_string(),
                description: tool.description().to_string(),
                parameters: tool.parameters(),
            })
            .collect();
        definitions.sort_by(|a, b| a.name.cmp(&b.name));
        definitions
    }

    /// Execute a tool by name.
    pub async fn execute(
        &self,
        name: &str,
        params: serde_json::Value,
        ctx: &ToolContext,
    ) -> Result<ToolResult> {
        let tool = self
            .get(name)
            .ok_or_else(|| AgentError::ToolNotFound(name.to_string()))?;

        if ctx.is_cancelled() {
            return Err(AgentError::Cancelled);
        }
        tracing::debug!(tool = name, session = %ctx.session_id, "Executing tool");
        tool.execute(params, ctx).await
    }
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.names())
            .finish()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    /// A tool that echoes its parameters.
    struct EchoTool;

    #[async_trait]
    impl Tool for EchoTool {
        fn name(&self) -> &str {
            "echo"
        }

        fn description(&self) -> &str {
            "Echo the parameters back"
        }

        fn parameters(&self) -> serde_json::Value {
            json!({"type": "object"})
        }

        async fn execute(&self, params: serde_json::Value, _ctx: &ToolContext) -> Result<ToolResult> {
            Ok(ToolResult::json(params))
        }
    }

    #[test]
    fn test_tool_result_text() {
        let result = ToolResult::text("hello");
        assert!(result.is_success());
        assert_eq!(result.to_llm_content(), "hello");
    }

    #[test]
    fn test_tool_result_error() {
        let result = ToolResult::error("something failed");
        assert!(result.is_error());
        assert!(result.to_llm_content().starts_with("Error:"));
        assert!(matches!(result, ToolResult::Error { recoverable: true, .. }));
    }

    #[test]
    fn test_tool_result_serialization() {
        let json = serde_json::to_value(ToolResult::text("test")).unwrap();
        assert_eq!(json["type"], "text");
        let restored: ToolResult = serde_json::from_value(json).unwrap();
        assert!(matches!(restored, ToolResult::Text { content } if content == "test"));
    }

    #[test]
    fn test_tool_context_cancellation() {
        let token = CancellationToken::new();
        let ctx = ToolContext::with_cancellation(SessionId::new(), TurnId::new(), token.clone());
        assert!(!ctx.is_cancelled());
        token.cancel();
        assert!(ctx.is_cancelled());
    }

    #[test]
    fn test_registry_register_and_lookup() {
        let mut registry = ToolRegistry::new();
        assert!(registry.is_empty());
        registry.register(EchoTool);

        assert_eq!(registry.len(), 1);
        assert!(registry.contains("echo"));
        assert_eq!(registry.names(), vec!["echo"]);
        assert_eq!(registry.definitions()[0].description, "Echo the parameters back");
        assert!(registry.get("other").is_none());
    }

    #[tokio::test]
    async fn test_registry_execute() {
        let mut registry = ToolRegistry::new();
        registry.register(EchoTool);
        let ctx = ToolContext::default();

        let result = registry.execute("echo", json!({"a": 1}), &ctx).await.unwrap();
        assert!(matches!(result, ToolResult::Json { content } if content["a"] == 1));

        let missing = registry.execute("unknown", json!({}), &ctx).await;
        assert!(matches!(missing, Err(AgentError::ToolNotFound(_))));
    }

    #[tokio::test]
    async fn test_registry_execute_cancelled() {
        let mut registry = ToolRegistry::new();
        registry.register(EchoTool);
        let ctx = ToolContext::default();
        ctx.cancellation.cancel();

        let result = registry.execute("echo", json!({}), &ctx).await;
        assert!(matches!(result, Err(AgentError::Cancelled)));
    }

    #[test]
    fn test_param_ext_required_str() {
        let params = json!({"name": "x", "blank": "  ", "num": 3});
        assert_eq!(params.required_str("name", "hint").unwrap(), "x");
        assert!(matches!(
            params.required_str("blank", "hint"),
            Err(ParameterValidationError::MissingRequired { .. })
        ));
        assert!(matches!(
            params.required_str("num", "hint"),
            Err(ParameterValidationError::InvalidType { .. })
        ));
        assert_eq!(
            params.required_str("absent", "hint").unwrap_err().parameter_name(),
            "absent"
        );
    }

    #[test]
    fn test_param_ext_optional_count() {
        let params = json!({"limit": 5, "zero": 0, "big": 1000, "text": "5"});
        assert_eq!(params.optional_count("limit", 100).unwrap(), Some(5));
        assert_eq!(params.optional_count("absent", 100).unwrap(), None);
        assert!(params.optional_count("zero", 100).is_err());
        assert!(params.optional_count("big", 100).is_err());
        assert!(params.optional_count("text", 100).is_err());
    }

    #[test]
    fn test_param_ext_string_map() {
        let params = json!({"props": {"span": "120", "count": 4}, "bad": [1]});
        let map = params.optional_string_map("props").unwrap().unwrap();
        assert_eq!(map["span"], "120");
        assert_eq!(map["count"], "4");
        assert!(params.optional_string_map("bad").is_err());
        assert!(params.optional_string_map("absent").unwrap().is_none());
    }

    #[test]
    fn test_param_error_into_agent_error() {
        let err: AgentError = ParameterValidationError::missing("key", "provide a key").into();
        assert!(matches!(err, AgentError::InvalidToolParams(_)));
    }
}
