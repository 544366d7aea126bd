//! Memory tools.
//!
//! Expose the four text operations of a [`ScopedMemory`] to the model. Disk
//! work runs on the blocking pool; storage failures come back as error
//! results rather than aborting the agent's turn.

use async_trait::async_trait;
use serde_json::{Value, json};
use tracing::warn;

use trestle_memory::ScopedMemory;

use crate::error::Result;
use crate::tool::{ParamExt, ParameterValidationError, Tool, ToolContext, ToolResult};

/// Largest `limit` a model may request from `search_memory`.
const MAX_SEARCH_LIMIT: u64 = 100;

async fn run_blocking<T, F>(memory: &ScopedMemory, f: F) -> Result<T>
where
    F: FnOnce(ScopedMemory) -> T + Send + 'static,
    T: Send + 'static,
{
    let memory = memory.clone();
    Ok(tokio::task::spawn_blocking(move || f(memory)).await?)
}

// ─────────────────────────────────────────────────────────────────────────────
// Remember
// ─────────────────────────────────────────────────────────────────────────────

/// Validated parameters for the remember tool.
#[derive(Debug, Clone)]
pub struct RememberParams {
    pub category: String,
    pub key: String,
    pub value: String,
}

impl TryFrom<&Value> for RememberParams {
    type Error = ParameterValidationError;

    fn try_from(params: &Value) -> std::result::Result<Self, Self::Error> {
        Ok(Self {
            category: params
                .required_str("category", "name the category to store the fact in")?
                .to_string(),
            key: params
                .required_str("key", "name the fact within its category")?
                .to_string(),
            value: params
                .required_str("value", "provide the fact to remember")?
                .to_string(),
        })
    }
}

/// Store a fact under `category/key`.
#[derive(Debug, Clone)]
pub struct RememberTool {
    memory: ScopedMemory,
}

impl RememberTool {
    pub fn new(memory: ScopedMemory) -> Self {
        Self { memory }
    }
}

#[async_trait]
impl Tool for RememberTool {
    fn name(&self) -> &str {
        "remember"
    }

    fn description(&self) -> &str {
        "Store a fact in durable session memory under a category and key. \
         Writing the same category and key again replaces the previous value."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "category": {
                    "type": "string",
                    "description": "Grouping for the fact, e.g. 'design', 'materials', 'decisions'"
                },
                "key": {
                    "type": "string",
                    "description": "Name of the fact within its category"
                },
                "value": {
                    "type": "string",
                    "description": "The fact to remember"
                }
            },
            "required": ["category", "key", "value"]
        })
    }

    async fn execute(&self, params: Value, ctx: &ToolContext) -> Result<ToolResult> {
        if ctx.is_cancelled() {
            return Ok(ToolResult::error("Operation cancelled"));
        }

        let RememberParams {
            category,
            key,
            value,
        } = match RememberParams::try_from(&params) {
            Ok(p) => p,
            Err(e) => return Ok(ToolResult::error(e.to_string())),
        };

        let address = format!("{category}/{key}");
        match run_blocking(&self.memory, move |m| m.remember(&category, &key, &value)).await? {
            Ok(text) => Ok(ToolResult::text(text)),
            Err(e) => {
                warn!(session = %ctx.session_id, %address, error = %e, "remember failed");
                Ok(ToolResult::error(format!(
                    "Could not remember '{address}': {e}. The fact was NOT saved."
                )))
            }
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Recall
// ─────────────────────────────────────────────────────────────────────────────

/// Recall facts: a digest, a category, or one value.
#[derive(Debug, Clone)]
pub struct RecallTool {
    memory: ScopedMemory,
}

impl RecallTool {
    pub fn new(memory: ScopedMemory) -> Self {
        Self { memory }
    }
}

#[async_trait]
impl Tool for RecallTool {
    fn name(&self) -> &str {
        "recall"
    }

    fn description(&self) -> &str {
        "Recall from session memory. With no arguments, summarize everything known. \
         With a category, list its facts newest first. With a category and key, \
         return that exact fact."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "category": {
                    "type": "string",
                    "description": "Category to list or look up in"
                },
                "key": {
                    "type": "string",
                    "description": "Key of a single fact"
                }
            }
        })
    }

    async fn execute(&self, params: Value, ctx: &ToolContext) -> Result<ToolResult> {
        if ctx.is_cancelled() {
            return Ok(ToolResult::error("Operation cancelled"));
        }

        let category = params.optional_str("category").map(String::from);
        let key = params.optional_str("key").map(String::from);
        let text = run_blocking(&self.memory, move |m| {
            m.recall(category.as_deref(), key.as_deref())
        })
        .await?;
        Ok(ToolResult::text(text))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Search
// ─────────────────────────────────────────────────────────────────────────────

/// Case-insensitive substring search across all categories.
#[derive(Debug, Clone)]
pub struct SearchMemoryTool {
    memory: ScopedMemory,
}

impl SearchMemoryTool {
    pub fn new(memory: ScopedMemory) -> Self {
        Self { memory }
    }
}

#[async_trait]
impl Tool for SearchMemoryTool {
    fn name(&self) -> &str {
        "search_memory"
    }

    fn description(&self) -> &str {
        "Search session memory for a word or phrase. Matches category names, keys \
         and values, ignoring case. Newest matches first."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "Text to search for"
                },
                "limit": {
                    "type": "integer",
                    "description": "Maximum number of matches to show",
                    "default": self.memory.store().config().search_limit
                }
            },
            "required": ["query"]
        })
    }

    async fn execute(&self, params: Value, ctx: &ToolContext) -> Result<ToolResult> {
        if ctx.is_cancelled() {
            return Ok(ToolResult::error("Operation cancelled"));
        }

        let query = match params.required_str("query", "provide the text to search for") {
            Ok(q) => q.to_string(),
            Err(e) => return Ok(ToolResult::error(e.to_string())),
        };
        let limit = match params.optional_count("limit", MAX_SEARCH_LIMIT) {
            Ok(limit) => limit,
            Err(e) => return Ok(ToolResult::error(e.to_string())),
        };

        let text = run_blocking(&self.memory, move |m| m.search_memory(&query, limit)).await?;
        Ok(ToolResult::text(text))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Clear
// ─────────────────────────────────────────────────────────────────────────────

/// Delete a category or the whole scope, only with explicit confirmation.
#[derive(Debug, Clone)]
pub struct ClearMemoryTool {
    memory: ScopedMemory,
}

impl ClearMemoryTool {
    pub fn new(memory: ScopedMemory) -> Self {
        Self { memory }
    }
}

#[async_trait]
impl Tool for ClearMemoryTool {
    fn name(&self) -> &str {
        "clear_memory"
    }

    fn description(&self) -> &str {
        "Permanently delete one memory category, or all session memory when no \
         category is given. Only acts when confirm is \"yes\". This cannot be undone."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "category": {
                    "type": "string",
                    "description": "Category to delete. Omit to delete everything."
                },
                "confirm": {
                    "type": "string",
                    "description": "Must be \"yes\" to actually delete"
                }
            },
            "required": ["confirm"]
        })
    }

    async fn execute(&self, params: Value, ctx: &ToolContext) -> Result<ToolResult> {
        if ctx.is_cancelled() {
            return Ok(ToolResult::error("Operation cancelled"));
        }

        let category = params.optional_str("category").map(String::from);
        let confirm = params
            .get("confirm")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string();

        let target = category.clone().unwrap_or_else(|| "*".to_string());
        match run_blocking(&self.memory, move |m| m.clear_memory(category.as_deref(), &confirm))
            .await?
        {
            Ok(text) => Ok(ToolResult::text(text)),
            Err(e) => {
                warn!(session = %ctx.session_id, category = %target, error = %e, "clear_memory failed");
                Ok(ToolResult::error(format!("Could not clear memory: {e}. Nothing was deleted.")))
            }
        }
    }
}
