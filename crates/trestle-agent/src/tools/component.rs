//! Component registry tools.
//!
//! Results are JSON so the model can branch on `registered`/`updated`/`found`
//! without parsing prose. Registry calls may write through a sync hook, so
//! mutations run on the blocking pool.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Value, json};
use tracing::warn;

use trestle_registry::{ComponentRegistry, ComponentUpdate, NewComponent, SyncHook};

use crate::error::Result;
use crate::tool::{ParamExt, ParameterValidationError, Tool, ToolContext, ToolResult};

/// Default number of ids returned by `find_components`.
const DEFAULT_FIND_LIMIT: usize = 10;

/// Largest `limit` a model may request from `find_components`.
const MAX_FIND_LIMIT: u64 = 100;

fn component_properties() -> Value {
    json!({
        "type": "object",
        "description": "Extra metadata as string key/value pairs",
        "additionalProperties": {"type": "string"}
    })
}

// ─────────────────────────────────────────────────────────────────────────────
// Register
// ─────────────────────────────────────────────────────────────────────────────

/// Validated parameters for `register_component`.
#[derive(Debug, Clone)]
pub struct NewComponentParams(pub NewComponent);

impl TryFrom<&Value> for NewComponentParams {
    type Error = ParameterValidationError;

    fn try_from(params: &Value) -> std::result::Result<Self, Self::Error> {
        let id = params.required_str("id", "give the component a unique id, e.g. 'curve_001'")?;
        let component_type =
            params.required_str("type", "give the component a type, e.g. 'curve' or 'beam'")?;
        let name = params.required_str("name", "give the component a human-readable name")?;
        let description = params.optional_str("description").unwrap_or_default();
        let properties = params.optional_string_map("properties")?.unwrap_or_default();

        Ok(Self(
            NewComponent::new(id.trim(), component_type.trim(), name, description)
                .with_properties(properties),
        ))
    }
}

/// Register a newly created component.
pub struct RegisterComponentTool<S: SyncHook> {
    registry: Arc<ComponentRegistry<S>>,
}

impl<S: SyncHook> RegisterComponentTool<S> {
    pub fn new(registry: Arc<ComponentRegistry<S>>) -> Self {
        Self { registry }
    }
}

#[async_trait]
impl<S: SyncHook + 'static> Tool for RegisterComponentTool<S> {
    fn name(&self) -> &str {
        "register_component"
    }

    fn description(&self) -> &str {
        "Register a component you just created so it can be referred to later \
         (\"it\", \"the curve\"). Fails if the id is already registered."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "id": {"type": "string", "description": "Unique component id"},
                "type": {"type": "string", "description": "Component type, e.g. 'curve', 'beam'"},
                "name": {"type": "string", "description": "Human-readable name"},
                "description": {"type": "string", "description": "What the component is"},
                "properties": component_properties()
            },
            "required": ["id", "type", "name"]
        })
    }

    async fn execute(&self, params: Value, ctx: &ToolContext) -> Result<ToolResult> {
        if ctx.is_cancelled() {
            return Ok(ToolResult::error("Operation cancelled"));
        }

        let NewComponentParams(new) = match NewComponentParams::try_from(&params) {
            Ok(p) => p,
            Err(e) => return Ok(ToolResult::error(e.to_string())),
        };
        let id = new.id.clone();

        let registry = Arc::clone(&self.registry);
        match tokio::task::spawn_blocking(move || registry.register(new)).await? {
            Ok(true) => Ok(ToolResult::json(json!({
                "registered": true,
                "id": id,
                "message": format!("Registered component '{id}'.")
            }))),
            Ok(false) => Ok(ToolResult::json(json!({
                "registered": false,
                "id": id,
                "message": format!(
                    "Component '{id}' is already registered; nothing changed. \
                     Use update_component to modify it or pick a new id."
                )
            }))),
            Err(e) => {
                warn!(session = %ctx.session_id, component_id = %id, error = %e, "register_component failed");
                Ok(ToolResult::error(format!(
                    "Could not register '{id}': {e}. Nothing was registered."
                )))
            }
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Update
// ─────────────────────────────────────────────────────────────────────────────

/// Change fields of a registered component.
pub struct UpdateComponentTool<S: SyncHook> {
    registry: Arc<ComponentRegistry<S>>,
}

impl<S: SyncHook> UpdateComponentTool<S> {
    pub fn new(registry: Arc<ComponentRegistry<S>>) -> Self {
        Self { registry }
    }
}

fn parse_update(params: &Value) -> std::result::Result<(String, ComponentUpdate), ParameterValidationError> {
    let id = params.required_str("id", "give the id of the component to update")?;
    let update = ComponentUpdate {
        component_type: params.optional_str("type").map(String::from),
        name: params.optional_str("name").map(String::from),
        description: params
            .get("description")
            .and_then(|v| v.as_str())
            .map(String::from),
        properties: params.optional_string_map("properties")?,
    };
    if update.is_empty() {
        return Err(ParameterValidationError::invalid_value(
            "id",
            id,
            "no fields to change; provide type, name, description or properties",
        ));
    }
    Ok((id.trim().to_string(), update))
}

#[async_trait]
impl<S: SyncHook + 'static> Tool for UpdateComponentTool<S> {
    fn name(&self) -> &str {
        "update_component"
    }

    fn description(&self) -> &str {
        "Update fields of a registered component. Only the fields given are changed; \
         properties, if given, replace all existing properties."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "id": {"type": "string", "description": "Id of the component to update"},
                "type": {"type": "string"},
                "name": {"type": "string"},
                "description": {"type": "string"},
                "properties": component_properties()
            },
            "required": ["id"]
        })
    }

    async fn execute(&self, params: Value, ctx: &ToolContext) -> Result<ToolResult> {
        if ctx.is_cancelled() {
            return Ok(ToolResult::error("Operation cancelled"));
        }

        let (id, update) = match parse_update(&params) {
            Ok(p) => p,
            Err(e) => return Ok(ToolResult::error(e.to_string())),
        };

        let registry = Arc::clone(&self.registry);
        let target = id.clone();
        match tokio::task::spawn_blocking(move || registry.update(&target, update)).await? {
            Ok(true) => Ok(ToolResult::json(json!({
                "updated": true,
                "id": id,
                "component": self.registry.get(&id)
            }))),
            Ok(false) => Ok(ToolResult::json(json!({
                "updated": false,
                "id": id,
                "message": format!("No component with id '{id}' is registered.")
            }))),
            Err(e) => {
                warn!(session = %ctx.session_id, component_id = %id, error = %e, "update_component failed");
                Ok(ToolResult::error(format!(
                    "Could not update '{id}': {e}. The component was left unchanged."
                )))
            }
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Get
// ─────────────────────────────────────────────────────────────────────────────

/// Look up one component by id.
pub struct GetComponentTool<S: SyncHook> {
    registry: Arc<ComponentRegistry<S>>,
}

impl<S: SyncHook> GetComponentTool<S> {
    pub fn new(registry: Arc<ComponentRegistry<S>>) -> Self {
        Self { registry }
    }
}

#[async_trait]
impl<S: SyncHook + 'static> Tool for GetComponentTool<S> {
    fn name(&self) -> &str {
        "get_component"
    }

    fn description(&self) -> &str {
        "Get all fields of a registered component by id."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "id": {"type": "string", "description": "Component id"}
            },
            "required": ["id"]
        })
    }

    async fn execute(&self, params: Value, _ctx: &ToolContext) -> Result<ToolResult> {
        let id = match params.required_str("id", "give the component id to look up") {
            Ok(id) => id.trim(),
            Err(e) => return Ok(ToolResult::error(e.to_string())),
        };

        Ok(ToolResult::json(match self.registry.get(id) {
            Some(component) => json!({"found": true, "component": component}),
            None => json!({
                "found": false,
                "id": id,
                "message": format!("No component with id '{id}' is registered.")
            }),
        }))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Find
// ─────────────────────────────────────────────────────────────────────────────

/// List component ids by type or by recency.
pub struct FindComponentsTool<S: SyncHook> {
    registry: Arc<ComponentRegistry<S>>,
}

impl<S: SyncHook> FindComponentsTool<S> {
    pub fn new(registry: Arc<ComponentRegistry<S>>) -> Self {
        Self { registry }
    }
}

#[async_trait]
impl<S: SyncHook + 'static> Tool for FindComponentsTool<S> {
    fn name(&self) -> &str {
        "find_components"
    }

    fn description(&self) -> &str {
        "List registered component ids, most recently touched first. \
         Give a type to list only components of that exact type."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "type": {"type": "string", "description": "Exact component type to filter by"},
                "limit": {
                    "type": "integer",
                    "description": "Maximum number of ids",
                    "default": DEFAULT_FIND_LIMIT
                }
            }
        })
    }

    async fn execute(&self, params: Value, _ctx: &ToolContext) -> Result<ToolResult> {
        let limit = match params.optional_count("limit", MAX_FIND_LIMIT) {
            Ok(limit) => limit.unwrap_or(DEFAULT_FIND_LIMIT),
            Err(e) => return Ok(ToolResult::error(e.to_string())),
        };

        let ids: Vec<String> = match params.optional_str("type") {
            Some(component_type) => self
                .registry
                .find_by_type(component_type.trim())
                .into_iter()
                .take(limit)
                .collect(),
            None => self.registry.find_recent(limit),
        };
        Ok(ToolResult::json(json!({"count": ids.len(), "ids": ids})))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Resolve
// ─────────────────────────────────────────────────────────────────────────────

/// Resolve a vague reference ("it", "the beams") to component ids.
pub struct ResolveReferenceTool<S: SyncHook> {
    registry: Arc<ComponentRegistry<S>>,
}

impl<S: SyncHook> ResolveReferenceTool<S> {
    pub fn new(registry: Arc<ComponentRegistry<S>>) -> Self {
        Self { registry }
    }
}

#[async_trait]
impl<S: SyncHook + 'static> Tool for ResolveReferenceTool<S> {
    fn name(&self) -> &str {
        "resolve_reference"
    }

    fn description(&self) -> &str {
        "Work out which registered components a phrase refers to, e.g. \
         \"modify the curve you just drew\" or \"move them\". Returns ids, most \
         specific match first. An empty list means nothing matched: ask the user."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "text": {"type": "string", "description": "The phrase or full user request"}
            },
            "required": ["text"]
        })
    }

    async fn execute(&self, params: Value, _ctx: &ToolContext) -> Result<ToolResult> {
        let text = params.get("text").and_then(|v| v.as_str()).unwrap_or_default();
        let matches = self.registry.resolve_detailed(text);
        let ids: Vec<&str> = matches.iter().map(|m| m.id.as_str()).collect();

        let mut result = json!({"ids": ids, "matches": matches});
        if matches.is_empty() {
            result["message"] =
                json!("No registered component matched. Ask the user which component they mean.");
        }
        Ok(ToolResult::json(result))
    }
}
