//! End-to-end tests for a design session driven through the tool surface.

use std::sync::Arc;

use serde_json::{Value, json};
use tempfile::TempDir;

use trestle_agent::tools::register_session_tools;
use trestle_agent::{MemorySync, ToolContext, ToolRegistry, ToolResult, recover_registry};
use trestle_memory::MemoryStore;
use trestle_registry::{ComponentRegistry, RegistryConfig};

struct Session {
    tools: ToolRegistry,
    components: Arc<ComponentRegistry<MemorySync>>,
    ctx: ToolContext,
}

/// A fresh process attached to `scope` under `dir`.
fn session(dir: &TempDir, scope: &str) -> Session {
    let memory = MemoryStore::open(dir.path()).scope(scope).unwrap();
    let components = Arc::new(recover_registry(memory.clone(), RegistryConfig::default()));
    let mut tools = ToolRegistry::new();
    register_session_tools(&mut tools, &memory, &components);
    Session {
        tools,
        components,
        ctx: ToolContext::default(),
    }
}

impl Session {
    async fn call(&self, tool: &str, params: Value) -> ToolResult {
        self.tools.execute(tool, params, &self.ctx).await.unwrap()
    }

    async fn call_json(&self, tool: &str, params: Value) -> Value {
        match self.call(tool, params).await {
            ToolResult::Json { content } => content,
            other => panic!("{tool} returned {other:?}"),
        }
    }

    async fn call_text(&self, tool: &str, params: Value) -> String {
        let result = self.call(tool, params).await;
        assert!(result.is_success(), "{tool} failed: {result:?}");
        result.to_llm_content()
    }
}

#[tokio::test]
async fn test_tool_surface() {
    let dir = TempDir::new().unwrap();
    let s = session(&dir, "bridge");
    assert_eq!(
        s.tools.names(),
        vec![
            "clear_memory",
            "find_components",
            "get_component",
            "recall",
            "register_component",
            "remember",
            "resolve_reference",
            "search_memory",
            "update_component",
        ]
    );
}

#[tokio::test]
async fn test_register_resolve_update() {
    let dir = TempDir::new().unwrap();
    let s = session(&dir, "bridge");

    let registered = s
        .call_json(
            "register_component",
            json!({
                "id": "curve_001",
                "type": "curve",
                "name": "Bridge Arch",
                "description": "main bridge arch"
            }),
        )
        .await;
    assert_eq!(registered["registered"], true);

    let resolved = s
        .call_json(
            "resolve_reference",
            json!({"text": "modify the curve you just drew"}),
        )
        .await;
    assert_eq!(resolved["ids"], json!(["curve_001"]));

    let updated = s
        .call_json(
            "update_component",
            json!({"id": "curve_001", "description": "taller bridge arch"}),
        )
        .await;
    assert_eq!(updated["updated"], true);

    let component = s.components.get("curve_001").unwrap();
    assert_eq!(component.description, "taller bridge arch");
    assert!(component.updated_at > component.created_at);

    assert_eq!(
        s.call_text(
            "recall",
            json!({"category": "components", "key": "curve_001"})
        )
        .await,
        "[curve] Bridge Arch: taller bridge arch"
    );
}

#[tokio::test]
async fn test_fresh_process_finds_components_through_memory() {
    let dir = TempDir::new().unwrap();
    {
        let first = session(&dir, "bridge");
        first
            .call_json(
                "register_component",
                json!({
                    "id": "curve_001",
                    "type": "curve",
                    "name": "Bridge Arch",
                    "description": "main bridge arch"
                }),
            )
            .await;
        first
            .call_text(
                "remember",
                json!({"category": "design", "key": "span", "value": "120 m"}),
            )
            .await;
    }

    let second = session(&dir, "bridge");
    let found = second
        .call_text("search_memory", json!({"query": "arch"}))
        .await;
    assert!(found.contains("components/curve_001: [curve] Bridge Arch: main bridge arch"));

    let resolved = second
        .call_json("resolve_reference", json!({"text": "make it taller"}))
        .await;
    assert_eq!(resolved["ids"], json!(["curve_001"]));

    assert_eq!(
        second
            .call_text("recall", json!({"category": "design", "key": "span"}))
            .await,
        "120 m"
    );
}

#[tokio::test]
async fn test_scopes_do_not_leak() {
    let dir = TempDir::new().unwrap();
    let a = session(&dir, "session-a");
    let b = session(&dir, "session-b");

    a.call_text(
        "remember",
        json!({"category": "design", "key": "deck", "value": "concrete"}),
    )
    .await;

    let found = b.call_text("search_memory", json!({"query": "concrete"})).await;
    assert_eq!(found, "No memories found matching 'concrete'.");
}

#[tokio::test]
async fn test_clear_requires_confirmation() {
    let dir = TempDir::new().unwrap();
    let s = session(&dir, "bridge");
    s.call_text(
        "remember",
        json!({"category": "design", "key": "deck", "value": "concrete"}),
    )
    .await;

    let refused = s.call_text("clear_memory", json!({"category": "design"})).await;
    assert!(refused.starts_with("Nothing deleted"));
    assert_eq!(
        s.call_text("recall", json!({"category": "design", "key": "deck"}))
            .await,
        "concrete"
    );

    let cleared = s
        .call_text("clear_memory", json!({"category": "design", "confirm": "YES"}))
        .await;
    assert!(cleared.starts_with("Deleted category 'design'"));
}
