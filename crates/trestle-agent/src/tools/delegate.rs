//! Delegate tool for handing work to a worker agent.
//!
//! The triage agent calls `delegate` with a worker role and a task. The tool
//! attaches recent conversation, resolved components and relevant memories
//! before passing the task to a [`WorkerDispatcher`], which owns the worker
//! runtime.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{info, warn};

use trestle_registry::SyncHook;

use crate::enrich::{EnrichedTask, TaskEnricher};
use crate::error::Result;
use crate::tool::{ParamExt, Tool, ToolContext, ToolResult};

// ─────────────────────────────────────────────────────────────────────────────
// Roles
// ─────────────────────────────────────────────────────────────────────────────

/// Worker agents the triage agent can delegate to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentRole {
    Geometry,
    Material,
    Structural,
}

impl AgentRole {
    pub const ALL: [AgentRole; 3] = [Self::Geometry, Self::Material, Self::Structural];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Geometry => "geometry",
            Self::Material => "material",
            Self::Structural => "structural",
        }
    }

    /// One-line description shown to the model.
    pub fn description(&self) -> &'static str {
        match self {
            Self::Geometry => "creates and modifies CAD geometry (curves, surfaces, solids)",
            Self::Material => "selects materials and reports their properties",
            Self::Structural => "checks loads, spans and member sizing",
        }
    }

    fn available() -> String {
        Self::ALL
            .iter()
            .map(AgentRole::as_str)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for AgentRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AgentRole {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "geometry" => Ok(Self::Geometry),
            "material" => Ok(Self::Material),
            "structural" => Ok(Self::Structural),
            other => Err(format!(
                "Unknown agent '{other}'. Available agents: {}",
                Self::available()
            )),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Dispatcher
// ─────────────────────────────────────────────────────────────────────────────

/// Outcome of handing a task to a worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DelegationOutcome {
    /// The worker finished and produced a response.
    Completed { response: String },
    /// The worker could not carry out the task.
    Failed { message: String },
}

/// Runs worker agents.
///
/// Workers are expected to register anything they create through the
/// component tools, which mirrors it into memory for the next turn.
#[async_trait]
pub trait WorkerDispatcher: Send + Sync {
    async fn dispatch(&self, role: AgentRole, task: &EnrichedTask) -> DelegationOutcome;
}

/// Shared dispatcher handle.
pub type SharedDispatcher = Arc<dyn WorkerDispatcher>;

// ─────────────────────────────────────────────────────────────────────────────
// Delegate Tool
// ─────────────────────────────────────────────────────────────────────────────

/// Tool the triage agent uses to delegate to a worker.
///
/// # Example Usage
///
/// ```json
/// {
///   "role": "geometry",
///   "task": "Increase the arch rise of curve_001 by 2 m",
///   "utterance": "make the curve you just drew taller"
/// }
/// ```
pub struct DelegateTool<S: SyncHook> {
    dispatcher: SharedDispatcher,
    enricher: Arc<TaskEnricher<S>>,
}

impl<S: SyncHook> fmt::Debug for DelegateTool<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DelegateTool")
            .field("dispatcher", &"<WorkerDispatcher>")
            .field("enricher", &self.enricher)
            .finish()
    }
}

impl<S: SyncHook> DelegateTool<S> {
    pub fn new(dispatcher: SharedDispatcher, enricher: TaskEnricher<S>) -> Self {
        Self {
            dispatcher,
            enricher: Arc::new(enricher),
        }
    }
}

#[async_trait]
impl<S: SyncHook + 'static> Tool for DelegateTool<S> {
    fn name(&self) -> &str {
        "delegate"
    }

    fn description(&self) -> &str {
        "Delegate a task to a worker agent: 'geometry' creates and modifies CAD \
         geometry, 'material' selects materials, 'structural' checks loads and sizing. \
         Recent conversation, referenced components and relevant memories are \
         attached automatically."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "role": {
                    "type": "string",
                    "enum": AgentRole::ALL.iter().map(AgentRole::as_str).collect::<Vec<_>>(),
                    "description": "Worker agent to delegate to"
                },
                "task": {
                    "type": "string",
                    "description": "What the worker should do, stated concretely"
                },
                "utterance": {
                    "type": "string",
                    "description": "The user's words, used to resolve references like 'it' or 'the curve'. Defaults to the task."
                }
            },
            "required": ["role", "task"]
        })
    }

    async fn execute(&self, params: Value, ctx: &ToolContext) -> Result<ToolResult> {
        if ctx.is_cancelled() {
            return Ok(ToolResult::error("Operation cancelled"));
        }

        let role = match params.required_str("role", "name the worker agent to delegate to") {
            Ok(role) => role,
            Err(e) => return Ok(ToolResult::error(e.to_string())),
        };
        let role = match role.parse::<AgentRole>() {
            Ok(role) => role,
            Err(message) => return Ok(ToolResult::error(message)),
        };
        let task = match params.required_str("task", "describe what the worker should do") {
            Ok(task) => task,
            Err(e) => return Ok(ToolResult::error(e.to_string())),
        };
        let utterance = params.optional_str("utterance").unwrap_or(task);

        // Enrichment searches memory on disk.
        let enricher = Arc::clone(&self.enricher);
        let (task_text, utterance_text) = (task.to_string(), utterance.to_string());
        let enriched =
            tokio::task::spawn_blocking(move || enricher.enrich(&task_text, &utterance_text))
                .await?;
        self.enricher.history().push_user(utterance);

        info!(
            session = %ctx.session_id,
            role = %role,
            components = ?enriched.component_ids(),
            "Delegating task"
        );

        match self.dispatcher.dispatch(role, &enriched).await {
            DelegationOutcome::Completed { response } => {
                self.enricher.history().push_agent(role.as_str(), response.as_str());
                Ok(ToolResult::text(format!(
                    "## Result from '{role}'\n\n{response}"
                )))
            }
            DelegationOutcome::Failed { message } => {
                warn!(session = %ctx.session_id, role = %role, %message, "Worker failed");
                Ok(ToolResult::error(format!("Worker '{role}' failed: {message}")))
            }
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use tempfile::TempDir;
    use trestle_memory::MemoryStore;
    use trestle_registry::{ComponentRegistry, NewComponent, RegistryConfig};

    use crate::enrich::DelegationConfig;
    use crate::history::{ConversationHistory, Speaker};
    use crate::sync::MemorySync;

    /// Dispatcher that records what it was sent.
    struct MockDispatcher {
        seen: Mutex<Vec<(AgentRole, EnrichedTask)>>,
        fail: bool,
    }

    impl MockDispatcher {
        fn new(fail: bool) -> Arc<Self> {
            Arc::new(Self {
                seen: Mutex::new(Vec::new()),
                fail,
            })
        }
    }

    #[async_trait]
    impl WorkerDispatcher for MockDispatcher {
        async fn dispatch(&self, role: AgentRole, task: &EnrichedTask) -> DelegationOutcome {
            self.seen.lock().push((role, task.clone()));
            if self.fail {
                DelegationOutcome::Failed {
                    message: "geometry engine offline".to_string(),
                }
            } else {
                DelegationOutcome::Completed {
                    response: format!("done: {}", task.task),
                }
            }
        }
    }

    fn tool(
        dir: &TempDir,
        dispatcher: Arc<MockDispatcher>,
    ) -> (DelegateTool<MemorySync>, Arc<ComponentRegistry<MemorySync>>, Arc<ConversationHistory>) {
        let memory = MemoryStore::open(dir.path()).scope("s").unwrap();
        let registry = Arc::new(ComponentRegistry::with_hook(
            RegistryConfig::default(),
            MemorySync::new(memory.clone()),
        ));
        let history = Arc::new(ConversationHistory::default());
        let enricher = TaskEnricher::new(
            memory,
            Arc::clone(&registry),
            Arc::clone(&history),
            DelegationConfig::default(),
        );
        (DelegateTool::new(dispatcher, enricher), registry, history)
    }

    #[test]
    fn test_role_parsing() {
        assert_eq!(" Geometry ".parse::<AgentRole>().unwrap(), AgentRole::Geometry);
        assert_eq!(AgentRole::Structural.to_string(), "structural");
        let err = "painter".parse::<AgentRole>().unwrap_err();
        assert!(err.contains("geometry, material, structural"));
    }

    #[tokio::test]
    async fn test_delegate_enriches_and_records_history() {
        let dir = TempDir::new().unwrap();
        let dispatcher = MockDispatcher::new(false);
        let (tool, registry, history) = tool(&dir, Arc::clone(&dispatcher));
        registry
            .register(NewComponent::new("curve_001", "curve", "Bridge Arch", "main arch"))
            .unwrap();

        let result = tool
            .execute(
                json!({
                    "role": "geometry",
                    "task": "raise curve_001 by 2 m",
                    "utterance": "make the curve you just drew taller"
                }),
                &ToolContext::default(),
            )
            .await
            .unwrap();

        assert_eq!(
            result.to_llm_content(),
            "## Result from 'geometry'\n\ndone: raise curve_001 by 2 m"
        );

        let seen = dispatcher.seen.lock();
        assert_eq!(seen[0].0, AgentRole::Geometry);
        assert_eq!(seen[0].1.component_ids(), vec!["curve_001"]);

        let turns = history.recent(10);
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[0].speaker, Speaker::User);
        assert_eq!(turns[1].speaker, Speaker::Agent("geometry".into()));
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_delegate_attaches_memory_hits() {
        let dir = TempDir::new().unwrap();
        MemoryStore::open(dir.path())
            .scope("s")
            .unwrap()
            .put("design", "deck", "concrete deck, 30 cm")
            .unwrap();
        let dispatcher = MockDispatcher::new(false);
        let (tool, _, _) = tool(&dir, Arc::clone(&dispatcher));

        let result = tool
            .execute(
                json!({"role": "material", "task": "price the concrete deck"}),
                &ToolContext::default(),
            )
            .await
            .unwrap();
        assert!(result.is_success());

        let seen = dispatcher.seen.lock();
        let hits = &seen[0].1.memory_hits;
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].address(), "design/deck");
    }

    #[tokio::test]
    async fn test_history_excludes_current_utterance() {
        let dir = TempDir::new().unwrap();
        let dispatcher = MockDispatcher::new(false);
        let (tool, _, _) = tool(&dir, Arc::clone(&dispatcher));
        let ctx = ToolContext::default();

        tool.execute(json!({"role": "material", "task": "pick steel"}), &ctx)
            .await
            .unwrap();
        tool.execute(json!({"role": "material", "task": "pick concrete"}), &ctx)
            .await
            .unwrap();

        let seen = dispatcher.seen.lock();
        assert!(seen[0].1.history.is_empty());
        assert_eq!(seen[1].1.history.len(), 2);
        assert_eq!(seen[1].1.history[0].content, "pick steel");
    }

    #[tokio::test]
    async fn test_unknown_role_lists_available() {
        let dir = TempDir::new().unwrap();
        let dispatcher = MockDispatcher::new(false);
        let (tool, _, _) = tool(&dir, Arc::clone(&dispatcher));

        let result = tool
            .execute(json!({"role": "painter", "task": "x"}), &ToolContext::default())
            .await
            .unwrap();
        assert!(result.is_error());
        assert!(result.to_llm_content().contains("Available agents"));
        assert!(dispatcher.seen.lock().is_empty());
    }

    #[tokio::test]
    async fn test_worker_failure_is_error_result() {
        let dir = TempDir::new().unwrap();
        let (tool, _, history) = tool(&dir, MockDispatcher::new(true));

        let result = tool
            .execute(json!({"role": "geometry", "task": "draw"}), &ToolContext::default())
            .await
            .unwrap();
        assert!(result.is_error());
        assert!(result.to_llm_content().contains("geometry engine offline"));
        assert_eq!(history.len(), 1);
    }

    #[tokio::test]
    async fn test_cancelled() {
        let dir = TempDir::new().unwrap();
        let dispatcher = MockDispatcher::new(false);
        let (tool, _, _) = tool(&dir, Arc::clone(&dispatcher));
        let ctx = ToolContext::default();
        ctx.cancellation.cancel();

        let result = tool
            .execute(json!({"role": "geometry", "task": "draw"}), &ctx)
            .await
            .unwrap();
        assert!(result.is_error());
        assert!(dispatcher.seen.lock().is_empty());
    }
}
