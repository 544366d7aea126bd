//! Context enrichment for delegated tasks.
//!
//! Before the triage agent hands a task to a worker, it attaches what the
//! worker cannot know on its own: the last few conversation turns, the
//! components the user's utterance refers to, and memory entries that mention
//! the utterance's salient words.

use std::collections::HashSet;
use std::fmt::Write as _;
use std::sync::Arc;

use serde::Serialize;
use trestle_memory::{ScopedMemory, SearchHit};
use trestle_registry::{Component, ComponentRegistry, SyncHook};
use tracing::debug;

use crate::history::{ConversationHistory, HistoryTurn};
use crate::sync::COMPONENTS_CATEGORY;

/// Default number of history turns attached to a delegated task.
pub const DEFAULT_HISTORY_TURNS: usize = 6;

/// Default number of memory hits attached to a delegated task.
pub const DEFAULT_MEMORY_HITS: usize = 5;

/// Words too common to be worth a memory search.
const STOPWORDS: &[&str] = &[
    "about", "after", "again", "could", "from", "have", "into", "just", "make", "more", "please",
    "should", "than", "that", "their", "them", "then", "there", "these", "they", "this", "those",
    "want", "what", "when", "which", "will", "with", "would", "your",
];

/// Shortest word used as a memory search term.
const MIN_TERM_CHARS: usize = 4;

/// How much context a delegated task carries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DelegationConfig {
    pub history_turns: usize,
    pub memory_hits: usize,
}

impl Default for DelegationConfig {
    fn default() -> Self {
        Self {
            history_turns: DEFAULT_HISTORY_TURNS,
            memory_hits: DEFAULT_MEMORY_HITS,
        }
    }
}

impl DelegationConfig {
    pub fn with_history_turns(mut self, turns: usize) -> Self {
        self.history_turns = turns;
        self
    }

    pub fn with_memory_hits(mut self, hits: usize) -> Self {
        self.memory_hits = hits;
        self
    }
}

/// A task plus the context a worker needs to carry it out.
#[derive(Debug, Clone, Serialize)]
pub struct EnrichedTask {
    pub task: String,
    pub utterance: String,
    pub history: Vec<HistoryTurn>,
    pub components: Vec<Component>,
    pub memory_hits: Vec<SearchHit>,
}

impl EnrichedTask {
    /// Ids of the referenced components, most specific first.
    pub fn component_ids(&self) -> Vec<&str> {
        self.components.iter().map(|c| c.id.as_str()).collect()
    }

    /// Render as a prompt section for the worker. Empty sections are omitted.
    pub fn render(&self) -> String {
        let mut out = format!("## Task\n{}\n", self.task);

        if self.utterance != self.task {
            let _ = write!(out, "\n## User request\n{}\n", self.utterance);
        }

        if !self.history.is_empty() {
            out.push_str("\n## Recent conversation\n");
            for turn in &self.history {
                let _ = writeln!(out, "- {}: {}", turn.speaker, turn.content);
            }
        }

        if !self.components.is_empty() {
            out.push_str("\n## Referenced components\n");
            for c in &self.components {
                let _ = write!(
                    out,
                    "- {} ({}) \"{}\": {}",
                    c.id, c.component_type, c.name, c.description
                );
                if !c.properties.is_empty() {
                    let props: Vec<String> =
                        c.properties.iter().map(|(k, v)| format!("{k}={v}")).collect();
                    let _ = write!(out, " [{}]", props.join(", "));
                }
                out.push('\n');
            }
        }

        if !self.memory_hits.is_empty() {
            out.push_str("\n## Relevant memories\n");
            for hit in &self.memory_hits {
                let _ = writeln!(out, "- {}: {}", hit.address(), hit.value);
            }
        }

        out
    }
}

/// Builds [`EnrichedTask`]s from the shared session state.
pub struct TaskEnricher<S: SyncHook> {
    memory: ScopedMemory,
    registry: Arc<ComponentRegistry<S>>,
    history: Arc<ConversationHistory>,
    config: DelegationConfig,
}

impl<S: SyncHook> std::fmt::Debug for TaskEnricher<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskEnricher")
            .field("scope", &self.memory.scope().id())
            .field("config", &self.config)
            .finish()
    }
}

impl<S: SyncHook> TaskEnricher<S> {
    pub fn new(
        memory: ScopedMemory,
        registry: Arc<ComponentRegistry<S>>,
        history: Arc<ConversationHistory>,
        config: DelegationConfig,
    ) -> Self {
        Self {
            memory,
            registry,
            history,
            config,
        }
    }

    /// The history this enricher reads.
    pub fn history(&self) -> &Arc<ConversationHistory> {
        &self.history
    }

    /// Attach context for `task`, resolving references in `utterance`.
    pub fn enrich(&self, task: &str, utterance: &str) -> EnrichedTask {
        let history = self.history.recent(self.config.history_turns);

        let components: Vec<Component> = self
            .registry
            .resolve_reference(utterance)
            .iter()
            .filter_map(|id| self.registry.get(id))
            .collect();

        let resolved: HashSet<&str> = components.iter().map(|c| c.id.as_str()).collect();
        let memory_hits = self.memory_hits(utterance, &resolved);

        debug!(
            scope = %self.memory.scope(),
            components = components.len(),
            memory_hits = memory_hits.len(),
            history = history.len(),
            "Task enriched"
        );

        EnrichedTask {
            task: task.to_string(),
            utterance: utterance.to_string(),
            history,
            components,
            memory_hits,
        }
    }

    /// Newest memory entries matching any salient word of `utterance`.
    ///
    /// Component summaries already attached as resolved components are
    /// skipped.
    fn memory_hits(&self, utterance: &str, resolved: &HashSet<&str>) -> Vec<SearchHit> {
        if self.config.memory_hits == 0 {
            return Vec::new();
        }

        let mut seen: HashSet<String> = HashSet::new();
        let mut hits: Vec<SearchHit> = Vec::new();
        for term in search_terms(utterance) {
            for hit in self.memory.search(&term) {
                if hit.category == COMPONENTS_CATEGORY && resolved.contains(hit.key.as_str()) {
                    continue;
                }
                if seen.insert(hit.address()) {
                    hits.push(hit);
                }
            }
        }

        hits.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        hits.truncate(self.config.memory_hits);
        hits
    }
}

/// Distinct lowercase words worth searching memory for, in order of appearance.
fn search_terms(utterance: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    utterance
        .split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .map(str::to_lowercase)
        .filter(|w| w.chars().count() >= MIN_TERM_CHARS && !STOPWORDS.contains(&w.as_str()))
        .filter(|w| seen.insert(w.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use trestle_memory::MemoryStore;
    use trestle_registry::{NewComponent, RegistryConfig};

    use crate::sync::MemorySync;

    fn setup(dir: &TempDir) -> TaskEnricher<MemorySync> {
        let memory = MemoryStore::open(dir.path()).scope("s").unwrap();
        let registry = Arc::new(ComponentRegistry::with_hook(
            RegistryConfig::default(),
            MemorySync::new(memory.clone()),
        ));
        TaskEnricher::new(
            memory,
            registry,
            Arc::new(ConversationHistory::default()),
            DelegationConfig::default(),
        )
    }

    #[test]
    fn test_search_terms() {
        assert_eq!(
            search_terms("Make THAT arch taller, taller please"),
            vec!["arch", "taller"]
        );
        assert!(search_terms("do it").is_empty());
    }

    #[test]
    fn test_enrich_resolves_components() {
        let dir = TempDir::new().unwrap();
        let enricher = setup(&dir);
        enricher
            .registry
            .register(
                NewComponent::new("curve_001", "curve", "Bridge Arch", "main bridge arch")
                    .with_property("span", "120"),
            )
            .unwrap();

        let task = enricher.enrich("raise the arch", "modify the curve you just drew");
        assert_eq!(task.component_ids(), vec!["curve_001"]);

        let rendered = task.render();
        assert!(rendered.contains("## Referenced components"));
        assert!(rendered.contains("curve_001 (curve) \"Bridge Arch\": main bridge arch [span=120]"));
        assert!(rendered.contains("## User request"));
    }

    #[test]
    fn test_enrich_attaches_memory_and_history() {
        let dir = TempDir::new().unwrap();
        let enricher = setup(&dir);
        enricher.memory.put("design", "deck", "deck width 12 m").unwrap();
        enricher.memory.put("notes", "x", "unrelated").unwrap();
        enricher.history().push_user("we need a wider deck");
        enricher.history().push_agent("triage", "ok");

        let task = enricher.enrich("widen the deck", "widen the deck");
        assert_eq!(task.memory_hits.len(), 1);
        assert_eq!(task.memory_hits[0].address(), "design/deck");
        assert_eq!(task.history.len(), 2);

        let rendered = task.render();
        assert!(!rendered.contains("## User request"));
        assert!(rendered.contains("- user: we need a wider deck"));
        assert!(rendered.contains("- design/deck: deck width 12 m"));
        assert!(!rendered.contains("## Referenced components"));
    }

    #[test]
    fn test_resolved_component_summaries_not_duplicated() {
        let dir = TempDir::new().unwrap();
        let enricher = setup(&dir);
        enricher
            .registry
            .register(NewComponent::new("beam_1", "beam", "Girder", "steel girder"))
            .unwrap();

        let task = enricher.enrich("check", "check the beam girder");
        assert_eq!(task.component_ids(), vec!["beam_1"]);
        assert!(task.memory_hits.is_empty());
    }

    #[test]
    fn test_memory_hits_capped() {
        let dir = TempDir::new().unwrap();
        let memory = MemoryStore::open(dir.path()).scope("s").unwrap();
        for i in 0..10 {
            memory.put("loads", &format!("wind-{i}"), "wind load").unwrap();
        }
        let enricher = TaskEnricher::new(
            memory,
            Arc::new(ComponentRegistry::default()),
            Arc::new(ConversationHistory::default()),
            DelegationConfig::default().with_memory_hits(3),
        );

        assert_eq!(enricher.enrich("t", "wind").memory_hits.len(), 3);
    }
}
