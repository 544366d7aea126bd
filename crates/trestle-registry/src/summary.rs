//! Summary lines mirrored into durable memory, and recovery from them.
//!
//! A summary has the form `[<type>] <name>: <description>`. It is plain text so
//! that substring search over memory finds components by type or description,
//! and structured enough that a fresh process can rebuild an approximate index.

use std::fmt;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::component::{Component, Properties};

/// The parts of a component carried in its summary line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentSummary {
    pub component_type: String,
    pub name: String,
    pub description: String,
}

impl ComponentSummary {
    /// Render as `[<type>] <name>: <description>`.
    pub fn render(&self) -> String {
        self.to_string()
    }

    /// Parse a rendered summary. The name ends at the first `": "`.
    pub fn parse(line: &str) -> Option<Self> {
        let rest = line.trim().strip_prefix('[')?;
        let (component_type, rest) = rest.split_once("] ")?;
        let (name, description) = match rest.split_once(": ") {
            Some((name, description)) => (name, description),
            None => (rest.strip_suffix(':').unwrap_or(rest), ""),
        };

        if component_type.is_empty() {
            return None;
        }
        Some(Self {
            component_type: component_type.to_string(),
            name: name.to_string(),
            description: description.to_string(),
        })
    }

    /// Rebuild a component. Properties are not mirrored, so they come back empty.
    pub fn into_component(self, id: impl Into<String>, written_at: DateTime<Utc>) -> Component {
        Component {
            id: id.into(),
            component_type: self.component_type,
            name: self.name,
            description: self.description,
            properties: Properties::new(),
            created_at: written_at,
            updated_at: written_at,
        }
    }
}

impl fmt::Display for ComponentSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.component_type, self.name, self.description)
    }
}

/// Rebuild components from `(id, summary, written_at)` triples.
///
/// Lines that do not parse are skipped. The result is ordered oldest first,
/// ready for [`ComponentRegistry::restore`](crate::ComponentRegistry::restore).
pub fn recover_components<'a>(
    entries: impl IntoIterator<Item = (&'a str, &'a str, DateTime<Utc>)>,
) -> Vec<Component> {
    let mut components: Vec<Component> = entries
        .into_iter()
        .filter_map(|(id, line, written_at)| match ComponentSummary::parse(line) {
            Some(summary) => Some(summary.into_component(id, written_at)),
            None => {
                debug!(component_id = id, "Skipping unparsable component summary");
                None
            }
        })
        .collect();
    components.sort_by(|a, b| a.updated_at.cmp(&b.updated_at).then_with(|| a.id.cmp(&b.id)));
    components
}
