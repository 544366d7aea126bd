//! Text operations for LLM tool calls.
//!
//! These wrap the typed [`ScopedMemory`] API and always produce readable text.
//! Lookups never fail; mutations fail only when storage itself fails. Empty
//! optional arguments are treated as absent, since tool-calling models often
//! send `""` instead of omitting a field.

use crate::error::{MemoryError, Result};
use crate::store::ScopedMemory;

/// Tokens accepted as confirmation for a destructive clear.
pub const AFFIRMATIVE_TOKENS: &[&str] = &["yes", "confirm"];

/// Whether `token` explicitly confirms a destructive operation.
pub fn is_affirmative(token: &str) -> bool {
    let token = token.trim();
    AFFIRMATIVE_TOKENS
        .iter()
        .any(|t| token.eq_ignore_ascii_case(t))
}

impl ScopedMemory {
    /// Store a fact and confirm what was written.
    pub fn remember(&self, category: &str, key: &str, value: &str) -> Result<String> {
        match self.put(category, key, value) {
            Ok(_) => Ok(format!(
                "Remembered '{}' in category '{}'.",
                key.trim(),
                category.trim()
            )),
            Err(MemoryError::InvalidArgument(msg)) => Ok(format!("Nothing remembered: {msg}.")),
            Err(e) => Err(e),
        }
    }

    /// Recall by arity: digest, category listing, key lookup, or exact value.
    pub fn recall(&self, category: Option<&str>, key: Option<&str>) -> String {
        match (present(category), present(key)) {
            (None, None) => self.render_digest(),
            (Some(category), None) => self.render_category(category),
            (Some(category), Some(key)) => match self.get(category, key) {
                Some(record) => record.value,
                None => format!("No memory found for '{category}/{key}'."),
            },
            (None, Some(key)) => self.render_key(key),
        }
    }

    /// Search every category and render up to `limit` matches.
    pub fn search_memory(&self, query: &str, limit: Option<usize>) -> String {
        let query = query.trim();
        if query.is_empty() {
            return "Search query is empty; nothing to search for.".to_string();
        }

        let limit = limit.unwrap_or(self.store().config().search_limit).max(1);
        let hits = self.search(query);
        if hits.is_empty() {
            return format!("No memories found matching '{query}'.");
        }

        let mut lines = vec![format!(
            "Found {} matching '{query}':",
            count(hits.len(), "memory", "memories")
        )];
        lines.extend(
            hits.iter()
                .take(limit)
                .map(|hit| format!("- {}: {}", hit.address(), hit.value)),
        );
        if hits.len() > limit {
            lines.push(format!(
                "(showing {limit} of {} matches; refine the query or raise the limit)",
                hits.len()
            ));
        }
        lines.join("\n")
    }

    /// Delete a category or the whole scope, but only when confirmed.
    pub fn clear_memory(&self, category: Option<&str>, confirm: &str) -> Result<String> {
        let category = present(category);

        if !is_affirmative(confirm) {
            let target = match category {
                Some(c) => format!("category '{c}'"),
                None => format!("all memories for session '{}'", self.scope().id()),
            };
            return Ok(format!(
                "Nothing deleted: clearing {target} is irreversible. Call again with confirm=\"yes\" to proceed."
            ));
        }

        match category {
            Some(c) => {
                let outcome = self.clear(Some(c))?;
                if outcome.categories == 0 {
                    Ok(format!("Category '{c}' does not exist; nothing deleted."))
                } else {
                    Ok(format!(
                        "Deleted category '{c}' ({} removed).",
                        count(outcome.records, "item", "items")
                    ))
                }
            }
            None => {
                let outcome = self.clear(None)?;
                Ok(format!(
                    "Cleared all memories for session '{}' ({} removed from {}).",
                    self.scope().id(),
                    count(outcome.records, "item", "items"),
                    count(outcome.categories, "category", "categories")
                ))
            }
        }
    }

    fn render_digest(&self) -> String {
        let categories = self.categories();
        if categories.is_empty() {
            return format!("No memories stored for session '{}'.", self.scope().id());
        }

        let config = self.store().config();
        let total: usize = categories.iter().map(|(_, n)| n).sum();
        let mut lines = vec![format!(
            "Memory for session '{}': {} in {}.",
            self.scope().id(),
            count(total, "item", "items"),
            count(categories.len(), "category", "categories")
        )];

        for (name, size) in categories {
            lines.push(format!("- {name} ({})", count(size, "item", "items")));
            if size <= config.digest_preview_items {
                for (key, record) in self.entries(&name) {
                    lines.push(format!(
                        "    {key}: {}",
                        preview(&record.value, config.preview_chars)
                    ));
                }
            }
        }
        lines.join("\n")
    }

    fn render_category(&self, category: &str) -> String {
        let entries = self.entries(category);
        if entries.is_empty() {
            return format!("No memories found in category '{category}'.");
        }

        let limit = self.store().config().recall_limit;
        let mut lines = vec![format!(
            "{category} ({}, newest first):",
            count(entries.len(), "item", "items")
        )];
        lines.extend(
            entries
                .iter()
                .take(limit)
                .map(|(key, record)| format!("- {key}: {}", record.value)),
        );
        if entries.len() > limit {
            lines.push(format!(
                "... {} more not shown (truncated)",
                entries.len() - limit
            ));
        }
        lines.join("\n")
    }

    fn render_key(&self, key: &str) -> String {
        let hits = self.find_key(key);
        if hits.is_empty() {
            return format!("No memory found with key '{key}' in any category.");
        }
        hits.iter()
            .map(|hit| format!("{}: {}", hit.address(), hit.value))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

fn present(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn count(n: usize, singular: &str, plural: &str) -> String {
    if n == 1 {
        format!("{n} {singular}")
    } else {
        format!("{n} {plural}")
    }
}

fn preview(value: &str, max_chars: usize) -> String {
    let flat = value.replace(['\n', '\r'], " ");
    if flat.chars().count() <= max_chars {
        flat
    } else {
        let cut: String = flat.chars().take(max_chars.saturating_sub(3)).collect();
        format!("{cut}...")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{MemoryStore, StoreConfig};
    use tempfile::TempDir;

    fn memory(dir: &TempDir) -> ScopedMemory {
        MemoryStore::new(StoreConfig::new(dir.path()).with_recall_limit(2))
            .scope("s1")
            .unwrap()
    }

    #[test]
    fn test_is_affirmative() {
        assert!(is_affirmative("yes"));
        assert!(is_affirmative("  YES "));
        assert!(is_affirmative("confirm"));
        assert!(!is_affirmative("no"));
        assert!(!is_affirmative(""));
        assert!(!is_affirmative("y"));
        assert!(!is_affirmative("yes please"));
    }

    #[test]
    fn test_remember_confirmation() {
        let dir = TempDir::new().unwrap();
        let memory = memory(&dir);
        let msg = memory.remember("design", "span", "120 m").unwrap();
        assert!(msg.contains("span"));
        assert!(msg.contains("design"));
    }

    #[test]
    fn test_remember_invalid_argument_is_text() {
        let dir = TempDir::new().unwrap();
        let memory = memory(&dir);
        let msg = memory.remember("", "span", "x").unwrap();
        assert!(msg.starts_with("Nothing remembered"));
    }

    #[test]
    fn test_recall_exact_and_missing() {
        let dir = TempDir::new().unwrap();
        let memory = memory(&dir);
        memory.remember("design", "span", "120 m").unwrap();

        assert_eq!(memory.recall(Some("design"), Some("span")), "120 m");
        assert!(memory.recall(Some("design"), Some("height")).contains("No memory found"));
        assert!(memory.recall(Some("nope"), Some("span")).contains("No memory found"));
    }

    #[test]
    fn test_recall_digest() {
        let dir = TempDir::new().unwrap();
        let memory = memory(&dir);
        assert!(memory.recall(None, None).contains("No memories stored"));

        memory.remember("design", "span", "120 m").unwrap();
        for i in 0..5 {
            memory.remember("log", &format!("e{i}"), "entry").unwrap();
        }

        let digest = memory.recall(None, Some(""));
        assert!(digest.contains("6 items in 2 categories"));
        assert!(digest.contains("- design (1 item)"));
        assert!(digest.contains("span: 120 m"));
        assert!(digest.contains("- log (5 items)"));
        assert!(!digest.contains("e3: entry"));
    }

    #[test]
    fn test_digest_preview_length_configurable() {
        let dir = TempDir::new().unwrap();
        let memory = MemoryStore::new(StoreConfig::new(dir.path()).with_preview_chars(8))
            .scope("s")
            .unwrap();
        memory.remember("design", "deck", "reinforced concrete").unwrap();

        let digest = memory.recall(None, None);
        assert!(digest.contains("deck: reinf..."));
        assert!(!digest.contains("concrete"));
    }

    #[test]
    fn test_recall_category_truncates() {
        let dir = TempDir::new().unwrap();
        let memory = memory(&dir);
        for i in 0..4 {
            memory.remember("log", &format!("e{i}"), "entry").unwrap();
        }

        let listing = memory.recall(Some("log"), None);
        assert!(listing.starts_with("log (4 items"));
        assert!(listing.contains("2 more not shown (truncated)"));
        assert!(memory.recall(Some("empty"), None).contains("No memories found"));
    }

    #[test]
    fn test_recall_key_only() {
        let dir = TempDir::new().unwrap();
        let memory = memory(&dir);
        memory.remember("a", "shared", "one").unwrap();
        memory.remember("b", "shared", "two").unwrap();

        let out = memory.recall(None, Some("shared"));
        assert!(out.contains("a/shared: one"));
        assert!(out.contains("b/shared: two"));
    }

    #[test]
    fn test_search_memory_formatting() {
        let dir = TempDir::new().unwrap();
        let memory = memory(&dir);
        for i in 0..3 {
            memory.remember("beams", &format!("b{i}"), "steel I-beam").unwrap();
        }

        let out = memory.search_memory("STEEL", Some(2));
        assert!(out.starts_with("Found 3 memories"));
        assert!(out.contains("(showing 2 of 3 matches"));

        let none = memory.search_memory("timber", None);
        assert_eq!(none, "No memories found matching 'timber'.");
        assert!(memory.search_memory("  ", None).contains("empty"));
    }

    #[test]
    fn test_clear_requires_confirmation() {
        let dir = TempDir::new().unwrap();
        let memory = memory(&dir);
        memory.remember("design", "span", "120 m").unwrap();

        for token in ["no", "", "maybe", "y"] {
            let msg = memory.clear_memory(Some("design"), token).unwrap();
            assert!(msg.starts_with("Nothing deleted"));
        }
        assert_eq!(memory.len(), 1);

        let msg = memory.clear_memory(Some("design"), "yes").unwrap();
        assert!(msg.contains("Deleted category 'design' (1 item removed)"));
        assert!(memory.is_empty());
    }

    #[test]
    fn test_clear_missing_category_and_all() {
        let dir = TempDir::new().unwrap();
        let memory = memory(&dir);
        memory.remember("a", "1", "x").unwrap();
        memory.remember("b", "1", "y").unwrap();

        let msg = memory.clear_memory(Some("zzz"), "yes").unwrap();
        assert!(msg.contains("does not exist"));

        let msg = memory.clear_memory(None, "confirm").unwrap();
        assert!(msg.contains("2 items removed from 2 categories"));
        assert!(memory.is_empty());
    }

    #[test]
    fn test_preview_truncates_by_chars() {
        assert_eq!(preview("short", 10), "short");
        assert_eq!(preview("line\nbreak", 20), "line break");
        let long = "é".repeat(30);
        let out = preview(&long, 10);
        assert_eq!(out.chars().count(), 10);
        assert!(out.ends_with("..."));
    }
}
