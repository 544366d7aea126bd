//! Vague-reference resolution.
//!
//! Maps a natural-language fragment to the component ids it most likely
//! refers to. Pure and I/O free: callers pass the components in recency order
//! (most recently touched first).
//!
//! Rules, most specific first:
//!
//! 1. **Exact**: a component's id or name appears as a whole-word phrase.
//! 2. **Type**: a known component type appears as a whole word (a plain
//!    `s`/`es` plural and the spaced form of `snake_case` types also count);
//!    every component of that type matches.
//! 3. **Quantifier**: `all`, `every`, `everything` or `each` with no type cue
//!    matches every component.
//! 4. **Anaphor**: only when nothing above matched. `it`, `that` and `this`
//!    resolve to the most recent component; `them`, `they`, `those` and
//!    `these` resolve to the `plural_limit` most recent.
//!
//! Results are concatenated in that order and de-duplicated, so each id keeps
//! the position of the most specific rule that produced it. Within a rule,
//! recency order is preserved.

use std::collections::HashSet;
use std::fmt;

use serde::Serialize;

use crate::component::Component;

/// Singular anaphors.
pub const SINGULAR_ANAPHORS: &[&str] = &["it", "that", "this"];

/// Plural anaphors.
pub const PLURAL_ANAPHORS: &[&str] = &["them", "they", "those", "these"];

/// Quantifiers that select every component.
pub const QUANTIFIERS: &[&str] = &["all", "every", "everything", "each"];

/// Which rule produced a resolved id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchRule {
    /// The id or name appeared verbatim.
    Exact,
    /// The component's type appeared.
    Type,
    /// A quantifier selected everything.
    Quantifier,
    /// A pronoun selected the most recent component(s).
    Anaphor,
}

impl fmt::Display for MatchRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Exact => "exact",
            Self::Type => "type",
            Self::Quantifier => "quantifier",
            Self::Anaphor => "anaphor",
        };
        f.pad(name)
    }
}

/// A resolved id and the rule that matched it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Resolution {
    pub id: String,
    pub rule: MatchRule,
}

/// Resolve `text` to component ids, most specific first.
pub fn resolve_reference(text: &str, recent_first: &[&Component], plural_limit: usize) -> Vec<String> {
    resolve_detailed(text, recent_first, plural_limit)
        .into_iter()
        .map(|r| r.id)
        .collect()
}

/// Like [`resolve_reference`], but reports the rule behind each id.
pub fn resolve_detailed(
    text: &str,
    recent_first: &[&Component],
    plural_limit: usize,
) -> Vec<Resolution> {
    let tokens = tokenize(text);
    if tokens.is_empty() || recent_first.is_empty() {
        return Vec::new();
    }

    let exact: Vec<&Component> = recent_first
        .iter()
        .copied()
        .filter(|c| {
            contains_phrase(&tokens, &tokenize(&c.id))
                || contains_phrase(&tokens, &tokenize(&c.name))
        })
        .collect();

    let mut cued_types: HashSet<&str> = HashSet::new();
    for component in recent_first {
        let ty = component.component_type.as_str();
        if !cued_types.contains(ty) && type_forms(ty).iter().any(|f| contains_phrase(&tokens, f)) {
            cued_types.insert(ty);
        }
    }
    let typed: Vec<&Component> = recent_first
        .iter()
        .copied()
        .filter(|c| cued_types.contains(c.component_type.as_str()))
        .collect();

    let everything: &[&Component] = if cued_types.is_empty() && has_any(&tokens, QUANTIFIERS) {
        recent_first
    } else {
        &[]
    };

    let anaphoric: &[&Component] = if exact.is_empty() && typed.is_empty() && everything.is_empty() {
        if has_any(&tokens, PLURAL_ANAPHORS) {
            &recent_first[..plural_limit.max(1).min(recent_first.len())]
        } else if has_any(&tokens, SINGULAR_ANAPHORS) {
            &recent_first[..1]
        } else {
            &[]
        }
    } else {
        &[]
    };

    let mut seen: HashSet<&str> = HashSet::new();
    let mut resolved = Vec::new();
    let ranked = [
        (exact.as_slice(), MatchRule::Exact),
        (typed.as_slice(), MatchRule::Type),
        (everything, MatchRule::Quantifier),
        (anaphoric, MatchRule::Anaphor),
    ];
    for (components, rule) in ranked {
        for component in components {
            if seen.insert(component.id.as_str()) {
                resolved.push(Resolution {
                    id: component.id.clone(),
                    rule,
                });
            }
        }
    }
    resolved
}

/// Lowercased words; `_` is a word character so snake_case ids stay whole.
fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .collect()
}

fn contains_phrase(tokens: &[String], phrase: &[String]) -> bool {
    !phrase.is_empty() && tokens.windows(phrase.len()).any(|w| w == phrase)
}

fn has_any(tokens: &[String], words: &[&str]) -> bool {
    tokens.iter().any(|t| words.contains(&t.as_str()))
}

/// Phrases that count as mentioning `component_type`.
fn type_forms(component_type: &str) -> Vec<Vec<String>> {
    let mut forms: Vec<Vec<String>> = Vec::new();
    let bases = [tokenize(component_type), tokenize(&component_type.replace('_', " "))];
    for base in bases {
        if base.is_empty() {
            continue;
        }
        for suffix in ["", "s", "es"] {
            let mut form = base.clone();
            if let Some(last) = form.last_mut() {
                last.push_str(suffix);
            }
            if !forms.contains(&form) {
                forms.push(form);
            }
        }
    }
    forms
}
