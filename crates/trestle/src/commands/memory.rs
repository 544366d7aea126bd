//! Memory command - read and write a session's durable memory.

use std::time::Duration;

use anyhow::{Result, bail};
use chrono::Utc;
use clap::{Args, Subcommand};
use console::{Style, style};
use serde_json::json;

use super::Context;

/// Arguments for the memory command.
#[derive(Args, Debug)]
pub struct MemoryArgs {
    #[command(subcommand)]
    pub command: MemoryCommand,
}

#[derive(Subcommand, Debug)]
pub enum MemoryCommand {
    /// Store a fact, overwriting any previous value for the key
    Remember {
        category: String,
        key: String,
        value: String,
    },

    /// Show a digest, a category, or a single fact
    Recall {
        category: Option<String>,
        key: Option<String>,

        /// Look the key up in every category
        #[arg(long, conflicts_with_all = ["category", "key"])]
        any_key: Option<String>,
    },

    /// Case-insensitive substring search across all categories
    Search {
        query: String,

        /// Maximum results to show
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Delete one category, or the whole scope
    Clear {
        /// Category to delete (all categories when omitted)
        category: Option<String>,

        /// Must be "yes" or "confirm" to actually delete
        #[arg(long, default_value = "")]
        confirm: String,
    },

    /// List persisted scopes
    Sessions,

    /// Delete scopes not written within the retention window
    Prune {
        /// Override the configured retention_days
        #[arg(long)]
        older_than_days: Option<u32>,
    },
}

/// Run the memory command.
pub fn run(args: MemoryArgs, ctx: &Context) -> Result<()> {
    match args.command {
        MemoryCommand::Remember {
            category,
            key,
            value,
        } => cmd_remember(&category, &key, &value, ctx),
        MemoryCommand::Recall {
            category,
            key,
            any_key,
        } => match any_key {
            Some(k) => cmd_recall(None, Some(&k), ctx),
            None => cmd_recall(category.as_deref(), key.as_deref(), ctx),
        },
        MemoryCommand::Search { query, limit } => cmd_search(&query, limit, ctx),
        MemoryCommand::Clear { category, confirm } => cmd_clear(category.as_deref(), &confirm, ctx),
        MemoryCommand::Sessions => cmd_sessions(ctx),
        MemoryCommand::Prune { older_than_days } => cmd_prune(older_than_days, ctx),
    }
}

fn present(arg: Option<&str>) -> Option<&str> {
    arg.map(str::trim).filter(|s| !s.is_empty())
}

fn cmd_remember(category: &str, key: &str, value: &str, ctx: &Context) -> Result<()> {
    let memory = ctx.memory()?;
    let message = memory.remember(category, key, value)?;

    if ctx.json_output {
        ctx.print_json(&json!({
            "scope": ctx.scope,
            "category": category,
            "key": key,
            "message": message,
        }))
    } else {
        println!("{message}");
        Ok(())
    }
}

fn cmd_recall(category: Option<&str>, key: Option<&str>, ctx: &Context) -> Result<()> {
    let memory = ctx.memory()?;
    let (category, key) = (present(category), present(key));

    if !ctx.json_output {
        println!("{}", memory.recall(category, key));
        return Ok(());
    }

    let value = match (category, key) {
        (Some(c), Some(k)) => json!({"category": c, "key": k, "record": memory.get(c, k)}),
        (Some(c), None) => {
            let entries: Vec<_> = memory
                .entries(c)
                .into_iter()
                .map(|(key, record)| {
                    json!({"key": key, "value": record.value, "timestamp": record.timestamp})
                })
                .collect();
            json!({"category": c, "entries": entries})
        }
        (None, Some(k)) => json!({"key": k, "hits": memory.find_key(k)}),
        (None, None) => serde_json::to_value(memory.snapshot())?,
    };
    ctx.print_json(&value)
}

fn cmd_search(query: &str, limit: Option<usize>, ctx: &Context) -> Result<()> {
    let memory = ctx.memory()?;

    if ctx.verbose {
        let dim = Style::new().dim();
        eprintln!(
            "{}",
            dim.apply_to(format!("Searching scope '{}' for \"{query}\"", ctx.scope))
        );
    }

    if !ctx.json_output {
        println!("{}", memory.search_memory(query, limit));
        return Ok(());
    }

    let hits = memory.search(query);
    let limit = limit.unwrap_or(memory.store().config().search_limit);
    let total = hits.len();
    let shown: Vec<_> = hits.into_iter().take(limit).collect();
    ctx.print_json(&json!({"query": query, "total": total, "hits": shown}))
}

fn cmd_clear(category: Option<&str>, confirm: &str, ctx: &Context) -> Result<()> {
    let memory = ctx.memory()?;
    let category = present(category);
    let confirmed = trestle_memory::is_affirmative(confirm);
    let message = memory.clear_memory(category, confirm)?;

    if ctx.json_output {
        ctx.print_json(&json!({
            "scope": ctx.scope,
            "category": category,
            "confirmed": confirmed,
            "message": message,
        }))
    } else {
        println!("{message}");
        Ok(())
    }
}

fn cmd_sessions(ctx: &Context) -> Result<()> {
    let sessions = ctx.store().list_sessions()?;

    if ctx.json_output {
        return ctx.print_json(&sessions);
    }

    let dim = Style::new().dim();
    if sessions.is_empty() {
        println!(
            "{}",
            dim.apply_to(format!("No memory scopes in {}", ctx.memory_dir.display()))
        );
        return Ok(());
    }

    println!("{}", style("Memory Scopes").bold());
    println!("{}", dim.apply_to("─".repeat(50)));
    let now = Utc::now();
    for session in &sessions {
        let age = now.signed_duration_since(session.modified);
        println!(
            "  {:<24} {:>4} items  {:>3} categories  {}",
            style(&session.session_id).cyan(),
            session.records,
            session.categories,
            dim.apply_to(format_age(age))
        );
    }
    Ok(())
}

fn cmd_prune(older_than_days: Option<u32>, ctx: &Context) -> Result<()> {
    let max_age = match older_than_days {
        Some(days) => Duration::from_secs(u64::from(days) * 24 * 60 * 60),
        None => match ctx.loaded.config.memory().retention() {
            Some(max_age) => max_age,
            None => bail!(
                "no retention configured: set [memory] retention_days or pass --older-than-days"
            ),
        },
    };

    let report = ctx.store().prune_older_than(max_age)?;

    if ctx.json_output {
        return ctx.print_json(&report);
    }
    if report.removed.is_empty() {
        println!("Nothing to prune ({} scope(s) kept).", report.kept);
    } else {
        println!(
            "Pruned {} scope(s): {} ({} kept).",
            report.removed.len(),
            report.removed.join(", "),
            report.kept
        );
    }
    Ok(())
}

fn format_age(age: chrono::Duration) -> String {
    if age.num_days() > 0 {
        format!("{}d ago", age.num_days())
    } else if age.num_hours() > 0 {
        format!("{}h ago", age.num_hours())
    } else if age.num_minutes() > 0 {
        format!("{}m ago", age.num_minutes())
    } else {
        "just now".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_age() {
        assert_eq!(format_age(chrono::Duration::seconds(10)), "just now");
        assert_eq!(format_age(chrono::Duration::minutes(5)), "5m ago");
        assert_eq!(format_age(chrono::Duration::hours(3)), "3h ago");
        assert_eq!(format_age(chrono::Duration::days(2)), "2d ago");
    }

    #[test]
    fn test_present() {
        assert_eq!(present(Some(" design ")), Some("design"));
        assert_eq!(present(Some("  ")), None);
        assert_eq!(present(None), None);
    }
}
