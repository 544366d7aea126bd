//! Components command - inspect components recovered from a scope's memory.
//!
//! The live registry belongs to the agent process. Here it is rebuilt from
//! the `components` category, so properties are not available and times are
//! when each summary was last written.

use anyhow::Result;
use clap::{Args, Subcommand};
use console::{Style, style};
use serde_json::json;
use trestle_registry::Component;

use super::Context;

/// Arguments for the components command.
#[derive(Args, Debug)]
pub struct ComponentsArgs {
    #[command(subcommand)]
    pub command: ComponentsCommand,
}

#[derive(Subcommand, Debug)]
pub enum ComponentsCommand {
    /// List components, most recently touched first
    List {
        /// Only components of this exact type
        #[arg(short = 't', long = "type")]
        component_type: Option<String>,

        /// Maximum components to show
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },

    /// Resolve a vague reference ("it", "the curve") to component ids
    Resolve {
        /// The phrase to resolve
        text: String,
    },
}

/// Run the components command.
pub fn run(args: ComponentsArgs, ctx: &Context) -> Result<()> {
    match args.command {
        ComponentsCommand::List {
            component_type,
            limit,
        } => cmd_list(component_type.as_deref(), limit, ctx),
        ComponentsCommand::Resolve { text } => cmd_resolve(&text, ctx),
    }
}

fn cmd_list(component_type: Option<&str>, limit: usize, ctx: &Context) -> Result<()> {
    let registry = ctx.registry()?;
    let ids: Vec<String> = match component_type {
        Some(t) => registry.find_by_type(t).into_iter().take(limit).collect(),
        None => registry.find_recent(limit),
    };
    let components: Vec<Component> = ids.iter().filter_map(|id| registry.get(id)).collect();

    if ctx.json_output {
        return ctx.print_json(&components);
    }

    let dim = Style::new().dim();
    if components.is_empty() {
        println!(
            "{}",
            dim.apply_to(format!("No components recorded in scope '{}'", ctx.scope))
        );
        return Ok(());
    }

    println!("{}", style("Components").bold());
    println!("{}", dim.apply_to("─".repeat(50)));
    for c in &components {
        println!("  {:<20} {}", style(&c.id).cyan(), c.summary());
        if ctx.verbose {
            println!(
                "  {:<20} {}",
                "",
                dim.apply_to(format!("updated {}", c.updated_at.format("%Y-%m-%d %H:%M:%S")))
            );
        }
    }
    Ok(())
}

fn cmd_resolve(text: &str, ctx: &Context) -> Result<()> {
    let registry = ctx.registry()?;
    let matches = registry.resolve_detailed(text);

    if ctx.json_output {
        let ids: Vec<&str> = matches.iter().map(|m| m.id.as_str()).collect();
        return ctx.print_json(&json!({"text": text, "ids": ids, "matches": matches}));
    }

    if matches.is_empty() {
        println!("No component matches \"{text}\".");
        return Ok(());
    }
    for m in &matches {
        let summary = registry
            .get(&m.id)
            .map(|c| c.summary().to_string())
            .unwrap_or_default();
        println!(
            "{:<20} {:<10} {}",
            m.id,
            Style::new().dim().apply_to(m.rule),
            summary
        );
    }
    Ok(())
}
