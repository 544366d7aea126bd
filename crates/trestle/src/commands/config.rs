//! Config command - show the effective configuration.

use anyhow::Result;
use clap::{Args, Subcommand};
use serde_json::json;

use super::Context;

/// Arguments for the config command.
#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Show loaded config files and effective settings
    Show,

    /// Print the path of the user config file
    Path,
}

/// Run the config command.
pub fn run(args: ConfigArgs, ctx: &Context) -> Result<()> {
    match args.command {
        ConfigCommand::Show => cmd_show(ctx),
        ConfigCommand::Path => cmd_path(),
    }
}

fn cmd_show(ctx: &Context) -> Result<()> {
    let loaded = &ctx.loaded;
    let config = &loaded.config;
    let memory = config.memory();
    let logging = config.logging();

    if ctx.json_output {
        let sources: Vec<String> = loaded
            .loaded_from()
            .iter()
            .map(|p| p.display().to_string())
            .collect();
        return ctx.print_json(&json!({
            "sources": sources,
            "warnings": loaded.warnings,
            "memory_dir": ctx.memory_dir,
            "scope": ctx.scope,
            "memory": memory,
            "registry": config.registry(),
            "delegation": config.delegation(),
            "logging": logging,
        }));
    }

    println!("# Trestle Configuration\n");

    let sources = loaded.loaded_from();
    if sources.is_empty() {
        println!("No config files loaded (using defaults)\n");
    } else {
        println!("Config files:");
        for source in &sources {
            println!("  {}", source.display());
        }
        println!();
    }

    println!("Memory:");
    println!("  directory: {}", ctx.memory_dir.display());
    println!("  scope: {}", ctx.scope);
    println!(
        "  limits: search {}, recall {}, digest previews {} ({} chars)",
        memory.search_limit, memory.recall_limit, memory.digest_preview_items, memory.preview_chars
    );
    println!("  lock timeout: {} ms", memory.lock_timeout_ms);
    match memory.retention_days {
        Some(days) => println!("  retention: {days} days"),
        None => println!("  retention: never prune"),
    }
    println!();

    println!("Registry:");
    println!(
        "  plural references: {} most recent",
        config.registry().plural_reference_limit
    );
    println!();

    let delegation = config.delegation();
    println!("Delegation:");
    println!("  history turns: {}", delegation.history_turns);
    println!("  memory hits: {}", delegation.memory_hits);
    println!();

    println!("Logging:");
    if logging.file {
        println!("  file: {}", logging.effective_directory().display());
    } else {
        println!("  file: disabled");
    }
    println!();

    if !loaded.warnings.is_empty() {
        println!("Warnings:");
        for w in &loaded.warnings {
            println!("  ⚠ {w}");
        }
        println!();
    }

    Ok(())
}

fn cmd_path() -> Result<()> {
    match trestle_config::user_config_path() {
        Some(path) => println!("{}", path.display()),
        None => anyhow::bail!("no config directory available on this platform"),
    }
    Ok(())
}
