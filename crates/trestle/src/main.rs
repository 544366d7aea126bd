//! Trestle - session memory and component tracking for conversational CAD agents
//!
//! Main entry point for the Trestle CLI.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

mod commands;

use commands::{components, config, memory};

// ─────────────────────────────────────────────────────────────────────────────
// CLI Structure
// ─────────────────────────────────────────────────────────────────────────────

/// Trestle - session memory and component tracking for conversational CAD agents
#[derive(Parser)]
#[command(name = "trestle")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output as JSON (for scripting)
    #[arg(long, global = true)]
    pub json: bool,

    /// Memory scope (session id) to operate on
    #[arg(short, long, global = true)]
    pub scope: Option<String>,

    /// Directory holding memory files
    #[arg(long, global = true)]
    pub memory_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Read and write session memory
    Memory(memory::MemoryArgs),

    /// Inspect components recovered from memory
    Components(components::ComponentsArgs),

    /// Configuration management
    Config(config::ConfigArgs),
}

// ─────────────────────────────────────────────────────────────────────────────
// Main
// ─────────────────────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    let cli = Cli::parse();

    let loaded = trestle_config::load_config(None)?;
    let _guard = init_tracing(cli.verbose, &loaded.config.logging());
    for warning in &loaded.warnings {
        tracing::warn!("{warning}");
    }

    let memory_section = loaded.config.memory();
    let ctx = commands::Context {
        memory_dir: cli
            .memory_dir
            .unwrap_or_else(|| memory_section.effective_directory()),
        scope: cli.scope.unwrap_or_else(|| memory_section.effective_scope()),
        json_output: cli.json,
        verbose: cli.verbose,
        loaded,
    };

    match cli.command {
        Commands::Memory(args) => memory::run(args, &ctx),
        Commands::Components(args) => components::run(args, &ctx),
        Commands::Config(args) => config::run(args, &ctx),
    }
}

/// Console (human-readable, stderr) plus an optional daily-rolling JSON file.
///
/// The returned guard flushes the file writer when dropped.
fn init_tracing(verbose: bool, logging: &trestle_config::LoggingSection) -> Option<WorkerGuard> {
    use tracing_subscriber::prelude::*;

    let filter = if verbose {
        "trestle=debug,trestle_memory=debug,trestle_registry=debug,trestle_agent=debug,trestle_config=debug,info"
    } else {
        "trestle=info,trestle_memory=warn,trestle_registry=warn,trestle_agent=warn,warn"
    };
    let console_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    let (file_layer, guard) = if logging.file {
        let file_appender =
            tracing_appender::rolling::daily(logging.effective_directory(), "trestle.log");
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
        let layer = tracing_subscriber::fmt::layer()
            .json()
            .with_writer(non_blocking)
            .with_filter(EnvFilter::new(
                "trestle=trace,trestle_memory=trace,trestle_registry=trace,trestle_agent=trace,trestle_config=trace,info",
            ));
        (Some(layer), Some(guard))
    } else {
        (None, None)
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_writer(std::io::stderr)
                .with_filter(console_filter),
        )
        .with(file_layer)
        .init();

    guard
}
