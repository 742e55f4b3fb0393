//! Perspective: sync cost-allocation perspectives between a remote payload
//! and a flat YAML config.
//!
//! # Usage
//!
//! ```text
//! perspective [--root <dir>] import <payload.json|-> [--name <key>]
//! perspective [--root <dir>] export <key> [--out <file>] [--strategy uuid|sequential] [--compact] [--dry-run]
//! perspective [--root <dir>] export --all [--dry-run]
//! perspective [--root <dir>] diff <key> <remote.json>
//! perspective [--root <dir>] render <key> [--resource-name <name>] [--templates <dir>]
//! perspective [--root <dir>] status [--json]
//! ```
//!
//! Logging goes to stderr and is controlled by `RUST_LOG` (default `warn`).

mod commands;

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{
    diff::DiffArgs, export::ExportArgs, import::ImportArgs, render::RenderArgs,
    status::StatusArgs,
};
use perspective_sync::RefIdStrategy;

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "perspective",
    version,
    about = "Sync cost-allocation perspectives with a flat YAML config",
    long_about = None,
)]
struct Cli {
    /// Workspace holding `<key>.yaml` configs and the `.perspective/` state.
    #[arg(long, global = true, default_value = ".")]
    root: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Import a remote payload into `<root>/<key>.yaml`.
    Import(ImportArgs),

    /// Reconcile a config against its snapshot and write the payload.
    Export(ExportArgs),

    /// Show a unified diff between a remote payload and what export would send.
    Diff(DiffArgs),

    /// Print a config as a Terraform-style resource block.
    Render(RenderArgs),

    /// Show which configs changed since their last export.
    Status(StatusArgs),
}

// ---------------------------------------------------------------------------
// Shared RefIdStrategy argument
// ---------------------------------------------------------------------------

/// Thin wrapper so clap can parse [`RefIdStrategy`] from CLI args.
#[derive(Debug, Clone, Copy, Default)]
pub struct StrategyArg(pub RefIdStrategy);

impl FromStr for StrategyArg {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sequential" => Ok(Self(RefIdStrategy::Sequential)),
            "uuid" => Ok(Self(RefIdStrategy::Uuid)),
            other => Err(format!(
                "unknown ref-id strategy '{other}'; expected: sequential, uuid"
            )),
        }
    }
}

impl fmt::Display for StrategyArg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            RefIdStrategy::Sequential => f.write_str("sequential"),
            RefIdStrategy::Uuid => f.write_str("uuid"),
        }
    }
}

impl From<StrategyArg> for RefIdStrategy {
    fn from(s: StrategyArg) -> Self {
        s.0
    }
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn init_tracing() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let root = cli.root;
    tracing::debug!(root = %root.display(), "workspace root");
    match cli.command {
        Commands::Import(args) => args.run(&root),
        Commands::Export(args) => args.run(&root),
        Commands::Diff(args) => args.run(&root),
        Commands::Render(args) => args.run(&root),
        Commands::Status(args) => args.run(&root),
    }
}
