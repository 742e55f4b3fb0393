//! `perspective export`: reconcile ref-ids and write the remote payload.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;

use perspective_core::state;
use perspective_sync::{
    pipeline::{self, ExportOutcome},
    ExportOptions, WriteResult,
};

use crate::StrategyArg;

/// Arguments for `perspective export`.
#[derive(Args, Debug)]
pub struct ExportArgs {
    /// Config key to export (omit when using `--all`).
    pub key: Option<String>,

    /// Export every config under the root.
    #[arg(long, conflicts_with_all = ["key", "out"])]
    pub all: bool,

    /// Payload destination (default `.perspective/payloads/<key>.json`).
    #[arg(long)]
    pub out: Option<PathBuf>,

    /// How new ref-ids are minted: `uuid` or `sequential`.
    #[arg(long, default_value = "uuid")]
    pub strategy: StrategyArg,

    /// Write single-line JSON instead of pretty-printed.
    #[arg(long)]
    pub compact: bool,

    /// Show what would be written without touching any file.
    #[arg(long)]
    pub dry_run: bool,
}

impl ExportArgs {
    pub fn run(self, root: &Path) -> Result<()> {
        let options = ExportOptions {
            ref_id_strategy: self.strategy.into(),
            pretty: !self.compact,
        };

        let keys = if self.all {
            let keys = state::list_config_keys_at(root)
                .with_context(|| format!("failed to list configs in {}", root.display()))?;
            if keys.is_empty() {
                println!("No configs found. Run `perspective import` first.");
            }
            keys
        } else {
            vec![self
                .key
                .clone()
                .context("provide a config key or use --all")?]
        };

        for key in keys {
            let outcome =
                pipeline::export_at(root, &key, self.out.as_deref(), &options, self.dry_run)
                    .with_context(|| format!("export failed for '{key}'"))?;
            print_outcome(&outcome, self.dry_run);
        }
        Ok(())
    }
}

fn print_outcome(outcome: &ExportOutcome, dry_run: bool) {
    let prefix = if dry_run { "[dry-run] " } else { "" };
    match &outcome.write {
        WriteResult::Written { path } => {
            println!("{prefix}✓ '{}' exported  ✎  {}", outcome.key, path.display())
        }
        WriteResult::WouldWrite { path } => {
            println!("{prefix}✓ '{}' would export  ~  {}", outcome.key, path.display())
        }
        WriteResult::Unchanged { path } => {
            println!("{prefix}✓ '{}' unchanged  ·  {}", outcome.key, path.display())
        }
    }

    for assignment in outcome.report.minted() {
        println!(
            "  + new ref_id {} for group '{}'",
            assignment.ref_id, assignment.group
        );
    }
    if outcome.config_updated {
        println!("  config updated with reconciled ref-ids");
    }
}
