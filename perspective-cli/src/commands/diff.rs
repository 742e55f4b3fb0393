//! `perspective diff <key> <remote.json>`: show what export would change.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;

use perspective_sync::{diff_at, ExportOptions};

use crate::StrategyArg;

/// Arguments for `perspective diff`.
#[derive(Args, Debug)]
pub struct DiffArgs {
    /// Config key to diff.
    pub key: String,

    /// The payload currently held by the remote service.
    pub remote: PathBuf,

    /// How ref-ids for new groups would be minted.
    #[arg(long, default_value = "uuid")]
    pub strategy: StrategyArg,
}

impl DiffArgs {
    pub fn run(self, root: &Path) -> Result<()> {
        let remote = std::fs::read(&self.remote)
            .with_context(|| format!("failed to read {}", self.remote.display()))?;
        let options = ExportOptions {
            ref_id_strategy: self.strategy.into(),
            ..ExportOptions::default()
        };

        let result = diff_at(root, &self.key, &remote, &options)
            .with_context(|| format!("diff failed for '{}'", self.key))?;

        if result.is_empty() {
            println!("No differences for '{}'.", result.key);
            return Ok(());
        }

        print!("{}", result.unified_diff);
        if !result.unified_diff.ends_with('\n') {
            println!();
        }
        Ok(())
    }
}
