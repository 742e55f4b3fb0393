//! `perspective import`: turn a remote payload into a flat config.

use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;

use perspective_sync::pipeline;

/// Arguments for `perspective import`.
#[derive(Args, Debug)]
pub struct ImportArgs {
    /// Remote payload JSON file, or `-` for stdin.
    pub payload: PathBuf,

    /// Config key to write (defaults to the payload file stem).
    #[arg(long)]
    pub name: Option<String>,
}

impl ImportArgs {
    pub fn run(self, root: &Path) -> Result<()> {
        let from_stdin = self.payload.as_os_str() == "-";
        let raw = if from_stdin {
            let mut buf = Vec::new();
            std::io::stdin()
                .read_to_end(&mut buf)
                .context("failed to read payload from stdin")?;
            buf
        } else {
            std::fs::read(&self.payload)
                .with_context(|| format!("failed to read {}", self.payload.display()))?
        };

        let key = match self.name {
            Some(name) => name,
            None if from_stdin => anyhow::bail!("--name is required when reading from stdin"),
            None => self
                .payload
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .context("cannot derive a config name from the payload path; pass --name")?,
        };

        let outcome = pipeline::import_at(root, &key, &raw)
            .with_context(|| format!("import failed for '{key}'"))?;
        println!(
            "✓ imported '{}' ({} groups, {} other) → {}",
            outcome.key,
            outcome.groups,
            outcome.other_groups,
            outcome.config_path.display()
        );
        Ok(())
    }
}
