//! `perspective render <key>`: print a config as a Terraform-style resource.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;

use perspective_core::state;
use perspective_renderer::Renderer;

/// Arguments for `perspective render`.
#[derive(Args, Debug)]
pub struct RenderArgs {
    /// Config key to render.
    pub key: String,

    /// Resource name in the rendered block (defaults to the key).
    #[arg(long)]
    pub resource_name: Option<String>,

    /// Directory of `.tera` files overriding the built-in templates.
    #[arg(long)]
    pub templates: Option<PathBuf>,
}

impl RenderArgs {
    pub fn run(self, root: &Path) -> Result<()> {
        let config = state::load_config_at(root, &self.key)
            .with_context(|| format!("failed to load config '{}'", self.key))?;
        let renderer = match self.templates.as_deref() {
            Some(dir) => Renderer::with_template_dir(dir),
            None => Renderer::new(),
        }
        .context("failed to load templates")?;

        let name = self.resource_name.as_deref().unwrap_or(&self.key);
        let text = renderer
            .render(&config, name)
            .with_context(|| format!("render failed for '{}'", self.key))?;
        print!("{text}");
        Ok(())
    }
}
