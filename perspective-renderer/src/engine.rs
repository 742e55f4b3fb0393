//! Tera rendering engine: [`TemplateEngine`] and [`Renderer`].
//!
//! | Template                     | Renders                     |
//! |------------------------------|-----------------------------|
//! | `resource.tf.tera`           | the whole `resource` block  |
//! | `partials/group.tera`        | one `group { ... }`         |
//! | `partials/rule.tera`         | one `rule { ... }`          |
//! | `partials/condition.tera`    | one `condition { ... }`     |

use std::collections::HashMap;
use std::path::Path;

use tera::Tera;

use perspective_core::PerspectiveState;

use crate::context::TemplateContext;
use crate::error::RenderError;

/// Entry template rendered by [`TemplateEngine::render`].
pub const RESOURCE_TEMPLATE: &str = "resource.tf.tera";

// ---------------------------------------------------------------------------
// Embedded templates, baked into the binary at compile time via include_str!
// ---------------------------------------------------------------------------

const TPLS: &[(&str, &str)] = &[
    (RESOURCE_TEMPLATE, include_str!("templates/resource.tf.tera")),
    ("partials/group.tera", include_str!("templates/partials/group.tera")),
    ("partials/rule.tera", include_str!("templates/partials/rule.tera")),
    (
        "partials/condition.tera",
        include_str!("templates/partials/condition.tera"),
    ),
];

// ---------------------------------------------------------------------------
// Template loading
// ---------------------------------------------------------------------------

/// Relative path with `/` separators, lowercased.
fn template_key(rel: &Path) -> String {
    rel.to_string_lossy().replace('\\', "/").to_lowercase()
}

/// Walk `dir` and put every `.tera` file into `templates`, keyed relative to `base`.
fn read_overrides(
    base: &Path,
    dir: &Path,
    templates: &mut HashMap<String, String>,
) -> Result<(), RenderError> {
    let read_err = |path: &Path, source| RenderError::Io {
        path: path.to_path_buf(),
        source,
    };
    for entry in std::fs::read_dir(dir).map_err(|e| read_err(dir, e))? {
        let path = entry.map_err(|e| read_err(dir, e))?.path();
        if path.is_dir() {
            read_overrides(base, &path, templates)?;
            continue;
        }
        if path.extension().and_then(|ext| ext.to_str()) != Some("tera") {
            continue;
        }
        let Ok(rel) = path.strip_prefix(base) else {
            continue;
        };
        let body = std::fs::read_to_string(&path).map_err(|e| read_err(&path, e))?;
        templates.insert(template_key(rel), body);
    }
    Ok(())
}

fn build_tera(overrides: Option<&Path>) -> Result<Tera, RenderError> {
    let mut templates: HashMap<String, String> = TPLS
        .iter()
        .map(|(name, body)| (template_key(Path::new(name)), (*body).to_string()))
        .collect();
    if let Some(dir) = overrides.filter(|d| d.exists()) {
        read_overrides(dir, dir, &mut templates)?;
    }

    let mut tera = Tera::default();
    tera.add_raw_templates(templates)?;
    Ok(tera)
}

// ---------------------------------------------------------------------------
// TemplateEngine
// ---------------------------------------------------------------------------

/// Tera engine with optional user overrides.
///
/// `user_template_dir` may contain `.tera` files that replace the embedded
/// ones by relative path (e.g. `partials/rule.tera`). Names are normalised to
/// lowercase with `/` separators.
pub struct TemplateEngine {
    tera: Tera,
}

impl TemplateEngine {
    pub fn new(user_template_dir: Option<&Path>) -> Result<Self, RenderError> {
        let tera = build_tera(user_template_dir)?;
        Ok(TemplateEngine { tera })
    }

    /// Render [`RESOURCE_TEMPLATE`] with the supplied context.
    pub fn render(&self, ctx: &TemplateContext) -> Result<String, RenderError> {
        let tera_ctx = ctx.to_tera_context()?;
        let content = self.tera.render(RESOURCE_TEMPLATE, &tera_ctx)?;
        Ok(content.replace("\r\n", "\n"))
    }
}

// ---------------------------------------------------------------------------
// Renderer
// ---------------------------------------------------------------------------

/// Create once with [`Renderer::new`] and reuse.
pub struct Renderer {
    engine: TemplateEngine,
}

impl Renderer {
    /// Embedded templates only.
    pub fn new() -> Result<Self, RenderError> {
        Ok(Renderer {
            engine: TemplateEngine::new(None)?,
        })
    }

    /// Embedded templates, overridden by any `.tera` files under `dir`.
    pub fn with_template_dir(dir: &Path) -> Result<Self, RenderError> {
        Ok(Renderer {
            engine: TemplateEngine::new(Some(dir))?,
        })
    }

    /// Render `state` as a `resource` block named `resource_name`.
    pub fn render(
        &self,
        state: &PerspectiveState,
        resource_name: &str,
    ) -> Result<String, RenderError> {
        let ctx = TemplateContext::from_state(state, resource_name);
        self.engine.render(&ctx)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use perspective_core::{Group, GroupKind, Rule};

    fn state() -> PerspectiveState {
        let mut group = Group::new("Prod", GroupKind::Filter);
        group.rules.push(Rule::new("AwsAccount"));
        PerspectiveState {
            name: "Envs".into(),
            include_in_reports: true,
            groups: vec![group],
            other_groups: vec![],
        }
    }

    #[test]
    fn renderer_new_succeeds() {
        Renderer::new().expect("Renderer::new should succeed with embedded templates");
    }

    #[test]
    fn empty_perspective_renders_header_only() {
        let renderer = Renderer::new().unwrap();
        let text = renderer
            .render(&PerspectiveState::default(), "empty")
            .unwrap();
        assert_eq!(
            text,
            "resource \"cloudhealth_perspective\" \"empty\" {\n    name = \"\"\n    include_in_reports = false\n}\n"
        );
    }

    #[test]
    fn group_without_conditions_renders() {
        let renderer = Renderer::new().unwrap();
        let text = renderer.render(&state(), "envs").unwrap();
        assert!(text.contains("    group {\n        name = \"Prod\"\n        type = \"filter\"\n"));
        assert!(text.contains("        rule {\n            asset = \"AwsAccount\"\n        }\n"));
        assert!(!text.contains('\r'));
    }

    #[test]
    fn user_template_overrides_embedded_partial() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("partials")).unwrap();
        std::fs::write(
            dir.path().join("partials").join("group.tera"),
            "    # group {{ group.name }}\n",
        )
        .unwrap();

        let renderer = Renderer::with_template_dir(dir.path()).unwrap();
        let text = renderer.render(&state(), "envs").unwrap();
        assert!(text.contains("    # group \"Prod\"\n"));
        assert!(!text.contains("rule {"));
    }

    #[test]
    fn missing_override_dir_falls_back_to_embedded() {
        let renderer = Renderer::with_template_dir(Path::new("/nonexistent/templates")).unwrap();
        let text = renderer.render(&state(), "envs").unwrap();
        assert!(text.contains("group {"));
    }
}
