//! # perspective-renderer
//!
//! Tera-based renderer that prints a flat perspective as a Terraform-style
//! `resource` block, for seeding a declarative config from imported state.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use perspective_core::PerspectiveState;
//! use perspective_renderer::Renderer;
//!
//! fn print_config(state: &PerspectiveState) {
//!     if let Ok(renderer) = Renderer::new() {
//!         if let Ok(text) = renderer.render(state, "environments") {
//!             print!("{text}");
//!         }
//!     }
//! }
//! ```

pub mod context;
pub mod engine;
pub mod error;

pub use context::TemplateContext;
pub use engine::{Renderer, TemplateEngine};
pub use error::RenderError;
