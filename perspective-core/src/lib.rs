//! Perspective core library: schema model, state persistence, errors.
//!
//! Public API surface:
//! - [`types`]: ref-id newtype and the closed kind enums
//! - [`wire`]: the remote nested JSON schema
//! - [`flat`]: the flat, user-editable configuration
//! - [`state`]: load / save of configs and last-synced snapshots
//! - [`error`]: [`TranslateError`], [`StateError`]

pub mod error;
pub mod flat;
pub mod state;
pub mod types;
pub mod wire;

pub use error::{ErrorCategory, StateError, TranslateError};
pub use flat::{Clause, DynamicChild, Group, OtherEntry, PerspectiveState, Rule};
pub use types::{ConstantKind, GroupKind, RefId};
pub use wire::{ConstantBlock, ConstantItem, PerspectiveDocument, PerspectiveSchema};
