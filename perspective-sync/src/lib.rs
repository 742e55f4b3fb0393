//! # perspective-sync
//!
//! Translation between the remote perspective schema and the flat config,
//! plus the file-level sync pipeline built on top of it.
//!
//! - [`import()`] parses a remote payload into a [`PerspectiveState`].
//! - [`export()`] reconciles ref-ids against the previous state and builds
//!   the payload; [`to_json_bytes`] serializes it.
//! - [`pipeline`] wires both to the on-disk config, snapshot and payload files.
//!
//! [`PerspectiveState`]: perspective_core::PerspectiveState

pub mod diff;
pub mod error;
pub mod export;
pub mod hash_store;
pub mod import;
pub mod pipeline;
pub mod reconcile;
pub mod staleness;
pub mod writer;

pub use diff::{diff_at, PayloadDiff};
pub use error::SyncError;
pub use export::{build_document, export, export_from, to_json_bytes, Export, ExportOptions};
pub use import::{import, import_document};
pub use reconcile::{
    reconcile, reconcile_from, ref_id_watermark, Assignment, RefIdSource, RefIdStrategy,
    ReconcileReport,
};
pub use staleness::StalenessSignal;
pub use writer::WriteResult;
