//! Error types for perspective-core.

use std::path::PathBuf;

use thiserror::Error;

use crate::types::{ConstantKind, GroupKind, RefId};

/// Coarse classification of a [`TranslateError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// The payload does not match the declared wire shape.
    Format,
    /// An identifier points at nothing, or at something we cannot represent.
    Reference,
    /// The configuration contradicts itself (an authoring mistake).
    Consistency,
}

/// All errors that can arise while translating between the wire and flat schemas.
///
/// None of these are transient; every one aborts the whole translation.
#[derive(Debug, Error)]
pub enum TranslateError {
    /// Malformed JSON, or a field the wire schema does not declare.
    #[error("unable to parse perspective payload: {0}")]
    Json(#[from] serde_json::Error),

    /// `include_in_reports` was not a recognised boolean literal.
    #[error("malformed boolean '{value}' for {field}")]
    MalformedBoolean { field: &'static str, value: String },

    /// A Dynamic Group item names a block that does not exist.
    #[error("dynamic group '{name}' references blk_id {blk_id} which does not exist")]
    DanglingBlockId { name: String, blk_id: RefId },

    /// A rule names a group ref-id that does not exist under any kind.
    #[error("{kind} rule for asset '{asset}' targets unknown group {target}")]
    UnresolvedRuleTarget {
        kind: GroupKind,
        asset: String,
        target: RefId,
    },

    /// A constant kind literal outside the closed set.
    #[error("unknown constant type '{kind}'")]
    UnknownConstantKind { kind: String },

    /// A rule's kind disagrees with the kind of the group it targets.
    #[error("{found} rule for asset '{asset}' targets {expected} group {target}")]
    RuleKindMismatch {
        asset: String,
        target: RefId,
        expected: GroupKind,
        found: GroupKind,
    },

    /// A flat group mixes rule kinds, or declares rules of a foreign kind.
    #[error("group '{group}' is {group_kind} but contains a {rule_kind} rule; cannot mix categorize and filter rules")]
    MixedRuleKinds {
        group: String,
        group_kind: GroupKind,
        rule_kind: GroupKind,
    },

    /// Two groups of one kind share a name, so neither can be correlated.
    #[error("duplicate {kind} group name '{name}'")]
    DuplicateGroupName { name: String, kind: GroupKind },

    /// A wire rule has neither `to` nor `ref_id`.
    #[error("unable to find a target for {kind} rule for asset '{asset}'")]
    RuleWithoutTarget { kind: GroupKind, asset: String },

    /// Two items of one constant kind would share a ref-id on export.
    #[error("ref_id {ref_id} is used more than once in {kind} constants")]
    DuplicateRefId { kind: ConstantKind, ref_id: RefId },
}

impl TranslateError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            TranslateError::Json(_) | TranslateError::MalformedBoolean { .. } => {
                ErrorCategory::Format
            }
            TranslateError::DanglingBlockId { .. }
            | TranslateError::UnresolvedRuleTarget { .. }
            | TranslateError::UnknownConstantKind { .. } => ErrorCategory::Reference,
            TranslateError::RuleKindMismatch { .. }
            | TranslateError::MixedRuleKinds { .. }
            | TranslateError::DuplicateGroupName { .. }
            | TranslateError::RuleWithoutTarget { .. }
            | TranslateError::DuplicateRefId { .. } => ErrorCategory::Consistency,
        }
    }
}

/// Errors from loading or saving configs and state snapshots.
#[derive(Debug, Error)]
pub enum StateError {
    /// Underlying I/O failure, annotated with the path.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// YAML serialization error (write/save path).
    #[error("YAML serialization error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// YAML parse error on load, with the file path and line context from serde_yaml.
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// The requested file does not exist.
    #[error("no perspective file at {path}")]
    NotFound { path: PathBuf },
}

pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> StateError {
    StateError::Io {
        path: path.into(),
        source,
    }
}
