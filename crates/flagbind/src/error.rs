//! Error types for binding a schema to flags.
//!
//! Every variant describes a mistake in how a schema was declared or how the
//! parse context was populated. Hosts are expected to abort startup on them.

use flagbind_argparse::ValueKind;
use thiserror::Error;

use crate::descriptor::SemanticType;

/// Errors raised while extracting, synthesizing or hydrating a schema.
#[derive(Debug, Error)]
pub enum BindError {
    /// Field metadata could not be understood (bad tag, empty primary name,
    /// non-boolean `hidden`).
    #[error("field `{field}`: malformed metadata: {reason}")]
    MalformedMetadata { field: String, reason: String },

    /// A `value` literal does not fit the field's type.
    #[error("flag `{flag}`: invalid {kind} default `{literal}`: {reason}")]
    InvalidDefault {
        flag: String,
        kind: SemanticType,
        literal: String,
        reason: String,
    },

    /// The parse context registered the flag under another kind.
    #[error("flag `{flag}`: expected a {expected} value, parse context holds {found}")]
    KindMismatch {
        flag: String,
        expected: ValueKind,
        found: ValueKind,
    },

    /// The generic value in the parse context is not the field's type.
    #[error("flag `{flag}`: generic value is not a `{expected}`")]
    ValueTypeMismatch { flag: String, expected: &'static str },
}

/// Convenience alias for results with [`BindError`].
pub type Result<T> = std::result::Result<T, BindError>;
