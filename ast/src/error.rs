//! Error types for source locating

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LocateError {
    #[error("IO error reading {path}: {message}")]
    Io { path: PathBuf, message: String },

    #[error("Parser error in {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("Grammar could not be loaded: {0}")]
    Grammar(String),

    #[error("the source code of function {name} cannot be found in {path}")]
    NotFound { name: String, path: PathBuf },

    #[error("unsupported type expression `{text}` ({kind})")]
    UnsupportedType { kind: String, text: String },
}

impl LocateError {
    /// Environment faults: the file cannot be introspected at all.
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::Io { .. } | Self::Parse { .. } | Self::Grammar(_))
    }

    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

pub type LocateResult<T> = Result<T, LocateError>;
