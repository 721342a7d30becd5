//! Error types for plugin hosting

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadStage {
    Opening,
    EntryPoint,
    Instantiation,
    Validation,
}

impl std::fmt::Display for LoadStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LoadStage::Opening => write!(f, "opening library"),
            LoadStage::EntryPoint => write!(f, "resolving entry point"),
            LoadStage::Instantiation => write!(f, "creating instance"),
            LoadStage::Validation => write!(f, "validating descriptor"),
        }
    }
}

#[derive(Error, Debug)]
pub enum HostError {
    #[error("Plugin load failed at {stage} stage: {path}\n  Reason: {reason}")]
    LoadFailed {
        path: PathBuf,
        stage: LoadStage,
        reason: String,
    },

    #[error("Snapshot belongs to plugin {expected:#x}, not {found:#x}")]
    SnapshotMismatch { expected: i32, found: i32 },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),
}

pub type Result<T> = std::result::Result<T, HostError>;
