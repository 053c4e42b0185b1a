//! Error types
//!
//! `ApiError` is what every public operation returns. Faults from link
//! languages and sandboxed modules arrive as their own typed errors and are
//! wrapped here, so nothing a plugin does can unwind into registry state.

use std::path::PathBuf;
use thiserror::Error;
use uuid::Uuid;

/// Errors raised by the durable handle store.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Failed to write {path}: {source}")]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Corrupt perspective store {path}: {message}")]
    Corrupt { path: PathBuf, message: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid path: {0}")]
    InvalidPath(String),
}

/// A local diff did not reach its link language.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PropagationError {
    #[error("Link language {address} rejected the diff: {reason}")]
    Rejected { address: String, reason: String },

    #[error("Link language {address} is unavailable: {reason}")]
    Unavailable { address: String, reason: String },

    #[error("Link language {0} is not loaded")]
    LanguageNotLoaded(String),
}

/// A sandboxed module could not be loaded.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ModuleLoadError {
    #[error("Module not found: {0}")]
    NotFound(String),

    #[error("Module {path} failed to compile: {message}")]
    Compile { path: String, message: String },

    #[error("Module {path} failed to initialise: {message}")]
    Init { path: String, message: String },

    #[error("Module {path} did not load within {timeout_ms}ms")]
    Timeout { path: String, timeout_ms: u64 },
}

impl ModuleLoadError {
    /// Short sub-kind label, used in log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            ModuleLoadError::NotFound(_) => "not_found",
            ModuleLoadError::Compile { .. } => "compile",
            ModuleLoadError::Init { .. } => "init",
            ModuleLoadError::Timeout { .. } => "timeout",
        }
    }
}

/// Misuse of the link language capability surface.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LanguageError {
    #[error("Diff observer already registered for {0}")]
    ObserverAlreadyRegistered(String),

    #[error("Link language {0} is already installed")]
    AlreadyInstalled(String),

    #[error("Remote diff stream has already been taken")]
    DiffStreamTaken,
}

/// Errors surfaced by the public API.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Perspective not found: {0}")]
    NotFound(Uuid),

    #[error("Link not found in perspective {0}")]
    LinkNotFound(Uuid),

    #[error("Link language {address} is already bound to perspective {perspective}")]
    NeighbourhoodInUse { address: String, perspective: Uuid },

    #[error("Propagation failed: {0}")]
    Propagation(#[from] PropagationError),

    #[error("Module load failed: {0}")]
    ModuleLoad(#[from] ModuleLoadError),

    #[error("Link language error: {0}")]
    Language(#[from] LanguageError),

    #[error("Persistence failed: {0}")]
    Persistence(#[from] StorageError),

    #[error("Signing failed: {0}")]
    Signing(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl From<config::ConfigError> for ApiError {
    fn from(err: config::ConfigError) -> Self {
        ApiError::ConfigError(err.to_string())
    }
}
