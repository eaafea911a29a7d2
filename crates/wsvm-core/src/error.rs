//! Error types for host capability calls and their collaborators.
//!
//! A [`HostError`] never leaves a capability function as an error: it is
//! converted to its [`StatusCode`] at the boundary.

use crate::status::StatusCode;
use thiserror::Error;

/// Result type for work done inside a capability call.
pub type HostResult<T> = std::result::Result<T, HostError>;

/// Result type for collaborator operations.
pub type CollabResult<T> = std::result::Result<T, CollaboratorError>;

/// Local failure raised while serving a single capability call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HostError {
    #[error("read of {len} bytes at {ptr} exceeds guest memory ({size} bytes)")]
    ReadOutOfBounds { ptr: u32, len: u32, size: usize },

    #[error("write of {len} bytes at {ptr} exceeds guest memory ({size} bytes)")]
    WriteOutOfBounds { ptr: u32, len: u64, size: usize },

    #[error("output slot at {ptr} exceeds guest memory ({size} bytes)")]
    OutputSlotOutOfBounds { ptr: u32, size: usize },

    #[error("invalid utf-8 in {len} bytes at {ptr}")]
    InvalidUtf8 { ptr: u32, len: u32 },

    #[error("guest does not export linear memory")]
    MemoryNotExported,

    #[error("guest does not export an allocator")]
    AllocatorMissing,

    #[error("guest allocation failed: {0}")]
    AllocFailed(String),

    #[error("malformed command: {0}")]
    MalformedCommand(String),

    #[error("env key not found: {0}")]
    EnvKeyNotFound(String),

    #[error("resource not found: {0}")]
    NotFound(String),

    #[error("no database attached")]
    NoDatabase,

    #[error(transparent)]
    Collaborator(#[from] CollaboratorError),
}

impl HostError {
    /// Status the guest observes for this failure.
    pub fn status(&self) -> StatusCode {
        match self {
            HostError::ReadOutOfBounds { .. }
            | HostError::InvalidUtf8 { .. }
            | HostError::MalformedCommand(_) => StatusCode::TransDataFromVMFailed,
            HostError::WriteOutOfBounds { .. }
            | HostError::AllocatorMissing
            | HostError::AllocFailed(_) => StatusCode::TransDataToVMFailed,
            HostError::OutputSlotOutOfBounds { .. } | HostError::MemoryNotExported => {
                StatusCode::HostInternal
            }
            HostError::EnvKeyNotFound(_) => StatusCode::EnvKeyNotFound,
            HostError::NotFound(_) => StatusCode::ResourceNotFound,
            HostError::NoDatabase => StatusCode::NoDBContext,
            HostError::Collaborator(_) => StatusCode::ImportCallFailed,
        }
    }
}

/// Failure reported by an external collaborator.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CollaboratorError {
    #[error("database error: {0}")]
    Database(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("chain error: {0}")]
    Chain(String),

    #[error("translation error: {0}")]
    Translation(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("collaborator unavailable: {0}")]
    Unavailable(String),
}

impl From<serde_json::Error> for CollaboratorError {
    fn from(e: serde_json::Error) -> Self {
        CollaboratorError::Serialization(e.to_string())
    }
}
