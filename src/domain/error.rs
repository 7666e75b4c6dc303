use thiserror::Error;

/// Errors surfaced by the external connection host.
#[derive(Error, Debug)]
pub enum HostError {
    #[error("Profile switch failed: {0}")]
    SwitchFailed(String),

    #[error("Host facility unavailable: {0}")]
    Unavailable(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Errors from reapplying a restorable snapshot.
#[derive(Error, Debug)]
pub enum RestoreError {
    #[error("Applied snapshot did not verify against the live configuration; rolled back")]
    VerifyMismatch,

    #[error("Applied snapshot did not verify and rollback also failed: {0}")]
    RollbackFailed(String),

    #[error(transparent)]
    Host(#[from] HostError),
}

/// Result alias for host-facing operations.
pub type DomainResult<T> = Result<T, HostError>;
