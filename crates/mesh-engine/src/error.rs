//! Error types for the mesh engine (§7).
//!
//! Per §7's propagation policy, almost nothing here is fatal: decode
//! failures, dedup/cooldown drops, and queue overflow are not even
//! represented as `Result::Err` inside the engine loops — they are
//! counted and logged via `tracing`. `EngineError` exists for the handful
//! of operations where a caller (the `mesh-node` binary, or a test) needs
//! to distinguish a genuine failure from a no-op.

/// Errors the engine surfaces to its caller.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// The radio collaborator failed to start or stop (§7: "Radio transient
    /// errors"). Non-fatal: the mutex is freed and the next tick retries.
    #[error("radio error: {0}")]
    Radio(String),

    /// A required platform permission is missing (§6.4). The engine
    /// refuses to start scan/advertise until the caller retries.
    #[error("permission missing: {0}")]
    PermissionMissing(&'static str),

    /// Wraps a decode failure from `mesh-codec` when the caller asked for
    /// a hard `Result` instead of the diagnostic stream (e.g. tests).
    #[error("codec error: {0}")]
    Codec(#[from] mesh_types::CodecError),

    /// The identity string the caller supplied did not parse.
    #[error("identity error: {0}")]
    Identity(#[from] mesh_types::IdentityError),

    /// A `PersistencePort` adapter's underlying I/O failed (§6.3).
    #[error("persistence I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience result alias for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;
