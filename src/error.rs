//! Error types for submix.

use crate::handle::ObjectId;
use thiserror::Error;

/// Error type for mixer operations.
///
/// Protocol errors (`StaleHandle`, `TypeMismatch`, `CycleDetected`,
/// `UnsupportedChannelLayout`) are local to the offending command or bus
/// input: the mixer logs them and keeps processing the rest of the buffer.
/// `InvalidConfig` is fatal at setup time.
#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("stale handle {0:?}")]
    StaleHandle(ObjectId),

    #[error("expected a {expected}, found a {found}")]
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },

    #[error("connecting {0:?} would create a cycle")]
    CycleDetected(ObjectId),

    #[error("unsupported channel conversion: {source_channels} -> {target_channels}")]
    UnsupportedChannelLayout {
        source_channels: u32,
        target_channels: u32,
    },

    #[error("not implemented: {0}")]
    NotImplemented(&'static str),

    #[error("mixer is shut down")]
    Disconnected,
}

/// Result type alias.
pub type Result<T> = core::result::Result<T, Error>;
