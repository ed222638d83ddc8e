//! Error types for zonemix-player
//!
//! Every error is local to a single request/execute call and is returned to
//! the caller; nothing is retried automatically.

use crate::zone::ZoneId;
use thiserror::Error;

/// Main error type for zonemix-player
#[derive(Error, Debug)]
pub enum Error {
    /// Channel index outside the configured range
    #[error("Invalid channel index {index} (configured channels: {count})")]
    InvalidChannelIndex { index: usize, count: usize },

    /// Plan has no fade-in target
    #[error("Transition plan to zone {0} has no fade-in target")]
    MissingPlanTarget(ZoneId),

    /// Plan fades out and in on the same channel
    #[error("Transition plan fades channel {0} out and in at once")]
    ConflictingPlanChannels(usize),

    /// Zone id not present in the configuration
    #[error("Unknown zone: {0}")]
    UnknownZone(ZoneId),

    /// No table rule covers the requested transition
    #[error("No transition rule from zone {from} to zone {to}")]
    NoTransitionRule { from: ZoneId, to: ZoneId },

    /// Configuration loading or validation errors
    #[error("Configuration error: {0}")]
    Config(#[from] zonemix_common::Error),
}

/// Convenience Result type using zonemix-player Error
pub type Result<T> = std::result::Result<T, Error>;
