//! Crate-level error taxonomy.

use thiserror::Error;

use crate::source::SourceError;

/// Convenience alias for results returned by the player API.
pub type Result<T> = std::result::Result<T, PlayerError>;

/// Errors surfaced synchronously by the player API.
///
/// Decode-time failures never appear here from a background thread; they
/// are converted to a posted [`crate::PlayerEvent::Failed`] notification
/// for the affected slot.
#[derive(Debug, Error)]
pub enum PlayerError {
    /// Invalid or incomplete configuration; fatal to the call that
    /// triggered it, no partial state is retained.
    #[error("configuration error: {0}")]
    Config(&'static str),

    /// The primary slot has not produced a frame yet. Expected transient
    /// condition when querying state right after a start request.
    #[error("no frame has been decoded yet")]
    NoFrameYet,

    /// A stream could not be opened or decoded.
    #[error(transparent)]
    Source(#[from] SourceError),

    /// A pixel or snapshot buffer could not be allocated.
    #[error("buffer allocation failed")]
    Allocation,
}
