//! External decode collaborators.
//!
//! The demux/decode pipeline is not part of this crate. Hosts supply a
//! [`SourceOpener`] that turns a stream locator into a [`MediaSource`],
//! which yields decoded pictures and reports the pacing delay between them.

use std::time::Duration;

use thiserror::Error;

/// Errors raised by an external media source.
///
/// Recoverable at the session level: the affected playback slot terminates
/// and reports a failure, the other slot is unaffected.
#[derive(Debug, Clone, Error)]
pub enum SourceError {
    /// The stream locator could not be opened.
    #[error("failed to open stream: {0}")]
    Open(String),

    /// A frame could not be decoded mid-session.
    #[error("decode failed: {0}")]
    Decode(String),
}

/// One decoded picture: top-down rows of 24-bit RGB pixels.
#[derive(Debug, Clone)]
pub struct Picture {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Bytes per source row, at least `width * 3`.
    pub stride: usize,
    /// Pixel bytes, at least `stride * height`.
    pub data: Vec<u8>,
}

impl Picture {
    /// Create a picture from tightly packed RGB rows.
    pub fn from_rgb(width: u32, height: u32, data: Vec<u8>) -> Self {
        debug_assert!(data.len() >= width as usize * 3 * height as usize);
        Self {
            width,
            height,
            stride: width as usize * 3,
            data,
        }
    }

    /// Borrow row `y` (top-down), `width * 3` bytes.
    pub fn row(&self, y: u32) -> &[u8] {
        &self.data[y as usize * self.stride..][..self.width as usize * 3]
    }
}

/// A live decode session for one stream.
///
/// Every picture in one session must keep the dimensions of the first
/// picture; a source that changes resolution mid-stream must end the
/// session so the player can start a new one.
pub trait MediaSource: Send {
    /// Pull the next decoded picture; `None` signals end of stream.
    ///
    /// This call may block; cancellation of a blocked pull is governed by
    /// the source's own responsiveness, the player only checks its stop
    /// flag between pulls.
    fn next_picture(&mut self) -> Result<Option<Picture>, SourceError>;

    /// The pacing interval to wait before pulling the next picture.
    fn interframe_delay(&self) -> Duration;
}

/// Opens stream locators into decode sessions.
pub trait SourceOpener: Send + Sync {
    /// Open a session for the given locator.
    fn open(&self, locator: &str) -> Result<Box<dyn MediaSource>, SourceError>;
}
