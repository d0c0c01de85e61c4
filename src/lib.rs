//! Stream Player Core
//!
//! A threaded stream playback core: background decode loops feed fixed-size
//! frame buffers that a compositor paints onto a host window surface, with
//! optional picture-in-picture inset, zoom crop, and crosshair decoration.
//!
//! The decode pipeline and the window itself are external collaborators:
//! hosts supply a [`SourceOpener`] for frames and a [`PaintSurface`] for
//! output, and drain posted notifications on their UI thread through
//! [`PlayerController::pump_events`].

pub mod error;
pub mod frame;
pub mod playback;
pub mod player;
pub mod render;
pub mod source;

// Re-export commonly used types
pub use error::{PlayerError, Result};
pub use frame::FrameBuffer;
pub use playback::{PlaybackLoop, PlayerEvent, Slot};
pub use player::{PlayerController, PlayerParams, SlotCallback};
pub use render::{Compositor, PaintSurface, PipPlacement, RenderSettings};
pub use source::{MediaSource, Picture, SourceError, SourceOpener};
