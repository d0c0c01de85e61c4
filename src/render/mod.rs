//! Frame rendering to a host window surface.
//!
//! Handles picture-in-picture compositing, zoom cropping, and crosshair
//! decoration, all applied to a scratch image before the stretch to the
//! window; persisted frame storage is never touched by a draw.

mod compositor;
mod settings;

pub use compositor::{zoom_crop, Compositor};
pub use settings::{PipPlacement, RenderSettings};

/// Destination surface owned by the host window.
///
/// All methods are invoked on the host's UI-affine thread; only
/// [`PaintSurface::request_redraw`] may be triggered by background decode
/// activity, and then always via the posted event relay, never directly.
pub trait PaintSurface: Send {
    /// Current client area size in pixels.
    fn client_size(&self) -> (u32, u32);

    /// Ask the host to schedule a repaint. Must not block; the decode
    /// loops never wait for a paint.
    fn request_redraw(&mut self);

    /// Receive the final stretched RGB frame for display.
    fn present(&mut self, pixels: &[u8], width: u32, height: u32);
}
