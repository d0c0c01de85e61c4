//! Software compositor: scratch-image compositing and the window blit.

use image::imageops::{self, FilterType};
use image::RgbImage;

use super::{PaintSurface, PipPlacement, RenderSettings};
use crate::frame::FrameBuffer;

/// Additive brightening step applied to crosshair pixels, per channel.
const CROSSHAIR_GAIN: u8 = 0x6F;

/// Draws frame buffers to a host surface, independent of decode timing.
#[derive(Debug, Default)]
pub struct Compositor;

impl Compositor {
    /// Create a new compositor.
    pub fn new() -> Self {
        Self
    }

    /// Paint the primary buffer, optionally compositing a PiP inset, to
    /// the destination surface. A no-op when the destination client area
    /// is empty.
    ///
    /// Buffer locks are taken one at a time, primary first, and only for
    /// the copy into the scratch image. The PiP inset may be one or more
    /// frames stale relative to the primary; the two streams are not
    /// frame-synchronized.
    pub fn draw(
        &self,
        surface: &mut dyn PaintSurface,
        primary: &FrameBuffer,
        pip: Option<&FrameBuffer>,
        settings: &RenderSettings,
    ) {
        let (dest_w, dest_h) = surface.client_size();
        if dest_w == 0 || dest_h == 0 {
            return;
        }

        let mut scratch = primary.snapshot_image();
        if let Some(pip) = pip {
            overlay_pip(&mut scratch, &pip.snapshot_image(), settings.pip());
        }

        let zoom = settings.zoom();
        if settings.crosshair() > 0 {
            // The length shrinks with zoom but is floored at 1, so an
            // enabled crosshair never degenerates below a 3x3 plus.
            apply_crosshair(&mut scratch, (settings.crosshair() / zoom).max(1));
        }

        let (x, y, w, h) = zoom_crop(scratch.width(), scratch.height(), zoom);
        let cropped = imageops::crop_imm(&scratch, x, y, w, h).to_image();
        let stretched = imageops::resize(&cropped, dest_w, dest_h, FilterType::Triangle);
        surface.present(stretched.as_raw(), dest_w, dest_h);
    }
}

/// Source crop rectangle `(x, y, width, height)` for a zoom factor: the
/// full frame at zoom 1, otherwise the centered rectangle of 1/zoom the
/// width and height.
pub fn zoom_crop(width: u32, height: u32, zoom: u32) -> (u32, u32, u32, u32) {
    let zoom = zoom.max(1);
    if zoom == 1 {
        return (0, 0, width, height);
    }
    // A zoom beyond the frame size still leaves a one-pixel crop.
    let w = (width / zoom).max(1);
    let h = (height / zoom).max(1);
    ((width - w) / 2, (height - h) / 2, w, h)
}

/// Resolve the configured placement against the current dimensions of the
/// primary and PiP frames. Returns `(left, top, width, height)`.
pub(crate) fn resolve_pip_rect(
    primary: (u32, u32),
    pip: (u32, u32),
    placement: PipPlacement,
) -> (i64, i64, u32, u32) {
    let (primary_w, primary_h) = primary;
    let (pip_w, pip_h) = pip;

    let (w, h) = if placement.width <= 0 {
        (pip_w, pip_h)
    } else {
        // Height follows from the PiP's own aspect ratio.
        let w = placement.width as u32;
        (w, (w as u64 * pip_h as u64 / pip_w as u64) as u32)
    };

    let left = if placement.left < 0 {
        (i64::from(primary_w) - i64::from(w)) / 2
    } else {
        i64::from(placement.left)
    };
    let top = if placement.top < 0 {
        (i64::from(primary_h) - i64::from(h)) / 2
    } else {
        i64::from(placement.top)
    };

    (left, top, w, h)
}

/// Resample the PiP image to its resolved rectangle and lay it over the
/// scratch primary.
fn overlay_pip(primary: &mut RgbImage, pip: &RgbImage, placement: PipPlacement) {
    if pip.width() == 0 || pip.height() == 0 {
        return;
    }
    let (left, top, w, h) = resolve_pip_rect(
        (primary.width(), primary.height()),
        (pip.width(), pip.height()),
        placement,
    );
    if w == 0 || h == 0 {
        return;
    }
    let scaled = imageops::resize(pip, w, h, FilterType::Triangle);
    imageops::overlay(primary, &scaled, left, top);
}

/// Brighten one channel value, clamping at white instead of wrapping.
pub(crate) fn brighten(channel: u8, gain: u8) -> u8 {
    channel.saturating_add(gain)
}

/// Additively brighten a plus shape centered on the frame. `len` is the
/// arm half-length in pixels, already scaled for zoom; the arm
/// half-thickness is a fixed proportion of the length, at least one pixel.
/// The smallest rendering is therefore a 3x3 plus at `len == 1`.
fn apply_crosshair(image: &mut RgbImage, len: u32) {
    let len = i64::from(len);
    let arm = (len / 8).max(1);
    let width = i64::from(image.width());
    let height = i64::from(image.height());
    let cx = width / 2;
    let cy = height / 2;

    let mut bump = |x: i64, y: i64| {
        if x < 0 || y < 0 || x >= width || y >= height {
            return;
        }
        let pixel = image.get_pixel_mut(x as u32, y as u32);
        for channel in pixel.0.iter_mut() {
            *channel = brighten(*channel, CROSSHAIR_GAIN);
        }
    };

    // Horizontal bar.
    for x in -len..=len {
        for y in -arm..=arm {
            bump(cx + x, cy + y);
        }
    }
    // Vertical arms above and below the bar, excluding the overlap so no
    // pixel is brightened twice.
    for y in -len..-arm {
        for x in -arm..=arm {
            bump(cx + x, cy + y);
        }
    }
    for y in (arm + 1)..=len {
        for x in -arm..=arm {
            bump(cx + x, cy + y);
        }
    }
}
