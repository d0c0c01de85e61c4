//! Shared render and overlay configuration.
//!
//! Written only by the UI-affine thread and read by the same thread during
//! a draw, so no locking is applied.

use serde::{Deserialize, Serialize};

/// Placement of the picture-in-picture inset.
///
/// Unset values are resolved against the current frame dimensions at draw
/// time, not at configuration time, so a PiP stream whose aspect ratio
/// changes the effective inset height still centers correctly:
/// a non-positive `width` falls back to the PiP's natural width, and
/// negative `top`/`left` offsets mean "center on the primary frame".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipPlacement {
    /// Inset width in primary-frame pixels; <=0 = PiP natural width.
    pub width: i32,
    /// Top offset in primary-frame pixels; <0 = vertically centered.
    pub top: i32,
    /// Left offset in primary-frame pixels; <0 = horizontally centered.
    pub left: i32,
}

impl Default for PipPlacement {
    fn default() -> Self {
        Self {
            width: 0,
            top: 0,
            left: 0,
        }
    }
}

/// Overlay configuration shared by every draw.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderSettings {
    zoom: u32,
    crosshair: u32,
    pip: PipPlacement,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            zoom: 1,
            crosshair: 0,
            pip: PipPlacement::default(),
        }
    }
}

impl RenderSettings {
    /// Integer zoom factor, always >=1.
    pub fn zoom(&self) -> u32 {
        self.zoom
    }

    /// Set the zoom factor; values below 1 are clamped to 1.
    pub fn set_zoom(&mut self, zoom: i32) {
        self.zoom = zoom.max(1) as u32;
    }

    /// Crosshair arm half-length in pixels; 0 disables the crosshair.
    pub fn crosshair(&self) -> u32 {
        self.crosshair
    }

    /// Set the crosshair length; negative values disable it.
    pub fn set_crosshair(&mut self, length: i32) {
        self.crosshair = length.max(0) as u32;
    }

    /// Current PiP placement.
    pub fn pip(&self) -> PipPlacement {
        self.pip
    }

    /// Set the PiP placement (see [`PipPlacement`] for the auto values).
    pub fn set_pip(&mut self, width: i32, top: i32, left: i32) {
        self.pip = PipPlacement { width, top, left };
    }
}
