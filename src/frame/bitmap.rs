//! Self-describing bitmap snapshot encoding.
//!
//! An exported snapshot is a device-independent bitmap: a 40-byte
//! little-endian info header followed by the bottom-up, 4-byte-padded
//! 24-bit pixel rows. Ownership of the returned bytes transfers to the
//! caller.

use bytemuck::{Pod, Zeroable};

use crate::error::{PlayerError, Result};

/// Uncompressed RGB, the only compression mode this crate emits.
pub const BI_RGB: u32 = 0;

/// Size of the encoded header in bytes.
pub(crate) const HEADER_BYTES: usize = std::mem::size_of::<BitmapInfoHeader>();

/// BITMAPINFOHEADER-layout header describing the pixel block that follows.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Pod, Zeroable)]
pub struct BitmapInfoHeader {
    pub size: u32,
    pub width: i32,
    pub height: i32,
    pub planes: u16,
    pub bit_count: u16,
    pub compression: u32,
    pub size_image: u32,
    pub x_pels_per_meter: i32,
    pub y_pels_per_meter: i32,
    pub clr_used: u32,
    pub clr_important: u32,
}

impl BitmapInfoHeader {
    /// Header for a bottom-up, uncompressed 24-bit image.
    pub fn new(width: u32, height: u32, size_image: usize) -> Self {
        Self {
            size: HEADER_BYTES as u32,
            width: width as i32,
            // Positive height marks bottom-up row order.
            height: height as i32,
            planes: 1,
            bit_count: 24,
            compression: BI_RGB,
            size_image: size_image as u32,
            x_pels_per_meter: 0,
            y_pels_per_meter: 0,
            clr_used: 0,
            clr_important: 0,
        }
    }
}

/// Encode header + pixel bytes into one owned buffer.
///
/// `pixels` must already be in the stored format: bottom-up rows padded to
/// a 4-byte boundary.
pub(crate) fn encode(width: u32, height: u32, pixels: &[u8]) -> Result<Vec<u8>> {
    let header = BitmapInfoHeader::new(width, height, pixels.len());
    let mut out = Vec::new();
    out.try_reserve_exact(HEADER_BYTES + pixels.len())
        .map_err(|_| PlayerError::Allocation)?;
    out.extend_from_slice(bytemuck::bytes_of(&header));
    out.extend_from_slice(pixels);
    Ok(out)
}
