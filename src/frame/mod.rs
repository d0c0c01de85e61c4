//! Decoded-frame storage and snapshot export.

mod bitmap;
mod buffer;

pub use bitmap::BitmapInfoHeader;
pub use buffer::FrameBuffer;
