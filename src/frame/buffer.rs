//! Fixed-size pixel buffer shared between a decode loop and the renderer.

use std::sync::Mutex;

use image::RgbImage;

use crate::error::{PlayerError, Result};
use crate::frame::bitmap;
use crate::source::Picture;

/// Round a row of 24-bit pixels up to a 4-byte boundary.
pub(crate) fn padded_row_bytes(width: u32) -> usize {
    (width as usize * 3 + 3) & !3
}

/// One decoded image, safe for concurrent update and concurrent read.
///
/// Dimensions are fixed at construction from the first decoded picture and
/// the pixel storage is never reallocated: every update replaces the whole
/// content in place. Rows are stored bottom-up and padded to a 4-byte
/// boundary; the padding is always zero.
///
/// There is exactly one writer (the owning decode loop) and any number of
/// readers (redraw, snapshot export); the internal mutex makes an update
/// and a read mutually exclusive, so a reader never observes a torn frame.
#[derive(Debug)]
pub struct FrameBuffer {
    width: u32,
    height: u32,
    row_bytes: usize,
    pixels: Mutex<Vec<u8>>,
}

impl FrameBuffer {
    /// Allocate the padded storage for the picture's dimensions and load
    /// its content. Fails only if the storage cannot be allocated.
    pub fn new(picture: &Picture) -> Result<Self> {
        let row_bytes = padded_row_bytes(picture.width);
        let len = row_bytes * picture.height as usize;

        let mut pixels = Vec::new();
        pixels
            .try_reserve_exact(len)
            .map_err(|_| PlayerError::Allocation)?;
        pixels.resize(len, 0);

        let buffer = Self {
            width: picture.width,
            height: picture.height,
            row_bytes,
            pixels: Mutex::new(pixels),
        };
        buffer.update(picture);
        Ok(buffer)
    }

    /// Width and height in pixels, fixed for the buffer's lifetime.
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Stored bytes per row, including the 4-byte-boundary padding.
    pub fn row_bytes(&self) -> usize {
        self.row_bytes
    }

    /// Replace the entire pixel content in place under the lock, flipping
    /// to bottom-up row order and zero-filling the row padding.
    ///
    /// The picture must have the buffer's fixed dimensions; the decode
    /// session contract guarantees dimensional stability, and a source
    /// that changes resolution must start a new session.
    pub fn update(&self, picture: &Picture) {
        debug_assert_eq!(
            (picture.width, picture.height),
            (self.width, self.height),
            "picture dimensions must stay fixed for the session"
        );

        let mut pixels = self.pixels.lock().unwrap();
        let line = self.width as usize * 3;
        let height = self.height as usize;
        for y in 0..height {
            let dst = &mut pixels[(height - 1 - y) * self.row_bytes..][..self.row_bytes];
            dst[..line].copy_from_slice(picture.row(y as u32));
            dst[line..].fill(0);
        }
    }

    /// Copy the current content into a top-down scratch image under the
    /// lock. The storage-format artifacts (vertical flip, row padding)
    /// are stripped; this is the compositor's working representation.
    pub fn snapshot_image(&self) -> RgbImage {
        let pixels = self.pixels.lock().unwrap();
        let line = self.width as usize * 3;
        let height = self.height as usize;

        let mut raw = Vec::with_capacity(line * height);
        for y in 0..height {
            raw.extend_from_slice(&pixels[(height - 1 - y) * self.row_bytes..][..line]);
        }
        drop(pixels);

        RgbImage::from_raw(self.width, self.height, raw)
            .expect("raw length matches buffer dimensions")
    }

    /// Export the current frame as a self-describing bottom-up 24-bit
    /// bitmap (header + padded pixel bytes), copied under the lock.
    ///
    /// Always unzoomed and undecorated: draw-time compositing happens in
    /// a scratch image, never in this storage.
    pub fn to_bitmap(&self) -> Result<Vec<u8>> {
        let pixels = self.pixels.lock().unwrap();
        bitmap::encode(self.width, self.height, &pixels)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use super::*;
    use crate::source::testing::solid_picture;

    /// Picture with a distinct byte value per pixel component.
    fn sequential_picture(width: u32, height: u32) -> Picture {
        let data: Vec<u8> = (0..width as usize * 3 * height as usize)
            .map(|i| i as u8)
            .collect();
        Picture::from_rgb(width, height, data)
    }

    #[test]
    fn test_padded_row_bytes() {
        assert_eq!(padded_row_bytes(4), 12); // already aligned
        assert_eq!(padded_row_bytes(5), 16); // 15 -> 16
        assert_eq!(padded_row_bytes(640), 1920);
    }

    #[test]
    fn test_update_snapshot_round_trip() {
        // Width 5 forces row padding (15 -> 16 bytes).
        let picture = sequential_picture(5, 3);
        let buffer = FrameBuffer::new(&picture).unwrap();

        let image = buffer.snapshot_image();
        assert_eq!((image.width(), image.height()), (5, 3));
        for y in 0..3u32 {
            for x in 0..5u32 {
                let expected = &picture.row(y)[x as usize * 3..][..3];
                assert_eq!(&image.get_pixel(x, y).0[..], expected, "pixel ({x},{y})");
            }
        }

        // A second update fully replaces the content.
        let replacement = solid_picture(5, 3, [9, 8, 7]);
        buffer.update(&replacement);
        for pixel in buffer.snapshot_image().pixels() {
            assert_eq!(pixel.0, [9, 8, 7]);
        }
    }

    #[test]
    fn test_bitmap_is_bottom_up_and_padded() {
        let picture = sequential_picture(5, 3);
        let buffer = FrameBuffer::new(&picture).unwrap();

        let bmp = buffer.to_bitmap().unwrap();
        assert_eq!(bmp.len(), 40 + 16 * 3);

        // First stored row is the picture's last row; padding is zeroed.
        let first_row = &bmp[40..40 + 16];
        assert_eq!(&first_row[..15], picture.row(2));
        assert_eq!(&first_row[15..], &[0]);
    }

    #[test]
    fn test_concurrent_update_and_read_never_tears() {
        let picture = solid_picture(64, 48, [0x11; 3]);
        let buffer = Arc::new(FrameBuffer::new(&picture).unwrap());

        let writer = {
            let buffer = Arc::clone(&buffer);
            thread::spawn(move || {
                for i in 0..200 {
                    let fill = if i % 2 == 0 { 0xEE } else { 0x11 };
                    buffer.update(&solid_picture(64, 48, [fill; 3]));
                }
            })
        };

        // Every observed frame must be uniform: all rows from the same
        // update, never a mix of the two fill values.
        for _ in 0..200 {
            let image = buffer.snapshot_image();
            let first = image.get_pixel(0, 0).0;
            assert!(image.pixels().all(|p| p.0 == first), "torn frame observed");
        }

        writer.join().unwrap();
    }
}
