// THEORY:
// The `FrameBuffer` is the canvas of the renderer: a flat, row-major block of
// 16-bit words exactly as the panel expects to receive them. It plays the role a
// `Chunk` plays in an analysis pipeline, a "dumb" data container that knows how to
// perform simple operations on its own data and nothing about what is drawn on it.
//
// Key architectural principles:
// 1.  **Fallible Allocation**: Allocation is the single hard failure of the whole
//     render path. `try_new` reserves the storage fallibly and reports
//     `AvatarError::BufferAllocation` instead of aborting the process.
// 2.  **Clipping at the Lowest Level**: Every write goes through `put_pixel`, which
//     silently discards coordinates outside `[0, width) x [0, height)` on both
//     bounds. Higher layers may therefore hand it any geometry they like.
// 3.  **Panel Byte Order**: Colors are encoded through the buffer's `PixelFormat`
//     when written, so a flush is a plain copy of `pixels()`.
// 4.  **Damage Memory**: A buffer remembers the rectangle of the last face drawn
//     into it. When the same buffer comes around again in tracking mode only that
//     region has to be erased, never the whole screen.

use crate::core_modules::pixel::pixel::{PixelFormat, RawWord, Rgb565};
use crate::error::{AvatarError, Result};

/// An axis-aligned rectangle in screen coordinates. May extend off-screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    /// The rectangle covering every pixel within `half_w`/`half_h` of a center point.
    pub fn centered(cx: i32, cy: i32, half_w: i32, half_h: i32) -> Self {
        let half_w = half_w.max(0);
        let half_h = half_h.max(0);
        Rect {
            x: cx - half_w,
            y: cy - half_h,
            width: (half_w * 2 + 1) as u32,
            height: (half_h * 2 + 1) as u32,
        }
    }

    pub fn right(&self) -> i32 {
        self.x + self.width as i32
    }

    pub fn bottom(&self) -> i32 {
        self.y + self.height as i32
    }

    pub fn union(&self, other: &Rect) -> Rect {
        let x = self.x.min(other.x);
        let y = self.y.min(other.y);
        Rect {
            x,
            y,
            width: (self.right().max(other.right()) - x) as u32,
            height: (self.bottom().max(other.bottom()) - y) as u32,
        }
    }
}

/// A pixel buffer in the panel's native format.
#[derive(Debug, Clone)]
pub struct FrameBuffer {
    /// Width in pixels.
    width: u32,
    /// Height in pixels.
    height: u32,
    /// Byte layout of every stored word.
    format: PixelFormat,
    /// Row-major pixel words, already encoded for the panel.
    pixels: Vec<RawWord>,
    /// Bounds of the face last composited into this buffer, if any.
    damage: Option<Rect>,
}

impl FrameBuffer {
    /// Allocates a buffer cleared to black.
    pub fn try_new(width: u32, height: u32, format: PixelFormat) -> Result<Self> {
        let failed = || AvatarError::BufferAllocation { width, height };
        let len = (width as usize)
            .checked_mul(height as usize)
            .ok_or_else(failed)?;

        let mut pixels = Vec::new();
        pixels.try_reserve_exact(len).map_err(|_| failed())?;
        pixels.resize(len, format.encode(Rgb565::BLACK));

        Ok(Self {
            width,
            height,
            format,
            pixels,
            damage: None,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }

    /// Size of the buffer as transferred to the panel.
    pub fn byte_len(&self) -> usize {
        self.pixels.len() * self.format.bytes_per_pixel()
    }

    /// Writes one pixel. Out-of-range coordinates are discarded.
    #[inline]
    pub fn put_pixel(&mut self, x: i32, y: i32, color: Rgb565) {
        if x < 0 || y < 0 || x >= self.width as i32 || y >= self.height as i32 {
            return;
        }
        let index = y as usize * self.width as usize + x as usize;
        self.pixels[index] = self.format.encode(color);
    }

    pub fn get_pixel(&self, x: i32, y: i32) -> Option<Rgb565> {
        if x < 0 || y < 0 || x >= self.width as i32 || y >= self.height as i32 {
            return None;
        }
        let index = y as usize * self.width as usize + x as usize;
        Some(self.format.decode(self.pixels[index]))
    }

    /// Paints the whole buffer and forgets any damage.
    pub fn fill(&mut self, color: Rgb565) {
        let word = self.format.encode(color);
        self.pixels.fill(word);
        self.damage = None;
    }

    /// Paints the on-screen part of `rect`.
    pub fn fill_rect(&mut self, rect: Rect, color: Rgb565) {
        let x0 = rect.x.max(0);
        let y0 = rect.y.max(0);
        let x1 = rect.right().min(self.width as i32);
        let y1 = rect.bottom().min(self.height as i32);
        if x0 >= x1 || y0 >= y1 {
            return;
        }

        let word = self.format.encode(color);
        let stride = self.width as usize;
        for y in y0..y1 {
            let row = y as usize * stride;
            self.pixels[row + x0 as usize..row + x1 as usize].fill(word);
        }
    }

    /// The stored words, in panel byte order.
    pub fn pixels(&self) -> &[RawWord] {
        &self.pixels
    }

    /// The buffer serialized the way it goes over the wire to the panel.
    pub fn to_panel_bytes(&self) -> Vec<u8> {
        self.pixels.iter().flat_map(|w| w.to_le_bytes()).collect()
    }

    /// Decodes the buffer into packed 8-bit RGB, three bytes per pixel.
    pub fn to_rgb888(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.pixels.len() * 3);
        for word in &self.pixels {
            let (r, g, b) = self.format.decode(*word).to_rgb888();
            out.extend_from_slice(&[r, g, b]);
        }
        out
    }

    pub fn damage(&self) -> Option<Rect> {
        self.damage
    }

    pub(crate) fn set_damage(&mut self, damage: Option<Rect>) {
        self.damage = damage;
    }

    pub(crate) fn take_damage(&mut self) -> Option<Rect> {
        self.damage.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_buffer_is_black() {
        let fb = FrameBuffer::try_new(4, 3, PixelFormat::Rgb565).unwrap();
        assert_eq!(fb.pixels().len(), 12);
        assert_eq!(fb.byte_len(), 24);
        assert!(fb.pixels().iter().all(|w| *w == 0));
    }

    #[test]
    fn put_pixel_clips_both_bounds() {
        let mut fb = FrameBuffer::try_new(4, 4, PixelFormat::Rgb565).unwrap();
        fb.put_pixel(-1, 0, Rgb565::WHITE);
        fb.put_pixel(0, -1, Rgb565::WHITE);
        fb.put_pixel(4, 0, Rgb565::WHITE);
        fb.put_pixel(0, 4, Rgb565::WHITE);
        assert!(fb.pixels().iter().all(|w| *w == 0));

        fb.put_pixel(3, 3, Rgb565::WHITE);
        assert_eq!(fb.get_pixel(3, 3), Some(Rgb565::WHITE));
        assert_eq!(fb.get_pixel(4, 3), None);
    }

    #[test]
    fn swapped_buffer_decodes_to_logical_color() {
        let mut fb = FrameBuffer::try_new(2, 1, PixelFormat::Rgb565Swapped).unwrap();
        fb.put_pixel(1, 0, Rgb565::YELLOW);
        assert_eq!(fb.pixels()[1], 0xE0FF);
        assert_eq!(fb.get_pixel(1, 0), Some(Rgb565::YELLOW));
        assert_eq!(&fb.to_rgb888()[3..6], &[255, 255, 0]);
    }

    #[test]
    fn fill_rect_clips_to_screen() {
        let mut fb = FrameBuffer::try_new(5, 5, PixelFormat::Rgb565).unwrap();
        fb.fill_rect(Rect::centered(0, 0, 1, 1), Rgb565::RED);
        assert_eq!(fb.get_pixel(0, 0), Some(Rgb565::RED));
        assert_eq!(fb.get_pixel(1, 1), Some(Rgb565::RED));
        assert_eq!(fb.get_pixel(2, 2), Some(Rgb565::BLACK));
        let painted = fb.pixels().iter().filter(|w| **w == Rgb565::RED.raw()).count();
        assert_eq!(painted, 4);
    }

    #[test]
    fn zero_sized_buffer_accepts_writes() {
        let mut fb = FrameBuffer::try_new(0, 0, PixelFormat::Rgb565).unwrap();
        fb.put_pixel(0, 0, Rgb565::WHITE);
        fb.fill(Rgb565::WHITE);
        fb.fill_rect(Rect::centered(0, 0, 3, 3), Rgb565::WHITE);
        assert!(fb.is_empty());
    }

    #[test]
    fn rect_union_covers_both() {
        let a = Rect::centered(10, 10, 2, 2);
        let b = Rect::centered(20, 5, 1, 1);
        let u = a.union(&b);
        assert_eq!((u.x, u.y), (8, 4));
        assert_eq!(u.right(), 22);
        assert_eq!(u.bottom(), 13);
    }
}
