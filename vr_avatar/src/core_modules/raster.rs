// THEORY:
// The `raster` module turns the four geometric primitives a face is built from
// into pixels. Each primitive is a pure scanning loop over its own bounding box
// that tests an implicit equation and writes through `FrameBuffer::put_pixel`.
//
// Key principles:
// 1.  **Stateless Utility**: No primitive remembers anything. Same inputs, same pixels.
// 2.  **Clipping is Free**: Off-screen pixels are discarded by the buffer on both
//     bounds, so a face can be partly off-screen without special cases here.
// 3.  **Never Fail**: Degenerate geometry (negative radii, zero widths) draws
//     nothing or falls back to a flat stroke. Divisions that could hit zero are
//     guarded. A bad parameter costs one feature of one frame, never the frame.
//
// All products are carried in `i64` so large radii cannot overflow the ellipse test.

use crate::core_modules::frame_buffer::FrameBuffer;
use crate::core_modules::pixel::pixel::Rgb565;

/// Vertical thickness of an eyebrow stroke in pixels.
pub const EYEBROW_THICKNESS: i32 = 3;

/// Which side of the face an eyebrow sits on. Mirrors the slope of the stroke.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
}

impl Side {
    pub fn sign(self) -> i64 {
        match self {
            Side::Left => -1,
            Side::Right => 1,
        }
    }
}

/// Sets every pixel with `dx² + dy² <= r²`.
pub fn fill_circle(fb: &mut FrameBuffer, cx: i32, cy: i32, r: i32, color: Rgb565) {
    if r < 0 || fb.is_empty() {
        return;
    }
    let r_sq = r as i64 * r as i64;
    for dy in -r..=r {
        for dx in -r..=r {
            if (dx as i64 * dx as i64) + (dy as i64 * dy as i64) <= r_sq {
                fb.put_pixel(cx + dx, cy + dy, color);
            }
        }
    }
}

/// Sets every pixel with `dx²·ry² + dy²·rx² <= rx²·ry²`.
pub fn fill_ellipse(fb: &mut FrameBuffer, cx: i32, cy: i32, rx: i32, ry: i32, color: Rgb565) {
    if rx < 0 || ry < 0 || fb.is_empty() {
        return;
    }
    let rx_sq = rx as i64 * rx as i64;
    let ry_sq = ry as i64 * ry as i64;
    let limit = rx_sq * ry_sq;
    for dy in -ry..=ry {
        for dx in -rx..=rx {
            let dx = dx as i64;
            let dy_l = dy as i64;
            if dx * dx * ry_sq + dy_l * dy_l * rx_sq <= limit {
                fb.put_pixel(cx + dx as i32, cy + dy, color);
            }
        }
    }
}

/// Vertical displacement of the mouth curve at column `x`.
///
/// A parabola through the center: zero at `x = 0` and `curve` at both corners.
/// Negative curves lift the corners (smile), positive curves drop them (frown).
pub fn mouth_curve_offset(x: i32, half_width: i32, curve: i32) -> i32 {
    if curve == 0 || half_width == 0 {
        return 0;
    }
    let x = x as i64;
    let hw = half_width as i64;
    ((curve as i64 * x * x) / (hw * hw)) as i32
}

/// Draws a curved mouth as vertical segments of `height` pixels following the parabola.
pub fn draw_mouth(
    fb: &mut FrameBuffer,
    cx: i32,
    cy: i32,
    width: i32,
    height: i32,
    curve: i32,
    color: Rgb565,
) {
    if width <= 0 || height <= 0 || fb.is_empty() {
        return;
    }
    let half_width = width / 2;
    let top_from_center = height / 2;

    for x in -half_width..=half_width {
        let px = cx + x;
        let py = cy + mouth_curve_offset(x, half_width, curve);
        let top = py - top_from_center;
        for row in 0..height {
            fb.put_pixel(px, top + row, color);
        }
    }
}

/// Vertical displacement of an eyebrow at offset `i` from its center.
pub fn eyebrow_offset(i: i32, half_len: i32, angle: i32, side: Side) -> i32 {
    if half_len == 0 {
        return 0;
    }
    ((angle as i64 * i as i64 * side.sign()) / half_len as i64) as i32
}

/// Draws a straight, sloped eyebrow stroke `EYEBROW_THICKNESS` pixels tall.
pub fn draw_eyebrow(
    fb: &mut FrameBuffer,
    cx: i32,
    cy: i32,
    length: i32,
    angle: i32,
    side: Side,
    color: Rgb565,
) {
    if length <= 0 || fb.is_empty() {
        return;
    }
    let half_len = length / 2;
    let reach = EYEBROW_THICKNESS / 2;

    for i in -half_len..=half_len {
        let px = cx + i;
        let py = cy + eyebrow_offset(i, half_len, angle, side);
        for dy in -reach..=reach {
            fb.put_pixel(px, py + dy, color);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_modules::pixel::pixel::PixelFormat;

    fn canvas(w: u32, h: u32) -> FrameBuffer {
        FrameBuffer::try_new(w, h, PixelFormat::Rgb565).unwrap()
    }

    fn painted(fb: &FrameBuffer, color: Rgb565) -> usize {
        fb.pixels().iter().filter(|w| **w == color.raw()).count()
    }

    #[test]
    fn circle_edge_is_inclusive() {
        for r in 1..12 {
            let mut fb = canvas(64, 64);
            fill_circle(&mut fb, 0, 0, r, Rgb565::WHITE);
            assert_eq!(fb.get_pixel(r, 0), Some(Rgb565::WHITE), "r = {r}");
            assert_eq!(fb.get_pixel(r + 1, 0), Some(Rgb565::BLACK), "r = {r}");
            assert_eq!(fb.get_pixel(0, r), Some(Rgb565::WHITE), "r = {r}");
        }
    }

    #[test]
    fn circle_near_far_edge_does_not_wrap() {
        let mut fb = canvas(10, 10);
        fill_circle(&mut fb, 9, 5, 3, Rgb565::WHITE);
        // Writes past the right edge must not bleed into the next row's left edge.
        assert_eq!(fb.get_pixel(0, 5), Some(Rgb565::BLACK));
        assert_eq!(fb.get_pixel(0, 6), Some(Rgb565::BLACK));
        assert_eq!(fb.get_pixel(9, 5), Some(Rgb565::WHITE));
    }

    #[test]
    fn ellipse_respects_independent_radii() {
        let mut fb = canvas(40, 40);
        fill_ellipse(&mut fb, 20, 20, 8, 3, Rgb565::WHITE);
        assert_eq!(fb.get_pixel(28, 20), Some(Rgb565::WHITE));
        assert_eq!(fb.get_pixel(29, 20), Some(Rgb565::BLACK));
        assert_eq!(fb.get_pixel(20, 23), Some(Rgb565::WHITE));
        assert_eq!(fb.get_pixel(20, 24), Some(Rgb565::BLACK));
    }

    #[test]
    fn negative_radius_draws_nothing() {
        let mut fb = canvas(10, 10);
        fill_circle(&mut fb, 5, 5, -2, Rgb565::WHITE);
        fill_ellipse(&mut fb, 5, 5, 3, -1, Rgb565::WHITE);
        assert_eq!(painted(&fb, Rgb565::WHITE), 0);
    }

    #[test]
    fn mouth_curve_sign_lifts_or_drops_corners() {
        assert_eq!(mouth_curve_offset(0, 20, -20), 0);
        assert_eq!(mouth_curve_offset(20, 20, -20), -20);
        assert_eq!(mouth_curve_offset(-20, 20, 15), 15);
        assert_eq!(mouth_curve_offset(10, 20, 20), 5);
    }

    #[test]
    fn flat_mouth_is_a_centered_bar() {
        let mut fb = canvas(40, 40);
        draw_mouth(&mut fb, 20, 20, 10, 5, 0, Rgb565::WHITE);
        assert_eq!(painted(&fb, Rgb565::WHITE), 11 * 5);
        assert_eq!(fb.get_pixel(20, 18), Some(Rgb565::WHITE));
        assert_eq!(fb.get_pixel(20, 22), Some(Rgb565::WHITE));
        assert_eq!(fb.get_pixel(20, 23), Some(Rgb565::BLACK));
        assert_eq!(fb.get_pixel(20, 17), Some(Rgb565::BLACK));
    }

    #[test]
    fn degenerate_mouth_is_skipped_or_guarded() {
        let mut fb = canvas(20, 20);
        draw_mouth(&mut fb, 10, 10, 0, 5, 10, Rgb565::WHITE);
        draw_mouth(&mut fb, 10, 10, 8, 0, 10, Rgb565::WHITE);
        assert_eq!(painted(&fb, Rgb565::WHITE), 0);

        // width 1 gives a zero half width; the curve divisor is guarded.
        draw_mouth(&mut fb, 10, 10, 1, 3, 10, Rgb565::WHITE);
        assert_eq!(painted(&fb, Rgb565::WHITE), 3);
    }

    #[test]
    fn eyebrows_mirror_by_side() {
        assert_eq!(eyebrow_offset(10, 10, 20, Side::Right), 20);
        assert_eq!(eyebrow_offset(10, 10, 20, Side::Left), -20);
        assert_eq!(eyebrow_offset(-5, 10, 20, Side::Left), 10);
        assert_eq!(eyebrow_offset(4, 0, 20, Side::Left), 0);
    }

    #[test]
    fn eyebrow_stroke_is_three_pixels_thick() {
        let mut fb = canvas(40, 40);
        draw_eyebrow(&mut fb, 20, 20, 10, 0, Side::Left, Rgb565::WHITE);
        assert_eq!(painted(&fb, Rgb565::WHITE), 11 * 3);
        assert_eq!(fb.get_pixel(15, 19), Some(Rgb565::WHITE));
        assert_eq!(fb.get_pixel(15, 21), Some(Rgb565::WHITE));
        assert_eq!(fb.get_pixel(15, 22), Some(Rgb565::BLACK));
    }
}
