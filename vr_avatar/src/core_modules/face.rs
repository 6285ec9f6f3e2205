// THEORY:
// The `face` module is the Face Compositor. It takes one row of the expression
// table, a center point and a radius, and paints a complete face with the
// rasterizer using the painter's algorithm: each layer simply overwrites what is
// beneath it, in a fixed order (face disc, eyes, eyebrows, mouth).
//
// Key architectural principles:
// 1.  **One Scale Parameter**: Every base size is a fraction of `radius`. Eyes sit
//     a third of the radius from center and a quarter above it, are an eighth of
//     the radius wide, and so on. The expression table only nudges these, so the
//     same table works at any size.
// 2.  **Layout is Pure**: `FaceLayout::compute` does all the arithmetic without
//     touching pixels, which keeps invariants like the minimum eye height testable
//     on their own.
// 3.  **Two Entry Points**: `draw_centered` clears the whole screen and draws a
//     large face in the middle. `draw_at` draws at an arbitrary point and only
//     erases the region this buffer's previous face covered, so whatever else is on
//     screen survives.

use crate::core_modules::emotion::FaceParams;
use crate::core_modules::frame_buffer::{FrameBuffer, Rect};
use crate::core_modules::raster::{self, Side, EYEBROW_THICKNESS};

/// Eyes are never drawn shorter than this, however hard the expression squints.
pub const MIN_EYE_HEIGHT: i32 = 3;

/// Vertical radius of an eye after squint, floored at `MIN_EYE_HEIGHT`.
pub fn eye_height(radius: i32, squint: i32) -> i32 {
    (radius / 8 - squint).max(MIN_EYE_HEIGHT)
}

/// Derived positions and sizes of every facial feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FaceLayout {
    pub cx: i32,
    pub cy: i32,
    pub radius: i32,
    /// Horizontal distance from center to each eye and eyebrow.
    pub eye_dx: i32,
    pub eye_y: i32,
    pub eye_rx: i32,
    pub eye_ry: i32,
    pub eyebrow_y: i32,
    pub eyebrow_length: i32,
    pub mouth_y: i32,
    pub mouth_width: i32,
}

impl FaceLayout {
    pub fn compute(cx: i32, cy: i32, radius: i32, params: &FaceParams) -> Self {
        let eye_rx = radius / 8;
        let eye_rise = radius / 4 + params.eye_offset_y as i32;
        let eye_y = cy - eye_rise;

        Self {
            cx,
            cy,
            radius,
            eye_dx: radius / 3 + params.eye_offset_x as i32,
            eye_y,
            eye_rx,
            eye_ry: eye_height(radius, params.eye_squint as i32),
            eyebrow_y: eye_y - eye_rx - params.eyebrow_offset_y as i32,
            eyebrow_length: radius / 3,
            mouth_y: cy + radius / 3 + params.mouth_offset_y as i32,
            mouth_width: radius / 2,
        }
    }

    /// Smallest rectangle containing every pixel the face can touch.
    pub fn bounds(&self, params: &FaceParams) -> Rect {
        let mut bounds = Rect::centered(self.cx, self.cy, self.radius, self.radius);

        for side in [-1, 1] {
            let x = self.cx + side * self.eye_dx;
            bounds = bounds.union(&Rect::centered(x, self.eye_y, self.eye_rx, self.eye_ry));

            let brow_reach = (params.eyebrow_angle as i32).abs() + EYEBROW_THICKNESS / 2;
            bounds = bounds.union(&Rect::centered(
                x,
                self.eyebrow_y,
                self.eyebrow_length / 2,
                brow_reach,
            ));
        }

        let curve = params.mouth_curve as i32;
        let half_height = (params.mouth_height as i32).max(0) / 2;
        let top = self.mouth_y + curve.min(0) - half_height;
        let bottom = self.mouth_y + curve.max(0) + half_height;
        let half_width = self.mouth_width / 2;
        bounds.union(&Rect {
            x: self.cx - half_width,
            y: top,
            width: (half_width * 2 + 1).max(1) as u32,
            height: (bottom - top + 1).max(1) as u32,
        })
    }
}

/// Paints a face at `(cx, cy)` without touching the rest of the buffer.
///
/// Returns the area the face may have covered, or `None` for a non-positive radius.
pub fn draw_face(
    fb: &mut FrameBuffer,
    cx: i32,
    cy: i32,
    radius: i32,
    params: &FaceParams,
) -> Option<Rect> {
    if radius <= 0 || fb.is_empty() {
        return None;
    }
    let layout = FaceLayout::compute(cx, cy, radius, params);

    // --- 1. Face ---
    raster::fill_circle(fb, cx, cy, radius, params.face_color);

    // --- 2. Eyes ---
    for x in [cx - layout.eye_dx, cx + layout.eye_dx] {
        raster::fill_ellipse(fb, x, layout.eye_y, layout.eye_rx, layout.eye_ry, params.eye_color);
    }

    // --- 3. Eyebrows ---
    for (x, side) in [(cx - layout.eye_dx, Side::Left), (cx + layout.eye_dx, Side::Right)] {
        raster::draw_eyebrow(
            fb,
            x,
            layout.eyebrow_y,
            layout.eyebrow_length,
            params.eyebrow_angle as i32,
            side,
            params.eyebrow_color,
        );
    }

    // --- 4. Mouth ---
    raster::draw_mouth(
        fb,
        cx,
        layout.mouth_y,
        layout.mouth_width,
        params.mouth_height as i32,
        params.mouth_curve as i32,
        params.mouth_color,
    );

    Some(layout.bounds(params))
}

/// Radius of the full-screen face: a third of the shorter screen side.
pub fn centered_radius(width: u32, height: u32) -> i32 {
    (width.min(height) / 3) as i32
}

/// Clears the whole buffer to the background color and draws a large centered face.
pub fn draw_centered(fb: &mut FrameBuffer, params: &FaceParams) -> Option<Rect> {
    fb.fill(params.bg_color);
    let (w, h) = (fb.width(), fb.height());
    let drawn = draw_face(fb, (w / 2) as i32, (h / 2) as i32, centered_radius(w, h), params);
    fb.set_damage(drawn);
    drawn
}

/// Draws a face at an arbitrary point, erasing only this buffer's previous face.
pub fn draw_at(
    fb: &mut FrameBuffer,
    cx: i32,
    cy: i32,
    radius: i32,
    params: &FaceParams,
) -> Option<Rect> {
    if let Some(previous) = fb.take_damage() {
        fb.fill_rect(previous, params.bg_color);
    }
    let drawn = draw_face(fb, cx, cy, radius, params);
    fb.set_damage(drawn);
    drawn
}
