// THEORY:
// The `tracker` module is the Position Estimator. It turns a noisy, per-frame
// detection of where the user's face is into a stable screen offset that tells the
// renderer where to draw the avatar. It adds "memory" to a stream of stateless
// detections, the same way an object tracker gives blobs object permanence.
//
// Two detection sources share one output contract (`update -> Offset`):
// 1.  **Centroid Heuristic (stateful)**: The skin-tone scan gives a centroid and a
//     support count, in camera pixels, with no notion of where "center" is.
//     - *Calibration*: the first `calibration_frames` valid detections are assumed
//       to be the user sitting centered. Each one overwrites the base point and
//       reports zero offset.
//     - *Tracking*: afterwards the offset is the displacement from the base,
//       multiplied by a fixed gain, with X negated so the avatar mirrors the user.
//     - *Deadzone*: components strictly inside `(-deadzone, deadzone)` snap to zero.
//     - *Loss*: a frame with too little support is not an error. The last offset
//       decays geometrically toward zero, giving a smooth glide back to center.
// 2.  **Bounding Box (stateless)**: An AI detector already knows the face box. Its
//     center is taken relative to the camera frame center, mirrored on X and scaled
//     to screen pixels. No calibration, deadzone or decay applies.
//
// The estimator never clamps. Keeping the face fully on screen is the frame
// pipeline's job, since only it knows the face radius in use.

use crate::config::TrackingConfig;
use crate::core_modules::emotion::DetectedEmotion;
use tracing::{debug, info};

/// One frame's worth of raw detection, consumed once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectionSample {
    /// Centroid of a color-heuristic blob, in camera pixels.
    Centroid { x: i32, y: i32, support: u32 },
    /// Face box from an AI detector, in camera pixels, plus its expression reading.
    BoundingBox {
        left: i32,
        top: i32,
        right: i32,
        bottom: i32,
        emotion: DetectedEmotion,
        /// Classifier confidence, 0-100.
        confidence: u8,
    },
}

impl DetectionSample {
    /// The expression reading carried by the sample, if any.
    pub fn emotion(&self) -> Option<(DetectedEmotion, u8)> {
        match *self {
            DetectionSample::BoundingBox { emotion, confidence, .. } => Some((emotion, confidence)),
            DetectionSample::Centroid { .. } => None,
        }
    }
}

/// Displacement of the avatar from screen center, in screen pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Offset {
    pub x: i32,
    pub y: i32,
}

impl Offset {
    pub const ZERO: Offset = Offset { x: 0, y: 0 };

    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Scales both components by `factor`, truncating toward zero.
    pub fn decayed(self, factor: f32) -> Self {
        Offset {
            x: (self.x as f32 * factor) as i32,
            y: (self.y as f32 * factor) as i32,
        }
    }

    pub fn is_zero(&self) -> bool {
        *self == Offset::ZERO
    }
}

/// Snaps values strictly inside `(-threshold, threshold)` to zero.
pub fn apply_deadzone(value: i32, threshold: i32) -> i32 {
    if value > -threshold && value < threshold {
        0
    } else {
        value
    }
}

/// Offset of a face box's center from the camera center, mirrored and scaled to
/// the screen. A box with no area reads as centered.
pub fn box_offset(
    (left, top, right, bottom): (i32, i32, i32, i32),
    (camera_w, camera_h): (u32, u32),
    (screen_w, screen_h): (u32, u32),
) -> Offset {
    if right <= left || bottom <= top || camera_w == 0 || camera_h == 0 {
        return Offset::ZERO;
    }
    let center_x = (left as i64 + right as i64) / 2;
    let center_y = (top as i64 + bottom as i64) / 2;
    let dx = -(center_x - camera_w as i64 / 2);
    let dy = center_y - camera_h as i64 / 2;
    Offset {
        x: saturate(dx.saturating_mul(screen_w as i64) / camera_w as i64),
        y: saturate(dy.saturating_mul(screen_h as i64) / camera_h as i64),
    }
}

fn saturate(value: i64) -> i32 {
    value.clamp(i32::MIN as i64, i32::MAX as i64) as i32
}

/// Mutable state of the centroid strategy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrackState {
    /// Camera-space point taken as "user is centered".
    pub base_x: i32,
    pub base_y: i32,
    /// Valid detections consumed by calibration so far.
    pub calibration_frames: u32,
    /// The most recently reported offset.
    pub last: Offset,
    /// Consecutive frames without a valid detection.
    pub frames_since_seen: u32,
}

pub struct PositionEstimator {
    config: TrackingConfig,
    screen: (u32, u32),
    state: TrackState,
}

impl PositionEstimator {
    pub fn new(config: TrackingConfig, screen_width: u32, screen_height: u32) -> Self {
        Self {
            config,
            screen: (screen_width, screen_height),
            state: TrackState::default(),
        }
    }

    pub fn state(&self) -> &TrackState {
        &self.state
    }

    pub fn is_calibrated(&self) -> bool {
        self.state.calibration_frames >= self.config.calibration_frames
    }

    /// Consumes one frame's detection and returns the avatar offset for it.
    pub fn update(&mut self, sample: &DetectionSample) -> Offset {
        match *sample {
            DetectionSample::Centroid { x, y, support } => {
                if support < self.config.min_support {
                    self.lost()
                } else {
                    self.track_centroid(x, y)
                }
            }
            DetectionSample::BoundingBox { left, top, right, bottom, .. } => {
                let offset = box_offset(
                    (left, top, right, bottom),
                    (self.config.camera_width, self.config.camera_height),
                    self.screen,
                );
                self.state.frames_since_seen = 0;
                self.state.last = offset;
                offset
            }
        }
    }

    /// Adopts the offset the display drifted to while no estimates were published,
    /// so the next loss keeps decaying from where the face actually is.
    pub fn resume_from(&mut self, shown: Offset) {
        self.state.last = shown;
    }

    /// Records a frame with no usable detection: the last offset decays toward zero.
    pub fn lost(&mut self) -> Offset {
        if self.state.frames_since_seen == 0 && self.state.calibration_frames > 0 {
            debug!("tracking lost, decaying toward center");
        }
        self.state.frames_since_seen = self.state.frames_since_seen.saturating_add(1);
        self.state.last = self.state.last.decayed(self.config.decay_factor);
        self.state.last
    }

    fn track_centroid(&mut self, x: i32, y: i32) -> Offset {
        self.state.frames_since_seen = 0;

        // --- 1. Calibration ---
        if self.state.calibration_frames < self.config.calibration_frames {
            self.state.base_x = x;
            self.state.base_y = y;
            self.state.calibration_frames += 1;
            if self.is_calibrated() {
                info!(base_x = x, base_y = y, "tracking calibrated");
            }
            self.state.last = Offset::ZERO;
            return Offset::ZERO;
        }

        // --- 2. Relative, mirrored movement ---
        let gain = self.config.gain as i64;
        let dx = saturate((self.state.base_x as i64 - x as i64).saturating_mul(gain));
        let dy = saturate((y as i64 - self.state.base_y as i64).saturating_mul(gain));

        // --- 3. Deadzone ---
        let offset = Offset {
            x: apply_deadzone(dx, self.config.deadzone),
            y: apply_deadzone(dy, self.config.deadzone),
        };

        self.state.last = offset;
        offset
    }
}
