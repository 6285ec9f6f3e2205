//! Configuration parsing and validation.
//!
//! Every tunable of the renderer lives here with the defaults the hardware build
//! shipped with: a 480x480 panel, 20 calibration frames, gain 4, a 10px deadzone
//! and a decay that halves the offset each frame.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::core_modules::pixel::pixel::PixelFormat;
use crate::error::{AvatarError, Result};

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AvatarConfig {
    pub display: DisplayConfig,
    pub face: FaceConfig,
    pub tracking: TrackingConfig,
    pub skin_tone: SkinToneConfig,
    pub render: RenderConfig,
}

impl AvatarConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path.as_ref())
            .map_err(|e| AvatarError::ConfigRead(format!("{}: {}", path.as_ref().display(), e)))?;
        Self::from_toml(&contents)
    }

    /// Parse configuration from a TOML string
    pub fn from_toml(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| AvatarError::ConfigParse(e.to_string()))
    }

    /// Margin kept between the face center and every screen edge in tracking mode.
    pub fn safe_margin(&self) -> u32 {
        self.face.safe_margin.unwrap_or(self.face.radius)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        let d = &self.display;
        if d.width == 0 || d.height == 0 {
            return Err(AvatarError::invalid(
                "display",
                format!("screen must be non-empty, got {}x{}", d.width, d.height),
            ));
        }

        if self.face.radius == 0 {
            return Err(AvatarError::invalid("face.radius", "radius must be greater than 0"));
        }

        let margin = self.safe_margin();
        if margin < self.face.radius {
            return Err(AvatarError::invalid(
                "face.safe_margin",
                format!("margin {} is smaller than the face radius {}", margin, self.face.radius),
            ));
        }
        if margin.saturating_mul(2) > d.width || margin.saturating_mul(2) > d.height {
            return Err(AvatarError::invalid(
                "face.safe_margin",
                format!("margin {} leaves no room on a {}x{} screen", margin, d.width, d.height),
            ));
        }

        let t = &self.tracking;
        if !(0.0..1.0).contains(&t.decay_factor) {
            return Err(AvatarError::invalid(
                "tracking.decay_factor",
                format!("must be in [0, 1), got {}", t.decay_factor),
            ));
        }
        if t.deadzone < 0 {
            return Err(AvatarError::invalid("tracking.deadzone", "must not be negative"));
        }
        if t.camera_width == 0 || t.camera_height == 0 {
            return Err(AvatarError::invalid("tracking.camera", "camera frame must be non-empty"));
        }

        if self.skin_tone.step == 0 {
            return Err(AvatarError::invalid("skin_tone.step", "step must be greater than 0"));
        }

        if self.render.tick_hz == 0 {
            return Err(AvatarError::invalid("render.tick_hz", "tick rate must be greater than 0"));
        }
        if self.render.mode == RenderMode::Tracking && !d.double_buffered {
            return Err(AvatarError::invalid(
                "display.double_buffered",
                "continuous tracking redraw requires double buffering",
            ));
        }

        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
    pub double_buffered: bool,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            width: 480,
            height: 480,
            format: PixelFormat::Rgb565,
            double_buffered: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FaceConfig {
    /// Draw radius of the tracked face.
    pub radius: u32,
    /// Inset of the safe zone from each edge. Defaults to `radius`.
    pub safe_margin: Option<u32>,
}

impl Default for FaceConfig {
    fn default() -> Self {
        Self {
            radius: 60,
            safe_margin: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackingConfig {
    /// Valid detections treated as "centered" before tracking starts.
    pub calibration_frames: u32,
    /// Multiplier applied to camera-space displacement.
    pub gain: i32,
    /// Offsets strictly inside (-deadzone, deadzone) snap to zero.
    pub deadzone: i32,
    /// Per-frame multiplier on the offset while tracking is lost.
    pub decay_factor: f32,
    /// Skin samples a centroid needs to count as a detection.
    pub min_support: u32,
    /// Camera frame size, used to center bounding boxes.
    pub camera_width: u32,
    pub camera_height: u32,
    /// Render ticks without a new estimate before the renderer starts decaying on its own.
    pub stale_ticks: u32,
    /// Minimum classifier confidence for a bounding box's emotion to be applied.
    pub min_emotion_confidence: u8,
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            calibration_frames: 20,
            gain: 4,
            deadzone: 10,
            decay_factor: 0.5,
            min_support: 6,
            camera_width: 480,
            camera_height: 480,
            stale_ticks: 3,
            min_emotion_confidence: 0,
        }
    }
}

/// Exclusive chrominance and luma windows for the skin-tone heuristic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SkinToneConfig {
    /// Sampling stride in pixels on both axes.
    pub step: u32,
    pub u_min: u8,
    pub u_max: u8,
    pub v_min: u8,
    pub v_max: u8,
    pub y_min: u8,
}

impl Default for SkinToneConfig {
    fn default() -> Self {
        Self {
            step: 8,
            u_min: 100,
            u_max: 200,
            v_min: 130,
            v_max: 200,
            y_min: 40,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RenderMode {
    /// Full-screen face, whole background cleared every frame.
    Centered,
    /// Smaller face following the tracked position.
    #[default]
    Tracking,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub tick_hz: u32,
    pub mode: RenderMode,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            tick_hz: 20,
            mode: RenderMode::Tracking,
        }
    }
}
