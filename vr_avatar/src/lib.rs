// THEORY:
// This file is the main entry point for the `vr_avatar` library crate.
// It defines the public API exposed to whatever drives the avatar: a firmware
// main loop, a desktop tester, or a remote-control front end.
//
// The primary goal is to export the `AvatarRuntime` and `FramePipeline` with
// their associated data structures (`AvatarConfig`, `DisplaySink`,
// `DetectionSample`, etc.) as the clean, high-level interface of the renderer.
// The drawing primitives and the expression tables stay reachable under
// `core_modules` for callers that want to composite faces themselves.

pub mod config;
pub mod core_modules;
pub mod error;
pub mod pipeline;
pub mod render_loop;

pub use config::{AvatarConfig, RenderMode};
pub use core_modules::emotion::{DetectedEmotion, EmotionId, FaceParams};
pub use core_modules::emotion_selector::EmotionSelector;
pub use core_modules::frame_buffer::{FrameBuffer, Rect};
pub use core_modules::pixel::pixel::{PixelFormat, Rgb565};
pub use core_modules::skin_tone::SkinToneDetector;
pub use core_modules::tracker::{DetectionSample, Offset, PositionEstimator};
pub use error::{AvatarError, Result};
pub use pipeline::{DisplaySink, FramePipeline, PipelineState, PipelineStats};
pub use render_loop::{AvatarRuntime, Estimate, TrackingHandle};
