// THEORY:
// The `pipeline` module is the Frame Pipeline: the single owner of the frame
// buffers and the only place that turns "this emotion, this offset" into pixels on
// the panel. It encapsulates the compositor, the safe-zone clamp and the
// flush/swap discipline behind one `tick` call.
//
// Key architectural principles:
// 1.  **Explicit Ownership**: The buffers live inside `FramePipeline` and are only
//     lent out read-only to the display sink during a flush. Nothing else can
//     write to them.
// 2.  **Ping-Pong Buffering**: With two buffers, each tick draws into the active
//     one, flushes it, then flips `active` to the other. The buffer just handed to
//     the panel is never the one drawn into next, which is what keeps continuous
//     redraws free of tearing. A single-buffer mode exists for static screens.
// 3.  **Safe Zone**: Offsets from the estimator are relative to screen center and
//     unbounded. The pipeline converts them to an absolute point and clamps it so
//     the face center stays at least `safe_margin` from every edge.
// 4.  **Never Stall**: A failed flush is logged and counted, and the next tick
//     carries on. Only failing to allocate the buffers stops the pipeline, and that
//     happens before the first tick.
//
// Per tick the state machine walks: Rendering -> Flushing -> SwappedReady.

use crate::config::{AvatarConfig, RenderMode};
use crate::core_modules::emotion::EmotionId;
use crate::core_modules::face;
use crate::core_modules::frame_buffer::FrameBuffer;
use crate::core_modules::pixel::pixel::Rgb565;
use crate::core_modules::tracker::Offset;
use crate::error::Result;
use tracing::{debug, warn};

/// The flush capability of the physical display.
///
/// Implementations copy the buffer to the panel and return once the transfer is
/// done. They only ever see the buffer for the duration of the call.
pub trait DisplaySink: Send {
    fn flush(&mut self, buffer: &FrameBuffer) -> Result<()>;
}

/// Where the pipeline is in its per-tick cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    /// Buffers allocated, nothing drawn yet.
    Idle,
    Rendering,
    Flushing,
    /// The last frame was flushed and the next buffer is ready to draw into.
    SwappedReady,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineStats {
    pub frames_rendered: u64,
    pub flush_failures: u64,
}

/// What a single tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickReport {
    /// Index of the buffer that was drawn and flushed.
    pub buffer_index: usize,
    /// Face center used for the frame.
    pub center: (i32, i32),
    pub flushed: bool,
}

/// Clamps a point into `[margin, dimension - margin]` on both axes.
///
/// A margin that leaves no room on an axis pins that axis to the screen center.
pub fn clamp_to_safe_zone(x: i32, y: i32, width: u32, height: u32, margin: u32) -> (i32, i32) {
    fn clamp_axis(value: i32, dimension: u32, margin: u32) -> i32 {
        let lo = margin as i64;
        let hi = dimension as i64 - margin as i64;
        if lo > hi {
            return (dimension / 2) as i32;
        }
        (value as i64).clamp(lo, hi) as i32
    }
    (clamp_axis(x, width, margin), clamp_axis(y, height, margin))
}

pub struct FramePipeline {
    /// One buffer in single-buffer mode, two when double buffering.
    buffers: Vec<FrameBuffer>,
    /// Background each buffer was last cleared to. `None` until first use.
    backgrounds: Vec<Option<Rgb565>>,
    /// Index of the buffer the next tick draws into.
    active: usize,
    state: PipelineState,
    mode: RenderMode,
    width: u32,
    height: u32,
    face_radius: i32,
    safe_margin: u32,
    stats: PipelineStats,
}

impl FramePipeline {
    /// Validates the configuration and allocates the frame buffers.
    pub fn new(config: &AvatarConfig) -> Result<Self> {
        config.validate()?;
        let d = &config.display;
        let count = if d.double_buffered { 2 } else { 1 };

        let mut buffers = Vec::with_capacity(count);
        for _ in 0..count {
            buffers.push(FrameBuffer::try_new(d.width, d.height, d.format)?);
        }
        debug!(
            width = d.width,
            height = d.height,
            buffers = count,
            "frame pipeline allocated"
        );

        Ok(Self {
            backgrounds: vec![None; count],
            buffers,
            active: 0,
            state: PipelineState::Idle,
            mode: config.render.mode,
            width: d.width,
            height: d.height,
            face_radius: config.face.radius as i32,
            safe_margin: config.safe_margin(),
            stats: PipelineStats::default(),
        })
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    pub fn stats(&self) -> PipelineStats {
        self.stats
    }

    pub fn mode(&self) -> RenderMode {
        self.mode
    }

    pub fn is_double_buffered(&self) -> bool {
        self.buffers.len() == 2
    }

    pub fn active_index(&self) -> usize {
        self.active
    }

    pub fn buffer(&self, index: usize) -> Option<&FrameBuffer> {
        self.buffers.get(index)
    }

    /// Absolute, clamped face center for an offset from screen center.
    pub fn draw_point(&self, offset: Offset) -> (i32, i32) {
        let x = (self.width / 2) as i32 + offset.x;
        let y = (self.height / 2) as i32 + offset.y;
        clamp_to_safe_zone(x, y, self.width, self.height, self.safe_margin)
    }

    /// Draws one frame, flushes it and swaps buffers.
    pub fn tick<S: DisplaySink + ?Sized>(
        &mut self,
        sink: &mut S,
        emotion: EmotionId,
        offset: Offset,
    ) -> TickReport {
        let params = emotion.params();
        let buffer_index = self.active;

        // --- 1. Render ---
        self.state = PipelineState::Rendering;
        let center = match self.mode {
            RenderMode::Centered => ((self.width / 2) as i32, (self.height / 2) as i32),
            RenderMode::Tracking => self.draw_point(offset),
        };
        let radius = self.face_radius;
        let fb = &mut self.buffers[buffer_index];
        match self.mode {
            RenderMode::Centered => face::draw_centered(fb, params),
            RenderMode::Tracking => {
                // Damage-only erase is valid only over the same background.
                if self.backgrounds[buffer_index] != Some(params.bg_color) {
                    fb.fill(params.bg_color);
                }
                face::draw_at(fb, center.0, center.1, radius, params)
            }
        };
        self.backgrounds[buffer_index] = Some(params.bg_color);

        // --- 2. Flush ---
        self.state = PipelineState::Flushing;
        let flushed = match sink.flush(&self.buffers[buffer_index]) {
            Ok(()) => true,
            Err(e) => {
                self.stats.flush_failures += 1;
                warn!(buffer = buffer_index, "flush failed, skipping frame: {}", e);
                false
            }
        };
        self.stats.frames_rendered += 1;

        // --- 3. Swap ---
        self.active = (self.active + 1) % self.buffers.len();
        self.state = PipelineState::SwappedReady;

        TickReport {
            buffer_index,
            center,
            flushed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AvatarError;

    /// Remembers which allocation every flushed frame came from.
    #[derive(Default)]
    struct RecordingSink {
        /// Address of each flushed buffer's storage.
        flushed: Vec<usize>,
        fail_every: Option<usize>,
    }

    impl DisplaySink for RecordingSink {
        fn flush(&mut self, buffer: &FrameBuffer) -> Result<()> {
            self.flushed.push(buffer.pixels().as_ptr() as usize);
            match self.fail_every {
                Some(n) if self.flushed.len() % n == 0 => Err(AvatarError::Flush("bus busy".into())),
                _ => Ok(()),
            }
        }
    }

    #[test]
    fn double_buffer_alternates_every_tick() {
        let mut pipeline = FramePipeline::new(&AvatarConfig::default()).unwrap();
        let mut sink = RecordingSink::default();
        assert_eq!(pipeline.state(), PipelineState::Idle);

        for i in 0..9 {
            let report = pipeline.tick(&mut sink, EmotionId::Happy, Offset::new(i * 5, 0));
            assert_eq!(report.buffer_index, i as usize % 2);
            assert_eq!(pipeline.state(), PipelineState::SwappedReady);
        }
        for pair in sink.flushed.windows(2) {
            assert_ne!(pair[0], pair[1]);
        }
        assert_eq!(sink.flushed[0], sink.flushed[2]);
        assert_eq!(pipeline.stats().frames_rendered, 9);
    }

    #[test]
    fn single_buffer_mode_reuses_one_buffer() {
        let mut config = AvatarConfig::default();
        config.display.double_buffered = false;
        config.render.mode = RenderMode::Centered;
        let mut pipeline = FramePipeline::new(&config).unwrap();
        let mut sink = RecordingSink::default();

        for _ in 0..3 {
            assert_eq!(pipeline.tick(&mut sink, EmotionId::Sad, Offset::ZERO).buffer_index, 0);
        }
        assert!(!pipeline.is_double_buffered());
        assert!(sink.flushed.windows(2).all(|p| p[0] == p[1]));
    }

    #[test]
    fn clamp_keeps_point_inside_safe_zone() {
        for (x, y) in [(-500, -500), (0, 0), (240, 240), (479, 10), (10_000, -3), (i32::MAX, i32::MIN)] {
            let (cx, cy) = clamp_to_safe_zone(x, y, 480, 320, 60);
            assert!((60..=420).contains(&cx), "x {x} -> {cx}");
            assert!((60..=260).contains(&cy), "y {y} -> {cy}");
        }
        assert_eq!(clamp_to_safe_zone(100, 100, 480, 320, 60), (100, 100));
        assert_eq!(clamp_to_safe_zone(5, 5, 100, 100, 80), (50, 50));
    }

    #[test]
    fn tracking_offsets_are_relative_to_center() {
        let pipeline = FramePipeline::new(&AvatarConfig::default()).unwrap();
        assert_eq!(pipeline.draw_point(Offset::ZERO), (240, 240));
        assert_eq!(pipeline.draw_point(Offset::new(-40, 30)), (200, 270));
        assert_eq!(pipeline.draw_point(Offset::new(-1000, 1000)), (60, 420));
    }

    #[test]
    fn tracked_face_is_drawn_at_clamped_point() {
        let mut pipeline = FramePipeline::new(&AvatarConfig::default()).unwrap();
        let mut sink = RecordingSink::default();
        let report = pipeline.tick(&mut sink, EmotionId::Angry, Offset::new(500, 0));
        assert_eq!(report.center, (420, 240));

        let fb = pipeline.buffer(report.buffer_index).unwrap();
        assert_eq!(fb.get_pixel(420, 240), Some(EmotionId::Angry.params().face_color));
        assert_eq!(fb.get_pixel(240, 240), Some(EmotionId::Angry.params().bg_color));
    }

    #[test]
    fn flush_failures_do_not_stop_the_pipeline() {
        let mut pipeline = FramePipeline::new(&AvatarConfig::default()).unwrap();
        let mut sink = RecordingSink {
            fail_every: Some(2),
            ..Default::default()
        };
        let results: Vec<bool> = (0..4)
            .map(|_| pipeline.tick(&mut sink, EmotionId::Neutral, Offset::ZERO).flushed)
            .collect();
        assert_eq!(results, vec![true, false, true, false]);
        assert_eq!(
            pipeline.stats(),
            PipelineStats {
                frames_rendered: 4,
                flush_failures: 2
            }
        );
    }

    #[test]
    fn invalid_config_is_rejected_before_allocation() {
        let mut config = AvatarConfig::default();
        config.display.width = 0;
        assert!(matches!(
            FramePipeline::new(&config),
            Err(AvatarError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn oversized_screen_fails_allocation() {
        let mut config = AvatarConfig::default();
        config.display.width = u32::MAX;
        config.display.height = u32::MAX;
        assert!(matches!(
            FramePipeline::new(&config),
            Err(AvatarError::BufferAllocation { .. })
        ));
    }
}
