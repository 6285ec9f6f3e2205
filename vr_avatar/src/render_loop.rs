// THEORY:
// The `render_loop` module is the concurrent shell around the `FramePipeline`. It
// splits the system into the two activities the hardware forces on us: a producer
// that gets a face position whenever the camera (or a classifier) has one, and a
// renderer that must draw on a fixed cadence whether or not anything new arrived.
//
// Key architectural principles:
// 1.  **Last Write Wins**: The producer publishes into a `tokio::sync::watch`
//     slot. The renderer only ever wants the newest estimate, so stale ones are
//     overwritten rather than queued, and neither side ever blocks the other.
// 2.  **Sole Owner of the Buffers**: The render task owns the `FramePipeline` and
//     the `DisplaySink`. Nothing else can touch a buffer, so no locking is needed
//     around drawing or flushing.
// 3.  **Graceful Starvation**: If estimates stop arriving for `stale_ticks`
//     ticks, or every producer handle has been dropped, the renderer decays the
//     offset itself so the avatar drifts back to center instead of freezing.
// 4.  **Shared Emotion Cell**: The current expression lives in an
//     `EmotionSelector` that any thread can write and the renderer reads once per
//     tick.

use crate::config::{AvatarConfig, TrackingConfig};
use crate::core_modules::emotion::EmotionId;
use crate::core_modules::emotion_selector::EmotionSelector;
use crate::core_modules::tracker::{DetectionSample, Offset, PositionEstimator};
use crate::error::{AvatarError, Result};
use crate::pipeline::{DisplaySink, FramePipeline, PipelineStats};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

/// The newest position estimate, stamped so the renderer can tell fresh from stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Estimate {
    pub offset: Offset,
    /// Incremented on every publish. Zero means nothing was published yet.
    pub sequence: u64,
}

struct Producer {
    estimator: PositionEstimator,
    slot: watch::Sender<Estimate>,
    /// What the renderer is currently drawing, stamped with the estimate it came from.
    shown: watch::Receiver<Estimate>,
    sequence: u64,
    published: Offset,
}

impl Producer {
    /// Hands the renderer's own starvation decay back to the estimator.
    ///
    /// Only applies once the renderer has consumed the latest estimate and moved
    /// away from it, so a fresher publish is never overridden.
    fn catch_up(&mut self) {
        let shown = *self.shown.borrow();
        if self.sequence != 0 && shown.sequence == self.sequence && shown.offset != self.published {
            self.estimator.resume_from(shown.offset);
        }
    }

    fn publish(&mut self, offset: Offset) -> Offset {
        self.sequence += 1;
        self.published = offset;
        self.slot.send_replace(Estimate {
            offset,
            sequence: self.sequence,
        });
        offset
    }
}

/// The producer side: feeds detections to the estimator and publishes the result.
///
/// Cheap to clone. Once every clone is dropped the renderer treats tracking as
/// permanently lost.
#[derive(Clone)]
pub struct TrackingHandle {
    producer: Arc<Mutex<Producer>>,
    selector: Arc<EmotionSelector>,
    min_emotion_confidence: u8,
}

impl TrackingHandle {
    /// Runs one frame's detection through the estimator and publishes the offset.
    ///
    /// A bounding box carrying a confident emotion also updates the shown face.
    pub fn set_detection(&self, sample: &DetectionSample) -> Offset {
        if let Some((detected, confidence)) = sample.emotion() {
            if confidence >= self.min_emotion_confidence {
                self.selector.apply_detected(detected);
            }
        }

        let mut producer = self.producer.lock().unwrap_or_else(|e| e.into_inner());
        producer.catch_up();
        let offset = producer.estimator.update(sample);
        producer.publish(offset)
    }

    /// Reports a frame in which no face was found.
    pub fn report_lost(&self) -> Offset {
        let mut producer = self.producer.lock().unwrap_or_else(|e| e.into_inner());
        producer.catch_up();
        let offset = producer.estimator.lost();
        producer.publish(offset)
    }

    pub fn is_calibrated(&self) -> bool {
        let producer = self.producer.lock().unwrap_or_else(|e| e.into_inner());
        producer.estimator.is_calibrated()
    }

    pub fn selector(&self) -> &Arc<EmotionSelector> {
        &self.selector
    }
}

/// A running render task.
pub struct AvatarRuntime {
    selector: Arc<EmotionSelector>,
    shutdown: oneshot::Sender<()>,
    task: JoinHandle<PipelineStats>,
}

impl AvatarRuntime {
    /// Allocates the pipeline and starts rendering on the current tokio runtime.
    ///
    /// Fails before anything is spawned if the configuration is invalid or the
    /// frame buffers cannot be allocated.
    pub fn spawn<S>(config: AvatarConfig, sink: S) -> Result<(Self, TrackingHandle)>
    where
        S: DisplaySink + 'static,
    {
        let pipeline = FramePipeline::new(&config)?;
        let selector = Arc::new(EmotionSelector::new(EmotionId::Neutral));

        let (slot, estimates) = watch::channel(Estimate::default());
        let (shown_slot, shown) = watch::channel(Estimate::default());
        let (shutdown, stop) = oneshot::channel();

        let estimator = PositionEstimator::new(
            config.tracking.clone(),
            config.display.width,
            config.display.height,
        );
        let handle = TrackingHandle {
            producer: Arc::new(Mutex::new(Producer {
                estimator,
                slot,
                shown,
                sequence: 0,
                published: Offset::ZERO,
            })),
            selector: Arc::clone(&selector),
            min_emotion_confidence: config.tracking.min_emotion_confidence,
        };

        let period = Duration::from_secs(1) / config.render.tick_hz;
        info!(
            mode = ?pipeline.mode(),
            period_ms = period.as_millis() as u64,
            double_buffered = pipeline.is_double_buffered(),
            "avatar renderer starting"
        );

        let task = tokio::spawn(render_loop(
            pipeline,
            sink,
            estimates,
            shown_slot,
            Arc::clone(&selector),
            config.tracking,
            period,
            stop,
        ));

        Ok((
            Self {
                selector,
                shutdown,
                task,
            },
            handle,
        ))
    }

    pub fn selector(&self) -> &Arc<EmotionSelector> {
        &self.selector
    }

    /// Shows `emotion` from the next tick on.
    pub fn set_emotion(&self, emotion: EmotionId) {
        self.selector.set(emotion);
    }

    pub fn next_emotion(&self) -> EmotionId {
        self.selector.next()
    }

    /// Stops the render task after its current tick and returns its counters.
    pub async fn shutdown(self) -> Result<PipelineStats> {
        // The task may already have exited; the join below reports why.
        let _ = self.shutdown.send(());
        let stats = self
            .task
            .await
            .map_err(|e| AvatarError::RenderTask(e.to_string()))?;
        info!(
            frames = stats.frames_rendered,
            flush_failures = stats.flush_failures,
            "avatar renderer stopped"
        );
        Ok(stats)
    }
}

async fn render_loop<S: DisplaySink>(
    mut pipeline: FramePipeline,
    mut sink: S,
    estimates: watch::Receiver<Estimate>,
    shown: watch::Sender<Estimate>,
    selector: Arc<EmotionSelector>,
    tracking: TrackingConfig,
    period: Duration,
    mut stop: oneshot::Receiver<()>,
) -> PipelineStats {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let mut offset = Offset::ZERO;
    let mut last_sequence = 0;
    let mut stale_ticks = 0u32;
    let mut producer_gone = false;

    loop {
        tokio::select! {
            biased;
            _ = &mut stop => break,
            _ = ticker.tick() => {}
        }

        // --- 1. Pick up the newest estimate, or decay on starvation ---
        let latest = *estimates.borrow();
        if latest.sequence != last_sequence {
            last_sequence = latest.sequence;
            offset = latest.offset;
            stale_ticks = 0;
        } else {
            stale_ticks = stale_ticks.saturating_add(1);
            if !producer_gone && estimates.has_changed().is_err() {
                producer_gone = true;
                debug!("all tracking handles dropped, returning to center");
            }
            if producer_gone || stale_ticks > tracking.stale_ticks {
                offset = offset.decayed(tracking.decay_factor);
            }
        }

        // Lets the producer continue a decay from where the face really is.
        shown.send_replace(Estimate {
            offset,
            sequence: last_sequence,
        });

        // --- 2. Draw, flush, swap ---
        pipeline.tick(&mut sink, selector.get(), offset);
    }

    pipeline.stats()
}
