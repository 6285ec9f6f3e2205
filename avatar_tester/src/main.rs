//! Avatar tester - renders the avatar against a synthetic camera feed.
//!
//! A skin-colored disc wanders around an otherwise neutral YUYV frame. Each
//! camera frame goes through the skin-tone detector and the tracking handle,
//! while the render loop writes every flushed frame to `frame_NNNN.png`.

use anyhow::Context;
use clap::{Parser, ValueEnum};
use futures::stream::{self, StreamExt};
use std::f32::consts::TAU;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use vr_avatar::core_modules::utils::image_helper::image_helper;
use vr_avatar::{
    AvatarConfig, AvatarRuntime, DisplaySink, FrameBuffer, PipelineStats, RenderMode,
    SkinToneDetector,
};

/// Luma, chroma and luma, chroma for one skin-colored macro-pixel.
const SKIN: [u8; 4] = [150, 120, 150, 160];
/// A gray wall, outside every skin window.
const WALL: [u8; 4] = [90, 128, 90, 128];

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum Mode {
    Centered,
    Tracking,
}

impl From<Mode> for RenderMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Centered => RenderMode::Centered,
            Mode::Tracking => RenderMode::Tracking,
        }
    }
}

/// Render the avatar for a synthetic camera feed into a directory of PNGs
#[derive(Parser, Debug)]
#[command(name = "avatar_tester", version, about, long_about = None)]
struct Args {
    /// Number of camera frames to feed
    #[arg(short, long, default_value_t = 60)]
    frames: u32,

    /// Output directory for the rendered PNGs
    #[arg(short, long)]
    out: PathBuf,

    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Render mode (overrides config)
    #[arg(short, long, value_enum)]
    mode: Option<Mode>,

    /// Advance to the next emotion every K camera frames (0 disables)
    #[arg(long, default_value_t = 0)]
    cycle_every: u32,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

/// Writes each flushed buffer as a numbered PNG.
struct PngSink {
    dir: PathBuf,
    next_index: u32,
}

impl PngSink {
    fn new(dir: PathBuf) -> Self {
        Self { dir, next_index: 0 }
    }
}

impl DisplaySink for PngSink {
    fn flush(&mut self, buffer: &FrameBuffer) -> vr_avatar::Result<()> {
        let path = self.dir.join(format!("frame_{:04}.png", self.next_index));
        self.next_index += 1;
        image_helper::save(&path, buffer)?;
        Ok(())
    }
}

/// Center of the wandering disc for camera frame `index`, or `None` while it is
/// hidden so the avatar has something to recover from.
fn disc_center(index: u32, width: u32, height: u32) -> Option<(u32, u32)> {
    if index % 50 >= 45 {
        return None;
    }
    let phase = index as f32 / 60.0 * TAU;
    let x = width as f32 / 2.0 + width as f32 / 6.0 * phase.cos();
    let y = height as f32 / 2.0 + height as f32 / 8.0 * phase.sin();
    Some((x as u32, y as u32))
}

/// Builds a YUYV frame with a skin disc of `radius` pixels at `center`.
fn synth_frame(width: u32, height: u32, center: Option<(u32, u32)>, radius: u32) -> Vec<u8> {
    let mut frame = Vec::with_capacity((width * height * 2) as usize);
    let r2 = (radius * radius) as i64;
    for y in 0..height {
        for pair in 0..width / 2 {
            let inside = center.is_some_and(|(cx, cy)| {
                let dx = (pair * 2) as i64 - cx as i64;
                let dy = y as i64 - cy as i64;
                dx * dx + dy * dy <= r2
            });
            frame.extend_from_slice(if inside { &SKIN } else { &WALL });
        }
    }
    frame
}

async fn run(args: &Args) -> anyhow::Result<PipelineStats> {
    // --- 1. Configuration ---
    let mut config = match &args.config {
        Some(path) => AvatarConfig::from_file(path)?,
        None => AvatarConfig::default(),
    };
    if let Some(mode) = args.mode {
        config.render.mode = mode.into();
    }

    std::fs::create_dir_all(&args.out)
        .with_context(|| format!("creating output directory {}", args.out.display()))?;

    // --- 2. Renderer ---
    let camera = (config.tracking.camera_width, config.tracking.camera_height);
    let tick_hz = config.render.tick_hz;
    let detector = SkinToneDetector::new(config.skin_tone.clone());
    let (runtime, handle) = AvatarRuntime::spawn(config, PngSink::new(args.out.clone()))?;
    let period = Duration::from_secs(1) / tick_hz;

    // --- 3. Synthetic camera, one frame per render tick ---
    let disc_radius = camera.0.min(camera.1) / 10;
    let cycle_every = args.cycle_every;
    stream::iter(0..args.frames)
        .then(|index| async move {
            tokio::time::sleep(period).await;
            index
        })
        .for_each(|index| {
            let frame = synth_frame(camera.0, camera.1, disc_center(index, camera.0, camera.1), disc_radius);
            let offset = handle.set_detection(&detector.scan(&frame, camera.0, camera.1));
            if cycle_every > 0 && index > 0 && index % cycle_every == 0 {
                handle.selector().next();
            }
            tracing::debug!(index, x = offset.x, y = offset.y, "camera frame");
            futures::future::ready(())
        })
        .await;

    // --- 4. Shutdown ---
    drop(handle);
    let stats = runtime.shutdown().await?;
    Ok(stats)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize logging
    let log_level = if args.verbose { Level::DEBUG } else { Level::INFO };
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(log_level.into())
                .from_env_lossy(),
        )
        .init();

    let stats = run(&args).await?;
    info!(
        "Rendering complete: {} frames ({} failed flushes) saved to {}",
        stats.frames_rendered,
        stats.flush_failures,
        args.out.display()
    );
    Ok(())
}
