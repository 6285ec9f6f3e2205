// THEORY:
// The `skin_tone` module is the model-free face finder. It looks at a raw YUV422
// camera frame, decides for a sparse grid of sample points whether each looks like
// skin, and reports the centroid of the skin-colored samples together with how
// many there were (the "support").
//
// Key architectural principles:
// 1.  **Chrominance, not Brightness**: Skin clusters tightly in the U/V (Cb/Cr)
//     plane regardless of how bright it is lit, so classification uses two
//     chrominance windows and only a loose floor on luma to reject near-black.
// 2.  **Sparse Sampling**: Scanning every `step`-th pixel on both axes is more than
//     enough to place a face-sized blob and keeps the cost per frame tiny.
// 3.  **Stateless Utility**: A scan has no memory. Deciding whether the support is
//     enough, calibration and smoothing all belong to the position estimator.
//
// Frame layout (YUYV): every 4 bytes carry two horizontally adjacent pixels as
// `[Y0, U, Y1, V]`, with U and V shared by the pair.

use crate::config::SkinToneConfig;
use crate::core_modules::tracker::DetectionSample;
use tracing::trace;

/// Bytes per pixel in a YUYV frame (averaged over a macro-pixel).
const YUYV_BYTES_PER_PIXEL: usize = 2;

pub struct SkinToneDetector {
    config: SkinToneConfig,
}

impl SkinToneDetector {
    pub fn new(config: SkinToneConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SkinToneConfig {
        &self.config
    }

    /// Classifies one sample by its luma and chrominance.
    pub fn is_skin(&self, y: u8, u: u8, v: u8) -> bool {
        let c = &self.config;
        u > c.u_min && u < c.u_max && v > c.v_min && v < c.v_max && y > c.y_min
    }

    /// Scans a YUYV frame and reports the skin centroid in frame pixels.
    ///
    /// A frame shorter than `width * height * 2` bytes is scanned as far as its data
    /// goes. An empty result is a centroid at the origin with zero support.
    pub fn scan(&self, frame: &[u8], width: u32, height: u32) -> DetectionSample {
        let width = width as usize;
        let height = height as usize;
        let step = self.config.step.max(1) as usize;
        let limit = frame.len().min(width * height * YUYV_BYTES_PER_PIXEL);

        let mut sum_x: u64 = 0;
        let mut sum_y: u64 = 0;
        let mut support: u32 = 0;

        for y in (0..height).step_by(step) {
            for x in (0..width).step_by(step) {
                // Align to the start of the macro-pixel holding this pixel.
                let aligned_x = x & !1;
                let index = (y * width + aligned_x) * YUYV_BYTES_PER_PIXEL;
                if index + 3 >= limit {
                    continue;
                }

                let luma = frame[index];
                let u = frame[index + 1];
                let v = frame[index + 3];
                if self.is_skin(luma, u, v) {
                    sum_x += x as u64;
                    sum_y += y as u64;
                    support += 1;
                }
            }
        }

        if support == 0 {
            trace!("skin scan found nothing");
            return DetectionSample::Centroid { x: 0, y: 0, support: 0 };
        }

        let x = (sum_x / support as u64) as i32;
        let y = (sum_y / support as u64) as i32;
        trace!(support, x, y, "skin scan");
        DetectionSample::Centroid { x, y, support }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SKIN: [u8; 4] = [120, 150, 120, 160];
    const WALL: [u8; 4] = [120, 128, 120, 128];

    /// A YUYV frame filled with `WALL`, with `SKIN` inside the given pixel rectangle.
    fn frame_with_patch(w: usize, h: usize, x0: usize, y0: usize, x1: usize, y1: usize) -> Vec<u8> {
        let mut frame = Vec::with_capacity(w * h * 2);
        for y in 0..h {
            for pair in 0..w / 2 {
                let x = pair * 2;
                let inside = x >= x0 && x < x1 && y >= y0 && y < y1;
                frame.extend_from_slice(if inside { &SKIN } else { &WALL });
            }
        }
        frame
    }

    fn detector() -> SkinToneDetector {
        SkinToneDetector::new(SkinToneConfig::default())
    }

    #[test]
    fn classifies_by_exclusive_windows() {
        let d = detector();
        assert!(d.is_skin(120, 150, 160));
        assert!(!d.is_skin(40, 150, 160));
        assert!(!d.is_skin(120, 100, 160));
        assert!(!d.is_skin(120, 150, 200));
        assert!(!d.is_skin(120, 128, 128));
    }

    #[test]
    fn centroid_of_patch() {
        let frame = frame_with_patch(160, 160, 64, 32, 96, 64);
        let sample = detector().scan(&frame, 160, 160);
        // Samples at 64,72,80,88 on x and 32,40,48,56 on y.
        assert_eq!(sample, DetectionSample::Centroid { x: 76, y: 44, support: 16 });
    }

    #[test]
    fn empty_scene_has_no_support() {
        let frame = frame_with_patch(64, 64, 0, 0, 0, 0);
        assert_eq!(
            detector().scan(&frame, 64, 64),
            DetectionSample::Centroid { x: 0, y: 0, support: 0 }
        );
    }

    #[test]
    fn truncated_frame_is_scanned_partially() {
        let frame = frame_with_patch(64, 64, 0, 0, 64, 64);
        let half = &frame[..frame.len() / 2];
        match detector().scan(half, 64, 64) {
            DetectionSample::Centroid { y, support, .. } => {
                assert!(support > 0);
                assert!(y < 32);
            }
            other => panic!("unexpected sample {other:?}"),
        }
    }
}
