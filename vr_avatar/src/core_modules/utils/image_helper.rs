//! PNG export of frame buffers, for inspecting rendered frames off-device.

pub mod image_helper {
    use crate::core_modules::frame_buffer::FrameBuffer;
    use image::{ImageEncoder, RgbImage};
    use std::path::Path;

    /// Writes the buffer to `path` as an 8-bit RGB PNG.
    pub fn save<P: AsRef<Path>>(path: P, fb: &FrameBuffer) -> Result<(), image::error::ImageError> {
        let output = std::fs::File::create(path)?;
        let encoder = image::codecs::png::PngEncoder::new(std::io::BufWriter::new(output));

        encoder.write_image(&fb.to_rgb888(), fb.width(), fb.height(), image::ExtendedColorType::Rgb8)?;

        Ok(())
    }

    /// Decodes the buffer into an in-memory image.
    pub fn to_image(fb: &FrameBuffer) -> Option<RgbImage> {
        RgbImage::from_raw(fb.width(), fb.height(), fb.to_rgb888())
    }
}

#[cfg(test)]
mod tests {
    use super::image_helper::*;
    use crate::core_modules::frame_buffer::FrameBuffer;
    use crate::core_modules::pixel::pixel::{PixelFormat, Rgb565};

    #[test]
    fn save_yellow_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("yellow.png");
        let mut fb = FrameBuffer::try_new(32, 16, PixelFormat::Rgb565Swapped).unwrap();
        fb.fill(Rgb565::YELLOW);

        save(&path, &fb).expect("Error Saving File.");

        let decoded = image::open(&path).unwrap().to_rgb8();
        assert_eq!(decoded.dimensions(), (32, 16));
        assert_eq!(decoded.get_pixel(31, 15).0, [255, 255, 0]);
    }

    #[test]
    fn converts_in_memory() {
        let mut fb = FrameBuffer::try_new(4, 4, PixelFormat::Rgb565).unwrap();
        fb.put_pixel(2, 1, Rgb565::BLUE);
        let img = to_image(&fb).unwrap();
        assert_eq!(img.get_pixel(2, 1).0, [0, 0, 255]);
        assert_eq!(img.get_pixel(0, 0).0, [0, 0, 0]);
    }
}
