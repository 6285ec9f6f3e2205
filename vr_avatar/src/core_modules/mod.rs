pub mod emotion;
pub mod emotion_selector;
pub mod face;
pub mod frame_buffer;
pub mod pixel;
pub mod raster;
pub mod skin_tone;
pub mod tracker;
pub mod utils;
