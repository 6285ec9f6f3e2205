// THEORY (RGB565 Pixels):
// The `Pixel` module is the most fundamental unit of the renderer. The panel we
// drive speaks RGB565: five bits of red, six of green, five of blue packed into a
// single 16-bit word. Every color in the expression table, every value written by
// the rasterizer and every word flushed to the panel is one of these.
//
// What lives here:
// - `Rgb565`: a "dumb" value type for one packed color, plus lossless-enough
//   conversions to and from 8-bit-per-channel RGB (used for PNG export and for
//   authoring colors by eye).
// - `PixelFormat`: how a color is laid out in memory for a given panel. Some SPI
//   panels expect the two bytes of every word swapped; the frame buffer encodes
//   colors into the panel's order at write time so a flush is a straight copy.
//
// Key principles:
// 1) Single-pixel scope: nothing here knows about buffers, neighbors or geometry.
// 2) Colors are stored in logical order everywhere except inside a `FrameBuffer`.

pub mod pixel {
    use serde::{Deserialize, Serialize};

    pub type Channel = u8;
    pub type RawWord = u16;

    /// A single color packed as 5-6-5 bits, in logical (not panel) byte order.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    #[serde(transparent)]
    pub struct Rgb565(pub RawWord);

    impl Rgb565 {
        pub const BLACK: Rgb565 = Rgb565(0x0000);
        pub const WHITE: Rgb565 = Rgb565(0xFFFF);
        pub const YELLOW: Rgb565 = Rgb565(0xFFE0);
        pub const RED: Rgb565 = Rgb565(0xF800);
        pub const BLUE: Rgb565 = Rgb565(0x001F);

        /// Packs an 8-bit-per-channel color, dropping the low bits of each channel.
        pub const fn from_rgb888(red: Channel, green: Channel, blue: Channel) -> Self {
            let r = (red as RawWord & 0xF8) << 8;
            let g = (green as RawWord & 0xFC) << 3;
            let b = blue as RawWord >> 3;
            Rgb565(r | g | b)
        }

        /// Expands back to 8 bits per channel. The high bits are replicated into the
        /// low bits so that full intensity maps to 255 rather than 248.
        pub fn to_rgb888(self) -> (Channel, Channel, Channel) {
            let r5 = (self.0 >> 11) & 0x1F;
            let g6 = (self.0 >> 5) & 0x3F;
            let b5 = self.0 & 0x1F;
            (
                ((r5 << 3) | (r5 >> 2)) as Channel,
                ((g6 << 2) | (g6 >> 4)) as Channel,
                ((b5 << 3) | (b5 >> 2)) as Channel,
            )
        }

        pub const fn swap_bytes(self) -> Self {
            Rgb565(self.0.swap_bytes())
        }

        pub const fn raw(self) -> RawWord {
            self.0
        }
    }

    /// The in-memory layout a display panel expects.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
    #[serde(rename_all = "snake_case")]
    pub enum PixelFormat {
        /// Native little-endian 16-bit words.
        #[default]
        Rgb565,
        /// 16-bit words with their two bytes exchanged.
        Rgb565Swapped,
    }

    impl PixelFormat {
        pub const fn bytes_per_pixel(self) -> usize {
            2
        }

        /// Converts a logical color into the word stored in a buffer of this format.
        #[inline]
        pub fn encode(self, color: Rgb565) -> RawWord {
            match self {
                PixelFormat::Rgb565 => color.raw(),
                PixelFormat::Rgb565Swapped => color.swap_bytes().raw(),
            }
        }

        /// Recovers the logical color from a stored word.
        #[inline]
        pub fn decode(self, word: RawWord) -> Rgb565 {
            match self {
                PixelFormat::Rgb565 => Rgb565(word),
                PixelFormat::Rgb565Swapped => Rgb565(word).swap_bytes(),
            }
        }
    }
}
