// THEORY (single-pixel heuristics):
// The `Pixel` module is the smallest unit of the engine. It is a "dumb" data
// container for one RGBA sample plus the handful of single-pixel metrics every
// later stage leans on. Nothing here reads a neighbor: gradients, flood fills
// and neighborhood statistics belong to the stage modules that own them.
//
// Heuristic families kept here:
// - Brightness: luminance (Rec. 601), the rounded gray byte, and the plain
//   channel mean used by mask decoding and surface inference.
// - Similarity: the L1 ("Manhattan") distance to a reference color, which is
//   the region-growing predicate.
// - HSL: hue/saturation/lightness in [0, 1], derived once for paint colors.

pub mod pixel {
    pub type Byte = u8;
    pub type Channel = Byte;
    pub type Luminance = f64;
    pub type ColorDistance = f64;

    pub const CHANNELS: usize = 4;

    const RED_WEIGHT: f64 = 0.299;
    const GREEN_WEIGHT: f64 = 0.587;
    const BLUE_WEIGHT: f64 = 0.114;

    /// A "dumb" data container representing a single RGBA pixel.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Pixel {
        /// The red channel value (0-255).
        pub red: Channel,
        /// The green channel value (0-255).
        pub green: Channel,
        /// The blue channel value (0-255).
        pub blue: Channel,
        /// The alpha (transparency) channel value (0-255).
        pub alpha: Channel,
    }

    impl Pixel {
        pub fn new(red: Channel, green: Channel, blue: Channel, alpha: Channel) -> Self {
            Pixel {
                red,
                green,
                blue,
                alpha,
            }
        }

        /// Reads the pixel at flat `index` from an interleaved RGBA byte slice.
        #[inline]
        pub fn read(data: &[Byte], index: usize) -> Self {
            let offset = index * CHANNELS;
            Pixel::new(
                data[offset],
                data[offset + 1],
                data[offset + 2],
                data[offset + 3],
            )
        }

        /// Luminance estimate (Rec. 601 luma) on the 0..255 scale.
        #[inline]
        pub fn luminance(&self) -> Luminance {
            RED_WEIGHT * self.red as f64
                + GREEN_WEIGHT * self.green as f64
                + BLUE_WEIGHT * self.blue as f64
        }

        /// Luminance rounded to a gray byte.
        #[inline]
        pub fn gray(&self) -> Byte {
            self.luminance().round().clamp(0.0, 255.0) as Byte
        }

        /// Unweighted channel mean, 0..255.
        #[inline]
        pub fn mean_brightness(&self) -> f64 {
            (self.red as f64 + self.green as f64 + self.blue as f64) / 3.0
        }

        #[inline]
        pub fn rgb(&self) -> [f64; 3] {
            [self.red as f64, self.green as f64, self.blue as f64]
        }

        /// Sum of absolute per-channel differences against `reference`.
        #[inline]
        pub fn color_distance(&self, reference: &[f64; 3]) -> ColorDistance {
            (self.red as f64 - reference[0]).abs()
                + (self.green as f64 - reference[1]).abs()
                + (self.blue as f64 - reference[2]).abs()
        }

        /// Hue, saturation and lightness, each normalized to [0, 1].
        pub fn hsl(&self) -> (f64, f64, f64) {
            let red = self.red as f64 / 255.0;
            let green = self.green as f64 / 255.0;
            let blue = self.blue as f64 / 255.0;
            let maximum_channel = red.max(green.max(blue));
            let minimum_channel = red.min(green.min(blue));
            let lightness = (maximum_channel + minimum_channel) * 0.5;

            let chroma = maximum_channel - minimum_channel;
            if chroma <= 1e-12 {
                return (0.0, 0.0, lightness);
            }

            let saturation = if lightness > 0.5 {
                chroma / (2.0 - maximum_channel - minimum_channel)
            } else {
                chroma / (maximum_channel + minimum_channel)
            };

            let hue_sixths = if maximum_channel == red {
                (green - blue) / chroma + if green < blue { 6.0 } else { 0.0 }
            } else if maximum_channel == green {
                (blue - red) / chroma + 2.0
            } else {
                (red - green) / chroma + 4.0
            };

            (hue_sixths / 6.0, saturation, lightness)
        }
    }

    impl From<Pixel> for [Byte; CHANNELS] {
        fn from(pixel: Pixel) -> Self {
            [pixel.red, pixel.green, pixel.blue, pixel.alpha]
        }
    }
}

#[cfg(test)]
mod tests {
    use super::pixel::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn luminance_uses_rec601_weights() {
        let white = Pixel::new(255, 255, 255, 255);
        assert_abs_diff_eq!(white.luminance(), 255.0, epsilon = 1e-9);
        assert_eq!(white.gray(), 255);

        let green = Pixel::new(0, 255, 0, 255);
        assert_abs_diff_eq!(green.luminance(), 0.587 * 255.0, epsilon = 1e-9);
        assert_eq!(green.gray(), 150);
    }

    #[test]
    fn read_indexes_interleaved_rgba() {
        let data = [1, 2, 3, 4, 10, 20, 30, 40];
        assert_eq!(Pixel::read(&data, 1), Pixel::new(10, 20, 30, 40));
    }

    #[test]
    fn color_distance_is_manhattan() {
        let pixel = Pixel::new(100, 120, 140, 255);
        assert_abs_diff_eq!(
            pixel.color_distance(&[110.0, 100.0, 140.5]),
            10.0 + 20.0 + 0.5,
            epsilon = 1e-9
        );
    }

    #[test]
    fn hsl_of_primaries_and_grays() {
        let (h, s, l) = Pixel::new(255, 0, 0, 255).hsl();
        assert_abs_diff_eq!(h, 0.0, epsilon = 1e-9);
        assert_abs_diff_eq!(s, 1.0, epsilon = 1e-9);
        assert_abs_diff_eq!(l, 0.5, epsilon = 1e-9);

        let (h, _, _) = Pixel::new(0, 0, 255, 255).hsl();
        assert_abs_diff_eq!(h, 2.0 / 3.0, epsilon = 1e-9);

        let (h, s, l) = Pixel::new(128, 128, 128, 255).hsl();
        assert_eq!((h, s), (0.0, 0.0));
        assert_abs_diff_eq!(l, 128.0 / 255.0, epsilon = 1e-9);
    }
}
