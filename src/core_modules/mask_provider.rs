// THEORY:
// A `MaskProvider` is an optional, pluggable source of wall masks, typically a
// semantic segmentation model running somewhere else. The pipeline never
// depends on one: when a provider fails or finds nothing, the local
// segmenter's mask is used instead.
//
// Providers return labeled masks. Labels are matched case-insensitively
// against two fixed vocabularies: wall-like labels are unioned into the wall,
// and labels for things that sit on or in front of a wall (windows, doors,
// people, plants) are subtracted from it.

use crate::core_modules::raster::{BinaryMask, RasterBuffer};
use image::imageops::{self, FilterType};
use thiserror::Error;

pub const INCLUDE_LABELS: &[&str] = &[
    "wall",
    "building",
    "house",
    "facade",
    "exterior wall",
    "interior wall",
    "wall-brick",
    "wall-concrete",
    "wall-stone",
    "wall-tile",
    "wall-panel",
    "wall-other",
    "ceiling-merged",
    "floor-other",
];

pub const EXCLUDE_LABELS: &[&str] = &[
    "window",
    "door",
    "roof",
    "sky",
    "pole",
    "tree",
    "road",
    "car",
    "person",
    "ceiling",
    "floor",
    "plant",
    "signboard",
    "fence",
    "railing",
    "column",
    "grill",
    "wire",
    "light",
    "lamp",
    "vent",
    "water",
    "grass",
    "sidewalk",
    "pavement",
    "curtain",
    "blind",
    "furniture",
];

/// Decoded mask pixels count as set above these levels.
const MASK_ALPHA_THRESHOLD: u8 = 128;
const MASK_BRIGHTNESS_THRESHOLD: f64 = 120.0;

#[derive(Error, Debug)]
pub enum MaskProviderError {
    #[error("Mask provider unavailable: {0}")]
    Unavailable(String),

    #[error("Mask provider request failed: {0}")]
    Request(String),

    #[error("Failed to decode provider mask: {0}")]
    Decode(#[from] image::ImageError),
}

/// One labeled region from a provider, at any resolution.
#[derive(Debug, Clone, PartialEq)]
pub struct LabeledMask {
    pub label: String,
    pub mask: BinaryMask,
}

impl LabeledMask {
    pub fn new(label: impl Into<String>, mask: BinaryMask) -> Self {
        Self {
            label: label.into(),
            mask,
        }
    }

    /// Decodes an encoded mask image (PNG and friends) and resizes it to
    /// `width` x `height` with nearest-neighbor sampling. A pixel is set when
    /// it is mostly opaque and bright.
    pub fn from_encoded(
        label: impl Into<String>,
        bytes: &[u8],
        width: u32,
        height: u32,
    ) -> Result<Self, MaskProviderError> {
        let decoded = image::load_from_memory(bytes)?.to_rgba8();
        let resized = if decoded.dimensions() == (width, height) {
            decoded
        } else {
            imageops::resize(&decoded, width, height, FilterType::Nearest)
        };

        let bits = resized
            .pixels()
            .map(|p| {
                let [red, green, blue, alpha] = p.0;
                let brightness = (red as f64 + green as f64 + blue as f64) / 3.0;
                u8::from(alpha > MASK_ALPHA_THRESHOLD && brightness > MASK_BRIGHTNESS_THRESHOLD)
            })
            .collect();

        Ok(Self::new(label, BinaryMask::from_raw(width, height, bits)))
    }

    pub fn is_include(&self) -> bool {
        matches_label(INCLUDE_LABELS, &self.label)
    }

    pub fn is_exclude(&self) -> bool {
        matches_label(EXCLUDE_LABELS, &self.label)
    }
}

fn matches_label(vocabulary: &[&str], label: &str) -> bool {
    let label = label.trim();
    vocabulary.iter().any(|known| known.eq_ignore_ascii_case(label))
}

/// An external segmentation source.
pub trait MaskProvider: Send + Sync {
    fn segment(&self, raster: &RasterBuffer) -> Result<Vec<LabeledMask>, MaskProviderError>;
}

impl<F> MaskProvider for F
where
    F: Fn(&RasterBuffer) -> Result<Vec<LabeledMask>, MaskProviderError> + Send + Sync,
{
    fn segment(&self, raster: &RasterBuffer) -> Result<Vec<LabeledMask>, MaskProviderError> {
        self(raster)
    }
}

/// Unions the include masks and subtracts the exclude masks, all resampled to
/// `width` x `height`. Labels in neither vocabulary are ignored.
pub fn combine(masks: &[LabeledMask], width: u32, height: u32) -> BinaryMask {
    let mut wall = BinaryMask::new(width, height);
    let mut blocked = BinaryMask::new(width, height);

    for labeled in masks {
        let target = if labeled.is_include() {
            &mut wall
        } else if labeled.is_exclude() {
            &mut blocked
        } else {
            continue;
        };
        let resampled = labeled.mask.resample_nearest(width, height);
        for (bit, &other) in target.bits_mut().iter_mut().zip(resampled.bits()) {
            *bit |= other;
        }
    }

    for (bit, &other) in wall.bits_mut().iter_mut().zip(blocked.bits()) {
        if other != 0 {
            *bit = 0;
        }
    }
    wall
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgba, RgbaImage};
    use std::io::Cursor;

    fn full(width: u32, height: u32) -> BinaryMask {
        BinaryMask::from_bits(width, height, vec![1; (width * height) as usize]).unwrap()
    }

    #[test]
    fn labels_match_case_insensitively() {
        assert!(LabeledMask::new("Wall-Brick", full(1, 1)).is_include());
        assert!(LabeledMask::new(" WINDOW ", full(1, 1)).is_exclude());
        let unknown = LabeledMask::new("bicycle", full(1, 1));
        assert!(!unknown.is_include() && !unknown.is_exclude());
    }

    #[test]
    fn combine_subtracts_excluded_regions() {
        let mut window = BinaryMask::new(4, 4);
        window.set(5, true);
        let masks = vec![
            LabeledMask::new("building", full(2, 2)),
            LabeledMask::new("window", window),
            LabeledMask::new("bicycle", BinaryMask::new(4, 4)),
        ];
        let combined = combine(&masks, 4, 4);
        assert_eq!(combined.count(), 15);
        assert!(!combined.is_set(5));
    }

    #[test]
    fn combine_without_includes_is_empty() {
        let combined = combine(&[LabeledMask::new("sky", full(3, 3))], 3, 3);
        assert_eq!(combined.count(), 0);
    }

    #[test]
    fn decodes_bright_opaque_pixels() {
        let mut image = RgbaImage::from_pixel(2, 2, Rgba([0, 0, 0, 255]));
        image.put_pixel(0, 0, Rgba([255, 255, 255, 255]));
        image.put_pixel(1, 0, Rgba([255, 255, 255, 10]));
        let mut bytes = Vec::new();
        image.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png).unwrap();

        let labeled = LabeledMask::from_encoded("wall", &bytes, 4, 4).unwrap();
        assert_eq!(labeled.mask.dimensions(), (4, 4));
        assert_eq!(labeled.mask.count(), 4);
        assert!(labeled.mask.is_set_at(1, 1));
        assert!(!labeled.mask.is_set_at(2, 0));
    }

    #[test]
    fn closures_are_providers() {
        let provider = |_: &RasterBuffer| -> Result<Vec<LabeledMask>, MaskProviderError> {
            Err(MaskProviderError::Unavailable("offline".into()))
        };
        let raster = RasterBuffer::filled(1, 1, [0, 0, 0, 255]);
        assert!(provider.segment(&raster).is_err());
    }
}
