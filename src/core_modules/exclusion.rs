// THEORY:
// The exclusion classifier is a per-pixel veto. A pixel it rejects can never
// become wall, no matter how similar its color is to the reference. Each rule
// encodes one common non-wall region in a building photo:
//
// 1.  **Sky**: bright pixels in the top 12% of the frame.
// 2.  **Ground**: dark pixels in the bottom 8%.
// 3.  **Clipped exposure**: near-black or near-white, where color carries no
//     information.
// 4.  **Structural edge**: anything the edge map flagged.
// 5.  **Vegetation**: green clearly dominating both red and blue.
// 6.  **Glare**: very bright pixels in the vertical middle band (glass).
//
// Rules are checked in that order and the first match wins, so the per-reason
// counts partition the excluded pixels.

use crate::core_modules::edge_map::EdgeField;
use crate::core_modules::raster::{BinaryMask, GrayscaleBuffer, RasterBuffer};
use crate::error::Result;
use rayon::prelude::*;
use std::ops::Add;

const SKY_BAND: f64 = 0.12;
const SKY_BRIGHTNESS: u8 = 170;
const GROUND_BAND: f64 = 0.92;
const GROUND_BRIGHTNESS: u8 = 110;
const CLIPPED_DARK: u8 = 15;
const CLIPPED_BRIGHT: u8 = 250;
const VEGETATION_GREEN_OVER_RED: i32 = 35;
const VEGETATION_GREEN_OVER_BLUE: i32 = 30;
const GLARE_BRIGHTNESS: u8 = 235;
const GLARE_BAND: (f64, f64) = (0.15, 0.85);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExclusionReason {
    Sky,
    Ground,
    ClippedExposure,
    StructuralEdge,
    Vegetation,
    Glare,
}

/// How many pixels each rule rejected.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ExclusionCounts {
    pub sky: usize,
    pub ground: usize,
    pub clipped_exposure: usize,
    pub structural_edge: usize,
    pub vegetation: usize,
    pub glare: usize,
}

impl ExclusionCounts {
    pub fn total(&self) -> usize {
        self.sky
            + self.ground
            + self.clipped_exposure
            + self.structural_edge
            + self.vegetation
            + self.glare
    }

    fn record(&mut self, reason: ExclusionReason) {
        match reason {
            ExclusionReason::Sky => self.sky += 1,
            ExclusionReason::Ground => self.ground += 1,
            ExclusionReason::ClippedExposure => self.clipped_exposure += 1,
            ExclusionReason::StructuralEdge => self.structural_edge += 1,
            ExclusionReason::Vegetation => self.vegetation += 1,
            ExclusionReason::Glare => self.glare += 1,
        }
    }
}

impl Add for ExclusionCounts {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Self {
            sky: self.sky + other.sky,
            ground: self.ground + other.ground,
            clipped_exposure: self.clipped_exposure + other.clipped_exposure,
            structural_edge: self.structural_edge + other.structural_edge,
            vegetation: self.vegetation + other.vegetation,
            glare: self.glare + other.glare,
        }
    }
}

/// The exclusion mask together with its diagnostics.
#[derive(Debug, Clone, PartialEq)]
pub struct ExclusionMap {
    pub mask: BinaryMask,
    pub counts: ExclusionCounts,
}

/// Classifies one pixel. `None` means the pixel may join the wall.
#[inline]
pub fn classify_pixel(
    rgb: [u8; 3],
    brightness: u8,
    is_edge: bool,
    y: u32,
    height: u32,
) -> Option<ExclusionReason> {
    let y = y as f64;
    let h = height as f64;
    let [red, green, blue] = rgb.map(i32::from);

    if y < SKY_BAND * h && brightness > SKY_BRIGHTNESS {
        Some(ExclusionReason::Sky)
    } else if y > GROUND_BAND * h && brightness < GROUND_BRIGHTNESS {
        Some(ExclusionReason::Ground)
    } else if brightness < CLIPPED_DARK || brightness > CLIPPED_BRIGHT {
        Some(ExclusionReason::ClippedExposure)
    } else if is_edge {
        Some(ExclusionReason::StructuralEdge)
    } else if green > red + VEGETATION_GREEN_OVER_RED && green > blue + VEGETATION_GREEN_OVER_BLUE {
        Some(ExclusionReason::Vegetation)
    } else if brightness > GLARE_BRIGHTNESS && y > GLARE_BAND.0 * h && y < GLARE_BAND.1 * h {
        Some(ExclusionReason::Glare)
    } else {
        None
    }
}

/// Builds the exclusion mask for a working buffer.
pub fn classify(raster: &RasterBuffer, gray: &GrayscaleBuffer, edges: &EdgeField) -> Result<ExclusionMap> {
    raster.ensure_dimensions(gray.width(), gray.height())?;
    raster.ensure_dimensions(edges.width(), edges.height())?;

    let width = raster.width() as usize;
    let height = raster.height();
    let mut bits = vec![0u8; raster.pixel_count()];
    if width == 0 {
        return Ok(ExclusionMap {
            mask: BinaryMask::from_raw(raster.width(), height, bits),
            counts: ExclusionCounts::default(),
        });
    }

    let counts = bits
        .par_chunks_mut(width)
        .enumerate()
        .map(|(y, row)| {
            let mut counts = ExclusionCounts::default();
            for (x, bit) in row.iter_mut().enumerate() {
                let index = y * width + x;
                let pixel = raster.pixel(index);
                let reason = classify_pixel(
                    [pixel.red, pixel.green, pixel.blue],
                    gray.get(index),
                    edges.is_edge(index),
                    y as u32,
                    height,
                );
                if let Some(reason) = reason {
                    *bit = 1;
                    counts.record(reason);
                }
            }
            counts
        })
        .reduce(ExclusionCounts::default, Add::add);

    Ok(ExclusionMap {
        mask: BinaryMask::from_raw(raster.width(), height, bits),
        counts,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EdgeOperator;

    #[test]
    fn sky_wins_over_clipping_in_the_top_band() {
        assert_eq!(
            classify_pixel([255, 255, 255], 255, false, 0, 100),
            Some(ExclusionReason::Sky)
        );
        assert_eq!(
            classify_pixel([255, 255, 255], 255, false, 50, 100),
            Some(ExclusionReason::ClippedExposure)
        );
    }

    #[test]
    fn ground_and_vegetation() {
        assert_eq!(
            classify_pixel([90, 90, 90], 90, false, 95, 100),
            Some(ExclusionReason::Ground)
        );
        assert_eq!(
            classify_pixel([60, 140, 70], 111, false, 50, 100),
            Some(ExclusionReason::Vegetation)
        );
    }

    #[test]
    fn edge_outranks_vegetation() {
        assert_eq!(
            classify_pixel([60, 140, 70], 111, true, 50, 100),
            Some(ExclusionReason::StructuralEdge)
        );
    }

    #[test]
    fn glare_only_in_the_middle_band() {
        assert_eq!(
            classify_pixel([240, 240, 240], 240, false, 50, 100),
            Some(ExclusionReason::Glare)
        );
        assert_eq!(classify_pixel([240, 240, 240], 240, false, 10, 100), Some(ExclusionReason::Sky));
        assert_eq!(classify_pixel([240, 240, 240], 240, false, 88, 100), None);
    }

    #[test]
    fn mid_gray_is_eligible() {
        assert_eq!(classify_pixel([128, 128, 128], 128, false, 50, 100), None);
    }

    #[test]
    fn counts_partition_the_mask() {
        let mut raster = RasterBuffer::filled(10, 10, [128, 128, 128, 255]);
        raster.set_pixel_at(5, 0, [250, 250, 250, 255]);
        raster.set_pixel_at(5, 5, [5, 5, 5, 255]);
        raster.set_pixel_at(2, 5, [40, 200, 40, 255]);
        let gray = GrayscaleBuffer::from_raster(&raster);
        let edges = EdgeField::build(&gray, 80, EdgeOperator::Central);

        let map = classify(&raster, &gray, &edges).unwrap();
        assert_eq!(map.counts.total(), map.mask.count());
        assert_eq!(map.counts.sky, 1);
        assert!(map.counts.clipped_exposure >= 1);
        assert!(map.mask.is_set_at(5, 5));
        assert!(!map.mask.is_set_at(8, 8));
    }
}
