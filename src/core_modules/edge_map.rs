// THEORY:
// The edge map marks pixels where brightness changes sharply. Walls are mostly
// smooth, so strong edges are treated as structural boundaries (window frames,
// corners, door jambs) that region growing must not cross.
//
// 1.  **Grayscale**: `Y = round(0.299R + 0.587G + 0.114B)`.
// 2.  **Gradient**: per interior pixel, either axis-aligned central differences
//     or imageproc's 3x3 Sobel gradients (divided by 4 so both share one
//     threshold scale). The magnitude is the L1 norm `|gx| + |gy|`.
// 3.  **Threshold**: `is_edge = magnitude > edge_threshold`.
//
// Border rows and columns have no full neighborhood; they carry magnitude 0 and
// are never edges. Rows are independent, so the pass runs row-parallel.

use crate::config::EdgeOperator;
use crate::core_modules::raster::{BinaryMask, GrayscaleBuffer};
use image::GrayImage;
use imageproc::gradients::{horizontal_sobel, vertical_sobel};
use rayon::prelude::*;

/// Sobel responses are four times the central difference of a clean step.
const SOBEL_SCALE: f32 = 4.0;

/// Per-pixel gradient magnitude plus the thresholded edge flags.
#[derive(Debug, Clone, PartialEq)]
pub struct EdgeField {
    width: u32,
    height: u32,
    /// Raw gradient units, not normalized.
    magnitude: Vec<f32>,
    is_edge: BinaryMask,
}

impl EdgeField {
    pub fn build(gray: &GrayscaleBuffer, edge_threshold: u32, operator: EdgeOperator) -> Self {
        let width = gray.width() as usize;
        let height = gray.height() as usize;
        let mut magnitude = vec![0.0f32; width * height];

        if width >= 3 && height >= 3 {
            let samples = gray.samples();
            let sobel = match operator {
                EdgeOperator::Central => None,
                EdgeOperator::Sobel => sobel_gradients(gray),
            };
            magnitude
                .par_chunks_mut(width)
                .enumerate()
                .filter(|(y, _)| *y > 0 && *y < height - 1)
                .for_each(|(y, row)| {
                    for x in 1..width - 1 {
                        let index = y * width + x;
                        row[x] = match &sobel {
                            Some((gx, gy)) => {
                                (gx[index].unsigned_abs() + gy[index].unsigned_abs()) as f32 / SOBEL_SCALE
                            }
                            None => central(samples, width, x, y),
                        };
                    }
                });
        }

        let threshold = edge_threshold as f32;
        let flags = magnitude.iter().map(|&m| u8::from(m > threshold)).collect();
        let is_edge = BinaryMask::from_raw(gray.width(), gray.height(), flags);

        Self {
            width: gray.width(),
            height: gray.height(),
            magnitude,
            is_edge,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    #[inline]
    pub fn is_edge(&self, index: usize) -> bool {
        self.is_edge.is_set(index)
    }

    #[inline]
    pub fn magnitude(&self, index: usize) -> f32 {
        self.magnitude[index]
    }

    pub fn magnitudes(&self) -> &[f32] {
        &self.magnitude
    }

    pub fn edge_mask(&self) -> &BinaryMask {
        &self.is_edge
    }
}

#[inline]
fn central(samples: &[u8], width: usize, x: usize, y: usize) -> f32 {
    let at = |x: usize, y: usize| samples[y * width + x] as i32;
    let gx = at(x + 1, y) - at(x - 1, y);
    let gy = at(x, y + 1) - at(x, y - 1);
    (gx.abs() + gy.abs()) as f32
}

/// Horizontal and vertical Sobel responses over the whole image. imageproc
/// clamps at the border; those values are discarded by the caller.
fn sobel_gradients(gray: &GrayscaleBuffer) -> Option<(Vec<i16>, Vec<i16>)> {
    let image = GrayImage::from_raw(gray.width(), gray.height(), gray.samples().to_vec())?;
    Some((horizontal_sobel(&image).into_raw(), vertical_sobel(&image).into_raw()))
}
