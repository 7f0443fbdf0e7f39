// THEORY:
// The lighting analyzer reads the *original* photo and records how light falls
// on it, so the compositor can put the same shading back on top of a flat
// paint color. It never looks at the wall mask: lighting is a property of the
// scene, and keeping the two passes independent lets them run side by side.
//
// Per pixel:
// - luminance in [0, 1] (Rec. 601 weights over 255)
// - depth: normalized gradient strength, a cheap stand-in for surface relief
// - texture: local contrast, twice the 3x3 standard deviation of luminance
// - shadow / highlight: luminance more than 0.6 standard deviations below or
//   above the image mean
// Globally: mean and standard deviation of luminance, and the dominant light
// direction, which points against the summed brightness gradient.
//
// Border pixels lack a full neighborhood and carry zeros. Per-row gradient sums
// are collected and added in row order, so the result is bit-for-bit stable.

use crate::core_modules::raster::{BinaryMask, RasterBuffer};
use crate::error::Result;
use rayon::prelude::*;

const SHADOW_HIGHLIGHT_SIGMA: f64 = 0.6;
const DEPTH_NORMALIZER: f64 = 510.0;
const TEXTURE_GAIN: f64 = 2.0;

#[derive(Debug, Clone, PartialEq)]
pub struct LightingField {
    width: u32,
    height: u32,
    pub luminance: Vec<f32>,
    pub depth: Vec<f32>,
    pub texture: Vec<f32>,
    pub is_shadow: BinaryMask,
    pub is_highlight: BinaryMask,
    pub mean_luminance: f64,
    pub std_luminance: f64,
    /// The summed luminance gradient, negated and normalized, or `[0.0, 0.0]`
    /// when there is no net gradient.
    pub light_direction: [f64; 2],
}

impl LightingField {
    pub fn analyze(raster: &RasterBuffer) -> Self {
        let width = raster.width() as usize;
        let height = raster.height() as usize;
        let pixel_count = raster.pixel_count();

        let luminance: Vec<f32> = (0..pixel_count)
            .into_par_iter()
            .map(|index| (raster.pixel(index).luminance() / 255.0) as f32)
            .collect();

        let (mean_luminance, std_luminance) = mean_and_std(&luminance);
        let shadow_below = mean_luminance - SHADOW_HIGHLIGHT_SIGMA * std_luminance;
        let highlight_above = mean_luminance + SHADOW_HIGHLIGHT_SIGMA * std_luminance;

        let mut depth = vec![0.0f32; pixel_count];
        let mut texture = vec![0.0f32; pixel_count];
        let mut shadow_bits = vec![0u8; pixel_count];
        let mut highlight_bits = vec![0u8; pixel_count];
        let mut light_direction = [0.0, 0.0];

        if width >= 3 && height >= 3 {
            let row_sums: Vec<(f64, f64)> = depth
                .par_chunks_mut(width)
                .zip(texture.par_chunks_mut(width))
                .zip(shadow_bits.par_chunks_mut(width))
                .zip(highlight_bits.par_chunks_mut(width))
                .enumerate()
                .map(|(y, (((depth_row, texture_row), shadow_row), highlight_row))| {
                    if y == 0 || y == height - 1 {
                        return (0.0, 0.0);
                    }
                    let lum = |x: usize, y: usize| luminance[y * width + x] as f64;
                    let mut sum_gx = 0.0;
                    let mut sum_gy = 0.0;
                    for x in 1..width - 1 {
                        let gx = (lum(x + 1, y) - lum(x - 1, y)) * 255.0;
                        let gy = (lum(x, y + 1) - lum(x, y - 1)) * 255.0;
                        sum_gx += gx;
                        sum_gy += gy;

                        depth_row[x] = ((gx * gx + gy * gy).sqrt() / DEPTH_NORMALIZER).clamp(0.0, 1.0) as f32;
                        texture_row[x] = (TEXTURE_GAIN * window_std(&luminance, width, x, y)).clamp(0.0, 1.0) as f32;

                        let center = lum(x, y);
                        shadow_row[x] = u8::from(center < shadow_below);
                        highlight_row[x] = u8::from(center > highlight_above);
                    }
                    (sum_gx, sum_gy)
                })
                .collect();

            let (sum_gx, sum_gy) = row_sums
                .iter()
                .fold((0.0, 0.0), |acc, row| (acc.0 + row.0, acc.1 + row.1));
            let norm = (sum_gx * sum_gx + sum_gy * sum_gy).sqrt();
            if norm > f64::EPSILON {
                light_direction = [-sum_gx / norm, -sum_gy / norm];
            }
        }

        Self {
            width: raster.width(),
            height: raster.height(),
            luminance,
            depth,
            texture,
            is_shadow: BinaryMask::from_raw(raster.width(), raster.height(), shadow_bits),
            is_highlight: BinaryMask::from_raw(raster.width(), raster.height(), highlight_bits),
            mean_luminance,
            std_luminance,
            light_direction,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Fails with `DimensionMismatch` unless this field was built for `raster`'s size.
    pub fn ensure_matches(&self, raster: &RasterBuffer) -> Result<()> {
        raster.ensure_dimensions(self.width, self.height)
    }
}

/// Population mean and standard deviation.
fn mean_and_std(values: &[f32]) -> (f64, f64) {
    if values.is_empty() {
        return (0.0, 0.0);
    }
    let count = values.len() as f64;
    let mean = values.iter().map(|&v| v as f64).sum::<f64>() / count;
    let variance = values
        .iter()
        .map(|&v| {
            let delta = v as f64 - mean;
            delta * delta
        })
        .sum::<f64>()
        / count;
    (mean, variance.sqrt())
}

/// Population standard deviation of the 3x3 window centered on an interior pixel.
fn window_std(luminance: &[f32], width: usize, x: usize, y: usize) -> f64 {
    let mut sum = 0.0;
    let mut sum_sq = 0.0;
    for ny in y - 1..=y + 1 {
        for nx in x - 1..=x + 1 {
            let value = luminance[ny * width + nx] as f64;
            sum += value;
            sum_sq += value * value;
        }
    }
    let mean = sum / 9.0;
    (sum_sq / 9.0 - mean * mean).max(0.0).sqrt()
}
