// THEORY:
// After compositing, the wall boundary is a hard step from paint to photo.
// The blender softens that step by pulling each boundary pixel a quarter of
// the way toward a weighted average of its 5x5 neighborhood. Wall samples count
// fully and non-wall samples at 0.35, so the paint edge bleeds only a little
// into the surroundings.
//
// All samples come from a snapshot taken before blending starts. A pixel's
// result therefore never depends on whether a neighbor was blended first.

use crate::core_modules::pixel::pixel::{CHANNELS, Pixel};
use crate::core_modules::raster::{BinaryMask, RasterBuffer};
use rayon::prelude::*;

const BLEND_RADIUS: i64 = 2;
const WALL_WEIGHT: f64 = 1.0;
const NON_WALL_WEIGHT: f64 = 0.35;
const BLEND_FACTOR: f64 = 0.25;

/// True for a wall pixel with at least one in-bounds non-wall 8-neighbor.
pub fn is_boundary(mask: &BinaryMask, x: i64, y: i64) -> bool {
    let width = mask.width() as i64;
    let height = mask.height() as i64;
    if !mask.is_set((y * width + x) as usize) {
        return false;
    }
    for ny in (y - 1).max(0)..=(y + 1).min(height - 1) {
        for nx in (x - 1).max(0)..=(x + 1).min(width - 1) {
            if !mask.is_set((ny * width + nx) as usize) {
                return true;
            }
        }
    }
    false
}

/// Softens the wall boundary in place and returns how many pixels were blended.
/// The mask is resampled to the buffer first when the sizes differ.
pub fn blend_edges(buffer: &mut RasterBuffer, mask: &BinaryMask) -> usize {
    let mask = mask.resample_nearest(buffer.width(), buffer.height());
    let width = buffer.width() as usize;
    let height = buffer.height() as i64;
    if width == 0 || mask.count() == 0 {
        return 0;
    }

    let snapshot = buffer.as_bytes().to_vec();
    buffer
        .as_bytes_mut()
        .par_chunks_mut(width * CHANNELS)
        .enumerate()
        .map(|(y, row)| {
            let y = y as i64;
            let mut blended = 0usize;
            for x in 0..width as i64 {
                if !is_boundary(&mask, x, y) {
                    continue;
                }

                let mut sum = [0.0f64; 3];
                let mut total_weight = 0.0;
                for ny in (y - BLEND_RADIUS).max(0)..=(y + BLEND_RADIUS).min(height - 1) {
                    for nx in (x - BLEND_RADIUS).max(0)..=(x + BLEND_RADIUS).min(width as i64 - 1) {
                        let index = ny as usize * width + nx as usize;
                        let weight = if mask.is_set(index) { WALL_WEIGHT } else { NON_WALL_WEIGHT };
                        let sample = Pixel::read(&snapshot, index).rgb();
                        for (acc, channel) in sum.iter_mut().zip(sample) {
                            *acc += channel * weight;
                        }
                        total_weight += weight;
                    }
                }

                let center = Pixel::read(&snapshot, y as usize * width + x as usize).rgb();
                let offset = x as usize * CHANNELS;
                for channel in 0..3 {
                    let mean = sum[channel] / total_weight;
                    let value = center[channel] * (1.0 - BLEND_FACTOR) + mean * BLEND_FACTOR;
                    row[offset + channel] = value.round().clamp(0.0, 255.0) as u8;
                }
                blended += 1;
            }
            blended
        })
        .sum()
}
