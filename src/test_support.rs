//! Synthetic fixtures shared by the unit tests.

use crate::core_modules::mask_provider::{LabeledMask, MaskProviderError};
use crate::core_modules::raster::{BinaryMask, RasterBuffer};

pub fn uniform(width: u32, height: u32, rgb: [u8; 3]) -> RasterBuffer {
    RasterBuffer::filled(width, height, [rgb[0], rgb[1], rgb[2], 255])
}

/// Mid-gray (128) with the listed columns painted near-black (10).
pub fn gray_with_dark_strip(width: u32, height: u32, columns: &[u32]) -> RasterBuffer {
    let mut raster = uniform(width, height, [128, 128, 128]);
    for y in 0..height {
        for &x in columns {
            raster.set_pixel_at(x, y, [10, 10, 10, 255]);
        }
    }
    raster
}

/// Mid-gray with one brighter column. Its gradient (30) sits inside the edge
/// threshold range, so whether it becomes a barrier depends on the threshold.
pub fn textured(width: u32, height: u32) -> RasterBuffer {
    let mut raster = uniform(width, height, [128, 128, 128]);
    let column = width / 2;
    for y in 0..height {
        raster.set_pixel_at(column, y, [158, 158, 158, 255]);
    }
    raster
}

/// Mid-gray with a 143/158/173 ramp centered on each listed column. The
/// center's gradient (30) is an edge at strict thresholds and wall texture at
/// lenient ones.
pub fn ramped_columns(width: u32, height: u32, centers: &[u32]) -> RasterBuffer {
    let mut raster = uniform(width, height, [128, 128, 128]);
    for y in 0..height {
        for &x in centers {
            for (offset, value) in [(0u32, 143u8), (1, 158), (2, 173)] {
                if let Some(column) = (x + offset).checked_sub(1).filter(|&c| c < width) {
                    raster.set_pixel_at(column, y, [value, value, value, 255]);
                }
            }
        }
    }
    raster
}

/// A provider answer covering the whole frame with one label.
pub fn full_frame(label: &str, width: u32, height: u32) -> Result<Vec<LabeledMask>, MaskProviderError> {
    let mask = BinaryMask::from_bits(width, height, vec![1; (width * height) as usize])
        .map_err(|e| MaskProviderError::Request(e.to_string()))?;
    Ok(vec![LabeledMask::new(label, mask)])
}
