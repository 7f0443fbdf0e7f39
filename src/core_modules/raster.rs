// THEORY:
// Flat, arena-style buffers shared by every stage. A pixel is never an object;
// it is an index `y * width + x` into a contiguous `Vec`. Stages hand these
// buffers forward by value or by shared reference, so no two runs ever alias
// the same storage.
//
// - `RasterBuffer` owns interleaved RGBA bytes and validates its length once,
//   at construction, so the stages can index without re-checking.
// - `GrayscaleBuffer` is the derived single-channel view.
// - `BinaryMask` is the one representation for every yes/no raster: edge flags,
//   exclusion, raw and refined wall masks, and external provider masks.

use crate::core_modules::pixel::pixel::{CHANNELS, Pixel};
use crate::error::{PipelineError, Result};
use image::RgbaImage;
use rayon::prelude::*;

/// Interleaved RGBA raster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RasterBuffer {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl RasterBuffer {
    pub fn new(width: u32, height: u32, data: Vec<u8>) -> Result<Self> {
        let expected = width as usize * height as usize * CHANNELS;
        if data.len() != expected {
            return Err(PipelineError::BufferSize {
                width,
                height,
                expected,
                actual: data.len(),
            });
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// A buffer where every pixel has the same RGBA value.
    pub fn filled(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        let pixel_count = width as usize * height as usize;
        let mut data = Vec::with_capacity(pixel_count * CHANNELS);
        for _ in 0..pixel_count {
            data.extend_from_slice(&rgba);
        }
        Self {
            width,
            height,
            data,
        }
    }

    pub fn from_rgba_image(image: RgbaImage) -> Self {
        let (width, height) = image.dimensions();
        Self {
            width,
            height,
            data: image.into_raw(),
        }
    }

    pub fn into_rgba_image(self) -> Option<RgbaImage> {
        RgbaImage::from_raw(self.width, self.height, self.data)
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

    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    pub fn is_empty(&self) -> bool {
        self.pixel_count() == 0
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }

    #[inline]
    pub fn pixel(&self, index: usize) -> Pixel {
        Pixel::read(&self.data, index)
    }

    #[inline]
    pub fn pixel_at(&self, x: u32, y: u32) -> Pixel {
        self.pixel(y as usize * self.width as usize + x as usize)
    }

    pub fn set_pixel_at(&mut self, x: u32, y: u32, rgba: [u8; 4]) {
        let offset = (y as usize * self.width as usize + x as usize) * CHANNELS;
        self.data[offset..offset + CHANNELS].copy_from_slice(&rgba);
    }

    /// Fails fast when `other` does not share this buffer's dimensions.
    pub fn ensure_dimensions(&self, width: u32, height: u32) -> Result<()> {
        if self.width != width || self.height != height {
            return Err(PipelineError::DimensionMismatch {
                expected_width: self.width,
                expected_height: self.height,
                actual_width: width,
                actual_height: height,
            });
        }
        Ok(())
    }
}

/// Single-channel luminance raster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrayscaleBuffer {
    width: u32,
    height: u32,
    samples: Vec<u8>,
}

impl GrayscaleBuffer {
    /// Converts with `Y = 0.299R + 0.587G + 0.114B`, rounded.
    pub fn from_raster(raster: &RasterBuffer) -> Self {
        let samples = raster
            .as_bytes()
            .par_chunks_exact(CHANNELS)
            .map(|rgba| Pixel::new(rgba[0], rgba[1], rgba[2], rgba[3]).gray())
            .collect();
        Self {
            width: raster.width(),
            height: raster.height(),
            samples,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    #[inline]
    pub fn get(&self, index: usize) -> u8 {
        self.samples[index]
    }

    pub fn samples(&self) -> &[u8] {
        &self.samples
    }
}

/// Axis-aligned box enclosing every set pixel of a mask, inclusive on all sides.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundingBox {
    pub min_x: u32,
    pub min_y: u32,
    pub max_x: u32,
    pub max_y: u32,
}

/// A width x height raster of 0/1 flags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinaryMask {
    width: u32,
    height: u32,
    bits: Vec<u8>,
}

impl BinaryMask {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            bits: vec![0; width as usize * height as usize],
        }
    }

    /// Wraps existing flags; any non-zero value is normalized to 1.
    pub fn from_bits(width: u32, height: u32, bits: Vec<u8>) -> Result<Self> {
        let expected = width as usize * height as usize;
        if bits.len() != expected {
            return Err(PipelineError::BufferSize {
                width,
                height,
                expected,
                actual: bits.len(),
            });
        }
        let bits = bits.into_iter().map(|b| u8::from(b != 0)).collect();
        Ok(Self {
            width,
            height,
            bits,
        })
    }

    /// Stage-internal constructor for flags already known to be 0/1 and sized.
    pub(crate) fn from_raw(width: u32, height: u32, bits: Vec<u8>) -> Self {
        debug_assert_eq!(bits.len(), width as usize * height as usize);
        Self {
            width,
            height,
            bits,
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

    pub fn len(&self) -> usize {
        self.bits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bits.is_empty()
    }

    #[inline]
    pub fn is_set(&self, index: usize) -> bool {
        self.bits[index] != 0
    }

    #[inline]
    pub fn is_set_at(&self, x: u32, y: u32) -> bool {
        self.is_set(y as usize * self.width as usize + x as usize)
    }

    #[inline]
    pub fn set(&mut self, index: usize, value: bool) {
        self.bits[index] = u8::from(value);
    }

    pub fn bits(&self) -> &[u8] {
        &self.bits
    }

    pub(crate) fn bits_mut(&mut self) -> &mut [u8] {
        &mut self.bits
    }

    pub fn count(&self) -> usize {
        self.bits.iter().filter(|&&b| b != 0).count()
    }

    /// Set pixels as a percentage of all pixels.
    pub fn coverage_percent(&self) -> f64 {
        if self.bits.is_empty() {
            return 0.0;
        }
        self.count() as f64 / self.bits.len() as f64 * 100.0
    }

    pub fn bounding_box(&self) -> Option<BoundingBox> {
        let width = self.width as usize;
        let mut bounds: Option<BoundingBox> = None;
        for (index, _) in self.bits.iter().enumerate().filter(|(_, b)| **b != 0) {
            let x = (index % width) as u32;
            let y = (index / width) as u32;
            bounds = Some(match bounds {
                None => BoundingBox {
                    min_x: x,
                    min_y: y,
                    max_x: x,
                    max_y: y,
                },
                Some(b) => BoundingBox {
                    min_x: b.min_x.min(x),
                    min_y: b.min_y.min(y),
                    max_x: b.max_x.max(x),
                    max_y: b.max_y.max(y),
                },
            });
        }
        bounds
    }

    /// In-place union with a same-sized mask.
    pub fn union_with(&mut self, other: &BinaryMask) -> Result<()> {
        self.ensure_same_size(other)?;
        for (bit, other_bit) in self.bits.iter_mut().zip(&other.bits) {
            *bit |= *other_bit;
        }
        Ok(())
    }

    /// In-place difference: clears every pixel set in `other`.
    pub fn subtract(&mut self, other: &BinaryMask) -> Result<()> {
        self.ensure_same_size(other)?;
        for (bit, other_bit) in self.bits.iter_mut().zip(&other.bits) {
            if *other_bit != 0 {
                *bit = 0;
            }
        }
        Ok(())
    }

    /// Nearest-neighbor resample to `width` x `height`.
    pub fn resample_nearest(&self, width: u32, height: u32) -> BinaryMask {
        if width == self.width && height == self.height {
            return self.clone();
        }
        let mut resampled = BinaryMask::new(width, height);
        if self.bits.is_empty() || width == 0 || height == 0 {
            return resampled;
        }

        let scale_x = self.width as f64 / width as f64;
        let scale_y = self.height as f64 / height as f64;
        let source_width = self.width as usize;
        let target_width = width as usize;

        resampled
            .bits
            .par_chunks_mut(target_width)
            .enumerate()
            .for_each(|(y, row)| {
                let sy = ((y as f64 * scale_y).floor() as usize).min(self.height as usize - 1);
                for (x, bit) in row.iter_mut().enumerate() {
                    let sx = ((x as f64 * scale_x).floor() as usize).min(source_width - 1);
                    *bit = self.bits[sy * source_width + sx];
                }
            });
        resampled
    }

    /// Renders set pixels white on black, for debugging output.
    pub fn to_rgba_image(&self) -> Option<RgbaImage> {
        let mut data = Vec::with_capacity(self.bits.len() * CHANNELS);
        for &bit in &self.bits {
            let value = if bit != 0 { 255 } else { 0 };
            data.extend_from_slice(&[value, value, value, 255]);
        }
        RgbaImage::from_raw(self.width, self.height, data)
    }

    pub fn ensure_same_size(&self, other: &BinaryMask) -> Result<()> {
        if self.dimensions() != other.dimensions() {
            return Err(PipelineError::DimensionMismatch {
                expected_width: self.width,
                expected_height: self.height,
                actual_width: other.width,
                actual_height: other.height,
            });
        }
        Ok(())
    }
}
