// THEORY:
// The Buffer Preparer is the only stage that touches encoded image bytes. It
// turns whatever the host hands over (a file, an in-memory encoding, or an
// already-decoded RGBA buffer) into the two rasters the rest of the pipeline
// works on:
// 1.  The **original** buffer at full resolution. Lighting and compositing run
//     here, so the painted result never loses detail.
// 2.  The **working** buffer, downscaled so its width is at most
//     `max_analysis_width`. Segmentation runs here; its cost grows with pixel
//     count and its heuristics do not need more resolution. Aspect ratio is
//     preserved and small images are never upscaled.

use crate::core_modules::raster::RasterBuffer;
use crate::error::{PipelineError, Result};
use image::imageops::{self, FilterType};
use image::{ExtendedColorType, ImageEncoder, RgbaImage};
use std::path::Path;

/// Decodes any format the `image` crate recognizes into an RGBA raster.
pub fn decode(bytes: &[u8]) -> Result<RasterBuffer> {
    let image = image::load_from_memory(bytes)?;
    non_empty(RasterBuffer::from_rgba_image(image.to_rgba8()))
}

pub fn open(path: impl AsRef<Path>) -> Result<RasterBuffer> {
    let image = image::open(path)?;
    non_empty(RasterBuffer::from_rgba_image(image.to_rgba8()))
}

fn non_empty(raster: RasterBuffer) -> Result<RasterBuffer> {
    if raster.is_empty() {
        return Err(PipelineError::EmptyImage);
    }
    Ok(raster)
}

/// Dimensions of the working buffer for a `width` x `height` source.
pub fn working_dimensions(width: u32, height: u32, max_analysis_width: u32) -> (u32, u32) {
    let max_analysis_width = max_analysis_width.max(1);
    if width <= max_analysis_width {
        return (width, height);
    }
    let scale = max_analysis_width as f64 / width as f64;
    let scaled_height = ((height as f64 * scale).round() as u32).max(1);
    (max_analysis_width, scaled_height)
}

/// Produces the working buffer. Returns a clone when no scaling is needed.
pub fn prepare(original: &RasterBuffer, max_analysis_width: u32) -> Result<RasterBuffer> {
    if original.is_empty() {
        return Err(PipelineError::EmptyImage);
    }

    let (width, height) = working_dimensions(original.width(), original.height(), max_analysis_width);
    if (width, height) == original.dimensions() {
        return Ok(original.clone());
    }

    let source = RgbaImage::from_raw(
        original.width(),
        original.height(),
        original.as_bytes().to_vec(),
    )
    .ok_or(PipelineError::BufferSize {
        width: original.width(),
        height: original.height(),
        expected: original.pixel_count() * 4,
        actual: original.as_bytes().len(),
    })?;

    let resized = imageops::resize(&source, width, height, FilterType::Triangle);
    Ok(RasterBuffer::from_rgba_image(resized))
}

/// Writes a raster to disk as PNG.
pub fn save_png(path: impl AsRef<Path>, raster: &RasterBuffer) -> Result<()> {
    let output = std::io::BufWriter::new(std::fs::File::create(path)?);
    let encoder = image::codecs::png::PngEncoder::new(output);
    encoder.write_image(
        raster.as_bytes(),
        raster.width(),
        raster.height(),
        ExtendedColorType::Rgba8,
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn never_upscales() {
        assert_eq!(working_dimensions(320, 200, 600), (320, 200));
        assert_eq!(working_dimensions(600, 10, 600), (600, 10));
    }

    #[test]
    fn downscale_preserves_aspect() {
        assert_eq!(working_dimensions(1200, 800, 600), (600, 400));
        assert_eq!(working_dimensions(6000, 1, 600), (600, 1));
    }

    #[test]
    fn prepare_resizes_large_buffers() {
        let original = RasterBuffer::filled(1200, 300, [120, 130, 140, 255]);
        let working = prepare(&original, 600).unwrap();
        assert_eq!(working.dimensions(), (600, 150));
        let pixel = working.pixel_at(300, 75);
        assert_eq!((pixel.red, pixel.green, pixel.blue), (120, 130, 140));
    }

    #[test]
    fn prepare_rejects_empty() {
        let empty = RasterBuffer::new(0, 0, Vec::new()).unwrap();
        assert!(matches!(prepare(&empty, 600), Err(PipelineError::EmptyImage)));
    }

    #[test]
    fn decode_round_trips_through_png() {
        let mut raster = RasterBuffer::filled(3, 2, [10, 20, 30, 255]);
        raster.set_pixel_at(2, 1, [200, 100, 50, 255]);

        let path = std::env::temp_dir().join("wall_vision_decode_round_trip.png");
        save_png(&path, &raster).unwrap();
        let bytes = std::fs::read(&path).unwrap();
        let _ = std::fs::remove_file(&path);

        assert_eq!(decode(&bytes).unwrap(), raster);
    }

    #[test]
    fn decode_reports_garbage() {
        assert!(matches!(decode(b"not an image"), Err(PipelineError::Decode(_))));
    }
}
