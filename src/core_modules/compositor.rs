// THEORY:
// The compositor is where the chosen paint color meets the photo. A flat fill
// would look like a sticker, so each wall pixel's paint is darkened by how
// much light that spot of the wall actually received.
//
// Key architectural principles & algorithm steps:
// 1.  **Luminance**: start from the lighting field's luminance (or the pixel's
//     own luma when no field is supplied) plus a small wall-type bias.
// 2.  **Shading cues**: shadows darken, highlights lift, strong relief (depth)
//     and rough texture each darken a little, weighted by the surface type.
// 3.  **Edge falloff**: pixels near the edge of the wall's bounding box are
//     dimmed slightly, mimicking ambient occlusion at corners.
// 4.  **Blend**: the paint is scaled by `1 - s + s * luminance` (`s` is the
//     shading strength) and mixed with the original pixel at the overlay
//     strength `k`. Alpha is forced opaque.
//
// An empty mask is a no-op: zero pixels painted and the buffer left untouched.

use crate::config::PipelineConfig;
use crate::core_modules::lighting::LightingField;
use crate::core_modules::paint_color::PaintColor;
use crate::core_modules::pixel::pixel::{CHANNELS, Pixel};
use crate::core_modules::raster::{BinaryMask, BoundingBox, RasterBuffer};
use crate::core_modules::surface::SurfaceContext;
use crate::error::Result;
use rayon::prelude::*;

const SHADOW_FACTOR: f64 = 0.92;
const HIGHLIGHT_GAIN: f64 = 1.05;
const HIGHLIGHT_LIFT: f64 = 0.02;
const DEPTH_DARKENING: f64 = 0.08;
const FALLOFF_BASE: f64 = 0.92;
const FALLOFF_RANGE: f64 = 0.1;

/// Blend coefficients for one run, resolved from the surface context and config.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompositeSettings {
    /// `k`: fraction of paint in the output pixel.
    pub overlay_strength: f64,
    /// `s`: how strongly luminance modulates the paint.
    pub shading_strength: f64,
    pub luminance_bias: f64,
    pub micro_texture: f64,
}

impl CompositeSettings {
    pub fn resolve(context: &SurfaceContext, config: &PipelineConfig) -> Self {
        Self {
            overlay_strength: config
                .overlay_override()
                .unwrap_or_else(|| context.condition.overlay_strength()),
            shading_strength: config.shading_strength(),
            luminance_bias: context.wall_type.luminance_bias(),
            micro_texture: context.surface_type.micro_texture(),
        }
    }
}

/// Paint scaled by the shading term `1 - s + s * luminance`.
#[inline]
pub fn shaded_target(paint: [f64; 3], luminance: f64, shading_strength: f64) -> [f64; 3] {
    let shade = 1.0 - shading_strength + shading_strength * luminance;
    paint.map(|channel| channel * shade)
}

/// `round(target * k + original * (1 - k))`, per channel.
#[inline]
pub fn blend_pixel(original: [u8; 3], target: [f64; 3], overlay_strength: f64) -> [u8; 3] {
    let mut out = [0u8; 3];
    for channel in 0..3 {
        let value = target[channel] * overlay_strength + original[channel] as f64 * (1.0 - overlay_strength);
        out[channel] = value.round().clamp(0.0, 255.0) as u8;
    }
    out
}

/// `0.92 + 0.1 * min(dx / spanX, dy / spanY)`, distances to the nearer box side.
#[inline]
pub fn edge_falloff(x: u32, y: u32, bounds: &BoundingBox) -> f64 {
    let span_x = (bounds.max_x - bounds.min_x).max(1) as f64;
    let span_y = (bounds.max_y - bounds.min_y).max(1) as f64;
    let dx = (x - bounds.min_x).min(bounds.max_x - x) as f64 / span_x;
    let dy = (y - bounds.min_y).min(bounds.max_y - y) as f64 / span_y;
    FALLOFF_BASE + FALLOFF_RANGE * dx.min(dy)
}

/// Paints every wall pixel of `buffer` in place and returns how many were painted.
///
/// `mask` may be at any resolution; it is resampled (nearest neighbor) to the
/// buffer. `lighting`, when given, must match the buffer's dimensions.
pub fn composite(
    buffer: &mut RasterBuffer,
    mask: &BinaryMask,
    lighting: Option<&LightingField>,
    color: &PaintColor,
    settings: &CompositeSettings,
) -> Result<usize> {
    if let Some(field) = lighting {
        field.ensure_matches(buffer)?;
    }

    let mask = mask.resample_nearest(buffer.width(), buffer.height());
    let Some(bounds) = mask.bounding_box() else {
        return Ok(0);
    };

    let width = buffer.width() as usize;
    let paint = color.rgb();
    let row_bytes = width * CHANNELS;

    let painted = buffer
        .as_bytes_mut()
        .par_chunks_mut(row_bytes)
        .enumerate()
        .map(|(y, row)| {
            let mut painted = 0usize;
            for x in 0..width {
                let index = y * width + x;
                if !mask.is_set(index) {
                    continue;
                }
                let offset = x * CHANNELS;
                let original = Pixel::read(row, x);

                let mut luminance = match lighting {
                    Some(field) => field.luminance[index] as f64,
                    None => original.luminance() / 255.0,
                };
                luminance = (luminance + settings.luminance_bias).clamp(0.0, 1.0);

                if let Some(field) = lighting {
                    if field.is_shadow.is_set(index) {
                        luminance *= SHADOW_FACTOR;
                    }
                    if field.is_highlight.is_set(index) {
                        luminance = (luminance * HIGHLIGHT_GAIN + HIGHLIGHT_LIFT).clamp(0.0, 1.0);
                    }
                    luminance *= 1.0 - DEPTH_DARKENING * field.depth[index] as f64;
                    luminance *= 1.0 - settings.micro_texture * field.texture[index] as f64;
                }
                luminance = (luminance * edge_falloff(x as u32, y as u32, &bounds)).clamp(0.0, 1.0);

                let target = shaded_target(paint, luminance, settings.shading_strength);
                let [red, green, blue] = blend_pixel(
                    [original.red, original.green, original.blue],
                    target,
                    settings.overlay_strength,
                );
                row[offset..offset + CHANNELS].copy_from_slice(&[red, green, blue, 255]);
                painted += 1;
            }
            painted
        })
        .sum();

    Ok(painted)
}
