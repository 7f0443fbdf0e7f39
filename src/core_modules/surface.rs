// THEORY:
// `SurfaceContext` describes the photographed wall, not the image. It has no
// behavior of its own beyond mapping each enumerated value to the blend
// coefficients the compositor consumes:
// - condition    -> overlay strength (cleaner surfaces take a more opaque coat)
// - wall type    -> a small luminance bias (interiors read slightly brighter)
// - surface type -> micro-texture weight (rough brick keeps more of its grain)
//
// Parsing is lenient: hosts often receive these labels from a classifier or a
// form field, so unknown strings fall back to the defaults instead of failing.

use crate::core_modules::raster::RasterBuffer;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SurfaceCondition {
    #[default]
    Clean,
    Dusty,
    Stained,
    Unfinished,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum WallType {
    Interior,
    #[default]
    Exterior,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SurfaceType {
    #[default]
    Plastered,
    Concrete,
    Brick,
    Painted,
    Other,
}

impl SurfaceCondition {
    /// Fraction of the paint color in the final pixel.
    pub fn overlay_strength(self) -> f64 {
        match self {
            SurfaceCondition::Clean => 0.98,
            SurfaceCondition::Dusty | SurfaceCondition::Stained => 0.97,
            SurfaceCondition::Unfinished => 0.96,
        }
    }
}

impl WallType {
    pub fn luminance_bias(self) -> f64 {
        match self {
            WallType::Interior => 0.02,
            WallType::Exterior => -0.01,
        }
    }
}

impl SurfaceType {
    pub fn micro_texture(self) -> f64 {
        match self {
            SurfaceType::Plastered => 0.05,
            SurfaceType::Concrete => 0.08,
            SurfaceType::Brick => 0.12,
            SurfaceType::Painted => 0.04,
            SurfaceType::Other => 0.07,
        }
    }
}

impl FromStr for SurfaceCondition {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_ascii_lowercase().as_str() {
            "dusty" => SurfaceCondition::Dusty,
            "stained" => SurfaceCondition::Stained,
            "unfinished" => SurfaceCondition::Unfinished,
            _ => SurfaceCondition::Clean,
        })
    }
}

impl FromStr for WallType {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_ascii_lowercase().as_str() {
            "interior" => WallType::Interior,
            _ => WallType::Exterior,
        })
    }
}

impl FromStr for SurfaceType {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim().to_ascii_lowercase().as_str() {
            "concrete" => SurfaceType::Concrete,
            "brick" => SurfaceType::Brick,
            "painted" | "painted surface" => SurfaceType::Painted,
            "plastered" | "plastered wall" => SurfaceType::Plastered,
            _ => SurfaceType::Other,
        })
    }
}

/// Fraction of the height treated as the "top band" by [`SurfaceContext::infer`].
const TOP_BAND_FRACTION: f64 = 0.20;
const EXTERIOR_TOP_BRIGHTNESS: f64 = 180.0;
const EXTERIOR_MEAN_BRIGHTNESS: f64 = 120.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SurfaceContext {
    pub condition: SurfaceCondition,
    pub wall_type: WallType,
    pub surface_type: SurfaceType,
}

impl SurfaceContext {
    pub fn new(condition: SurfaceCondition, wall_type: WallType, surface_type: SurfaceType) -> Self {
        Self {
            condition,
            wall_type,
            surface_type,
        }
    }

    /// Builds a context from free-form labels; unknown labels take defaults.
    pub fn parse(condition: &str, wall_type: &str, surface_type: &str) -> Self {
        Self::new(
            condition.parse().unwrap_or_default(),
            wall_type.parse().unwrap_or_default(),
            surface_type.parse().unwrap_or_default(),
        )
    }

    /// Guesses interior vs exterior from brightness alone: a bright top band
    /// (open sky) or a bright scene overall reads as exterior. Condition and
    /// surface type keep their defaults.
    pub fn infer(raster: &RasterBuffer) -> Self {
        let width = raster.width() as usize;
        let top_rows = (raster.height() as f64 * TOP_BAND_FRACTION).ceil() as usize;

        let mut total = 0.0;
        let mut top_total = 0.0;
        let mut top_count = 0usize;
        for index in 0..raster.pixel_count() {
            let brightness = raster.pixel(index).mean_brightness();
            total += brightness;
            if index / width.max(1) < top_rows {
                top_total += brightness;
                top_count += 1;
            }
        }

        let pixel_count = raster.pixel_count().max(1) as f64;
        let mean = total / pixel_count;
        let top_mean = if top_count > 0 {
            top_total / top_count as f64
        } else {
            0.0
        };

        let wall_type = if top_mean > EXTERIOR_TOP_BRIGHTNESS || mean > EXTERIOR_MEAN_BRIGHTNESS {
            WallType::Exterior
        } else {
            WallType::Interior
        };
        Self {
            wall_type,
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overlay_strength_is_stronger_for_cleaner_surfaces() {
        let clean = SurfaceCondition::Clean.overlay_strength();
        let unfinished = SurfaceCondition::Unfinished.overlay_strength();
        assert!(clean > unfinished);
        for condition in [
            SurfaceCondition::Clean,
            SurfaceCondition::Dusty,
            SurfaceCondition::Stained,
            SurfaceCondition::Unfinished,
        ] {
            let k = condition.overlay_strength();
            assert!((0.9..=1.0).contains(&k));
        }
    }

    #[test]
    fn parse_is_lenient() {
        let context = SurfaceContext::parse("Stained", " interior ", "painted surface");
        assert_eq!(
            context,
            SurfaceContext::new(SurfaceCondition::Stained, WallType::Interior, SurfaceType::Painted)
        );

        let fallback = SurfaceContext::parse("glossy", "underwater", "");
        assert_eq!(fallback.condition, SurfaceCondition::Clean);
        assert_eq!(fallback.wall_type, WallType::Exterior);
        assert_eq!(fallback.surface_type, SurfaceType::Other);
    }

    #[test]
    fn infer_reads_dim_scenes_as_interior() {
        let dim = RasterBuffer::filled(10, 10, [90, 90, 90, 255]);
        assert_eq!(SurfaceContext::infer(&dim).wall_type, WallType::Interior);

        let mut sky = RasterBuffer::filled(10, 10, [90, 90, 90, 255]);
        for x in 0..10 {
            for y in 0..2 {
                sky.set_pixel_at(x, y, [230, 240, 250, 255]);
            }
        }
        assert_eq!(SurfaceContext::infer(&sky).wall_type, WallType::Exterior);
    }
}
