//! Tunable parameters for a paint run.
//!
//! Every numeric knob is clamped into its documented range rather than
//! rejected, so a host can wire sliders straight into these types.

use std::ops::RangeInclusive;

pub const EDGE_THRESHOLD_RANGE: RangeInclusive<u32> = 20..=80;
pub const COLOR_TOLERANCE_RANGE: RangeInclusive<u32> = 40..=120;
pub const OVERLAY_STRENGTH_RANGE: RangeInclusive<f64> = 0.9..=1.0;

pub const DEFAULT_EDGE_THRESHOLD: u32 = 40;
pub const DEFAULT_COLOR_TOLERANCE: u32 = 70;
pub const DEFAULT_MAX_ANALYSIS_WIDTH: u32 = 600;
pub const DEFAULT_SHADING_STRENGTH: f64 = 0.35;

/// Segmentation thresholds. Construct through [`Thresholds::new`] to get the
/// clamping guarantees.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Thresholds {
    /// Gradient magnitude above which a pixel is an edge. Larger values admit
    /// more texture as wall; smaller values fragment the mask.
    pub edge_threshold: u32,
    /// Maximum L1 RGB distance from the reference wall color.
    pub color_tolerance: u32,
}

impl Thresholds {
    pub fn new(edge_threshold: u32, color_tolerance: u32) -> Self {
        Self {
            edge_threshold: clamp_to(edge_threshold, &EDGE_THRESHOLD_RANGE),
            color_tolerance: clamp_to(color_tolerance, &COLOR_TOLERANCE_RANGE),
        }
    }

    /// Re-applies the clamps, for values that arrived through deserialization
    /// or direct field access.
    pub fn clamped(self) -> Self {
        Self::new(self.edge_threshold, self.color_tolerance)
    }
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            edge_threshold: DEFAULT_EDGE_THRESHOLD,
            color_tolerance: DEFAULT_COLOR_TOLERANCE,
        }
    }
}

fn clamp_to(value: u32, range: &RangeInclusive<u32>) -> u32 {
    value.clamp(*range.start(), *range.end())
}

/// Gradient operator used by the edge map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum EdgeOperator {
    /// Axis-aligned central differences. Fast, and the reference behavior.
    #[default]
    Central,
    /// Full 3x3 Sobel kernels, scaled to stay comparable with `Central`.
    Sobel,
}

/// Configuration for a [`crate::pipeline::PaintPipeline`].
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PipelineConfig {
    /// Images wider than this are downscaled before segmentation.
    pub max_analysis_width: u32,
    pub thresholds: Thresholds,
    pub edge_operator: EdgeOperator,
    /// Fixed overlay strength; `None` selects it from the surface condition.
    pub overlay_override: Option<f64>,
    /// How much of the photo's shading modulates the paint color.
    /// 0.0 paints a flat swatch, 1.0 multiplies by luminance outright.
    pub shading_strength: f64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_analysis_width: DEFAULT_MAX_ANALYSIS_WIDTH,
            thresholds: Thresholds::default(),
            edge_operator: EdgeOperator::default(),
            overlay_override: None,
            shading_strength: DEFAULT_SHADING_STRENGTH,
        }
    }
}

impl PipelineConfig {
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder::default()
    }

    /// The overlay override, clamped into its legal range.
    pub fn overlay_override(&self) -> Option<f64> {
        self.overlay_override
            .map(|k| k.clamp(*OVERLAY_STRENGTH_RANGE.start(), *OVERLAY_STRENGTH_RANGE.end()))
    }

    pub fn shading_strength(&self) -> f64 {
        if self.shading_strength.is_nan() {
            return DEFAULT_SHADING_STRENGTH;
        }
        self.shading_strength.clamp(0.0, 1.0)
    }
}

#[derive(Default)]
pub struct PipelineConfigBuilder {
    max_analysis_width: Option<u32>,
    thresholds: Option<Thresholds>,
    edge_operator: Option<EdgeOperator>,
    overlay_override: Option<Option<f64>>,
    shading_strength: Option<f64>,
}

impl PipelineConfigBuilder {
    pub fn max_analysis_width(mut self, width: u32) -> Self {
        self.max_analysis_width = Some(width.max(1));
        self
    }

    pub fn thresholds(mut self, edge_threshold: u32, color_tolerance: u32) -> Self {
        self.thresholds = Some(Thresholds::new(edge_threshold, color_tolerance));
        self
    }

    pub fn edge_operator(mut self, operator: EdgeOperator) -> Self {
        self.edge_operator = Some(operator);
        self
    }

    pub fn overlay_override(mut self, strength: Option<f64>) -> Self {
        self.overlay_override = Some(strength);
        self
    }

    pub fn shading_strength(mut self, strength: f64) -> Self {
        self.shading_strength = Some(strength);
        self
    }

    pub fn build(self) -> PipelineConfig {
        let default = PipelineConfig::default();
        PipelineConfig {
            max_analysis_width: self.max_analysis_width.unwrap_or(default.max_analysis_width),
            thresholds: self.thresholds.unwrap_or(default.thresholds),
            edge_operator: self.edge_operator.unwrap_or(default.edge_operator),
            overlay_override: self.overlay_override.unwrap_or(default.overlay_override),
            shading_strength: self.shading_strength.unwrap_or(default.shading_strength),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thresholds_clamp_instead_of_rejecting() {
        assert_eq!(Thresholds::new(5, 500), Thresholds::new(20, 120));
        assert_eq!(Thresholds::new(55, 90).edge_threshold, 55);
        let raw = Thresholds {
            edge_threshold: 1000,
            color_tolerance: 0,
        };
        assert_eq!(raw.clamped(), Thresholds::new(80, 40));
    }

    #[test]
    fn builder_fills_defaults() {
        let config = PipelineConfig::builder()
            .thresholds(60, 100)
            .edge_operator(EdgeOperator::Sobel)
            .build();

        assert_eq!(config.thresholds, Thresholds::new(60, 100));
        assert_eq!(config.edge_operator, EdgeOperator::Sobel);
        assert_eq!(config.max_analysis_width, DEFAULT_MAX_ANALYSIS_WIDTH);
        assert_eq!(config.overlay_override, None);
    }

    #[test]
    fn overlay_and_shading_are_clamped_on_read() {
        let config = PipelineConfig::builder()
            .overlay_override(Some(0.5))
            .shading_strength(3.0)
            .build();
        assert_eq!(config.overlay_override(), Some(0.9));
        assert_eq!(config.shading_strength(), 1.0);
    }
}
