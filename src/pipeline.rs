// THEORY:
// The `pipeline` module is the top-level API of the paint engine. It wires the
// stages together in their fixed order and owns nothing between runs:
//
//   prepare -> edge map -> exclusion -> region growing (or external mask)
//           -> { mask refinement || lighting analysis } -> composite -> blend
//
// Segmentation works on the downscaled working buffer; lighting, compositing
// and blending work on the full-resolution original, with the wall mask
// resampled up to meet it. Refinement and lighting share no data, so they run
// on the two sides of a `rayon::join`.
//
// A `CancellationToken` is checked between stages. A cancelled run returns
// `PipelineError::Cancelled` and leaves the caller's buffer untouched, because
// painting always happens on a private copy.

use crate::cancel::CancellationToken;
use crate::config::{PipelineConfig, Thresholds};
use crate::core_modules::buffer_preparer;
use crate::core_modules::compositor::{self, CompositeSettings};
use crate::core_modules::edge_blender;
use crate::core_modules::edge_map::EdgeField;
use crate::core_modules::exclusion::{self, ExclusionMap};
use crate::core_modules::lighting::LightingField;
use crate::core_modules::mask_provider::{self, MaskProvider};
use crate::core_modules::mask_refiner::{self, RefinedMask};
use crate::core_modules::paint_color::PaintColor;
use crate::core_modules::raster::{BinaryMask, GrayscaleBuffer, RasterBuffer};
use crate::core_modules::region_grower::{Point, region_grower};
use crate::core_modules::surface::SurfaceContext;
use crate::error::Result;
use std::sync::Arc;
use tracing::{debug, info, info_span, warn};

/// Where the wall mask of a run came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum MaskSource {
    /// Seeded region growing on the photo itself.
    Local,
    /// A `MaskProvider` returned a usable mask.
    External,
}

/// Every intermediate raster of one segmentation, for diagnostics.
#[derive(Debug, Clone)]
pub struct Segmentation {
    /// The downscaled buffer segmentation ran on.
    pub working: RasterBuffer,
    pub edges: EdgeField,
    pub exclusion: ExclusionMap,
    /// The mask before refinement.
    pub raw_mask: BinaryMask,
    pub refined: RefinedMask,
    /// Empty when the mask came from a provider.
    pub seeds: Vec<Point>,
    pub reference_color: Option<[f64; 3]>,
    pub mask_source: MaskSource,
}

/// The result of painting one image.
#[derive(Debug, Clone)]
pub struct PaintOutcome {
    /// Full-resolution painted copy of the input.
    pub painted_buffer: RasterBuffer,
    /// Refined wall pixels as a percentage of the working buffer.
    pub coverage_percent: f64,
    pub painted_pixel_count: usize,
    pub mask_source: MaskSource,
    /// The refined mask at working resolution.
    pub wall_mask: BinaryMask,
}

/// Segmentation up to, but not including, refinement.
struct RawSegmentation {
    working: RasterBuffer,
    edges: EdgeField,
    exclusion: ExclusionMap,
    mask: BinaryMask,
    seeds: Vec<Point>,
    reference_color: Option<[f64; 3]>,
    mask_source: MaskSource,
}

/// The synchronous paint engine. Cheap to share; it holds only configuration.
#[derive(Clone, Default)]
pub struct PaintPipeline {
    config: PipelineConfig,
    provider: Option<Arc<dyn MaskProvider>>,
}

impl std::fmt::Debug for PaintPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PaintPipeline")
            .field("config", &self.config)
            .field("provider", &self.provider.is_some())
            .finish()
    }
}

impl PaintPipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            config,
            provider: None,
        }
    }

    /// Consults `provider` before the local segmenter on every run.
    pub fn with_provider(mut self, provider: Arc<dyn MaskProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Runs segmentation only and returns every intermediate result.
    pub fn segment(&self, image: &RasterBuffer, thresholds: Thresholds) -> Result<Segmentation> {
        let cancel = CancellationToken::new();
        let raw = self.segment_raw(image, thresholds.clamped(), &cancel)?;
        let refined = {
            let _span = info_span!("mask_refine").entered();
            mask_refiner::refine(&raw.mask, &raw.exclusion.mask)?
        };
        Ok(Segmentation {
            working: raw.working,
            edges: raw.edges,
            exclusion: raw.exclusion,
            raw_mask: raw.mask,
            refined,
            seeds: raw.seeds,
            reference_color: raw.reference_color,
            mask_source: raw.mask_source,
        })
    }

    /// [`segment_and_paint`](Self::segment_and_paint) with the thresholds from
    /// the pipeline's configuration.
    pub fn segment_and_paint_default(
        &self,
        image: &RasterBuffer,
        color: &PaintColor,
        context: &SurfaceContext,
    ) -> Result<PaintOutcome> {
        self.segment_and_paint(image, color, self.config.thresholds, context)
    }

    pub fn segment_and_paint(
        &self,
        image: &RasterBuffer,
        color: &PaintColor,
        thresholds: Thresholds,
        context: &SurfaceContext,
    ) -> Result<PaintOutcome> {
        self.segment_and_paint_with_cancel(image, color, thresholds, context, &CancellationToken::new())
    }

    pub fn segment_and_paint_with_cancel(
        &self,
        image: &RasterBuffer,
        color: &PaintColor,
        thresholds: Thresholds,
        context: &SurfaceContext,
        cancel: &CancellationToken,
    ) -> Result<PaintOutcome> {
        let _run = info_span!("segment_and_paint", color = %color, width = image.width(), height = image.height())
            .entered();
        let thresholds = thresholds.clamped();

        let raw = self.segment_raw(image, thresholds, cancel)?;
        cancel.check()?;

        let (refined, lighting) = rayon::join(
            || {
                let _span = info_span!("mask_refine").entered();
                mask_refiner::refine(&raw.mask, &raw.exclusion.mask)
            },
            || {
                let _span = info_span!("lighting").entered();
                LightingField::analyze(image)
            },
        );
        let refined = refined?;
        info!(
            coverage_percent = refined.coverage_percent,
            light_direction = ?lighting.light_direction,
            "Wall mask refined"
        );
        cancel.check()?;

        let mut painted_buffer = image.clone();
        let settings = CompositeSettings::resolve(context, &self.config);
        let painted_pixel_count = {
            let _span = info_span!("composite").entered();
            compositor::composite(&mut painted_buffer, &refined.mask, Some(&lighting), color, &settings)?
        };
        cancel.check()?;

        if painted_pixel_count > 0 {
            let _span = info_span!("edge_blend").entered();
            let blended = edge_blender::blend_edges(&mut painted_buffer, &refined.mask);
            debug!(blended, "Boundary pixels blended");
        } else {
            info!("Wall mask is empty; image left unpainted");
        }

        info!(painted = painted_pixel_count, source = ?raw.mask_source, "Paint complete");
        Ok(PaintOutcome {
            painted_buffer,
            coverage_percent: refined.coverage_percent,
            painted_pixel_count,
            mask_source: raw.mask_source,
            wall_mask: refined.mask,
        })
    }

    fn segment_raw(
        &self,
        image: &RasterBuffer,
        thresholds: Thresholds,
        cancel: &CancellationToken,
    ) -> Result<RawSegmentation> {
        cancel.check()?;
        let working = {
            let _span = info_span!("buffer_prepare").entered();
            buffer_preparer::prepare(image, self.config.max_analysis_width)?
        };
        debug!(width = working.width(), height = working.height(), "Working buffer ready");
        cancel.check()?;

        let (gray, edges) = {
            let _span = info_span!("edge_map").entered();
            let gray = GrayscaleBuffer::from_raster(&working);
            let edges = EdgeField::build(&gray, thresholds.edge_threshold, self.config.edge_operator);
            (gray, edges)
        };
        cancel.check()?;

        let exclusion = {
            let _span = info_span!("exclusion").entered();
            exclusion::classify(&working, &gray, &edges)?
        };
        debug!(excluded = exclusion.counts.total(), counts = ?exclusion.counts, "Exclusion mask built");
        cancel.check()?;

        if let Some(mask) = self.external_mask(&working, &exclusion.mask) {
            return Ok(RawSegmentation {
                working,
                edges,
                exclusion,
                mask,
                seeds: Vec::new(),
                reference_color: None,
                mask_source: MaskSource::External,
            });
        }
        cancel.check()?;

        let growth = {
            let _span = info_span!("region_grow").entered();
            region_grower::segment(&working, &gray, &edges, &exclusion.mask, thresholds.color_tolerance)
        };
        info!(
            seeds = growth.seeds.len(),
            reference = ?growth.reference_color,
            grown = growth.mask.count(),
            "Region grown"
        );

        Ok(RawSegmentation {
            working,
            edges,
            exclusion,
            mask: growth.mask,
            seeds: growth.seeds,
            reference_color: Some(growth.reference_color),
            mask_source: MaskSource::Local,
        })
    }

    /// The provider's mask minus exclusions, or `None` to fall back to the
    /// local segmenter. Provider errors are logged, never returned.
    fn external_mask(&self, working: &RasterBuffer, exclusion: &BinaryMask) -> Option<BinaryMask> {
        let provider = self.provider.as_ref()?;
        let _span = info_span!("mask_provider").entered();

        let labeled = match provider.segment(working) {
            Ok(labeled) => labeled,
            Err(e) => {
                warn!(error = %e, "Mask provider failed, falling back to local segmentation");
                return None;
            }
        };

        let mut mask = mask_provider::combine(&labeled, working.width(), working.height());
        if let Err(e) = mask.subtract(exclusion) {
            warn!(error = %e, "Provider mask unusable, falling back to local segmentation");
            return None;
        }
        if mask.count() == 0 {
            warn!(labels = labeled.len(), "Mask provider found no wall, falling back to local segmentation");
            return None;
        }
        info!(pixels = mask.count(), labels = labeled.len(), "Using provider mask");
        Some(mask)
    }
}
