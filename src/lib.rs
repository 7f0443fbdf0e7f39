// THEORY:
// This file is the entry point for the `wall_vision` library crate. It exposes
// the paint engine as a small public surface:
//
// - `PaintPipeline` for synchronous, single-image runs
// - `ParallelPipeline` for async hosts that need last-request-wins semantics
// - the value types a host constructs or reads (`RasterBuffer`, `PaintColor`,
//   `SurfaceContext`, `Thresholds`, `PaintOutcome`)
//
// The individual stages live in `core_modules` and stay public for hosts that
// want to run or inspect a single stage, but the pipelines are the intended
// interface.

pub mod cancel;
pub mod config;
pub mod core_modules;
pub mod error;
pub mod logger;
pub mod parallel_pipeline;
pub mod pipeline;

#[cfg(test)]
pub(crate) mod test_support;

pub use cancel::CancellationToken;
pub use config::{EdgeOperator, PipelineConfig, Thresholds};
pub use core_modules::mask_provider::{LabeledMask, MaskProvider, MaskProviderError};
pub use core_modules::paint_color::PaintColor;
pub use core_modules::raster::{BinaryMask, RasterBuffer};
pub use core_modules::surface::{SurfaceCondition, SurfaceContext, SurfaceType, WallType};
pub use error::{PipelineError, Result};
pub use parallel_pipeline::{PaintRequest, ParallelPipeline};
pub use pipeline::{MaskSource, PaintOutcome, PaintPipeline, Segmentation};
