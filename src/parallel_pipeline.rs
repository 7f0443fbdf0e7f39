// THEORY:
// `ParallelPipeline` is the async facade over `PaintPipeline` for interactive
// hosts, where a user drags a slider or clicks through swatches faster than a
// paint completes. Its rules:
// 1.  **Off the reactor**: every run executes on a blocking task, inside a
//     dedicated rayon pool sized to the machine, so the async runtime stays
//     responsive.
// 2.  **Last request wins**: each `submit` bumps a generation counter and
//     cancels the token of the run it replaces. A run whose generation is no
//     longer current resolves to `Ok(None)`, whether it was cut short or
//     finished anyway.
// 3.  **Batches are independent**: `render_batch` paints several colors over one
//     image concurrently. Batch runs do not supersede each other or `submit`.

use crate::cancel::CancellationToken;
use crate::config::Thresholds;
use crate::core_modules::paint_color::PaintColor;
use crate::core_modules::raster::RasterBuffer;
use crate::core_modules::surface::SurfaceContext;
use crate::error::{PipelineError, Result};
use crate::pipeline::{PaintOutcome, PaintPipeline};
use futures::future::join_all;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::debug;

/// One paint job. The image is shared so batches and retries do not copy it.
#[derive(Debug, Clone)]
pub struct PaintRequest {
    pub image: Arc<RasterBuffer>,
    pub color: PaintColor,
    pub thresholds: Thresholds,
    pub context: SurfaceContext,
}

pub struct ParallelPipeline {
    pipeline: Arc<PaintPipeline>,
    pool: Arc<rayon::ThreadPool>,
    generation: AtomicU64,
    in_flight: Mutex<Option<CancellationToken>>,
}

impl ParallelPipeline {
    /// Builds a worker pool with one thread per logical CPU.
    pub fn new(pipeline: PaintPipeline) -> Result<Self> {
        Self::with_threads(pipeline, num_cpus::get())
    }

    pub fn with_threads(pipeline: PaintPipeline, threads: usize) -> Result<Self> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads.max(1))
            .thread_name(|index| format!("wall-vision-{index}"))
            .build()?;
        Ok(Self {
            pipeline: Arc::new(pipeline),
            pool: Arc::new(pool),
            generation: AtomicU64::new(0),
            in_flight: Mutex::new(None),
        })
    }

    pub fn pipeline(&self) -> &PaintPipeline {
        &self.pipeline
    }

    /// Runs `request`, superseding any run still in flight.
    ///
    /// Returns `Ok(None)` when a later `submit` superseded this one.
    pub async fn submit(&self, request: PaintRequest) -> Result<Option<PaintOutcome>> {
        let token = CancellationToken::new();
        let generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
        if let Some(previous) = self.swap_in_flight(Some(token.clone())) {
            previous.cancel();
        }

        let result = self.spawn_run(request, token.clone()).await;
        self.clear_in_flight(&token);

        if self.generation.load(Ordering::Acquire) != generation {
            debug!(generation, "Discarding superseded paint result");
            return Ok(None);
        }
        result.map(Some)
    }

    /// Paints every color over the same image concurrently. Results keep the
    /// order of `colors`.
    pub async fn render_batch(
        &self,
        image: Arc<RasterBuffer>,
        colors: &[PaintColor],
        thresholds: Thresholds,
        context: SurfaceContext,
    ) -> Vec<Result<PaintOutcome>> {
        let runs = colors.iter().map(|color| {
            let request = PaintRequest {
                image: Arc::clone(&image),
                color: *color,
                thresholds,
                context,
            };
            self.spawn_run(request, CancellationToken::new())
        });
        join_all(runs).await
    }

    /// Cancels whatever `submit` run is in flight, if any.
    pub fn cancel_in_flight(&self) {
        self.generation.fetch_add(1, Ordering::AcqRel);
        if let Some(previous) = self.swap_in_flight(None) {
            previous.cancel();
        }
    }

    async fn spawn_run(&self, request: PaintRequest, token: CancellationToken) -> Result<PaintOutcome> {
        let pipeline = Arc::clone(&self.pipeline);
        let pool = Arc::clone(&self.pool);
        tokio::task::spawn_blocking(move || {
            pool.install(|| {
                pipeline.segment_and_paint_with_cancel(
                    &request.image,
                    &request.color,
                    request.thresholds,
                    &request.context,
                    &token,
                )
            })
        })
        .await
        .map_err(PipelineError::from)?
    }

    fn swap_in_flight(&self, token: Option<CancellationToken>) -> Option<CancellationToken> {
        let mut slot = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
        std::mem::replace(&mut *slot, token)
    }

    /// Empties the slot only while it still holds `token`; a newer run's
    /// token stays cancellable.
    fn clear_in_flight(&self, token: &CancellationToken) {
        let mut slot = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
        if slot.as_ref().is_some_and(|current| current.same_token(token)) {
            *slot = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::uniform;

    fn request(hex: &str) -> PaintRequest {
        PaintRequest {
            image: Arc::new(uniform(24, 24, [128, 128, 128])),
            color: PaintColor::from_hex(hex).unwrap(),
            thresholds: Thresholds::default(),
            context: SurfaceContext::default(),
        }
    }

    #[tokio::test]
    async fn single_submission_completes() {
        let pipeline = ParallelPipeline::with_threads(PaintPipeline::default(), 2).unwrap();
        let outcome = pipeline.submit(request("#2244AA")).await.unwrap();
        let outcome = outcome.expect("not superseded");
        assert_eq!(outcome.painted_pixel_count, 24 * 24);
    }

    #[tokio::test]
    async fn later_submission_supersedes_earlier() {
        let pipeline = ParallelPipeline::with_threads(PaintPipeline::default(), 2).unwrap();
        let (first, second) = tokio::join!(
            pipeline.submit(request("#FF0000")),
            pipeline.submit(request("#0000FF")),
        );

        assert!(first.unwrap().is_none());
        let second = second.unwrap().expect("latest request wins");
        let pixel = second.painted_buffer.pixel_at(12, 12);
        assert!(pixel.blue > pixel.red);
    }

    #[test]
    fn finished_run_leaves_newer_token_in_place() {
        let pipeline = ParallelPipeline::with_threads(PaintPipeline::default(), 1).unwrap();
        let older = CancellationToken::new();
        let newer = CancellationToken::new();
        pipeline.swap_in_flight(Some(newer.clone()));

        pipeline.clear_in_flight(&older);
        pipeline.cancel_in_flight();
        assert!(newer.is_cancelled());

        pipeline.swap_in_flight(Some(older.clone()));
        pipeline.clear_in_flight(&older);
        assert!(pipeline.swap_in_flight(None).is_none());
    }

    #[tokio::test]
    async fn batch_renders_every_color_in_order() {
        let pipeline = ParallelPipeline::new(PaintPipeline::default()).unwrap();
        let colors = ["#FF0000", "#00FF00", "#0000FF"].map(|hex| PaintColor::from_hex(hex).unwrap());
        let image = Arc::new(uniform(16, 16, [128, 128, 128]));

        let outcomes = pipeline
            .render_batch(image, &colors, Thresholds::default(), SurfaceContext::default())
            .await;

        assert_eq!(outcomes.len(), 3);
        let dominant: Vec<usize> = outcomes
            .into_iter()
            .map(|outcome| {
                let pixel = outcome.unwrap().painted_buffer.pixel_at(8, 8);
                let rgb = [pixel.red, pixel.green, pixel.blue];
                (0..3).max_by_key(|&c| rgb[c]).unwrap()
            })
            .collect();
        assert_eq!(dominant, vec![0, 1, 2]);
    }
}
