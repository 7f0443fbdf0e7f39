use anyhow::{Context, bail};
use std::env;
use std::sync::Arc;
use tracing::info;
use wall_vision::core_modules::buffer_preparer;
use wall_vision::{
    PaintColor, PaintPipeline, PaintRequest, ParallelPipeline, PipelineConfig, SurfaceContext, Thresholds, logger,
};

const USAGE: &str = "Usage: visual_tester <input_image> <output.png> <hex_color> [edge_threshold] [color_tolerance] [--mask <mask.png>]";

struct Args {
    input: String,
    output: String,
    color: String,
    thresholds: Thresholds,
    mask_output: Option<String>,
}

fn parse_args() -> anyhow::Result<Args> {
    let mut positional = Vec::new();
    let mut mask_output = None;
    let mut args = env::args().skip(1);
    while let Some(arg) = args.next() {
        if arg == "--mask" {
            mask_output = Some(args.next().context("--mask needs a path")?);
        } else {
            positional.push(arg);
        }
    }

    if positional.len() < 3 {
        bail!(USAGE);
    }
    let defaults = Thresholds::default();
    let edge = match positional.get(3) {
        Some(value) => value.parse().with_context(|| format!("bad edge threshold {value:?}"))?,
        None => defaults.edge_threshold,
    };
    let tolerance = match positional.get(4) {
        Some(value) => value.parse().with_context(|| format!("bad color tolerance {value:?}"))?,
        None => defaults.color_tolerance,
    };

    let mut positional = positional.into_iter();
    Ok(Args {
        input: positional.next().unwrap_or_default(),
        output: positional.next().unwrap_or_default(),
        color: positional.next().unwrap_or_default(),
        thresholds: Thresholds::new(edge, tolerance),
        mask_output,
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logger::init_with("wall_vision=info,visual_tester=info");

    // --- 1. Argument Parsing & Setup ---
    let args = parse_args()?;
    let color = PaintColor::from_hex(&args.color)?;

    // --- 2. Image I/O ---
    let image = buffer_preparer::open(&args.input).with_context(|| format!("reading {}", args.input))?;
    let context = SurfaceContext::infer(&image);
    info!(
        width = image.width(),
        height = image.height(),
        wall_type = ?context.wall_type,
        "Loaded {}",
        args.input
    );

    // --- 3. Paint ---
    let config = PipelineConfig::builder()
        .thresholds(args.thresholds.edge_threshold, args.thresholds.color_tolerance)
        .build();
    let pipeline = ParallelPipeline::new(PaintPipeline::new(config))?;
    let outcome = pipeline
        .submit(PaintRequest {
            image: Arc::new(image),
            color,
            thresholds: pipeline.pipeline().config().thresholds,
            context,
        })
        .await?
        .context("paint run was superseded")?;

    // --- 4. Write Output ---
    buffer_preparer::save_png(&args.output, &outcome.painted_buffer)?;
    if let Some(mask_path) = &args.mask_output {
        let mask = outcome
            .wall_mask
            .to_rgba_image()
            .context("mask buffer has the wrong size")?;
        mask.save(mask_path)?;
    }

    println!(
        "Painted {} pixels ({:.1}% wall coverage, {:?} mask). Output saved to {}",
        outcome.painted_pixel_count, outcome.coverage_percent, outcome.mask_source, args.output
    );
    Ok(())
}
