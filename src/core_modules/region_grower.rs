// THEORY:
// The region grower turns "which pixels are allowed" (the exclusion mask) into
// "which pixels are the wall". It is a seeded flood fill with a color predicate.
//
// Key architectural principles & algorithm steps:
// 1.  **Seeding**: walls usually fill the middle of a facade photo, so seeds are
//     sampled on a coarse grid (stride 10) inside the central band
//     `x in [20%, 80%)`, `y in [30%, 70%)`. A grid point qualifies only if it is
//     not excluded, its gradient is at most the lowest legal edge threshold, and
//     it has mid-range brightness (60..210 exclusive). With no qualifying point
//     the image center is the lone seed. The seed set does not depend on the
//     caller's edge threshold, so lowering the threshold can only shrink the
//     region.
// 2.  **Reference color**: the mean RGB of the seeds. One reference per run keeps
//     the predicate identical for every pixel, so the result does not depend on
//     traversal order.
// 3.  **Region growing**: a multi-source breadth-first search over the
//     8-connected grid. A dequeued pixel joins when it is not excluded and its
//     L1 RGB distance to the reference is below the tolerance. Only joined
//     pixels expand, so the region stays connected to the seeds and cannot hop
//     over a rejected strip.
// 4.  **Stateless Utility**: nothing survives between calls.

use crate::config::EDGE_THRESHOLD_RANGE;
use crate::core_modules::edge_map::EdgeField;
use crate::core_modules::raster::{BinaryMask, GrayscaleBuffer, RasterBuffer};

/// A pixel coordinate in the working buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Point {
    pub x: u32,
    pub y: u32,
}

/// The outcome of one seeded growth.
#[derive(Debug, Clone, PartialEq)]
pub struct GrowthResult {
    pub mask: BinaryMask,
    pub seeds: Vec<Point>,
    pub reference_color: [f64; 3],
}

pub mod region_grower {
    use super::*;
    use std::collections::VecDeque;

    pub const SEED_STRIDE: usize = 10;
    const SEED_BAND_X: (f64, f64) = (0.20, 0.80);
    const SEED_BAND_Y: (f64, f64) = (0.30, 0.70);
    const SEED_MIN_BRIGHTNESS: u8 = 60;
    const SEED_MAX_BRIGHTNESS: u8 = 210;
    const SEED_MAX_GRADIENT: f32 = *EDGE_THRESHOLD_RANGE.start() as f32;

    const NEIGHBORS: [(i64, i64); 8] = [
        (-1, -1),
        (0, -1),
        (1, -1),
        (-1, 0),
        (1, 0),
        (-1, 1),
        (0, 1),
        (1, 1),
    ];

    /// Picks seed points on the central sampling grid, falling back to the
    /// image center when nothing qualifies.
    pub fn find_seeds(gray: &GrayscaleBuffer, edges: &EdgeField, exclusion: &BinaryMask) -> Vec<Point> {
        let width = gray.width();
        let height = gray.height();
        if width == 0 || height == 0 {
            return Vec::new();
        }

        let w = width as f64;
        let h = height as f64;
        let x_start = (SEED_BAND_X.0 * w).floor() as u32;
        let y_start = (SEED_BAND_Y.0 * h).floor() as u32;

        let mut seeds = Vec::new();
        for y in (y_start..height).step_by(SEED_STRIDE) {
            if y as f64 >= SEED_BAND_Y.1 * h {
                break;
            }
            for x in (x_start..width).step_by(SEED_STRIDE) {
                if x as f64 >= SEED_BAND_X.1 * w {
                    break;
                }
                let index = (y * width + x) as usize;
                let brightness = gray.get(index);
                if !exclusion.is_set(index)
                    && edges.magnitude(index) <= SEED_MAX_GRADIENT
                    && brightness > SEED_MIN_BRIGHTNESS
                    && brightness < SEED_MAX_BRIGHTNESS
                {
                    seeds.push(Point { x, y });
                }
            }
        }

        if seeds.is_empty() {
            seeds.push(Point {
                x: width / 2,
                y: height / 2,
            });
        }
        seeds
    }

    /// Mean RGB over the seed pixels.
    pub fn reference_color(raster: &RasterBuffer, seeds: &[Point]) -> [f64; 3] {
        if seeds.is_empty() {
            return [0.0; 3];
        }
        let mut sum = [0.0; 3];
        for seed in seeds {
            let rgb = raster.pixel_at(seed.x, seed.y).rgb();
            for (total, channel) in sum.iter_mut().zip(rgb) {
                *total += channel;
            }
        }
        sum.map(|total| total / seeds.len() as f64)
    }

    /// Multi-source 8-connected BFS from `seeds`.
    pub fn grow_region(
        raster: &RasterBuffer,
        exclusion: &BinaryMask,
        seeds: &[Point],
        reference: &[f64; 3],
        color_tolerance: u32,
    ) -> BinaryMask {
        let width = raster.width() as usize;
        let height = raster.height() as usize;
        let mut mask = BinaryMask::new(raster.width(), raster.height());
        let mut visited = vec![false; width * height];
        let mut queue: VecDeque<usize> = VecDeque::with_capacity(seeds.len());
        let tolerance = color_tolerance as f64;

        for seed in seeds {
            if seed.x as usize >= width || seed.y as usize >= height {
                continue;
            }
            let index = seed.y as usize * width + seed.x as usize;
            if !visited[index] {
                visited[index] = true;
                queue.push_back(index);
            }
        }

        while let Some(current) = queue.pop_front() {
            if exclusion.is_set(current) || raster.pixel(current).color_distance(reference) >= tolerance {
                continue;
            }
            mask.set(current, true);

            let x = (current % width) as i64;
            let y = (current / width) as i64;
            for (dx, dy) in NEIGHBORS {
                let nx = x + dx;
                let ny = y + dy;
                if nx < 0 || ny < 0 || nx >= width as i64 || ny >= height as i64 {
                    continue;
                }
                let neighbor = ny as usize * width + nx as usize;
                if !visited[neighbor] {
                    visited[neighbor] = true;
                    queue.push_back(neighbor);
                }
            }
        }

        mask
    }

    /// Seeds, reference color and growth in one call.
    pub fn segment(
        raster: &RasterBuffer,
        gray: &GrayscaleBuffer,
        edges: &EdgeField,
        exclusion: &BinaryMask,
        color_tolerance: u32,
    ) -> GrowthResult {
        let seeds = find_seeds(gray, edges, exclusion);
        let reference_color = reference_color(raster, &seeds);
        let mask = grow_region(raster, exclusion, &seeds, &reference_color, color_tolerance);
        GrowthResult {
            mask,
            seeds,
            reference_color,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::region_grower::*;
    use super::*;
    use crate::config::EdgeOperator;
    use crate::core_modules::exclusion;
    use crate::test_support::{gray_with_dark_strip, ramped_columns, uniform};

    fn analyze(raster: &RasterBuffer, edge_threshold: u32) -> (GrayscaleBuffer, EdgeField, BinaryMask) {
        let gray = GrayscaleBuffer::from_raster(raster);
        let edges = EdgeField::build(&gray, edge_threshold, EdgeOperator::Central);
        let exclusion = exclusion::classify(raster, &gray, &edges).unwrap().mask;
        (gray, edges, exclusion)
    }

    #[test]
    fn seeds_sample_the_central_band() {
        let raster = uniform(100, 100, [128, 128, 128]);
        let (gray, edges, exclusion) = analyze(&raster, 40);
        let seeds = find_seeds(&gray, &edges, &exclusion);

        // x in {20, 30, .., 70}, y in {30, 40, .., 60}
        assert_eq!(seeds.len(), 6 * 4);
        assert_eq!(seeds[0], Point { x: 20, y: 30 });
        assert!(seeds.iter().all(|p| p.x < 80 && p.y < 70));
    }

    #[test]
    fn seeds_fall_back_to_center() {
        let raster = uniform(30, 20, [30, 30, 30]);
        let (gray, edges, exclusion) = analyze(&raster, 40);
        assert_eq!(find_seeds(&gray, &edges, &exclusion), vec![Point { x: 15, y: 10 }]);
    }

    #[test]
    fn seeds_ignore_the_edge_threshold() {
        let raster = ramped_columns(100, 100, &[20, 30, 40, 50]);
        let (gray, strict_edges, strict_exclusion) = analyze(&raster, 20);
        let (_, lenient_edges, lenient_exclusion) = analyze(&raster, 80);

        let strict = find_seeds(&gray, &strict_edges, &strict_exclusion);
        let lenient = find_seeds(&gray, &lenient_edges, &lenient_exclusion);
        assert_eq!(strict, lenient);
        // Textured grid columns never seed, whatever the threshold.
        assert!(strict.iter().all(|p| p.x >= 60));
        assert_eq!(reference_color(&raster, &lenient), [128.0; 3]);
    }

    #[test]
    fn reference_is_seed_mean() {
        let mut raster = uniform(4, 1, [0, 0, 0]);
        raster.set_pixel_at(0, 0, [100, 50, 10, 255]);
        raster.set_pixel_at(1, 0, [200, 150, 30, 255]);
        let reference = reference_color(&raster, &[Point { x: 0, y: 0 }, Point { x: 1, y: 0 }]);
        assert_eq!(reference, [150.0, 100.0, 20.0]);
    }

    #[test]
    fn growth_never_enters_excluded_pixels() {
        let raster = gray_with_dark_strip(40, 40, &[20, 21]);
        let (gray, edges, exclusion) = analyze(&raster, 40);
        let result = segment(&raster, &gray, &edges, &exclusion, 120);

        assert!(result.mask.count() > 0);
        for (index, &bit) in result.mask.bits().iter().enumerate() {
            if bit != 0 {
                assert!(!exclusion.is_set(index));
            }
        }
    }

    #[test]
    fn a_single_seed_does_not_bridge_a_dark_strip() {
        let raster = gray_with_dark_strip(40, 40, &[20, 21]);
        let (_, _, exclusion) = analyze(&raster, 40);
        let seed = Point { x: 5, y: 20 };
        let reference = reference_color(&raster, &[seed]);
        let mask = grow_region(&raster, &exclusion, &[seed], &reference, 120);

        assert!(mask.is_set_at(5, 20));
        for y in 0..40 {
            for x in 20..40 {
                assert!(!mask.is_set_at(x, y), "({x}, {y}) leaked past the strip");
            }
        }
    }

    #[test]
    fn rejected_seed_does_not_expand() {
        let raster = uniform(10, 10, [128, 128, 128]);
        let exclusion = BinaryMask::new(10, 10);
        let mask = grow_region(&raster, &exclusion, &[Point { x: 5, y: 5 }], &[0.0, 0.0, 0.0], 40);
        assert_eq!(mask.count(), 0);
    }
}
