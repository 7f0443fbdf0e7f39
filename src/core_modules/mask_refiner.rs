// THEORY:
// Region growing leaves two kinds of noise: pinholes inside the wall (a speck
// of dirt, a screw head) and thin spurs where growth leaked along a seam. The
// refiner removes both with two neighborhood votes:
// 1.  **Closing**: a missing pixel is filled when at least 15 of the in-bounds
//     pixels of its 5x5 window are wall. Excluded pixels are never filled, so
//     refinement cannot reintroduce sky, edges or glare.
// 2.  **Pruning**: a wall pixel survives when at least 3 of its in-bounds
//     8-neighbors are wall after closing.
//
// Both passes read one mask and write another, so every row is independent.

use crate::core_modules::raster::BinaryMask;
use crate::error::Result;
use rayon::prelude::*;

const CLOSING_RADIUS: i64 = 2;
const CLOSING_MIN_WALL: usize = 15;
const PRUNING_MIN_NEIGHBORS: usize = 3;

/// A cleaned-up wall mask and its coverage.
#[derive(Debug, Clone, PartialEq)]
pub struct RefinedMask {
    pub mask: BinaryMask,
    /// Wall pixels as a percentage of all pixels.
    pub coverage_percent: f64,
}

pub fn refine(mask: &BinaryMask, exclusion: &BinaryMask) -> Result<RefinedMask> {
    let closed = close(mask, exclusion)?;
    let pruned = prune(&closed);
    let coverage_percent = pruned.coverage_percent();
    Ok(RefinedMask {
        mask: pruned,
        coverage_percent,
    })
}

pub fn close(mask: &BinaryMask, exclusion: &BinaryMask) -> Result<BinaryMask> {
    mask.ensure_same_size(exclusion)?;

    Ok(vote(mask, |index, x, y| {
        if mask.is_set(index) {
            return true;
        }
        if exclusion.is_set(index) {
            return false;
        }
        count_in_window(mask, x, y, CLOSING_RADIUS, true) >= CLOSING_MIN_WALL
    }))
}

pub fn prune(mask: &BinaryMask) -> BinaryMask {
    vote(mask, |index, x, y| {
        mask.is_set(index) && count_in_window(mask, x, y, 1, false) >= PRUNING_MIN_NEIGHBORS
    })
}

/// Builds a new mask by evaluating `keep` for every pixel, row-parallel.
fn vote<F>(mask: &BinaryMask, keep: F) -> BinaryMask
where
    F: Fn(usize, i64, i64) -> bool + Sync,
{
    let width = mask.width() as usize;
    let mut result = BinaryMask::new(mask.width(), mask.height());
    if width == 0 {
        return result;
    }
    result
        .bits_mut()
        .par_chunks_mut(width)
        .enumerate()
        .for_each(|(y, row)| {
            for (x, bit) in row.iter_mut().enumerate() {
                *bit = u8::from(keep(y * width + x, x as i64, y as i64));
            }
        });
    result
}

/// Counts set pixels in the in-bounds square window of `radius` around (x, y).
fn count_in_window(mask: &BinaryMask, x: i64, y: i64, radius: i64, include_center: bool) -> usize {
    let width = mask.width() as i64;
    let height = mask.height() as i64;
    let mut count = 0;
    for ny in (y - radius).max(0)..=(y + radius).min(height - 1) {
        for nx in (x - radius).max(0)..=(x + radius).min(width - 1) {
            if !include_center && nx == x && ny == y {
                continue;
            }
            if mask.is_set((ny * width + nx) as usize) {
                count += 1;
            }
        }
    }
    count
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mask_from_rows(rows: &[&str]) -> BinaryMask {
        let height = rows.len() as u32;
        let width = rows[0].len() as u32;
        let bits = rows
            .iter()
            .flat_map(|row| row.bytes().map(|b| u8::from(b == b'#')))
            .collect();
        BinaryMask::from_bits(width, height, bits).unwrap()
    }

    #[test]
    fn closing_fills_pinholes() {
        let mut mask = BinaryMask::from_bits(7, 7, vec![1; 49]).unwrap();
        mask.set(3 * 7 + 3, false);
        let closed = close(&mask, &BinaryMask::new(7, 7)).unwrap();
        assert_eq!(closed.count(), 49);
    }

    #[test]
    fn closing_respects_exclusion() {
        let mut mask = BinaryMask::from_bits(7, 7, vec![1; 49]).unwrap();
        mask.set(24, false);
        let mut exclusion = BinaryMask::new(7, 7);
        exclusion.set(24, true);
        let closed = close(&mask, &exclusion).unwrap();
        assert!(!closed.is_set(24));
    }

    #[test]
    fn closing_rejects_mismatched_exclusion() {
        let mask = BinaryMask::new(4, 4);
        assert!(close(&mask, &BinaryMask::new(5, 4)).is_err());
    }

    #[test]
    fn pruning_drops_isolated_and_thin_fragments() {
        let mask = mask_from_rows(&[
            "#.......", //
            "........", //
            "...###..", //
            "...###..", //
            "...###..", //
            "........", //
            "#######.", //
        ]);
        let pruned = prune(&mask);
        assert!(!pruned.is_set_at(0, 0));
        // Every pixel of the 3x3 block has at least 3 block neighbors.
        assert!(pruned.is_set_at(3, 2));
        assert!(pruned.is_set_at(4, 3));
        // A one-pixel line gives each pixel at most 2 neighbors.
        assert!((0..8).all(|x| !pruned.is_set_at(x, 6)));
    }

    #[test]
    fn full_small_mask_survives_refinement() {
        let mask = BinaryMask::from_bits(4, 4, vec![1; 16]).unwrap();
        let refined = refine(&mask, &BinaryMask::new(4, 4)).unwrap();
        assert_eq!(refined.mask.count(), 16);
        assert_eq!(refined.coverage_percent, 100.0);
    }

    #[test]
    fn empty_mask_stays_empty() {
        let refined = refine(&BinaryMask::new(6, 6), &BinaryMask::new(6, 6)).unwrap();
        assert_eq!(refined.mask.count(), 0);
        assert_eq!(refined.coverage_percent, 0.0);
    }
}
