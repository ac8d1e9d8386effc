//! Background (negative) sample selection.

use image::RgbImage;
use rand::Rng;
use serde::{Deserialize, Serialize};

use sealion_core::{Category, LabeledPoint};

#[cfg(feature = "tracing")]
use tracing::instrument;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NegativeParams {
    /// Grid pitch; also the exclusion radius around annotated points.
    pub step: u32,
    /// Side of the tile whose brightness is tested.
    pub tile_size: u32,
    /// Minimum mean per-pixel channel sum of a tile in the annotated image.
    pub min_tile_mean: f64,
}

impl Default for NegativeParams {
    fn default() -> Self {
        Self {
            step: 120,
            tile_size: 92,
            min_tile_mean: 200.0,
        }
    }
}

/// Number of grid columns and rows laid over a `width × height` image.
pub fn grid_dims(width: u32, height: u32, step: u32) -> (u32, u32) {
    if step == 0 {
        return (0, 0);
    }
    (
        (width / step).saturating_sub(1),
        (height / step).saturating_sub(1),
    )
}

/// Mean per-pixel channel sum over the `size × size` tile at `(x, y)`,
/// clipped to the image.
pub fn tile_mean(img: &RgbImage, x: u32, y: u32, size: u32) -> f64 {
    let x1 = x.saturating_add(size).min(img.width());
    let y1 = y.saturating_add(size).min(img.height());
    if x >= x1 || y >= y1 {
        return 0.0;
    }
    let mut total = 0u64;
    for yy in y..y1 {
        for xx in x..x1 {
            total += img
                .get_pixel(xx, yy)
                .0
                .iter()
                .map(|&c| u64::from(c))
                .sum::<u64>();
        }
    }
    let n = u64::from(x1 - x) * u64::from(y1 - y);
    total as f64 / n as f64
}

/// Every grid tile origin that is clear of `positives` and looks like real,
/// unmasked scene content. Row-major order.
#[cfg_attr(
    feature = "tracing",
    instrument(level = "debug", skip(annotated, positives, params), fields(positives = positives.len()))
)]
pub fn candidate_tiles(
    image_id: u32,
    annotated: &RgbImage,
    positives: &[LabeledPoint],
    params: &NegativeParams,
) -> Vec<LabeledPoint> {
    let (cols, rows) = grid_dims(annotated.width(), annotated.height(), params.step);
    let step = params.step as i32;

    let mut out = Vec::new();
    let (mut overlapping, mut dark) = (0usize, 0usize);
    for j in 0..rows {
        for i in 0..cols {
            let x = i * params.step;
            let y = j * params.step;

            if positives
                .iter()
                .any(|p| p.within_box(x as i32, y as i32, step))
            {
                overlapping += 1;
                continue;
            }

            if tile_mean(annotated, x, y, params.tile_size) < params.min_tile_mean {
                dark += 1;
                continue;
            }

            out.push(LabeledPoint::new(
                image_id,
                Category::Background,
                x as i32,
                y as i32,
            ));
        }
    }
    log::debug!(
        "image {image_id}: {cols}x{rows} grid, {} candidates ({overlapping} overlapping, {dark} masked)",
        out.len()
    );
    out
}

/// Keep a uniformly random subset of at most `max_count` points, preserving
/// their relative order.
pub fn balance<R: Rng + ?Sized>(
    mut negatives: Vec<LabeledPoint>,
    max_count: usize,
    rng: &mut R,
) -> Vec<LabeledPoint> {
    if negatives.len() <= max_count {
        return negatives;
    }
    let mut keep = rand::seq::index::sample(rng, negatives.len(), max_count).into_vec();
    keep.sort_unstable();
    let mut keep = keep.into_iter().peekable();
    let mut idx = 0usize;
    negatives.retain(|_| {
        let hit = keep.peek() == Some(&idx);
        if hit {
            keep.next();
        }
        idx += 1;
        hit
    });
    negatives
}

/// Candidate tiles, balanced down to at most one per positive point.
pub fn sample_negatives<R: Rng + ?Sized>(
    image_id: u32,
    annotated: &RgbImage,
    positives: &[LabeledPoint],
    params: &NegativeParams,
    rng: &mut R,
) -> Vec<LabeledPoint> {
    let candidates = candidate_tiles(image_id, annotated, positives, params);
    balance(candidates, positives.len(), rng)
}
