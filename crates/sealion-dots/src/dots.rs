//! Dot marker extraction from a source/annotated image pair.

use image::RgbImage;
use serde::{Deserialize, Serialize};

use sealion_core::{find_contours, BinaryMask, ColorPalette, LabeledPoint};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Empirically tuned constants of the dot extractor.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DotParams {
    /// Max-over-channels difference for a pixel to count as painted.
    pub min_difference: u8,
    /// Contours must enclose strictly more than this area.
    pub min_area: f64,
    /// Contours must enclose strictly less than this area.
    pub max_area: f64,
    /// Pairs whose mean absolute difference exceeds this are misaligned.
    pub max_mean_difference: f64,
    pub palette: ColorPalette,
}

impl Default for DotParams {
    fn default() -> Self {
        Self {
            min_difference: 16,
            min_area: 9.0,
            max_area: 100.0,
            max_mean_difference: 50.0,
            palette: ColorPalette::sea_lions(),
        }
    }
}

impl DotParams {
    #[inline]
    pub fn is_unusable(&self, mean_difference: f64) -> bool {
        mean_difference > self.max_mean_difference
    }

    #[inline]
    pub fn accepts_area(&self, area: f64) -> bool {
        area > self.min_area && area < self.max_area
    }
}

/// Mean absolute difference over all pixels and channels.
pub fn mean_abs_difference(a: &RgbImage, b: &RgbImage) -> f64 {
    let n = a.as_raw().len().min(b.as_raw().len());
    if n == 0 {
        return 0.0;
    }
    let total: u64 = a
        .as_raw()
        .iter()
        .zip(b.as_raw())
        .map(|(&x, &y)| u64::from(x.abs_diff(y)))
        .sum();
    total as f64 / n as f64
}

/// Pixels whose largest per-channel difference reaches `min_difference`.
pub fn foreground_mask(a: &RgbImage, b: &RgbImage, min_difference: u8) -> BinaryMask {
    let width = a.width().min(b.width());
    let height = a.height().min(b.height());
    BinaryMask::from_fn(width as usize, height as usize, |x, y| {
        let p = a.get_pixel(x as u32, y as u32).0;
        let q = b.get_pixel(x as u32, y as u32).0;
        let max = (0..3).map(|c| p[c].abs_diff(q[c])).max().unwrap_or(0);
        max >= min_difference
    })
}

/// Extract the dot markers of one image pair.
///
/// `source` must already be masked (see [`crate::image_access::mask_painted`])
/// and both images must share the same geometry. Returns `None` when the pair
/// differs too much to be trusted.
#[cfg_attr(
    feature = "tracing",
    instrument(
        level = "info",
        skip(source, annotated, params),
        fields(width = source.width(), height = source.height())
    )
)]
pub fn extract_dots(
    image_id: u32,
    source: &RgbImage,
    annotated: &RgbImage,
    params: &DotParams,
) -> Option<Vec<LabeledPoint>> {
    if source.dimensions() != annotated.dimensions() {
        log::warn!(
            "image {image_id}: source {:?} and annotated {:?} sizes differ",
            source.dimensions(),
            annotated.dimensions()
        );
        return None;
    }

    let mean = mean_abs_difference(source, annotated);
    if params.is_unusable(mean) {
        log::warn!(
            "image {image_id}: mean difference {mean:.2} exceeds {}, skipping pair",
            params.max_mean_difference
        );
        return None;
    }

    let fg = foreground_mask(source, annotated, params.min_difference);
    log::debug!("image {image_id}: {} foreground pixels", fg.count());

    let mut points = Vec::new();
    for entry in params.palette.iter() {
        let has_color = BinaryMask::from_fn(fg.width, fg.height, |x, y| {
            fg.data[y * fg.width + x] && entry.matches(annotated.get_pixel(x as u32, y as u32).0)
        });
        if has_color.is_empty() {
            continue;
        }

        let before = points.len();
        for contour in find_contours(&has_color) {
            let area = contour.area();
            if !params.accepts_area(area) {
                continue;
            }
            let Some(c) = contour.centroid() else {
                continue;
            };
            points.push(LabeledPoint::new(
                image_id,
                entry.category,
                c.x.round() as i32,
                c.y.round() as i32,
            ));
        }
        log::debug!(
            "image {image_id}: {} {} dots",
            points.len() - before,
            entry.category.name()
        );
    }
    Some(points)
}
