//! Adaptive cropping of a chunk to the subject near its center.

use std::collections::BTreeMap;

use image::{GrayImage, Luma, RgbImage};
use imageproc::distance_transform::Norm;
use imageproc::region_labelling::{connected_components, Connectivity};
use nalgebra::Point2;
use serde::{Deserialize, Serialize};

use sealion_core::{find_contours, BinaryMask, Bounds, Contour};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CropParams {
    pub blur_sigma: f32,
    /// Canny hysteresis thresholds on the Sobel magnitude of an 8-bit image.
    pub canny_low: f32,
    pub canny_high: f32,
    /// Max L1 distance between the subject centroid and the chunk center.
    pub max_center_distance: f64,
    pub min_area: f64,
    /// Minimum side of the cropped bounding box.
    pub min_size: u32,
    /// Skip the component sitting on the chunk's center pixel when picking
    /// the subject.
    pub exclude_center_label: bool,
}

impl Default for CropParams {
    fn default() -> Self {
        Self {
            blur_sigma: 3.0,
            canny_low: 25.0,
            canny_high: 51.0,
            max_center_distance: 20.0,
            min_area: 50.0,
            min_size: 15,
            exclude_center_label: true,
        }
    }
}

/// Subject located inside a chunk.
#[derive(Clone, Debug)]
pub struct SubjectCrop {
    pub image: RgbImage,
    /// Outline centroid in chunk coordinates (x = column, y = row).
    pub centroid: Point2<f64>,
    pub bounds: Bounds,
    pub area: f64,
}

/// Blur, edge-detect, dilate and fill `chunk` into a mask of solid objects.
pub fn object_mask(chunk: &RgbImage, params: &CropParams) -> BinaryMask {
    let gray = image::imageops::grayscale(chunk);
    let blurred = imageproc::filter::gaussian_blur_f32(&gray, params.blur_sigma);
    let edges = imageproc::edges::canny(&blurred, params.canny_low, params.canny_high);
    let dilated = imageproc::morphology::dilate(&edges, Norm::L1, 1);

    let mut mask = BinaryMask::from_fn(
        dilated.width() as usize,
        dilated.height() as usize,
        |x, y| dilated.get_pixel(x as u32, y as u32)[0] > 0,
    );
    mask.fill_holes();
    mask
}

#[derive(Default)]
struct Moments {
    sum_x: f64,
    sum_y: f64,
    count: usize,
}

/// Pick the component label whose pixel centroid is nearest to `center`.
fn nearest_component(
    labels: &image::ImageBuffer<Luma<u32>, Vec<u32>>,
    center: (u32, u32),
    excluded: Option<u32>,
) -> Option<u32> {
    let mut moments: BTreeMap<u32, Moments> = BTreeMap::new();
    for (x, y, p) in labels.enumerate_pixels() {
        let l = p[0];
        if l == 0 {
            continue;
        }
        let m = moments.entry(l).or_default();
        m.sum_x += x as f64;
        m.sum_y += y as f64;
        m.count += 1;
    }

    let (cx, cy) = (center.0 as f64, center.1 as f64);
    let mut best: Option<(u32, f64)> = None;
    for (&label, m) in &moments {
        if Some(label) == excluded {
            continue;
        }
        let dx = m.sum_x / m.count as f64 - cx;
        let dy = m.sum_y / m.count as f64 - cy;
        let d2 = dx * dx + dy * dy;
        if best.is_none_or(|(_, b)| d2 < b) {
            best = Some((label, d2));
        }
    }
    best.map(|(l, _)| l)
}

/// Locate the subject near the center of `chunk` and crop to its bounding box.
///
/// Returns `None` when no object is found, or when the closest object fails
/// the distance, area or size checks.
pub fn crop_subject(chunk: &RgbImage, params: &CropParams) -> Option<SubjectCrop> {
    let (w, h) = chunk.dimensions();
    if w == 0 || h == 0 {
        return None;
    }

    let mask = object_mask(chunk, params);
    if mask.is_empty() {
        log::trace!("crop: no edges in chunk");
        return None;
    }

    let filled = GrayImage::from_fn(w, h, |x, y| {
        Luma([if mask.get(x as i64, y as i64) { 255 } else { 0 }])
    });
    let labels = connected_components(&filled, Connectivity::Four, Luma([0u8]));

    let center = (w / 2, h / 2);
    let center_label = labels.get_pixel(center.0, center.1)[0];
    let excluded = (params.exclude_center_label && center_label != 0).then_some(center_label);
    let obj = nearest_component(&labels, center, excluded)?;

    let component = BinaryMask::from_fn(w as usize, h as usize, |x, y| {
        labels.get_pixel(x as u32, y as u32)[0] == obj
    });
    let outline: Contour = find_contours(&component)
        .into_iter()
        .max_by(|a, b| a.area().total_cmp(&b.area()))?;

    let centroid = outline.centroid()?;
    let dist = (centroid.x - center.0 as f64).abs() + (centroid.y - center.1 as f64).abs();
    if dist > params.max_center_distance {
        log::trace!("crop: subject {dist:.1}px from center");
        return None;
    }

    let area = outline.area();
    let bounds = outline.bounds()?;
    if area < params.min_area || bounds.area() < params.min_area {
        log::trace!("crop: subject area {area:.1} too small");
        return None;
    }

    let x0 = bounds.min_x.max(0.0) as u32;
    let y0 = bounds.min_y.max(0.0) as u32;
    let x1 = (bounds.max_x.max(0.0) as u32).min(w);
    let y1 = (bounds.max_y.max(0.0) as u32).min(h);
    let (cw, ch) = (x1.saturating_sub(x0), y1.saturating_sub(y0));
    if cw < params.min_size || ch < params.min_size {
        log::trace!("crop: subject box {cw}x{ch} too small");
        return None;
    }

    let image = image::imageops::crop_imm(chunk, x0, y0, cw, ch).to_image();
    Some(SubjectCrop {
        image,
        centroid,
        bounds,
        area,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    const BG: Rgb<u8> = Rgb([160, 150, 140]);
    const FG: Rgb<u8> = Rgb([30, 30, 30]);

    fn chunk_with_square(size: u32, x0: u32, y0: u32, side: u32) -> RgbImage {
        RgbImage::from_fn(size, size, |x, y| {
            if (x0..x0 + side).contains(&x) && (y0..y0 + side).contains(&y) {
                FG
            } else {
                BG
            }
        })
    }

    #[test]
    fn uniform_chunk_has_no_subject() {
        let chunk = RgbImage::from_pixel(128, 128, BG);
        assert!(object_mask(&chunk, &CropParams::default()).is_empty());
        assert!(crop_subject(&chunk, &CropParams::default()).is_none());
    }

    #[test]
    fn crops_subject_beside_center() {
        // 20px square centered at (78, 64); the center pixel stays background.
        let chunk = chunk_with_square(128, 68, 54, 20);
        let crop = crop_subject(&chunk, &CropParams::default()).expect("subject");
        assert!((crop.centroid.x - 78.0).abs() < 2.0, "{:?}", crop.centroid);
        assert!((crop.centroid.y - 64.0).abs() < 2.0, "{:?}", crop.centroid);
        let (cw, ch) = crop.image.dimensions();
        assert!((18..=30).contains(&cw), "width {cw}");
        assert!((18..=30).contains(&ch), "height {ch}");
    }

    #[test]
    fn distant_subject_is_rejected() {
        let chunk = chunk_with_square(128, 98, 54, 20);
        assert!(crop_subject(&chunk, &CropParams::default()).is_none());
    }

    #[test]
    fn center_component_is_skipped_unless_allowed() {
        let chunk = chunk_with_square(128, 54, 54, 20);
        assert!(crop_subject(&chunk, &CropParams::default()).is_none());

        let params = CropParams {
            exclude_center_label: false,
            ..CropParams::default()
        };
        let crop = crop_subject(&chunk, &params).expect("subject");
        assert!((crop.centroid.x - 64.0).abs() < 2.0);
        assert!((crop.centroid.y - 64.0).abs() < 2.0);
    }

    #[test]
    fn nearest_component_honours_exclusion() {
        let mut labels = image::ImageBuffer::<Luma<u32>, Vec<u32>>::new(10, 1);
        labels.put_pixel(5, 0, Luma([1]));
        labels.put_pixel(8, 0, Luma([2]));
        labels.put_pixel(0, 0, Luma([3]));
        assert_eq!(nearest_component(&labels, (5, 0), None), Some(1));
        assert_eq!(nearest_component(&labels, (5, 0), Some(1)), Some(2));
        let empty = image::ImageBuffer::<Luma<u32>, Vec<u32>>::new(4, 4);
        assert_eq!(nearest_component(&empty, (2, 2), None), None);
    }
}
