//! Materializing training chunks around labeled points.

use std::fs;
use std::path::{Path, PathBuf};

use image::RgbImage;
use serde::{Deserialize, Serialize};

use sealion_core::LabeledPoint;

use crate::crop::{crop_subject, CropParams};
use crate::error::Result;
use crate::image_access::ImageStore;

#[cfg(feature = "tracing")]
use tracing::instrument;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChunkMode {
    /// Fixed `size × size` window centered on every point.
    Fixed,
    /// Window tightened to the subject's bounding box; background points keep
    /// the fixed window.
    Cropped,
}

/// Size suffix of a chunk file name.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChunkDims {
    Square(u32),
    Rect { width: u32, height: u32 },
}

/// `chunk_{id}_{cls}_{x}_{y}_{size}.png` or `chunk_{id}_{cls}_{x}_{y}_{w}_{h}.png`.
pub fn chunk_file_name(point: &LabeledPoint, dims: ChunkDims) -> String {
    let size = match dims {
        ChunkDims::Square(s) => s.to_string(),
        ChunkDims::Rect { width, height } => format!("{width}_{height}"),
    };
    format!(
        "chunk_{}_{}_{}_{}_{}.png",
        point.image_id,
        point.category.code(),
        point.x,
        point.y,
        size
    )
}

/// Window of `size × size` whose top-left corner in `bordered` is the point's
/// unbordered position. With a border of `size / 2` this centers the point.
pub fn fixed_window(bordered: &RgbImage, point: &LabeledPoint, size: u32) -> RgbImage {
    let x = point.x.max(0) as u32;
    let y = point.y.max(0) as u32;
    image::imageops::crop_imm(bordered, x, y, size, size).to_image()
}

/// Adaptive crop of the fixed window around `point`.
///
/// The returned point carries the subject's centroid translated back to
/// unbordered image coordinates.
pub fn cropped_window(
    bordered: &RgbImage,
    point: &LabeledPoint,
    size: u32,
    params: &CropParams,
) -> Option<(LabeledPoint, RgbImage)> {
    let chunk = fixed_window(bordered, point, size);
    let crop = crop_subject(&chunk, params)?;
    let half = f64::from(size / 2);
    let moved = LabeledPoint {
        x: (f64::from(point.x) + (crop.centroid.x - half)).round() as i32,
        y: (f64::from(point.y) + (crop.centroid.y - half)).round() as i32,
        ..*point
    };
    Some((moved, crop.image))
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkSummary {
    pub written: usize,
    /// Points without a qualifying crop.
    pub skipped: usize,
    /// Points whose image could not be loaded.
    pub failed: usize,
}

/// Writes chunks for a list of points into one output directory.
pub struct ChunkWriter<'a> {
    store: &'a ImageStore,
    out_dir: PathBuf,
    size: u32,
    mode: ChunkMode,
    crop: CropParams,
}

impl<'a> ChunkWriter<'a> {
    pub fn new(
        store: &'a ImageStore,
        out_dir: impl Into<PathBuf>,
        size: u32,
        mode: ChunkMode,
    ) -> Self {
        Self {
            store,
            out_dir: out_dir.into(),
            size,
            mode,
            crop: CropParams::default(),
        }
    }

    pub fn with_crop_params(mut self, crop: CropParams) -> Self {
        self.crop = crop;
        self
    }

    pub fn out_dir(&self) -> &Path {
        &self.out_dir
    }

    /// Write one file per point. Images are loaded once per run of
    /// consecutive points sharing an image id.
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "info", skip(self, points), fields(points = points.len(), mode = ?self.mode))
    )]
    pub fn write(&self, points: &[LabeledPoint]) -> Result<ChunkSummary> {
        fs::create_dir_all(&self.out_dir)?;
        log::info!(
            "writing {:?} chunks of size {} for {} points to {}",
            self.mode,
            self.size,
            points.len(),
            self.out_dir.display()
        );

        let mut summary = ChunkSummary::default();
        let mut current: Option<(u32, Option<RgbImage>)> = None;
        for point in points {
            let reload = current.as_ref().is_none_or(|(id, _)| *id != point.image_id);
            if reload {
                let img = match self.store.load_masked(point.image_id, self.size / 2) {
                    Ok(img) => Some(img),
                    Err(e) if e.is_per_image() => {
                        log::warn!("image {}: {e}, skipping its chunks", point.image_id);
                        None
                    }
                    Err(e) => return Err(e),
                };
                current = Some((point.image_id, img));
            }
            let Some((_, Some(img))) = current.as_ref() else {
                summary.failed += 1;
                continue;
            };

            if self.write_point(img, point)? {
                summary.written += 1;
            } else {
                summary.skipped += 1;
            }
        }
        log::info!(
            "chunks: {} written, {} skipped, {} failed",
            summary.written,
            summary.skipped,
            summary.failed
        );
        Ok(summary)
    }

    fn write_point(&self, img: &RgbImage, point: &LabeledPoint) -> Result<bool> {
        let (name, chunk) = match self.mode {
            ChunkMode::Fixed => (
                chunk_file_name(point, ChunkDims::Square(self.size)),
                fixed_window(img, point, self.size),
            ),
            ChunkMode::Cropped if point.category.is_background() => (
                chunk_file_name(
                    point,
                    ChunkDims::Rect {
                        width: self.size,
                        height: self.size,
                    },
                ),
                fixed_window(img, point, self.size),
            ),
            ChunkMode::Cropped => {
                let Some((moved, crop)) = cropped_window(img, point, self.size, &self.crop) else {
                    log::debug!(
                        "no subject for {}_{}_{}_{}",
                        point.image_id,
                        point.category.code(),
                        point.x,
                        point.y
                    );
                    return Ok(false);
                };
                let dims = ChunkDims::Rect {
                    width: crop.width(),
                    height: crop.height(),
                };
                (chunk_file_name(&moved, dims), crop)
            }
        };
        let path = self.out_dir.join(&name);
        log::trace!("saving {}", path.display());
        chunk.save(&path)?;
        Ok(true)
    }
}
