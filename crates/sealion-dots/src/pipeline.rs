//! Batch facade tying the pipeline stages together.

use std::collections::BTreeMap;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use sealion_core::LabeledPoint;

use crate::chunks::{ChunkMode, ChunkSummary, ChunkWriter};
use crate::config::{SeaLionConfig, TRAIN_SHORT_IDS};
use crate::coords::CoordinateStore;
use crate::counts::{category_counts, positive_counts, CountTable, Counts};
use crate::dots::extract_dots;
use crate::error::Result;
use crate::image_access::ImageStore;
use crate::negatives::sample_negatives;

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Outcome tally of a batch run.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    /// Images that produced a point list.
    pub processed: usize,
    /// Image pairs rejected by the mean-difference gate.
    pub unusable: usize,
    /// Images skipped because they could not be loaded.
    pub failed: usize,
    pub points: usize,
    /// Count error against the truth table, when one was supplied.
    pub rmse: Option<f64>,
}

/// Per-image dot extraction and sampling driven by a [`SeaLionConfig`].
pub struct SeaLionData {
    config: SeaLionConfig,
    store: ImageStore,
}

impl SeaLionData {
    pub fn new(config: SeaLionConfig) -> Self {
        let store = ImageStore::new(config.images.clone());
        Self { config, store }
    }

    pub fn config(&self) -> &SeaLionConfig {
        &self.config
    }

    pub fn store(&self) -> &ImageStore {
        &self.store
    }

    /// All training ids except the mismatched ones, ascending.
    pub fn train_ids(&self) -> Vec<u32> {
        (0..self.config.train_count)
            .filter(|id| !self.config.bad_train_ids.contains(id))
            .collect()
    }

    pub fn train_short_ids(&self) -> Vec<u32> {
        TRAIN_SHORT_IDS.to_vec()
    }

    pub fn test_ids(&self) -> Vec<u32> {
        (0..self.config.test_count).collect()
    }

    /// Deterministic per-image generator, independent of processing order.
    pub fn rng_for(&self, image_id: u32) -> StdRng {
        StdRng::seed_from_u64(self.config.seed.wrapping_add(u64::from(image_id)))
    }

    /// Dot markers of one training image; `Ok(None)` for an unusable pair.
    pub fn dots(&self, image_id: u32) -> Result<Option<Vec<LabeledPoint>>> {
        let (source, annotated) = self.store.load_pair(image_id, 0)?;
        Ok(extract_dots(image_id, &source, &annotated, &self.config.dots))
    }

    /// Dot markers followed by balanced background samples.
    #[cfg_attr(feature = "tracing", instrument(level = "info", skip(self, rng)))]
    pub fn coords<R: Rng + ?Sized>(
        &self,
        image_id: u32,
        rng: &mut R,
    ) -> Result<Option<Vec<LabeledPoint>>> {
        let (source, annotated) = self.store.load_pair(image_id, 0)?;
        let Some(mut points) = extract_dots(image_id, &source, &annotated, &self.config.dots)
        else {
            return Ok(None);
        };
        let negatives =
            sample_negatives(image_id, &annotated, &points, &self.config.negatives, rng);
        log::debug!(
            "image {image_id}: {} dots, {} background samples",
            points.len(),
            negatives.len()
        );
        points.extend(negatives);
        Ok(Some(points))
    }

    /// Run [`Self::coords`] over `ids`, skipping images that fail to load.
    pub fn collect_coords(
        &self,
        ids: &[u32],
        truth: Option<&CountTable>,
    ) -> Result<(Vec<LabeledPoint>, BatchSummary)> {
        let mut all = Vec::new();
        let mut summary = BatchSummary::default();
        let mut observed: BTreeMap<u32, Counts> = BTreeMap::new();

        for &id in ids {
            let mut rng = self.rng_for(id);
            let points = match self.coords(id, &mut rng) {
                Ok(Some(points)) => points,
                Ok(None) => {
                    summary.unusable += 1;
                    continue;
                }
                Err(e) if e.is_per_image() => {
                    log::warn!("image {id}: {e}");
                    summary.failed += 1;
                    continue;
                }
                Err(e) => return Err(e),
            };

            let counts = positive_counts(&points);
            if let Some(true_counts) = truth.and_then(|t| t.get(id)) {
                log::debug!(
                    "image {id}: true {true_counts:?}, counted {:?}",
                    category_counts(&points)
                );
            }
            observed.insert(id, counts);
            summary.processed += 1;
            all.extend(points);
        }

        summary.points = all.len();
        summary.rmse = truth.and_then(|t| t.rmse(&observed));
        log::info!(
            "processed {} images ({} unusable, {} failed), {} points",
            summary.processed,
            summary.unusable,
            summary.failed,
            summary.points
        );
        if let Some(rmse) = summary.rmse {
            log::info!("count rmse {rmse:.3}");
        }
        Ok((all, summary))
    }

    /// Collect coordinates for `ids` and write them to the configured table.
    pub fn save_coords(&self, ids: &[u32], truth: Option<&CountTable>) -> Result<BatchSummary> {
        let (points, summary) = self.collect_coords(ids, truth)?;
        CoordinateStore::new(&self.config.coords_path).save(&points)?;
        Ok(summary)
    }

    pub fn load_coords(&self) -> Result<Vec<LabeledPoint>> {
        CoordinateStore::new(&self.config.coords_path).load()
    }

    /// Write chunks for `points` into the directory configured for `mode`.
    pub fn save_chunks(&self, points: &[LabeledPoint], mode: ChunkMode) -> Result<ChunkSummary> {
        ChunkWriter::new(
            &self.store,
            self.config.chunk_dir(mode),
            self.config.chunk_size,
            mode,
        )
        .with_crop_params(self.config.crop.clone())
        .write(points)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn train_ids_skip_mismatched_images() {
        let data = SeaLionData::new(SeaLionConfig::default());
        let ids = data.train_ids();
        assert_eq!(ids.len(), 947 - 57);
        assert_eq!(&ids[..4], &[0, 1, 2, 4]);
        assert!(!ids.contains(&946));
        assert_eq!(data.test_ids().len(), 18636);
    }

    #[test]
    fn rng_depends_only_on_seed_and_id() {
        let data = SeaLionData::new(SeaLionConfig::default());
        let a: u64 = data.rng_for(5).random();
        let b: u64 = data.rng_for(5).random();
        let c: u64 = data.rng_for(6).random();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn missing_images_are_counted_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let data = SeaLionData::new(SeaLionConfig::rooted(dir.path()));
        let (points, summary) = data.collect_coords(&[0, 1], None).unwrap();
        assert!(points.is_empty());
        assert_eq!(summary.failed, 2);
        assert_eq!(summary.processed, 0);
    }
}
