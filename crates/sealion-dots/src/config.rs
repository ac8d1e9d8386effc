//! JSON configuration for batch runs.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::chunks::ChunkMode;
use crate::crop::CropParams;
use crate::dots::DotParams;
use crate::error::Result;
use crate::image_access::ImagePaths;
use crate::negatives::NegativeParams;

/// Training images whose annotated counterpart does not line up with the
/// source photograph.
pub const MISMATCHED_TRAIN_IDS: [u32; 57] = [
    3, 7, 9, 21, 30, 34, 71, 81, 89, 97, 151, 184, 215, 234, 242, 268, 290, 311, 331, 344, 380,
    384, 406, 421, 469, 475, 490, 499, 507, 530, 531, 605, 607, 614, 621, 638, 644, 687, 712, 721,
    767, 779, 781, 794, 800, 811, 839, 840, 869, 882, 901, 903, 905, 909, 913, 927, 946,
];

/// Small subset of clean training ids for quick runs.
pub const TRAIN_SHORT_IDS: [u32; 8] = [0, 1, 2, 4, 5, 6, 8, 10];

fn default_counts_path() -> PathBuf {
    PathBuf::from("data/Train/train.csv")
}

fn default_coords_path() -> PathBuf {
    PathBuf::from("chunks/coords.csv")
}

fn default_chunks_dir() -> PathBuf {
    PathBuf::from("chunks")
}

fn default_cropped_chunks_dir() -> PathBuf {
    PathBuf::from("croppedchunks")
}

fn default_chunk_size() -> u32 {
    128
}

fn default_train_count() -> u32 {
    947
}

fn default_test_count() -> u32 {
    18636
}

fn default_bad_train_ids() -> Vec<u32> {
    MISMATCHED_TRAIN_IDS.to_vec()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeaLionConfig {
    #[serde(default)]
    pub images: ImagePaths,
    #[serde(default = "default_counts_path")]
    pub counts_path: PathBuf,
    #[serde(default = "default_coords_path")]
    pub coords_path: PathBuf,
    #[serde(default = "default_chunks_dir")]
    pub chunks_dir: PathBuf,
    #[serde(default = "default_cropped_chunks_dir")]
    pub cropped_chunks_dir: PathBuf,
    #[serde(default = "default_chunk_size")]
    pub chunk_size: u32,
    /// Base seed for negative sampling; image `id` uses `seed + id`.
    #[serde(default)]
    pub seed: u64,
    #[serde(default = "default_train_count")]
    pub train_count: u32,
    #[serde(default = "default_test_count")]
    pub test_count: u32,
    #[serde(default = "default_bad_train_ids")]
    pub bad_train_ids: Vec<u32>,
    #[serde(default)]
    pub dots: DotParams,
    #[serde(default)]
    pub negatives: NegativeParams,
    #[serde(default)]
    pub crop: CropParams,
}

impl Default for SeaLionConfig {
    fn default() -> Self {
        Self {
            images: ImagePaths::default(),
            counts_path: default_counts_path(),
            coords_path: default_coords_path(),
            chunks_dir: default_chunks_dir(),
            cropped_chunks_dir: default_cropped_chunks_dir(),
            chunk_size: default_chunk_size(),
            seed: 0,
            train_count: default_train_count(),
            test_count: default_test_count(),
            bad_train_ids: default_bad_train_ids(),
            dots: DotParams::default(),
            negatives: NegativeParams::default(),
            crop: CropParams::default(),
        }
    }
}

impl SeaLionConfig {
    /// Default layout with every relative path placed under `root`.
    pub fn rooted(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        let mut cfg = Self::default();
        let join = |t: &str| root.join(t).to_string_lossy().into_owned();
        cfg.images = ImagePaths {
            source: join(&cfg.images.source),
            annotated: join(&cfg.images.annotated),
            test: join(&cfg.images.test),
        };
        cfg.counts_path = root.join(&cfg.counts_path);
        cfg.coords_path = root.join(&cfg.coords_path);
        cfg.chunks_dir = root.join(&cfg.chunks_dir);
        cfg.cropped_chunks_dir = root.join(&cfg.cropped_chunks_dir);
        cfg
    }

    pub fn load_json(path: impl AsRef<Path>) -> Result<Self> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Output directory for a chunk mode.
    pub fn chunk_dir(&self, mode: ChunkMode) -> &Path {
        match mode {
            ChunkMode::Fixed => &self.chunks_dir,
            ChunkMode::Cropped => &self.cropped_chunks_dir,
        }
    }
}
