//! Dot annotation extraction and training-chunk generation for sea lion
//! survey photographs.
//!
//! Each training image comes as a pair: the clean photograph and a copy where
//! annotators painted a colored dot on every animal. The pipeline:
//! - loads both images, blanking regions that were painted over
//!   ([`image_access`]),
//! - finds the dots by differencing the pair and classifying the changed
//!   pixels against the dot palette ([`dots`]),
//! - adds background samples from a coarse grid clear of any dot
//!   ([`negatives`]),
//! - persists the labeled points ([`coords`]) and cuts training chunks
//!   around them, optionally tightened to the animal ([`chunks`], [`crop`]).
//!
//! ## Quickstart
//!
//! ```no_run
//! use sealion_dots::{SeaLionConfig, SeaLionData, ChunkMode};
//!
//! # fn main() -> Result<(), sealion_dots::SeaLionError> {
//! let data = SeaLionData::new(SeaLionConfig::rooted("/data/sealions"));
//! let summary = data.save_coords(&data.train_short_ids(), None)?;
//! println!("{} points from {} images", summary.points, summary.processed);
//!
//! let points = data.load_coords()?;
//! data.save_chunks(&points, ChunkMode::Cropped)?;
//! # Ok(())
//! # }
//! ```

pub mod chunks;
pub mod config;
pub mod coords;
pub mod counts;
pub mod crop;
pub mod dots;
pub mod error;
pub mod image_access;
pub mod negatives;
pub mod pipeline;

pub use chunks::{chunk_file_name, ChunkDims, ChunkMode, ChunkSummary, ChunkWriter};
pub use config::{SeaLionConfig, MISMATCHED_TRAIN_IDS, TRAIN_SHORT_IDS};
pub use coords::{read_points, write_points, CoordinateStore, COORDS_HEADER};
pub use counts::{category_counts, positive_counts, CountTable, Counts};
pub use crop::{crop_subject, CropParams, SubjectCrop};
pub use dots::{extract_dots, mean_abs_difference, DotParams};
pub use error::{Result, SeaLionError};
pub use image_access::{ImageKind, ImagePaths, ImageStore};
pub use negatives::{balance, candidate_tiles, grid_dims, sample_negatives, NegativeParams};
pub use pipeline::{BatchSummary, SeaLionData};

pub use sealion_core::{Category, ColorPalette, LabeledPoint, PaletteEntry};
