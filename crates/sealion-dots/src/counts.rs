//! Ground-truth per-image counts and count error.

use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use sealion_core::{Category, LabeledPoint};

use crate::coords::parse_field;
use crate::error::{Result, SeaLionError};

/// Number of annotated categories.
pub const POSITIVE_CATEGORIES: usize = 5;

pub type Counts = [u32; POSITIVE_CATEGORIES];

/// True counts per training image, read once and then shared read-only.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CountTable {
    counts: HashMap<u32, Counts>,
}

impl CountTable {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(SeaLionError::TableNotFound {
                path: path.to_path_buf(),
            });
        }
        log::info!("loading counts from {}", path.display());
        Self::read(BufReader::new(File::open(path)?))
    }

    /// Parse `image_id,c1,..,c5` rows after a header line.
    pub fn read<R: BufRead>(reader: R) -> Result<Self> {
        let mut counts = HashMap::new();
        for (idx, line) in reader.lines().enumerate().skip(1) {
            let line = line?;
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let line_no = idx + 1;
            let fields: Vec<&str> = line.split(',').map(str::trim).collect();
            if fields.len() != POSITIVE_CATEGORIES + 1 {
                return Err(SeaLionError::malformed(
                    line_no,
                    format!(
                        "expected {} fields, found {}",
                        POSITIVE_CATEGORIES + 1,
                        fields.len()
                    ),
                ));
            }
            let id: u32 = parse_field(line_no, "image_id", fields[0])?;
            let mut row = [0u32; POSITIVE_CATEGORIES];
            for (slot, raw) in row.iter_mut().zip(&fields[1..]) {
                *slot = parse_field(line_no, "count", raw)?;
            }
            counts.insert(id, row);
        }
        Ok(Self { counts })
    }

    pub fn from_map(counts: HashMap<u32, Counts>) -> Self {
        Self { counts }
    }

    pub fn get(&self, image_id: u32) -> Option<&Counts> {
        self.counts.get(&image_id)
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Root mean squared count error per category, averaged over categories.
    ///
    /// Ids absent from the table are ignored; `None` when nothing matched.
    pub fn rmse(&self, observed: &BTreeMap<u32, Counts>) -> Option<f64> {
        let mut sq = [0.0f64; POSITIVE_CATEGORIES];
        let mut n = 0usize;
        for (id, obs) in observed {
            let Some(truth) = self.get(*id) else {
                continue;
            };
            for c in 0..POSITIVE_CATEGORIES {
                let d = f64::from(truth[c]) - f64::from(obs[c]);
                sq[c] += d * d;
            }
            n += 1;
        }
        if n == 0 {
            return None;
        }
        let total: f64 = sq.iter().map(|s| (s / n as f64).sqrt()).sum();
        Some(total / POSITIVE_CATEGORIES as f64)
    }
}

/// Tally of points per category, indexed by category code (background last).
pub fn category_counts(points: &[LabeledPoint]) -> [u32; 6] {
    let mut counts = [0u32; 6];
    for p in points {
        counts[p.category.code() as usize] += 1;
    }
    counts
}

/// The five annotated entries of [`category_counts`].
pub fn positive_counts(points: &[LabeledPoint]) -> Counts {
    let all = category_counts(points);
    let mut out = [0u32; POSITIVE_CATEGORIES];
    for c in Category::POSITIVE {
        out[c.code() as usize] = all[c.code() as usize];
    }
    out
}
