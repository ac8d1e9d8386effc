//! Comma-separated persistence of labeled points.

use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use sealion_core::{Category, LabeledPoint};

use crate::error::{Result, SeaLionError};

/// Header row, in field order.
pub const COORDS_HEADER: &str = "image_id,category,x,y";

/// Write the header and one `image_id,category,x,y` row per point.
pub fn write_points<W: Write>(mut writer: W, points: &[LabeledPoint]) -> Result<()> {
    writeln!(writer, "{COORDS_HEADER}")?;
    for p in points {
        writeln!(
            writer,
            "{},{},{},{}",
            p.image_id,
            p.category.code(),
            p.x,
            p.y
        )?;
    }
    writer.flush()?;
    Ok(())
}

/// Parse rows written by [`write_points`]. The first line is skipped as the
/// header; blank lines are ignored. Any malformed row fails the whole read.
pub fn read_points<R: BufRead>(reader: R) -> Result<Vec<LabeledPoint>> {
    let mut points = Vec::new();
    for (idx, line) in reader.lines().enumerate().skip(1) {
        let line = line?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        points.push(parse_row(idx + 1, line)?);
    }
    Ok(points)
}

fn parse_row(line_no: usize, line: &str) -> Result<LabeledPoint> {
    let fields: Vec<&str> = line.split(',').map(str::trim).collect();
    let [id, cls, x, y] = fields.as_slice() else {
        return Err(SeaLionError::malformed(
            line_no,
            format!("expected 4 fields, found {}", fields.len()),
        ));
    };

    let image_id: u32 = parse_field(line_no, "image_id", id)?;
    let code: i64 = parse_field(line_no, "category", cls)?;
    let category =
        Category::try_from(code).map_err(|e| SeaLionError::malformed(line_no, e.to_string()))?;
    let x: i32 = parse_field(line_no, "x", x)?;
    let y: i32 = parse_field(line_no, "y", y)?;
    Ok(LabeledPoint {
        image_id,
        category,
        x,
        y,
    })
}

pub(crate) fn parse_field<T: std::str::FromStr>(
    line_no: usize,
    name: &str,
    raw: &str,
) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    raw.parse()
        .map_err(|e| SeaLionError::malformed(line_no, format!("{name} {raw:?}: {e}")))
}

/// Coordinate table bound to a file path.
#[derive(Clone, Debug)]
pub struct CoordinateStore {
    path: PathBuf,
}

impl CoordinateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn save(&self, points: &[LabeledPoint]) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        log::info!(
            "saving {} coordinates to {}",
            points.len(),
            self.path.display()
        );
        let file = File::create(&self.path)?;
        write_points(BufWriter::new(file), points)
    }

    pub fn load(&self) -> Result<Vec<LabeledPoint>> {
        if !self.path.is_file() {
            return Err(SeaLionError::TableNotFound {
                path: self.path.clone(),
            });
        }
        log::info!("loading coordinates from {}", self.path.display());
        read_points(BufReader::new(File::open(&self.path)?))
    }
}
