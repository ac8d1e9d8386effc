//! Loading source, annotated and test photographs.

use std::fmt;
use std::path::{Path, PathBuf};

use image::{ImageReader, RgbImage};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SeaLionError};

#[cfg(feature = "tracing")]
use tracing::instrument;

/// Annotated pixels whose channel sum is below this were painted over.
pub const PAINT_MASK_MAX_SUM: u32 = 40;

/// Placeholder replaced by the image id in path templates.
pub const ID_PLACEHOLDER: &str = "{id}";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageKind {
    /// Clean training photograph.
    Source,
    /// Training photograph with dot markers painted on.
    Annotated,
    Test,
}

impl fmt::Display for ImageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ImageKind::Source => "source",
            ImageKind::Annotated => "annotated",
            ImageKind::Test => "test",
        })
    }
}

/// Path templates for every image kind, each containing `{id}`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImagePaths {
    pub source: String,
    pub annotated: String,
    pub test: String,
}

impl Default for ImagePaths {
    fn default() -> Self {
        Self {
            source: "data/Train/{id}.jpg".to_string(),
            annotated: "data/TrainDotted/{id}.jpg".to_string(),
            test: "data/Test/{id}.jpg".to_string(),
        }
    }
}

impl ImagePaths {
    pub fn template(&self, kind: ImageKind) -> &str {
        match kind {
            ImageKind::Source => &self.source,
            ImageKind::Annotated => &self.annotated,
            ImageKind::Test => &self.test,
        }
    }

    pub fn resolve(&self, kind: ImageKind, id: u32) -> PathBuf {
        PathBuf::from(self.template(kind).replace(ID_PLACEHOLDER, &id.to_string()))
    }
}

/// Image loader bound to a set of path templates.
#[derive(Clone, Debug)]
pub struct ImageStore {
    paths: ImagePaths,
}

impl ImageStore {
    pub fn new(paths: ImagePaths) -> Self {
        Self { paths }
    }

    pub fn paths(&self) -> &ImagePaths {
        &self.paths
    }

    /// Load an image as RGB8, padded with `border` zero pixels on every side.
    #[cfg_attr(feature = "tracing", instrument(level = "debug", skip(self)))]
    pub fn load(&self, kind: ImageKind, id: u32, border: u32) -> Result<RgbImage> {
        let path = self.paths.resolve(kind, id);
        if !path.is_file() {
            return Err(SeaLionError::ImageNotFound { kind, path });
        }
        let img = ImageReader::open(&path)
            .map_err(|e| open_error(kind, &path, e))?
            .decode()?
            .to_rgb8();
        log::debug!(
            "loaded {kind} image {id} ({}x{}) from {}",
            img.width(),
            img.height(),
            path.display()
        );
        Ok(pad_border(&img, border))
    }

    /// Load the source image with painted-over regions zeroed.
    pub fn load_masked(&self, id: u32, border: u32) -> Result<RgbImage> {
        self.load_pair(id, border).map(|(source, _)| source)
    }

    /// Masked source and annotated images of one training id, each decoded
    /// once.
    #[cfg_attr(feature = "tracing", instrument(level = "debug", skip(self)))]
    pub fn load_pair(&self, id: u32, border: u32) -> Result<(RgbImage, RgbImage)> {
        let mut source = self.load(ImageKind::Source, id, border)?;
        let annotated = self.load(ImageKind::Annotated, id, border)?;
        mask_painted(&mut source, &annotated, PAINT_MASK_MAX_SUM);
        Ok((source, annotated))
    }
}

/// Classify a failure to open an image file. Both outcomes skip only the
/// affected image in a batch.
fn open_error(kind: ImageKind, path: &Path, err: std::io::Error) -> SeaLionError {
    if err.kind() == std::io::ErrorKind::NotFound {
        SeaLionError::ImageNotFound {
            kind,
            path: path.to_path_buf(),
        }
    } else {
        SeaLionError::ImageUnreadable {
            kind,
            path: path.to_path_buf(),
            source: err,
        }
    }
}

/// Copy `img` into a zero canvas grown by `border` on all four sides.
pub fn pad_border(img: &RgbImage, border: u32) -> RgbImage {
    if border == 0 {
        return img.clone();
    }
    let mut out = RgbImage::new(img.width() + 2 * border, img.height() + 2 * border);
    image::imageops::replace(&mut out, img, i64::from(border), i64::from(border));
    out
}

/// Zero every pixel of `img` whose counterpart in `annotated` has a channel
/// sum below `max_sum`. Painted regions in JPEGs are only near-black.
pub fn mask_painted(img: &mut RgbImage, annotated: &RgbImage, max_sum: u32) {
    let mut masked = 0usize;
    for (dst, src) in img.pixels_mut().zip(annotated.pixels()) {
        let sum: u32 = src.0.iter().map(|&c| u32::from(c)).sum();
        if sum < max_sum {
            dst.0 = [0, 0, 0];
            masked += 1;
        }
    }
    log::trace!("masked {masked} painted pixels");
}
