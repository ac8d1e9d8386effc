use std::path::PathBuf;

use crate::image_access::ImageKind;

/// Result alias for pipeline operations.
pub type Result<T> = std::result::Result<T, SeaLionError>;

/// Errors raised by the extraction pipeline.
///
/// An unusable image pair or a subject that cannot be cropped are not
/// errors; those come back as `None`.
#[derive(thiserror::Error, Debug)]
pub enum SeaLionError {
    #[error("{kind} image not found: {}", path.display())]
    ImageNotFound { kind: ImageKind, path: PathBuf },

    #[error("cannot read {kind} image {}: {source}", path.display())]
    ImageUnreadable {
        kind: ImageKind,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("table not found: {}", path.display())]
    TableNotFound { path: PathBuf },

    #[error("malformed record at line {line}: {reason}")]
    MalformedRecord { line: usize, reason: String },

    #[error(transparent)]
    Image(#[from] image::ImageError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl SeaLionError {
    pub(crate) fn malformed(line: usize, reason: impl Into<String>) -> Self {
        Self::MalformedRecord {
            line,
            reason: reason.into(),
        }
    }

    /// Whether a batch run should skip the current image and keep going.
    pub fn is_per_image(&self) -> bool {
        matches!(
            self,
            SeaLionError::ImageNotFound { .. }
                | SeaLionError::ImageUnreadable { .. }
                | SeaLionError::Image(_)
        )
    }
}
