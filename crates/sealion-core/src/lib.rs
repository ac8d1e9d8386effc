//! Core types and geometry for sea lion dot annotations.
//!
//! This crate holds the value types shared by the extraction pipeline
//! (labeled points, categories, the dot color palette) and the raster
//! geometry it needs (binary masks, marching-squares contours). It does not
//! decode or write images.

mod contour;
mod logger;
mod mask;
mod palette;
mod point;

pub use contour::{find_contours, Bounds, Contour};
pub use mask::BinaryMask;
pub use palette::{ColorPalette, PaletteEntry};
pub use point::{Category, InvalidCategory, LabeledPoint};

#[cfg(feature = "tracing")]
pub use logger::init_tracing;

pub use logger::{init_with_level, level_from_env, LOG_ENV};
