//! Core types and utilities for water-line gauge measurement.
//!
//! This crate is intentionally small and purely geometric: an 8-bit gray
//! image type with bilinear sampling, a homography with a normalized DLT
//! estimator, the pixel geometry shared by calibration and line search, and
//! the error-kind tag every crate in the workspace reports.

mod error;
mod geometry;
mod homography;
mod image;
mod logger;

pub use error::ErrorKind;
pub use geometry::{GridSize, ImageSize, PixelRect, SearchLine, Side};
pub use homography::{estimate_homography, Homography, HomographyError};
pub use image::{sample_bilinear, GrayImage, GrayImageView};

#[cfg(feature = "tracing")]
pub use logger::init_tracing;

pub use logger::init_with_level;
