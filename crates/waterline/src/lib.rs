//! Water-line gauge measurement from camera frames of a bowtie target.
//!
//! This crate provides:
//! - re-exports of the calibration, marker search and line search crates
//! - [`WaterlineConfig`], a JSON station config
//! - (feature `image`) end-to-end helpers on `image::GrayImage`
//!
//! ## Quickstart
//!
//! ```no_run
//! use image::ImageReader;
//! use waterline::detect;
//! use waterline::WaterlineConfig;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let cfg = WaterlineConfig::default();
//! let mut calib = cfg.new_calib();
//! calib.load("calib.json")?;
//!
//! let img = ImageReader::open("frame.png")?.decode()?.to_luma8();
//! let finder = cfg.build_finder(calib.image_size())?;
//! let level = detect::find_water_level(&img, &calib, &finder)?;
//! println!("water level: {:.3}", level.level());
//! # Ok(())
//! # }
//! ```
//!
//! ## API map
//! - `waterline::core`: images, geometry, homography, logging.
//! - `waterline::bowtie`: bowtie template bank and grid search.
//! - `waterline::calib`: calibration model, search band, calibration file.
//! - `waterline::findline`: water-line search and RANSAC fit.
//! - `waterline::detect` (feature `image`): end-to-end helpers.

mod config;
mod error;

pub use waterline_bowtie as bowtie;
pub use waterline_calib as calib;
pub use waterline_core as core;
pub use waterline_findline as findline;

pub use config::WaterlineConfig;
pub use error::WaterlineError;
pub use waterline_calib::Calib;
pub use waterline_findline::{FindLine, FindLineResult, FindPointSet};

#[cfg(feature = "image")]
pub mod detect;
