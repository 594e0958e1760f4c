//! Water-line search over a calibrated band and move-target checks.
//!
//! The search band is a list of near-vertical [`SearchLine`]s (usually from
//! `waterline_calib::Calib::search_lines`). Consecutive lines are summed into
//! intensity profiles, each profile yields one candidate at its strongest
//! step, and an angle-gated RANSAC fit turns the candidates into a line.
//!
//! ```no_run
//! use waterline_core::{GrayImage, ImageSize};
//! use waterline_findline::FindLine;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! # let img = GrayImage::new(640, 480);
//! # let lines = Vec::new();
//! let mut finder = FindLine::default();
//! finder.init_bowtie_search(40, ImageSize::new(640, 480))?;
//! let result = finder.find(&img.view(), &lines)?;
//! println!("water line at y = {:.1}", result.line.center.y);
//! # Ok(())
//! # }
//! ```
//!
//! [`SearchLine`]: waterline_core::SearchLine

mod error;
mod finder;
mod params;
mod profile;
mod ransac;
mod types;

#[cfg(feature = "image")]
pub mod overlay;

pub use error::FindLineError;
pub use finder::FindLine;
pub use params::{FindLineParams, LineFitParams};
pub use profile::{calc_row_sums, calc_swath_point, evaluate_swath, median_filter};
pub use ransac::fit_line_ransac;
pub use types::{FindLineResult, FindPointSet, LineFit};
