//! Pixel to world calibration for water-line gauge cameras.
//!
//! [`Calib`] fits forward and inverse homographies from the marker grid,
//! places the two move-search regions on the top-row corner markers and
//! derives the band of search lines the water line is looked for in. The
//! calibration round-trips through a small JSON file (see [`Calib::save`]).

mod calib;
mod error;
mod io;
mod model;
mod params;
mod swath;

pub use calib::Calib;
pub use error::{CalibError, CalibIoError};
pub use model::{CalibrationModel, PlaneMapping};
pub use params::CalibParams;
pub use swath::calc_search_swaths;
