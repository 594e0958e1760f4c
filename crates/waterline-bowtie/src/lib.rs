//! Bowtie marker search for water-line gauge targets.
//!
//! A [`BowtieTemplateBank`] holds `TEMPLATE_COUNT` renders of the bowtie
//! marker (two dark triangles meeting at the center) rotated in one-degree
//! steps around upright. It finds the full calibration grid in a frame and
//! later re-locates the two top-row reference markers to detect drift.
//!
//! ```no_run
//! use waterline_bowtie::BowtieTemplateBank;
//! use waterline_core::{GrayImageView, GridSize, ImageSize};
//!
//! # fn run(img: GrayImageView<'_>) -> Result<(), waterline_bowtie::BowtieError> {
//! let mut bank = BowtieTemplateBank::default();
//! bank.init(56, ImageSize::new(img.width, img.height))?;
//! let grid = bank.find_targets(&img, 0.3, GridSize::new(2, 4))?;
//! println!("found {} markers", grid.len());
//! let moved = bank.find_move_targets(&img)?;
//! println!("left marker at {:?}", moved.left);
//! # Ok(())
//! # }
//! ```

mod bank;
mod error;
mod ncc;
mod params;
mod template;
mod types;

pub use bank::{move_search_half_size, BowtieTemplateBank};
pub use error::BowtieError;
pub use ncc::{correlate, subpixel_point_refine, PreparedTemplate, ScoreMap};
pub use params::BowtieParams;
pub use template::{
    build_templates, center_index, even_dim, render_bowtie, template_angle,
    TEMPLATE_ANGLE_STEP_DEG, TEMPLATE_COUNT, TEMPLATE_DIM_MAX, TEMPLATE_DIM_MIN,
};
pub use types::{MoveDrift, MoveTargets, TemplateMatchItem};
