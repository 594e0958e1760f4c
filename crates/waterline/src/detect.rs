//! End-to-end helpers on `image::GrayImage` frames.

use log::{info, warn};
use nalgebra::Point2;
use serde::{Deserialize, Serialize};
use waterline_bowtie::{BowtieTemplateBank, MoveDrift, MoveTargets};
use waterline_calib::Calib;
use waterline_core::{GrayImageView, ImageSize, Side};
use waterline_findline::{FindLine, FindLineResult, FindPointSet};

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::{WaterlineConfig, WaterlineError};

/// Borrow an `image::GrayImage` as a core view.
pub fn gray_view(img: &::image::GrayImage) -> GrayImageView<'_> {
    GrayImageView {
        width: img.width() as usize,
        height: img.height() as usize,
        data: img.as_raw(),
    }
}

fn image_size(img: &::image::GrayImage) -> ImageSize {
    ImageSize::new(img.width() as usize, img.height() as usize)
}

/// Water line in pixel and world coordinates.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WaterLevel {
    pub pixel: FindLineResult,
    pub world: FindPointSet,
}

impl WaterLevel {
    /// World height of the water line at the band center.
    pub fn level(&self) -> f64 {
        self.world.center.y
    }
}

/// Outcome of a target drift check.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct MoveCheck {
    pub found: MoveTargets,
    pub reference: MoveTargets,
    pub drift: MoveDrift,
    pub moved: bool,
}

/// Find the marker grid in `img` and calibrate against `world_points`
/// (row-major, top-left first, one per marker).
#[cfg_attr(
    feature = "tracing",
    instrument(level = "info", skip_all, fields(width = img.width(), height = img.height()))
)]
pub fn calibrate_from_image(
    img: &::image::GrayImage,
    world_points: &[Point2<f64>],
    cfg: &WaterlineConfig,
) -> Result<Calib, WaterlineError> {
    let expected = cfg.grid.count();
    if world_points.len() != expected {
        return Err(WaterlineError::WorldPointCount {
            expected,
            got: world_points.len(),
        });
    }
    let size = image_size(img);
    let mut bank = BowtieTemplateBank::new(cfg.bowtie.clone());
    bank.init(cfg.template_dim, size)?;
    bank.find_targets(&gray_view(img), cfg.grid_min_score, cfg.grid)?;
    let pixel_points = bank.found_points()?;

    let mut calib = cfg.new_calib();
    calib.calibrate(&pixel_points, world_points, cfg.grid, size)?;
    info!(
        "calibrated from image: {} markers, {} search lines",
        pixel_points.len(),
        calib.search_lines().len()
    );
    Ok(calib)
}

/// Search the calibrated band of `img` for the water line.
#[cfg_attr(
    feature = "tracing",
    instrument(level = "info", skip_all, fields(width = img.width(), height = img.height()))
)]
pub fn find_water_level(
    img: &::image::GrayImage,
    calib: &Calib,
    finder: &FindLine,
) -> Result<WaterLevel, WaterlineError> {
    if image_size(img) != calib.image_size() {
        warn!(
            "frame is {}x{}, calibration was made for {:?}",
            img.width(),
            img.height(),
            calib.image_size()
        );
    }
    let pixel = finder.find(&gray_view(img), calib.search_lines())?;
    let world = pixel.line.to_world(calib)?;
    Ok(WaterLevel { pixel, world })
}

/// Re-locate the move targets inside the calibrated regions and compare
/// them with the calibrated top corner markers.
pub fn check_target_moved(
    img: &::image::GrayImage,
    calib: &Calib,
    finder: &mut FindLine,
    tolerance_px: f64,
) -> Result<MoveCheck, WaterlineError> {
    let reference = MoveTargets::new(
        calib.move_ref_point(Side::Left)?,
        calib.move_ref_point(Side::Right)?,
    );
    finder.use_calibration_rois(calib)?;
    let found = finder.find_move_targets(&gray_view(img))?;
    let drift = found.drift_from(&reference);
    let moved = drift.exceeds(tolerance_px);
    if moved {
        warn!("target moved by {:.2}px", drift.max_px);
    }
    Ok(MoveCheck {
        found,
        reference,
        drift,
        moved,
    })
}
