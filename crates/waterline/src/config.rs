//! JSON configuration for a gauge station.

use std::{fs, path::Path};

use serde::{Deserialize, Serialize};
use waterline_bowtie::{move_search_half_size, BowtieParams};
use waterline_calib::{Calib, CalibParams};
use waterline_core::{GridSize, ImageSize};
use waterline_findline::{FindLine, FindLineParams};

use crate::WaterlineError;

/// Everything a station needs besides the calibration file.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WaterlineConfig {
    /// Side of the bowtie templates in pixels.
    pub template_dim: usize,
    /// Marker grid on the target.
    pub grid: GridSize,
    /// Minimum coarse score when searching for the full grid.
    pub grid_min_score: f64,
    /// Largest move-target offset (pixels) still treated as "not moved".
    pub move_tolerance_px: f64,
    pub bowtie: BowtieParams,
    pub calib: CalibParams,
    pub findline: FindLineParams,
}

impl Default for WaterlineConfig {
    fn default() -> Self {
        Self {
            template_dim: 56,
            grid: GridSize::new(2, 4),
            grid_min_score: 0.3,
            move_tolerance_px: 2.0,
            bowtie: BowtieParams::default(),
            calib: CalibParams::default(),
            findline: FindLineParams::default(),
        }
    }
}

impl WaterlineConfig {
    /// Load a JSON config from disk. Missing fields take their defaults.
    pub fn load_json(path: impl AsRef<Path>) -> Result<Self, WaterlineError> {
        let raw = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Write this config to disk as pretty JSON.
    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), WaterlineError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    /// A calibration whose move-search boxes are large enough for a whole
    /// marker of `template_dim` pixels.
    pub fn new_calib(&self) -> Calib {
        let mut params = self.calib.clone();
        params.move_search_half_size =
            move_search_half_size(self.template_dim, params.move_search_half_size);
        Calib::new(params)
    }

    /// A finder with its templates built for frames of `img_size`.
    pub fn build_finder(&self, img_size: ImageSize) -> Result<FindLine, WaterlineError> {
        let mut finder = FindLine::new(self.bowtie.clone(), self.findline.clone());
        finder.init_bowtie_search(self.template_dim, img_size)?;
        Ok(finder)
    }
}
