use serde::{Deserialize, Serialize};

/// Geometry settings derived at calibration time.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibParams {
    /// Half side of the move-search boxes around the top-row corner markers.
    pub move_search_half_size: i32,
    /// Band height as a multiple of the top-to-bottom grid row distance.
    pub band_height_scale: f64,
    /// Fraction of the band height added above the top row and below the bottom row.
    pub band_padding_fraction: f64,
}

impl Default for CalibParams {
    fn default() -> Self {
        Self {
            move_search_half_size: 56,
            band_height_scale: 1.25,
            band_padding_fraction: 0.125,
        }
    }
}
