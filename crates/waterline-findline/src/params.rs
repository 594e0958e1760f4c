use serde::{Deserialize, Serialize};

use crate::FindLineError;

/// RANSAC line fit settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LineFitParams {
    /// Number of random point pairs tried.
    pub iterations: usize,
    /// Seed of the pair sampler; the same seed gives the same fit.
    pub seed: u64,
    /// Largest perpendicular distance (pixels) of an inlier from a trial line.
    pub inlier_tolerance_px: f64,
    /// Minimum support of the accepted line. Values below 2 act as 2.
    pub min_inliers: usize,
    /// Accepted line angle range in degrees, image y axis pointing down.
    pub min_angle_deg: f64,
    pub max_angle_deg: f64,
}

impl Default for LineFitParams {
    fn default() -> Self {
        Self {
            iterations: 200,
            seed: 0x5eed_1a4e,
            inlier_tolerance_px: 2.0,
            min_inliers: 3,
            min_angle_deg: -10.0,
            max_angle_deg: 10.0,
        }
    }
}

impl LineFitParams {
    pub(crate) fn validate(&self) -> Result<(), FindLineError> {
        if self.iterations == 0 {
            return Err(FindLineError::InvalidParams("iterations must be positive"));
        }
        if self.inlier_tolerance_px.is_nan() || self.inlier_tolerance_px <= 0.0 {
            return Err(FindLineError::InvalidParams(
                "inlier tolerance must be positive",
            ));
        }
        check_angle_bounds(self.min_angle_deg, self.max_angle_deg)
    }
}

pub(crate) fn check_angle_bounds(min: f64, max: f64) -> Result<(), FindLineError> {
    if !(-45.0..=45.0).contains(&min) || !(-45.0..=45.0).contains(&max) || min >= max {
        return Err(FindLineError::AngleBounds { min, max });
    }
    Ok(())
}

/// Water-line search settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FindLineParams {
    /// Search lines summed into one intensity profile.
    pub swath_width: usize,
    /// Median filter kernel applied to each profile (odd, 1 disables).
    pub median_kernel: usize,
    /// Samples averaged on each side of a candidate transition.
    pub transition_window: usize,
    pub line_fit: LineFitParams,
}

impl Default for FindLineParams {
    fn default() -> Self {
        Self {
            swath_width: 10,
            median_kernel: 5,
            transition_window: 3,
            line_fit: LineFitParams::default(),
        }
    }
}

impl FindLineParams {
    pub(crate) fn validate(&self) -> Result<(), FindLineError> {
        if self.swath_width == 0 {
            return Err(FindLineError::InvalidParams("swath width must be positive"));
        }
        if self.median_kernel == 0 || self.median_kernel % 2 == 0 {
            return Err(FindLineError::InvalidParams(
                "median kernel must be odd and positive",
            ));
        }
        if self.transition_window == 0 {
            return Err(FindLineError::InvalidParams(
                "transition window must be positive",
            ));
        }
        self.line_fit.validate()
    }
}
