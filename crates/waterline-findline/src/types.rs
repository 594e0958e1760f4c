use nalgebra::Point2;
use serde::{Deserialize, Serialize};
use waterline_calib::{Calib, CalibError};

/// A fitted line given by three points on it plus its slope form.
///
/// In pixel space `left` is at `x = 0`, `right` at the last image column and
/// `center` at the horizontal center of the search band.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FindPointSet {
    pub left: Point2<f64>,
    pub center: Point2<f64>,
    pub right: Point2<f64>,
    /// `y = slope * x + intercept`
    pub slope: f64,
    pub intercept: f64,
    pub angle_deg: f64,
}

impl FindPointSet {
    /// Points on `y = slope * x + intercept` at the three given abscissae.
    pub fn from_slope_intercept(slope: f64, intercept: f64, xs: [f64; 3]) -> Self {
        let at = |x: f64| Point2::new(x, slope * x + intercept);
        Self {
            left: at(xs[0]),
            center: at(xs[1]),
            right: at(xs[2]),
            slope,
            intercept,
            angle_deg: slope.atan().to_degrees(),
        }
    }

    /// The same three points mapped to world coordinates, with slope and
    /// angle recomputed from the mapped left and right points.
    ///
    /// `center.y` of the result is the water level in world units.
    pub fn to_world(&self, calib: &Calib) -> Result<FindPointSet, CalibError> {
        let left = calib.pixel_to_world(self.left)?;
        let center = calib.pixel_to_world(self.center)?;
        let right = calib.pixel_to_world(self.right)?;
        let dx = right.x - left.x;
        let slope = if dx.abs() > f64::EPSILON {
            (right.y - left.y) / dx
        } else {
            0.0
        };
        Ok(FindPointSet {
            left,
            center,
            right,
            slope,
            intercept: left.y - slope * left.x,
            angle_deg: slope.atan().to_degrees(),
        })
    }
}

/// Outcome of one water-line search.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FindLineResult {
    pub line: FindPointSet,
    /// One candidate per evaluated swath, in swath order.
    pub found_points: Vec<Point2<f64>>,
    pub inliers: Vec<Point2<f64>>,
    pub outliers: Vec<Point2<f64>>,
}

/// RANSAC fit over a candidate set.
#[derive(Clone, Debug, PartialEq)]
pub struct LineFit {
    pub line: FindPointSet,
    /// Indices into the fitted candidates, ascending.
    pub inliers: Vec<usize>,
    /// Root-mean-square perpendicular distance of the inliers to the final line.
    pub inlier_rms: f64,
}

impl LineFit {
    /// Split `points` into inliers and outliers of this fit.
    pub fn partition(&self, points: &[Point2<f64>]) -> (Vec<Point2<f64>>, Vec<Point2<f64>>) {
        let mut inliers = Vec::with_capacity(self.inliers.len());
        let mut outliers = Vec::new();
        let mut next = self.inliers.iter().peekable();
        for (i, p) in points.iter().enumerate() {
            if next.peek() == Some(&&i) {
                next.next();
                inliers.push(*p);
            } else {
                outliers.push(*p);
            }
        }
        (inliers, outliers)
    }
}
