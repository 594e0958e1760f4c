use nalgebra::Point2;
use serde::{Deserialize, Serialize};
use waterline_core::{GridSize, Homography, PixelRect, SearchLine, Side};

/// Everything a calibration produces apart from the fitted matrices.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CalibrationModel {
    pub grid: GridSize,
    /// Marker centers in the image, row-major, top-left first.
    pub pixel_points: Vec<Point2<f64>>,
    /// Target coordinates of the same markers.
    pub world_points: Vec<Point2<f64>>,
    pub move_search_left: PixelRect,
    pub move_search_right: PixelRect,
    pub search_lines: Vec<SearchLine>,
}

impl CalibrationModel {
    /// True if the point arrays exactly fill the grid.
    pub fn has_grid_points(&self) -> bool {
        let n = self.grid.count();
        n > 0 && self.pixel_points.len() == n && self.world_points.len() == n
    }

    pub fn move_search_roi(&self, side: Side) -> PixelRect {
        match side {
            Side::Left => self.move_search_left,
            Side::Right => self.move_search_right,
        }
    }

    /// Pixel position of the top-row corner marker on `side`.
    pub fn move_ref_point(&self, side: Side) -> Option<Point2<f64>> {
        if !self.has_grid_points() {
            return None;
        }
        let col = match side {
            Side::Left => 0,
            Side::Right => self.grid.columns - 1,
        };
        Some(self.pixel_points[self.grid.index(col, 0)])
    }
}

/// Forward and inverse homographies, always fitted together.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PlaneMapping {
    pub pixel_to_world: Homography,
    pub world_to_pixel: Homography,
}
