//! Calibration file format.
//!
//! ```json
//! {
//!   "imageWidth": 640, "imageHeight": 480,
//!   "PixelToWorld": { "columns": 2, "rows": 4,
//!     "points": [ { "pixelX": 1.0, "pixelY": 2.0, "worldX": 0.0, "worldY": 3.0 } ] },
//!   "MoveSearchRegions": { "Left": { "x": 0, "y": 0, "width": 112, "height": 112 },
//!                          "Right": { "x": 200, "y": 0, "width": 112, "height": 112 } },
//!   "SearchLines": [ { "topX": 10, "topY": 20, "botX": 12, "botY": 200 } ]
//! }
//! ```
//!
//! Only the points are authoritative: loading re-runs the calibration, and
//! the homographies are never written.

use std::{fs, path::Path};

use log::warn;
use nalgebra::Point2;
use serde::{Deserialize, Serialize};
use waterline_core::{GridSize, ImageSize, PixelRect, SearchLine};

use crate::calib::Calibrated;
use crate::{Calib, CalibError, CalibIoError};

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CalibFile {
    #[serde(default)]
    image_width: usize,
    #[serde(default)]
    image_height: usize,
    #[serde(rename = "PixelToWorld")]
    pixel_to_world: GridPoints,
    #[serde(rename = "MoveSearchRegions", default)]
    move_search_regions: MoveRegions,
    #[serde(rename = "SearchLines", default)]
    search_lines: Vec<LineEnds>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
struct GridPoints {
    columns: usize,
    rows: usize,
    points: Vec<PointPair>,
}

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct PointPair {
    pixel_x: f64,
    pixel_y: f64,
    world_x: f64,
    world_y: f64,
}

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
struct MoveRegions {
    #[serde(rename = "Left")]
    left: PixelRect,
    #[serde(rename = "Right")]
    right: PixelRect,
}

fn missing() -> i32 {
    i32::MIN
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LineEnds {
    #[serde(default = "missing")]
    top_x: i32,
    #[serde(default = "missing")]
    top_y: i32,
    #[serde(default = "missing")]
    bot_x: i32,
    #[serde(default = "missing")]
    bot_y: i32,
}

impl From<&SearchLine> for LineEnds {
    fn from(l: &SearchLine) -> Self {
        Self {
            top_x: l.top.x,
            top_y: l.top.y,
            bot_x: l.bot.x,
            bot_y: l.bot.y,
        }
    }
}

impl From<LineEnds> for SearchLine {
    fn from(l: LineEnds) -> Self {
        SearchLine::new(Point2::new(l.top_x, l.top_y), Point2::new(l.bot_x, l.bot_y))
    }
}

impl Calib {
    /// JSON text of the current calibration, as written by [`save`](Self::save).
    pub fn model_json_string(&self) -> Result<String, CalibIoError> {
        if !self.is_calibrated() {
            return Err(CalibError::Uncalibrated.into());
        }
        let model = self.model();
        let file = CalibFile {
            image_width: self.image_size().width,
            image_height: self.image_size().height,
            pixel_to_world: GridPoints {
                columns: model.grid.columns,
                rows: model.grid.rows,
                points: model
                    .pixel_points
                    .iter()
                    .zip(&model.world_points)
                    .map(|(p, w)| PointPair {
                        pixel_x: p.x,
                        pixel_y: p.y,
                        world_x: w.x,
                        world_y: w.y,
                    })
                    .collect(),
            },
            move_search_regions: MoveRegions {
                left: model.move_search_left,
                right: model.move_search_right,
            },
            search_lines: model.search_lines.iter().map(LineEnds::from).collect(),
        };
        Ok(serde_json::to_string_pretty(&file)?)
    }

    /// Write the calibration to `path`. Fails on an uncalibrated system.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), CalibIoError> {
        let json = self.model_json_string()?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Replace the calibration with the one stored at `path`.
    pub fn load(&mut self, path: impl AsRef<Path>) -> Result<(), CalibIoError> {
        let raw = fs::read_to_string(path)?;
        self.load_json_str(&raw)
    }

    /// Replace the calibration with one parsed from JSON text.
    ///
    /// The points are re-calibrated. Stored move-search regions and search
    /// lines replace the derived ones when they are usable for the stored
    /// image size; otherwise the derived ones are kept. On error the current
    /// calibration is unchanged.
    pub fn load_json_str(&mut self, json: &str) -> Result<(), CalibIoError> {
        let file: CalibFile = serde_json::from_str(json)?;
        let grid = GridSize::new(file.pixel_to_world.columns, file.pixel_to_world.rows);
        let points = &file.pixel_to_world.points;
        if grid.count() != points.len() {
            return Err(CalibIoError::CountMismatch {
                columns: grid.columns,
                rows: grid.rows,
                points: points.len(),
            });
        }

        let pixel: Vec<Point2<f64>> = points
            .iter()
            .map(|p| Point2::new(p.pixel_x, p.pixel_y))
            .collect();
        let world: Vec<Point2<f64>> = points
            .iter()
            .map(|p| Point2::new(p.world_x, p.world_y))
            .collect();
        let image_size = ImageSize::new(file.image_width, file.image_height);
        let Calibrated { mut model, mapping } = self.build(&pixel, &world, grid, image_size)?;

        let regions = file.move_search_regions;
        if regions.left.fits_in(image_size) && regions.right.fits_in(image_size) {
            model.move_search_left = regions.left;
            model.move_search_right = regions.right;
        } else {
            warn!(
                "stored move search regions {:?} / {:?} do not fit {}x{}, using derived regions",
                regions.left, regions.right, image_size.width, image_size.height
            );
        }

        let lines: Vec<SearchLine> = file.search_lines.into_iter().map(SearchLine::from).collect();
        if !lines.is_empty()
            && lines
                .iter()
                .all(|l| !l.has_sentinel() && l.fits_in(image_size))
        {
            model.search_lines = lines;
        } else {
            warn!(
                "stored search lines are missing or invalid, using {} derived lines",
                model.search_lines.len()
            );
        }

        self.commit(model, mapping, image_size);
        Ok(())
    }
}
