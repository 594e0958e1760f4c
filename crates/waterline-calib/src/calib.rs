use log::debug;
use nalgebra::Point2;
use waterline_core::{estimate_homography, GridSize, ImageSize, PixelRect, SearchLine, Side};

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::swath::calc_search_swaths;
use crate::{CalibError, CalibParams, CalibrationModel, PlaneMapping};

/// Pixel/world calibration of one camera view.
///
/// State only changes through [`calibrate`](Self::calibrate) or a load; both
/// build the complete new state first and commit it at the end, so a failed
/// call leaves the previous calibration in place.
#[derive(Clone, Debug, Default)]
pub struct Calib {
    params: CalibParams,
    model: CalibrationModel,
    image_size: ImageSize,
    mapping: Option<PlaneMapping>,
}

fn is_finite(p: &Point2<f64>) -> bool {
    p.x.is_finite() && p.y.is_finite()
}

pub(crate) struct Calibrated {
    pub model: CalibrationModel,
    pub mapping: PlaneMapping,
}

impl Calib {
    pub fn new(params: CalibParams) -> Self {
        Self {
            params,
            ..Self::default()
        }
    }

    pub fn params(&self) -> &CalibParams {
        &self.params
    }

    pub fn model(&self) -> &CalibrationModel {
        &self.model
    }

    pub fn image_size(&self) -> ImageSize {
        self.image_size
    }

    pub fn is_calibrated(&self) -> bool {
        self.mapping.is_some()
    }

    pub fn search_lines(&self) -> &[SearchLine] {
        &self.model.search_lines
    }

    /// Fit the pixel/world mapping from row-major grid correspondences and
    /// derive the move-search regions and the search band.
    #[cfg_attr(
        feature = "tracing",
        instrument(
            level = "info",
            skip(self, pixel_points, world_points),
            fields(points = pixel_points.len())
        )
    )]
    pub fn calibrate(
        &mut self,
        pixel_points: &[Point2<f64>],
        world_points: &[Point2<f64>],
        grid: GridSize,
        image_size: ImageSize,
    ) -> Result<(), CalibError> {
        let Calibrated { model, mapping } =
            self.build(pixel_points, world_points, grid, image_size)?;
        debug!(
            "calibrated {}x{} grid, {} search lines",
            grid.columns,
            grid.rows,
            model.search_lines.len()
        );
        self.commit(model, mapping, image_size);
        Ok(())
    }

    pub(crate) fn build(
        &self,
        pixel_points: &[Point2<f64>],
        world_points: &[Point2<f64>],
        grid: GridSize,
        image_size: ImageSize,
    ) -> Result<Calibrated, CalibError> {
        if pixel_points.len() != world_points.len() {
            return Err(CalibError::LengthMismatch {
                pixel: pixel_points.len(),
                world: world_points.len(),
            });
        }
        if pixel_points.is_empty() {
            return Err(CalibError::NoPoints);
        }
        if grid.columns == 0 || grid.count() != pixel_points.len() {
            return Err(CalibError::GridMismatch {
                columns: grid.columns,
                rows: grid.rows,
                points: pixel_points.len(),
            });
        }
        if grid.columns < 2 || grid.rows < 4 {
            return Err(CalibError::GridTooSmall {
                columns: grid.columns,
                rows: grid.rows,
            });
        }
        for (which, points) in [("pixel", pixel_points), ("world", world_points)] {
            if let Some(index) = points.iter().position(|p| !is_finite(p)) {
                return Err(CalibError::NonFinitePoint { which, index });
            }
        }
        if image_size.is_empty() {
            return Err(CalibError::EmptyImage {
                width: image_size.width,
                height: image_size.height,
            });
        }

        let pixel_to_world = estimate_homography(pixel_points, world_points)?;
        let world_to_pixel = estimate_homography(world_points, pixel_points)?;
        let search_lines = calc_search_swaths(pixel_points, grid, image_size, &self.params)?;

        let half = self.params.move_search_half_size;
        let top_left = pixel_points[grid.index(0, 0)];
        let top_right = pixel_points[grid.index(grid.columns - 1, 0)];
        let model = CalibrationModel {
            grid,
            pixel_points: pixel_points.to_vec(),
            world_points: world_points.to_vec(),
            move_search_left: PixelRect::centered_clamped(top_left, half, image_size),
            move_search_right: PixelRect::centered_clamped(top_right, half, image_size),
            search_lines,
        };
        Ok(Calibrated {
            model,
            mapping: PlaneMapping {
                pixel_to_world,
                world_to_pixel,
            },
        })
    }

    pub(crate) fn commit(
        &mut self,
        model: CalibrationModel,
        mapping: PlaneMapping,
        image_size: ImageSize,
    ) {
        self.model = model;
        self.mapping = Some(mapping);
        self.image_size = image_size;
    }

    fn mapping(&self) -> Result<&PlaneMapping, CalibError> {
        self.mapping.as_ref().ok_or(CalibError::Uncalibrated)
    }

    pub fn pixel_to_world(&self, pixel: Point2<f64>) -> Result<Point2<f64>, CalibError> {
        let mapping = self.mapping()?;
        if !is_finite(&pixel) {
            return Err(CalibError::NonFinitePoint {
                which: "pixel",
                index: 0,
            });
        }
        mapping
            .pixel_to_world
            .try_apply(pixel)
            .ok_or(CalibError::PointAtInfinity)
    }

    pub fn world_to_pixel(&self, world: Point2<f64>) -> Result<Point2<f64>, CalibError> {
        let mapping = self.mapping()?;
        if !is_finite(&world) {
            return Err(CalibError::NonFinitePoint {
                which: "world",
                index: 0,
            });
        }
        mapping
            .world_to_pixel
            .try_apply(world)
            .ok_or(CalibError::PointAtInfinity)
    }

    /// Search band for the current calibration, recomputed from its points.
    pub fn calc_search_swaths(&self) -> Result<Vec<SearchLine>, CalibError> {
        self.mapping()?;
        calc_search_swaths(
            &self.model.pixel_points,
            self.model.grid,
            self.image_size,
            &self.params,
        )
    }

    pub fn move_search_roi(&self, side: Side) -> PixelRect {
        self.model.move_search_roi(side)
    }

    /// Calibrated pixel position of the top-row corner marker on `side`.
    pub fn move_ref_point(&self, side: Side) -> Result<Point2<f64>, CalibError> {
        self.model
            .move_ref_point(side)
            .ok_or(CalibError::Uncalibrated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn world_grid() -> Vec<Point2<f64>> {
        (0..4)
            .flat_map(|r| (0..2).map(move |c| Point2::new(c as f64, 3.0 - r as f64)))
            .collect()
    }

    fn pixel_grid() -> Vec<Point2<f64>> {
        (0..4)
            .flat_map(|r| {
                (0..2).map(move |c| Point2::new(120.0 + 200.0 * c as f64, 80.0 + 100.0 * r as f64))
            })
            .collect()
    }

    #[test]
    fn affine_grid_maps_both_ways() {
        let mut calib = Calib::default();
        let size = ImageSize::new(480, 480);
        calib
            .calibrate(&pixel_grid(), &world_grid(), GridSize::new(2, 4), size)
            .unwrap();
        assert!(calib.is_calibrated());

        let w = calib.pixel_to_world(Point2::new(220.0, 130.0)).unwrap();
        assert_abs_diff_eq!(w.x, 0.5, epsilon = 1e-6);
        assert_abs_diff_eq!(w.y, 2.5, epsilon = 1e-6);
        let p = calib.world_to_pixel(Point2::new(1.0, 0.0)).unwrap();
        assert_abs_diff_eq!(p.x, 320.0, epsilon = 1e-6);
        assert_abs_diff_eq!(p.y, 380.0, epsilon = 1e-6);
    }

    #[test]
    fn move_regions_surround_top_corners() {
        let mut calib = Calib::default();
        let size = ImageSize::new(480, 480);
        calib
            .calibrate(&pixel_grid(), &world_grid(), GridSize::new(2, 4), size)
            .unwrap();
        assert_eq!(calib.move_search_roi(Side::Left), PixelRect::new(64, 24, 112, 112));
        assert_eq!(calib.move_search_roi(Side::Right), PixelRect::new(264, 24, 112, 112));
        assert_eq!(calib.move_ref_point(Side::Right).unwrap(), Point2::new(320.0, 80.0));
    }

    #[test]
    fn uncalibrated_queries_fail() {
        let calib = Calib::default();
        let err = calib.pixel_to_world(Point2::new(0.0, 0.0)).unwrap_err();
        assert_eq!(err, CalibError::Uncalibrated);
        assert!(err.kind().is_validation());
        assert!(calib.world_to_pixel(Point2::new(0.0, 0.0)).is_err());
        assert!(calib.move_ref_point(Side::Left).is_err());
        assert!(calib.calc_search_swaths().is_err());
    }

    #[test]
    fn small_grid_is_rejected() {
        let mut calib = Calib::default();
        let px: Vec<_> = pixel_grid().into_iter().take(6).collect();
        let wd: Vec<_> = world_grid().into_iter().take(6).collect();
        let err = calib
            .calibrate(&px, &wd, GridSize::new(2, 3), ImageSize::new(480, 480))
            .unwrap_err();
        assert_eq!(err, CalibError::GridTooSmall { columns: 2, rows: 3 });
    }
}
