use log::debug;
use nalgebra::Point2;
use waterline_bowtie::{
    BowtieError, BowtieParams, BowtieTemplateBank, MoveTargets, TemplateMatchItem,
};
use waterline_calib::{Calib, CalibError};
use waterline_core::{GrayImageView, GridSize, ImageSize, PixelRect, SearchLine, Side};

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::params::check_angle_bounds;
use crate::profile::evaluate_swath;
use crate::ransac::fit_line_ransac;
use crate::{FindLineError, FindLineParams, FindLineResult, LineFit};

/// Water-line finder with its own bowtie template bank for the move check.
///
/// Starts uninitialized; [`init_bowtie_search`](Self::init_bowtie_search)
/// builds the templates and makes [`find`](Self::find) and
/// [`find_move_targets`](Self::find_move_targets) available.
#[derive(Clone, Debug, Default)]
pub struct FindLine {
    params: FindLineParams,
    bank: BowtieTemplateBank,
}

impl FindLine {
    pub fn new(bowtie: BowtieParams, params: FindLineParams) -> Self {
        Self {
            params,
            bank: BowtieTemplateBank::new(bowtie),
        }
    }

    pub fn params(&self) -> &FindLineParams {
        &self.params
    }

    pub fn bank(&self) -> &BowtieTemplateBank {
        &self.bank
    }

    pub fn bank_mut(&mut self) -> &mut BowtieTemplateBank {
        &mut self.bank
    }

    pub fn is_ready(&self) -> bool {
        self.bank.is_initialized()
    }

    fn require_ready(&self) -> Result<(), FindLineError> {
        if self.is_ready() {
            Ok(())
        } else {
            Err(FindLineError::NotInitialized)
        }
    }

    /// Accepted water-line angle range in degrees.
    pub fn line_find_angle_bounds(&self) -> (f64, f64) {
        (
            self.params.line_fit.min_angle_deg,
            self.params.line_fit.max_angle_deg,
        )
    }

    pub fn set_line_find_angle_bounds(&mut self, min: f64, max: f64) -> Result<(), FindLineError> {
        check_angle_bounds(min, max)?;
        self.params.line_fit.min_angle_deg = min;
        self.params.line_fit.max_angle_deg = max;
        Ok(())
    }

    /// Build the bowtie templates for images of `img_size`.
    pub fn init_bowtie_search(
        &mut self,
        template_dim: usize,
        img_size: ImageSize,
    ) -> Result<(), FindLineError> {
        self.bank.init(template_dim, img_size)?;
        Ok(())
    }

    /// Locate the water line crossing `lines`.
    ///
    /// Lines are grouped into swaths of `swath_width`; a trailing partial
    /// swath counts when it holds at least half that many lines. Swaths with
    /// no usable transition are skipped; the remaining candidates go to the
    /// RANSAC fit.
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "info", skip(self, img, lines), fields(lines = lines.len()))
    )]
    pub fn find(
        &self,
        img: &GrayImageView<'_>,
        lines: &[SearchLine],
    ) -> Result<FindLineResult, FindLineError> {
        self.require_ready()?;
        self.params.validate()?;
        if lines.len() < 2 {
            return Err(FindLineError::TooFewLines(lines.len()));
        }

        let width = self.params.swath_width;
        let ranges: Vec<_> = (0..lines.len())
            .step_by(width)
            .map(|start| start..(start + width).min(lines.len()))
            .filter(|r| 2 * r.len() >= width)
            .collect();
        if ranges.len() < 2 {
            return Err(FindLineError::TooFewSwaths {
                lines: lines.len(),
                swaths: ranges.len(),
                width,
            });
        }

        let mut found_points = Vec::with_capacity(ranges.len());
        for range in ranges {
            match evaluate_swath(img, lines, range.clone(), &self.params) {
                Ok(p) => found_points.push(p),
                Err(e @ (FindLineError::FlatProfile | FindLineError::ProfileTooShort { .. })) => {
                    debug!("swath {range:?} skipped: {e}");
                }
                Err(e) => return Err(e),
            }
        }

        let middle = lines[lines.len() / 2];
        let x_center = 0.5 * (middle.top.x + middle.bot.x) as f64;
        let fit = fit_line_ransac(&found_points, x_center, img.size(), &self.params.line_fit)?;
        let (inliers, outliers) = fit.partition(&found_points);
        if !outliers.is_empty() {
            debug!("{} of {} swath points rejected", outliers.len(), found_points.len());
        }
        Ok(FindLineResult {
            line: fit.line,
            found_points,
            inliers,
            outliers,
        })
    }

    /// RANSAC fit with this finder's settings.
    pub fn fit_line_ransac(
        &self,
        points: &[Point2<f64>],
        x_center: f64,
        img_size: ImageSize,
    ) -> Result<LineFit, FindLineError> {
        fit_line_ransac(points, x_center, img_size, &self.params.line_fit)
    }

    /// Search the whole image for a `grid` of bowtie markers. On success the
    /// move-search regions follow the top corners of the found grid.
    pub fn find_calib_grid(
        &mut self,
        img: &GrayImageView<'_>,
        min_score: f64,
        grid: GridSize,
    ) -> Result<Vec<TemplateMatchItem>, FindLineError> {
        self.require_ready()?;
        Ok(self.bank.find_targets(img, min_score, grid)?)
    }

    /// Re-locate the two move-reference markers.
    pub fn find_move_targets(&mut self, img: &GrayImageView<'_>) -> Result<MoveTargets, FindLineError> {
        self.require_ready()?;
        Ok(self.bank.find_move_targets(img)?)
    }

    pub fn set_move_target_roi(
        &mut self,
        img_size: ImageSize,
        rect: PixelRect,
        side: Side,
    ) -> Result<(), FindLineError> {
        self.bank.set_move_target_roi(img_size, rect, side)?;
        Ok(())
    }

    pub fn move_target_rois(&self) -> (PixelRect, PixelRect) {
        self.bank.move_target_rois()
    }

    /// Take both move-search regions from a calibration. Nothing changes
    /// unless both regions are valid for the calibrated image size.
    pub fn use_calibration_rois(&mut self, calib: &Calib) -> Result<(), FindLineError> {
        if !calib.is_calibrated() {
            return Err(CalibError::Uncalibrated.into());
        }
        let size = calib.image_size();
        let regions = [Side::Left, Side::Right].map(|side| (side, calib.move_search_roi(side)));
        if let Some(&(side, rect)) = regions.iter().find(|(_, r)| !r.fits_in(size)) {
            return Err(BowtieError::InvalidRoi { side, rect }.into());
        }
        for (side, rect) in regions {
            self.bank.set_move_target_roi(size, rect, side)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use waterline_core::GrayImage;

    #[test]
    fn calls_before_init_fail_with_configuration_error() {
        let mut finder = FindLine::default();
        let img = GrayImage::new(64, 64);
        let lines = [
            SearchLine::new(Point2::new(10, 0), Point2::new(10, 63)),
            SearchLine::new(Point2::new(11, 0), Point2::new(11, 63)),
        ];
        let err = finder.find(&img.view(), &lines).unwrap_err();
        assert_eq!(err, FindLineError::NotInitialized);
        assert!(err.kind().is_validation());
        let err = finder.find_move_targets(&img.view()).unwrap_err();
        assert_eq!(err, FindLineError::NotInitialized);
    }

    #[test]
    fn angle_bounds_are_validated() {
        let mut finder = FindLine::default();
        assert_eq!(finder.line_find_angle_bounds(), (-10.0, 10.0));
        finder.set_line_find_angle_bounds(-20.0, 5.0).unwrap();
        assert_eq!(finder.line_find_angle_bounds(), (-20.0, 5.0));
        let err = finder.set_line_find_angle_bounds(10.0, 10.0).unwrap_err();
        assert!(matches!(err, FindLineError::AngleBounds { .. }));
        assert!(finder.set_line_find_angle_bounds(-50.0, 0.0).is_err());
        assert_eq!(finder.line_find_angle_bounds(), (-20.0, 5.0));
    }

    #[test]
    fn bad_template_dim_is_forwarded() {
        let mut finder = FindLine::default();
        let err = finder
            .init_bowtie_search(10, ImageSize::new(100, 100))
            .unwrap_err();
        assert_eq!(err, FindLineError::Bowtie(BowtieError::InvalidTemplateDim(10)));
        assert!(!finder.is_ready());
    }

    #[test]
    fn too_few_lines_or_swaths() {
        let mut finder = FindLine::default();
        finder.init_bowtie_search(20, ImageSize::new(64, 64)).unwrap();
        let img = GrayImage::new(64, 64);
        let lines: Vec<_> = (0..14)
            .map(|x| SearchLine::new(Point2::new(x, 0), Point2::new(x, 63)))
            .collect();
        assert_eq!(
            finder.find(&img.view(), &lines[..1]).unwrap_err(),
            FindLineError::TooFewLines(1)
        );
        // 10 + 4: the trailing 4 lines are under half a swath
        assert_eq!(
            finder.find(&img.view(), &lines).unwrap_err(),
            FindLineError::TooFewSwaths {
                lines: 14,
                swaths: 1,
                width: 10
            }
        );
    }
}
