//! Review overlays on RGB copies of the searched image.

use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_cross_mut, draw_hollow_rect_mut, draw_line_segment_mut};
use imageproc::rect::Rect;
use log::{debug, warn};
use nalgebra::Point2;
use waterline_calib::Calib;
use waterline_core::{GrayImageView, PixelRect, Side};

use crate::FindLineResult;

const CANDIDATE: Rgb<u8> = Rgb([0, 0, 255]);
const INLIER: Rgb<u8> = Rgb([0, 255, 0]);
const OUTLIER: Rgb<u8> = Rgb([255, 0, 0]);
const LINE: Rgb<u8> = Rgb([0, 255, 255]);
const REGION: Rgb<u8> = Rgb([255, 255, 0]);
const BAND: Rgb<u8> = Rgb([255, 0, 255]);
const GRID: Rgb<u8> = Rgb([255, 128, 0]);

/// Non-fatal problems found while drawing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OverlayWarning {
    NoSearchLines,
    EmptyMoveRegion(Side),
}

#[derive(Clone, Debug)]
pub struct Overlay {
    pub image: RgbImage,
    pub warnings: Vec<OverlayWarning>,
}

fn to_rgb(img: &GrayImageView<'_>) -> RgbImage {
    RgbImage::from_fn(img.width as u32, img.height as u32, |x, y| {
        let v = img.get(x as usize, y as usize);
        Rgb([v, v, v])
    })
}

fn segment(img: &mut RgbImage, a: Point2<f64>, b: Point2<f64>, color: Rgb<u8>) {
    draw_line_segment_mut(img, (a.x as f32, a.y as f32), (b.x as f32, b.y as f32), color);
}

/// Plus sign with arms of `arm` pixels; `arm == 1` is imageproc's 3x3 cross.
fn plus(img: &mut RgbImage, p: Point2<f64>, arm: f64, color: Rgb<u8>) {
    if arm <= 1.0 {
        draw_cross_mut(img, color, p.x.round() as i32, p.y.round() as i32);
        return;
    }
    let (x, y) = (p.x.round(), p.y.round());
    segment(img, Point2::new(x - arm, y), Point2::new(x + arm, y), color);
    segment(img, Point2::new(x, y - arm), Point2::new(x, y + arm), color);
}

fn outline(img: &mut RgbImage, r: PixelRect, color: Rgb<u8>) {
    let rect = Rect::at(r.x, r.y).of_size(r.width as u32, r.height as u32);
    draw_hollow_rect_mut(img, rect, color);
}

/// Lines between neighbouring grid markers, placed by mapping the world
/// grid through the calibration.
fn grid_lines(img: &mut RgbImage, calib: &Calib) -> usize {
    let model = calib.model();
    let grid = model.grid;
    let mapped: Vec<Option<Point2<f64>>> = model
        .world_points
        .iter()
        .map(|&w| calib.world_to_pixel(w).ok())
        .collect();
    if mapped.len() != grid.count() {
        return 0;
    }
    let mut drawn = 0;
    for row in 0..grid.rows {
        for col in 0..grid.columns {
            let here = mapped[grid.index(col, row)];
            let right = (col + 1 < grid.columns).then(|| mapped[grid.index(col + 1, row)]);
            let below = (row + 1 < grid.rows).then(|| mapped[grid.index(col, row + 1)]);
            for next in [right, below].into_iter().flatten() {
                if let (Some(a), Some(b)) = (here, next) {
                    segment(img, a, b, GRID);
                    drawn += 1;
                }
            }
        }
    }
    drawn
}

/// Candidates, inliers, outliers and the fitted line over the image.
pub fn draw_result(img: &GrayImageView<'_>, result: &FindLineResult) -> RgbImage {
    let mut out = to_rgb(img);
    for p in &result.found_points {
        plus(&mut out, *p, 4.0, CANDIDATE);
    }
    for p in &result.inliers {
        plus(&mut out, *p, 1.0, INLIER);
    }
    for p in &result.outliers {
        plus(&mut out, *p, 1.0, OUTLIER);
    }
    segment(&mut out, result.line.left, result.line.right, LINE);
    plus(&mut out, result.line.center, 6.0, LINE);
    out
}

/// World grid lines, grid points, move-search regions and the search band
/// outline.
///
/// Missing geometry is reported in [`Overlay::warnings`] and skipped.
pub fn draw_calibration(img: &GrayImageView<'_>, calib: &Calib) -> Overlay {
    let mut image = to_rgb(img);
    let mut warnings = Vec::new();

    if calib.is_calibrated() {
        let drawn = grid_lines(&mut image, calib);
        debug!("calibration overlay: {drawn} grid lines");
    }
    for p in &calib.model().pixel_points {
        plus(&mut image, *p, 5.0, INLIER);
    }
    for side in [Side::Left, Side::Right] {
        let roi = calib.move_search_roi(side);
        if roi.is_empty() {
            warnings.push(OverlayWarning::EmptyMoveRegion(side));
        } else {
            outline(&mut image, roi, REGION);
        }
    }

    let lines = calib.search_lines();
    match (lines.first(), lines.last()) {
        (Some(first), Some(last)) => {
            let f = |p: Point2<i32>| Point2::new(p.x as f64, p.y as f64);
            segment(&mut image, f(first.top), f(first.bot), BAND);
            segment(&mut image, f(last.top), f(last.bot), BAND);
            segment(&mut image, f(first.top), f(last.top), BAND);
            segment(&mut image, f(first.bot), f(last.bot), BAND);
        }
        _ => warnings.push(OverlayWarning::NoSearchLines),
    }

    for w in &warnings {
        warn!("calibration overlay: {w:?}");
    }
    Overlay { image, warnings }
}
