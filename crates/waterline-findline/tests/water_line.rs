use nalgebra::Point2;
use waterline_calib::Calib;
use waterline_core::{GrayImage, GridSize, ImageSize};
use waterline_findline::{FindLine, FindLineError};

const SIZE: ImageSize = ImageSize::new(400, 300);

fn water_y(x: f64) -> f64 {
    0.05 * x + 150.0
}

/// Bright target above a dark water surface, optionally with a dark block
/// high in the band that fools one swath.
fn scene(with_decoy: bool) -> GrayImage {
    GrayImage::from_fn(SIZE.width, SIZE.height, |x, y| {
        if with_decoy && (187..=196).contains(&x) && (60..75).contains(&y) {
            0
        } else if (y as f64) < water_y(x as f64) {
            200
        } else {
            50
        }
    })
}

/// 2x4 grid, columns at x = 100 and 300, rows 60 px apart from y = 40.
fn calibrated() -> Calib {
    let pixel: Vec<_> = (0..4)
        .flat_map(|r| (0..2).map(move |c| Point2::new(100.0 + 200.0 * c as f64, 40.0 + 60.0 * r as f64)))
        .collect();
    let world: Vec<_> = (0..4)
        .flat_map(|r| (0..2).map(move |c| Point2::new(c as f64, 3.0 - r as f64)))
        .collect();
    let mut calib = Calib::default();
    calib
        .calibrate(&pixel, &world, GridSize::new(2, 4), SIZE)
        .expect("calibrate");
    calib
}

fn ready_finder() -> FindLine {
    let mut finder = FindLine::default();
    finder.init_bowtie_search(40, SIZE).expect("init");
    finder
}

#[test]
fn step_image_water_line_is_recovered() {
    let calib = calibrated();
    let finder = ready_finder();
    let img = scene(false);

    assert_eq!(calib.search_lines().len(), 68);
    let result = finder.find(&img.view(), calib.search_lines()).unwrap();

    // 6 full swaths plus a trailing one of 8 lines
    assert_eq!(result.found_points.len(), 7);
    assert!(result.outliers.is_empty());
    let c = result.line.center;
    assert!((c.y - water_y(c.x)).abs() < 1.5, "center {c:?}");
    assert!((result.line.slope - 0.05).abs() < 0.03);
    assert_eq!(result.line.left.x, 0.0);
    assert_eq!(result.line.right.x, 399.0);
}

#[test]
fn decoy_swath_is_an_outlier() {
    let calib = calibrated();
    let finder = ready_finder();
    let img = scene(true);

    let result = finder.find(&img.view(), calib.search_lines()).unwrap();
    assert_eq!(result.found_points.len(), 7);
    assert_eq!(result.outliers.len(), 1);
    assert!(result.outliers[0].y < 80.0);
    assert_eq!(result.inliers.len(), 6);
    let c = result.line.center;
    assert!((c.y - water_y(c.x)).abs() < 1.5, "center {c:?}");
}

#[test]
fn water_level_in_world_units() {
    let calib = calibrated();
    let finder = ready_finder();
    let result = finder.find(&scene(false).view(), calib.search_lines()).unwrap();

    let world = result.line.to_world(&calib).unwrap();
    // world y = 3 - (pixel y - 40) / 60
    let expected = 3.0 - (water_y(result.line.center.x) - 40.0) / 60.0;
    assert!((world.center.y - expected).abs() < 0.03, "world {world:?}");
    assert!((world.left.x - (-0.5)).abs() < 1e-6);
}

#[test]
fn uniform_image_has_no_line() {
    let calib = calibrated();
    let finder = ready_finder();
    let img = GrayImage::filled(SIZE.width, SIZE.height, 128);
    let err = finder.find(&img.view(), calib.search_lines()).unwrap_err();
    assert_eq!(err, FindLineError::TooFewPoints(0));
}

#[test]
fn move_regions_come_from_calibration() {
    let calib = calibrated();
    let mut finder = ready_finder();
    finder.use_calibration_rois(&calib).unwrap();
    let (left, right) = finder.move_target_rois();
    assert_eq!(left, calib.move_search_roi(waterline_core::Side::Left));
    assert_eq!(right, calib.move_search_roi(waterline_core::Side::Right));

    let err = ready_finder()
        .use_calibration_rois(&Calib::default())
        .unwrap_err();
    assert!(err.kind().is_validation());
}
