#![cfg(feature = "image")]

use nalgebra::Point2;
use waterline::bowtie::{build_templates, center_index};
use waterline::core::{GrayImage, GridSize};
use waterline::detect::{calibrate_from_image, check_target_moved, find_water_level};
use waterline::{WaterlineConfig, WaterlineError};

const WIDTH: usize = 400;
const HEIGHT: usize = 360;
const DIM: usize = 40;

fn config() -> WaterlineConfig {
    WaterlineConfig {
        template_dim: DIM,
        grid: GridSize::new(2, 4),
        ..WaterlineConfig::default()
    }
}

fn marker_centers(shift_x: i32) -> Vec<(i32, i32)> {
    (0..4)
        .flat_map(|r| (0..2).map(move |c| (100 + 200 * c + shift_x, 60 + 70 * r)))
        .collect()
}

fn world_points() -> Vec<Point2<f64>> {
    (0..4)
        .flat_map(|r| (0..2).map(move |c| Point2::new(c as f64, 3.0 - r as f64)))
        .collect()
}

fn water_y(x: f64) -> f64 {
    0.02 * x + 230.0
}

/// Target board with the 2x4 bowtie grid; `wet` darkens everything below the water line.
fn frame(shift_x: i32, wet: bool) -> image::GrayImage {
    let tpl = build_templates(DIM).swap_remove(center_index());
    let mut img = GrayImage::filled(WIDTH, HEIGHT, 224);
    let half = (DIM / 2) as i32;
    for (cx, cy) in marker_centers(shift_x) {
        img.paste(&tpl.view(), cx - half, cy - half);
    }
    if wet {
        for y in 0..HEIGHT {
            for x in 0..WIDTH {
                if y as f64 >= water_y(x as f64) {
                    img.set(x, y, 50);
                }
            }
        }
    }
    image::GrayImage::from_raw(WIDTH as u32, HEIGHT as u32, img.data).expect("buffer size")
}

#[test]
fn calibrate_then_measure_water_level() {
    let cfg = config();
    let calib = calibrate_from_image(&frame(0, false), &world_points(), &cfg).unwrap();

    let top_left = calib.model().pixel_points[0];
    assert!((top_left - Point2::new(100.0, 60.0)).norm() < 0.5, "{top_left:?}");
    let bottom_right = calib.model().pixel_points[7];
    assert!((bottom_right - Point2::new(300.0, 270.0)).norm() < 0.5, "{bottom_right:?}");

    let finder = cfg.build_finder(calib.image_size()).unwrap();
    let level = find_water_level(&frame(0, true), &calib, &finder).unwrap();
    let c = level.pixel.line.center;
    assert!((c.y - water_y(c.x)).abs() < 1.5, "pixel center {c:?}");

    // world y = 3 - (pixel y - 60) / 70
    let expected = 3.0 - (water_y(c.x) - 60.0) / 70.0;
    assert!((level.level() - expected).abs() < 0.03, "level {}", level.level());
}

#[test]
fn drift_check_flags_a_shifted_target() {
    let cfg = config();
    let calib = calibrate_from_image(&frame(0, false), &world_points(), &cfg).unwrap();
    let mut finder = cfg.build_finder(calib.image_size()).unwrap();

    let still = check_target_moved(&frame(0, false), &calib, &mut finder, 2.0).unwrap();
    assert!(!still.moved, "drift {:?}", still.drift);
    assert!(still.found.left.x < still.found.right.x);

    let shifted = check_target_moved(&frame(5, false), &calib, &mut finder, 2.0).unwrap();
    assert!(shifted.moved);
    assert!((shifted.drift.left.x - 5.0).abs() < 0.5, "drift {:?}", shifted.drift);
    assert!((shifted.drift.max_px - 5.0).abs() < 0.5);
}

#[test]
fn world_point_count_must_match_grid() {
    let err = calibrate_from_image(&frame(0, false), &world_points()[..6], &config()).unwrap_err();
    assert!(matches!(
        err,
        WaterlineError::WorldPointCount {
            expected: 8,
            got: 6
        }
    ));
    assert!(err.kind().is_validation());
}

#[test]
fn calibration_survives_a_save_and_reload() {
    let cfg = config();
    let calib = calibrate_from_image(&frame(0, false), &world_points(), &cfg).unwrap();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("calib.json");
    calib.save(&path).unwrap();

    let mut reloaded = cfg.new_calib();
    reloaded.load(&path).unwrap();
    let finder = cfg.build_finder(reloaded.image_size()).unwrap();
    let a = find_water_level(&frame(0, true), &calib, &finder).unwrap();
    let b = find_water_level(&frame(0, true), &reloaded, &finder).unwrap();
    assert_eq!(a.pixel, b.pixel);
    assert!((a.level() - b.level()).abs() < 1e-9);
}
