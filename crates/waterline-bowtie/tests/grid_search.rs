use nalgebra::Point2;
use waterline_bowtie::{
    center_index, BowtieError, BowtieParams, BowtieTemplateBank, TemplateMatchItem,
};
use waterline_core::{GrayImage, GridSize, ImageSize, PixelRect, Side};

const DIM: usize = 20;
const BACKGROUND: u8 = 224;

fn init_bank(params: BowtieParams, size: ImageSize) -> BowtieTemplateBank {
    let mut bank = BowtieTemplateBank::new(params);
    bank.init(DIM, size).expect("init bank");
    bank
}

/// Paste the unrotated template so that its center lands on each point.
fn scene(size: ImageSize, bank: &BowtieTemplateBank, centers: &[(i32, i32)]) -> GrayImage {
    let tpl = bank.template(center_index()).expect("template");
    let mut img = GrayImage::filled(size.width, size.height, BACKGROUND);
    let half = (DIM / 2) as i32;
    for &(cx, cy) in centers {
        img.paste(&tpl, cx - half, cy - half);
    }
    img
}

fn grid_centers() -> Vec<(i32, i32)> {
    let mut out = Vec::new();
    for row in 0..4 {
        for col in 0..2 {
            out.push((40 + col * 80, 40 + row * 50));
        }
    }
    out
}

#[test]
fn exact_template_scores_near_one() {
    let size = ImageSize::new(120, 100);
    let mut bank = init_bank(BowtieParams::default(), size);
    let img = scene(size, &bank, &[(57, 43)]);

    let found = bank
        .match_template(center_index(), &img.view(), 0.05, 1)
        .expect("match");
    assert_eq!(found.len(), 1);
    assert!(found[0].score >= 0.95, "score {}", found[0].score);
    assert!((found[0].point.x - 57.0).abs() < 1e-9);
    assert!((found[0].point.y - 43.0).abs() < 1e-9);
}

#[test]
fn unreachable_min_score_is_no_match() {
    let size = ImageSize::new(90, 90);
    let mut bank = init_bank(BowtieParams::default(), size);
    let img = GrayImage::from_fn(90, 90, |x, y| ((x * 31 + y * 17 + (x * y) % 7) % 256) as u8);

    let err = bank
        .match_template(center_index(), &img.view(), 0.95, 4)
        .unwrap_err();
    assert!(matches!(err, BowtieError::NoMatch { .. }));
}

#[test]
fn sort_points_recovers_row_major_order_from_jittered_grid() {
    let mut bank = BowtieTemplateBank::default();
    let grid = GridSize::new(2, 4);
    let jitter = [
        (1.5, -2.0),
        (-2.0, 1.0),
        (0.5, 2.0),
        (2.0, -1.5),
        (-1.0, -2.0),
        (1.0, 1.5),
        (-2.0, 0.5),
        (0.0, -1.0),
    ];
    let mut items: Vec<TemplateMatchItem> = grid_centers()
        .iter()
        .zip(jitter)
        .map(|(&(x, y), (jx, jy))| {
            TemplateMatchItem::new(Point2::new(x as f64 + jx, y as f64 + jy), 0.9)
        })
        .collect();
    // weak decoys must be dropped
    items.push(TemplateMatchItem::new(Point2::new(80.0, 10.0), 0.4));
    items.push(TemplateMatchItem::new(Point2::new(5.0, 200.0), 0.3));
    items.reverse();
    items.swap(1, 6);

    let sorted = bank
        .sort_points(&items, grid, ImageSize::new(160, 230))
        .expect("sort");
    assert_eq!(sorted.len(), 8);
    for row in sorted.chunks(2) {
        assert!(row[0].point.x < row[1].point.x);
    }
    for pair in sorted.chunks(2).collect::<Vec<_>>().windows(2) {
        assert!(pair[0][0].point.y < pair[1][0].point.y);
        assert!(pair[0][1].point.y < pair[1][1].point.y);
    }
    for (item, &(x, y)) in sorted.iter().zip(&grid_centers()) {
        assert!((item.point.x - x as f64).abs() <= 2.0);
        assert!((item.point.y - y as f64).abs() <= 2.0);
    }
    assert_eq!(bank.found_grid().len(), 4);
    assert_eq!(bank.found_points().unwrap().len(), 8);
}

#[test]
fn find_targets_locates_synthetic_grid_and_move_regions() {
    let size = ImageSize::new(160, 230);
    let params = BowtieParams {
        move_search_half_size: 24,
        ..BowtieParams::default()
    };
    let mut bank = init_bank(params, size);
    let img = scene(size, &bank, &grid_centers());

    let found = bank
        .find_targets(&img.view(), 0.3, GridSize::new(2, 4))
        .expect("grid");
    assert_eq!(found.len(), 8);
    for (item, &(x, y)) in found.iter().zip(&grid_centers()) {
        assert!(
            (item.point.x - x as f64).abs() < 0.5 && (item.point.y - y as f64).abs() < 0.5,
            "found ({:.2}, {:.2}) expected ({x}, {y})",
            item.point.x,
            item.point.y
        );
        assert!(item.score > 0.95);
    }

    let (left, right) = bank.move_target_rois();
    assert_eq!(left, PixelRect::new(16, 16, 48, 48));
    assert_eq!(right, PixelRect::new(96, 16, 48, 48));

    let targets = bank.find_move_targets(&img.view()).expect("move targets");
    assert!((targets.left.x - 40.0).abs() < 0.5);
    assert!((targets.right.x - 120.0).abs() < 0.5);
}

#[test]
fn move_targets_are_ordered_left_then_right() {
    let size = ImageSize::new(200, 110);
    let mut bank = init_bank(BowtieParams::default(), size);
    // the right marker sits higher, so it is the first peak in raster order
    let img = scene(size, &bank, &[(150, 40), (50, 60)]);
    bank.set_move_target_roi(size, PixelRect::new(20, 30, 60, 60), Side::Left)
        .unwrap();
    bank.set_move_target_roi(size, PixelRect::new(120, 10, 60, 60), Side::Right)
        .unwrap();

    let targets = bank.find_move_targets(&img.view()).expect("targets");
    assert!((targets.left.x - 50.0).abs() < 0.5 && (targets.left.y - 60.0).abs() < 0.5);
    assert!((targets.right.x - 150.0).abs() < 0.5 && (targets.right.y - 40.0).abs() < 0.5);

    // shifting the scene shows up as drift
    let moved = scene(size, &bank, &[(153, 42), (53, 62)]);
    let now = bank.find_move_targets(&moved.view()).expect("moved targets");
    let drift = now.drift_from(&targets);
    assert!((drift.left.x - 3.0).abs() < 0.5);
    assert!((drift.right.y - 2.0).abs() < 0.5);
    assert!(drift.exceeds(2.0));
}

#[test]
fn move_search_without_markers_reports_count() {
    let size = ImageSize::new(200, 110);
    let mut bank = init_bank(BowtieParams::default(), size);
    bank.set_move_target_roi(size, PixelRect::new(20, 30, 60, 60), Side::Left)
        .unwrap();
    bank.set_move_target_roi(size, PixelRect::new(120, 10, 60, 60), Side::Right)
        .unwrap();

    let img = GrayImage::new(200, 110);
    let err = bank.find_move_targets(&img.view()).unwrap_err();
    assert_eq!(err, BowtieError::MoveTargetCount(0));
}

#[test]
fn two_markers_in_one_region_are_rejected() {
    let size = ImageSize::new(200, 110);
    let mut bank = init_bank(BowtieParams::default(), size);
    let img = scene(size, &bank, &[(40, 50), (100, 50)]);
    bank.set_move_target_roi(size, PixelRect::new(10, 20, 120, 70), Side::Left)
        .unwrap();
    bank.set_move_target_roi(size, PixelRect::new(140, 20, 50, 70), Side::Right)
        .unwrap();

    let err = bank.find_move_targets(&img.view()).unwrap_err();
    assert_eq!(
        err,
        BowtieError::MoveTargetRegion {
            side: Side::Left,
            found: 2
        }
    );
    assert!(err.kind().is_numeric());
}

#[test]
fn peaks_on_the_image_border_are_skipped() {
    let size = ImageSize::new(120, 100);
    let mut bank = init_bank(BowtieParams::default(), size);
    // the corner marker fills the template window at the score map origin
    let half = (DIM / 2) as i32;
    let img = scene(size, &bank, &[(half, half), (70, 50)]);

    let found = bank
        .match_template(center_index(), &img.view(), 0.5, 1)
        .expect("match");
    assert!((found[0].point.x - 70.0).abs() < 1e-9);
    assert!((found[0].point.y - 50.0).abs() < 1e-9);
}
