//! Search band between the top and bottom marker rows.

use nalgebra::Point2;
use waterline_core::{GridSize, ImageSize, SearchLine};

use crate::{CalibError, CalibParams};

fn lerp(a: Point2<f64>, b: Point2<f64>, t: f64) -> Point2<f64> {
    Point2::new(a.x + t * (b.x - a.x), a.y + t * (b.y - a.y))
}

fn to_pixel(p: Point2<f64>, img: ImageSize) -> Point2<i32> {
    let max_x = img.width as f64 - 1.0;
    let max_y = img.height as f64 - 1.0;
    Point2::new(
        p.x.clamp(0.0, max_x).round() as i32,
        p.y.clamp(0.0, max_y).round() as i32,
    )
}

/// Near-vertical search lines covering the middle third of the grid width.
///
/// Line tops follow the top marker row and line bottoms the bottom row at the
/// same fraction of the row width, so the band is a trapezoid matching the
/// perspective of the target. Top x advances by about one pixel per line.
/// The band is `band_height_scale` times the row distance tall, padded by
/// `band_padding_fraction` of that height above and below, and clamped to
/// the image.
pub fn calc_search_swaths(
    pixel_points: &[Point2<f64>],
    grid: GridSize,
    img: ImageSize,
    params: &CalibParams,
) -> Result<Vec<SearchLine>, CalibError> {
    if grid.columns < 2 || grid.rows < 4 {
        return Err(CalibError::GridTooSmall {
            columns: grid.columns,
            rows: grid.rows,
        });
    }
    if pixel_points.len() != grid.count() {
        return Err(CalibError::GridMismatch {
            columns: grid.columns,
            rows: grid.rows,
            points: pixel_points.len(),
        });
    }
    if img.is_empty() {
        return Err(CalibError::EmptyImage {
            width: img.width,
            height: img.height,
        });
    }

    let last_col = grid.columns - 1;
    let last_row = grid.rows - 1;
    let top_left = pixel_points[grid.index(0, 0)];
    let top_right = pixel_points[grid.index(last_col, 0)];
    let bot_left = pixel_points[grid.index(0, last_row)];
    let bot_right = pixel_points[grid.index(last_col, last_row)];

    let top_width = top_right.x - top_left.x;
    if top_width < 1.0 || bot_right.x - bot_left.x < 1.0 {
        return Err(CalibError::DegenerateGrid("top or bottom row has no width"));
    }
    let band_height = params.band_height_scale * (bot_left.y - top_left.y);
    if band_height <= 0.0 {
        return Err(CalibError::DegenerateGrid("bottom row is not below top row"));
    }
    let pad = params.band_padding_fraction * band_height;

    let steps = (top_width / 3.0).round().max(0.0) as usize;
    let lines = (0..=steps)
        .map(|i| {
            let t = if steps == 0 {
                1.0 / 3.0
            } else {
                1.0 / 3.0 + i as f64 / (3.0 * steps as f64)
            };
            let mut top = lerp(top_left, top_right, t);
            let mut bot = lerp(bot_left, bot_right, t);
            top.y -= pad;
            bot.y += pad;
            SearchLine::new(to_pixel(top, img), to_pixel(bot, img))
        })
        .collect();
    Ok(lines)
}
