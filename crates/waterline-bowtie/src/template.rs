//! Bowtie marker rendering and the rotated template bank.

use waterline_core::{GrayImage, PixelRect};

/// Number of rotated templates in a bank; index `TEMPLATE_COUNT / 2` is unrotated.
pub const TEMPLATE_COUNT: usize = 11;

/// Rotation step between neighbouring templates, in degrees.
pub const TEMPLATE_ANGLE_STEP_DEG: f64 = 1.0;

/// Smallest and largest accepted template side, in pixels.
pub const TEMPLATE_DIM_MIN: usize = 20;
pub const TEMPLATE_DIM_MAX: usize = 1000;

pub(crate) const BACKGROUND_LEVEL: u8 = 224;
pub(crate) const MARKER_LEVEL: u8 = 32;

/// Index of the unrotated template.
pub const fn center_index() -> usize {
    TEMPLATE_COUNT / 2
}

/// Rotation of template `index` in degrees (positive is counter-clockwise).
pub fn template_angle(index: usize) -> f64 {
    (index as f64 - center_index() as f64) * TEMPLATE_ANGLE_STEP_DEG
}

fn edge(a: (i64, i64), b: (i64, i64), p: (i64, i64)) -> i64 {
    (b.0 - a.0) * (p.1 - a.1) - (b.1 - a.1) * (p.0 - a.0)
}

fn fill_triangle(img: &mut GrayImage, tri: [(i64, i64); 3], value: u8) {
    let min_x = tri.iter().map(|p| p.0).min().unwrap_or(0).max(0);
    let max_x = tri
        .iter()
        .map(|p| p.0)
        .max()
        .unwrap_or(0)
        .min(img.width as i64 - 1);
    let min_y = tri.iter().map(|p| p.1).min().unwrap_or(0).max(0);
    let max_y = tri
        .iter()
        .map(|p| p.1)
        .max()
        .unwrap_or(0)
        .min(img.height as i64 - 1);

    for y in min_y..=max_y {
        for x in min_x..=max_x {
            let p = (x, y);
            let e0 = edge(tri[0], tri[1], p);
            let e1 = edge(tri[1], tri[2], p);
            let e2 = edge(tri[2], tri[0], p);
            // edges inclusive, either winding
            let inside = (e0 >= 0 && e1 >= 0 && e2 >= 0) || (e0 <= 0 && e1 <= 0 && e2 <= 0);
            if inside {
                img.set(x as usize, y as usize, value);
            }
        }
    }
}

/// Render the unrotated bowtie at `side x side`: a light background with two
/// dark triangles whose bases sit on the left and right borders and whose
/// apexes meet at the center.
pub fn render_bowtie(side: usize) -> GrayImage {
    let mut img = GrayImage::filled(side, side, BACKGROUND_LEVEL);
    let w = side as i64;
    let h = side as i64;
    let center = (w / 2, h / 2);
    fill_triangle(&mut img, [(1, 1), (1, h - 2), center], MARKER_LEVEL);
    fill_triangle(&mut img, [(w - 2, 1), (w - 2, h - 2), center], MARKER_LEVEL);
    img
}

/// Template side after rounding `dim` up to an even number.
pub fn even_dim(dim: usize) -> usize {
    dim + dim % 2
}

/// Build all `TEMPLATE_COUNT` templates of side `dim` (already even).
///
/// The bowtie is drawn at twice the size, rotated about its center and the
/// central `dim x dim` window is kept, so rotated corners never show.
pub fn build_templates(dim: usize) -> Vec<GrayImage> {
    let big = render_bowtie(2 * dim);
    let half = (dim / 2) as i32;
    let roi = PixelRect::new(half, half, dim as i32, dim as i32);

    (0..TEMPLATE_COUNT)
        .map(|index| {
            let angle = template_angle(index);
            let rotated = if index == center_index() {
                big.clone()
            } else {
                GrayImage::rotated(&big.view(), angle)
            };
            // roi always fits the 2*dim canvas
            GrayImage::crop(&rotated.view(), roi).unwrap_or_else(|| GrayImage::new(dim, dim))
        })
        .collect()
}
