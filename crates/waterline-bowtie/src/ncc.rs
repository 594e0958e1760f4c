//! Zero-mean normalized cross-correlation (the `TM_CCOEFF_NORMED` measure).
//!
//! For a template `T` with mean `mT` and an image window `I` of `n` pixels:
//!
//! ```text
//! score = sum((T - mT) * I) / sqrt(sum((T - mT)^2) * (sum(I^2) - sum(I)^2 / n))
//! ```
//!
//! Window sums come from integral images, so only the cross term costs
//! `O(n)` per position. Flat windows (or a flat template) score 0.

use nalgebra::Point2;
use waterline_core::{GrayImage, GrayImageView, PixelRect};

use crate::BowtieError;

/// Dense correlation scores; entry `(x, y)` is the template placed with its
/// top-left corner at `(x, y)` relative to the searched region.
#[derive(Clone, Debug, Default)]
pub struct ScoreMap {
    pub width: usize,
    pub height: usize,
    pub data: Vec<f32>,
}

impl ScoreMap {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            data: vec![0.0; width * height],
        }
    }

    /// Resize in place, keeping the allocation when it is already big enough.
    pub fn resize(&mut self, width: usize, height: usize) {
        self.width = width;
        self.height = height;
        self.data.clear();
        self.data.resize(width * height, 0.0);
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> f32 {
        self.data[y * self.width + x]
    }

    /// Location and value of the global maximum (first one in raster order on ties).
    pub fn max_loc(&self) -> Option<((usize, usize), f32)> {
        let mut best: Option<(usize, f32)> = None;
        for (i, &v) in self.data.iter().enumerate() {
            if best.is_none_or(|(_, b)| v > b) {
                best = Some((i, v));
            }
        }
        best.map(|(i, v)| ((i % self.width, i / self.width), v))
    }

    /// True for cells in the outermost row or column.
    #[inline]
    pub fn on_border(&self, x: usize, y: usize) -> bool {
        x == 0 || y == 0 || x + 1 >= self.width || y + 1 >= self.height
    }

    /// Exclude a filled disk of `radius` around `(cx, cy)` from further peak search.
    pub fn suppress_disk(&mut self, cx: usize, cy: usize, radius: usize) {
        let r = radius as i64;
        let (cx, cy) = (cx as i64, cy as i64);
        for y in (cy - r).max(0)..=(cy + r).min(self.height as i64 - 1) {
            for x in (cx - r).max(0)..=(cx + r).min(self.width as i64 - 1) {
                let (dx, dy) = (x - cx, y - cy);
                if dx * dx + dy * dy <= r * r {
                    self.data[y as usize * self.width + x as usize] = f32::NEG_INFINITY;
                }
            }
        }
    }
}

/// Template with the statistics the correlation needs precomputed.
#[derive(Clone, Debug)]
pub struct PreparedTemplate {
    pub image: GrayImage,
    mean: f64,
    /// `sum((T - mT)^2)`
    energy: f64,
}

impl PreparedTemplate {
    pub fn new(image: GrayImage) -> Self {
        let n = image.data.len().max(1) as f64;
        let mean = image.data.iter().map(|&v| v as f64).sum::<f64>() / n;
        let energy = image
            .data
            .iter()
            .map(|&v| {
                let d = v as f64 - mean;
                d * d
            })
            .sum();
        Self {
            image,
            mean,
            energy,
        }
    }

    #[inline]
    pub fn dim(&self) -> usize {
        self.image.width
    }
}

/// Summed-area tables of `I` and `I^2` over a rectangular region.
struct Integrals {
    stride: usize,
    sum: Vec<u64>,
    sq: Vec<u64>,
}

impl Integrals {
    fn new(img: &GrayImageView<'_>, rect: PixelRect) -> Self {
        let w = rect.width as usize;
        let h = rect.height as usize;
        let stride = w + 1;
        let mut sum = vec![0u64; stride * (h + 1)];
        let mut sq = vec![0u64; stride * (h + 1)];
        for y in 0..h {
            let row = &img.row(rect.y as usize + y)[rect.x as usize..rect.x as usize + w];
            let (mut rs, mut rq) = (0u64, 0u64);
            for (x, &v) in row.iter().enumerate() {
                let v = v as u64;
                rs += v;
                rq += v * v;
                sum[(y + 1) * stride + x + 1] = sum[y * stride + x + 1] + rs;
                sq[(y + 1) * stride + x + 1] = sq[y * stride + x + 1] + rq;
            }
        }
        Self { stride, sum, sq }
    }

    #[inline]
    fn window(table: &[u64], stride: usize, x: usize, y: usize, d: usize) -> u64 {
        table[(y + d) * stride + x + d] + table[y * stride + x]
            - table[y * stride + x + d]
            - table[(y + d) * stride + x]
    }
}

/// Correlate `tpl` over `rect` of `img`, writing into `out`.
///
/// `out` is resized to `(rect.width - dim + 1) x (rect.height - dim + 1)`.
pub fn correlate(
    img: &GrayImageView<'_>,
    rect: PixelRect,
    tpl: &PreparedTemplate,
    out: &mut ScoreMap,
) -> Result<(), BowtieError> {
    let d = tpl.dim();
    if !rect.fits_in(img.size()) || (rect.width as usize) < d || (rect.height as usize) < d {
        return Err(BowtieError::ImageTooSmall {
            width: rect.width.max(0) as usize,
            height: rect.height.max(0) as usize,
            dim: d,
        });
    }
    let out_w = rect.width as usize - d + 1;
    let out_h = rect.height as usize - d + 1;
    out.resize(out_w, out_h);

    let integrals = Integrals::new(img, rect);
    let n = (d * d) as f64;
    let (x0, y0) = (rect.x as usize, rect.y as usize);
    let tpl_data = &tpl.image.data;

    for oy in 0..out_h {
        for ox in 0..out_w {
            let s = Integrals::window(&integrals.sum, integrals.stride, ox, oy, d) as f64;
            let sq = Integrals::window(&integrals.sq, integrals.stride, ox, oy, d) as f64;
            let var = sq - s * s / n;
            let denom2 = tpl.energy * var;
            if var <= 1e-6 * n || denom2 <= 0.0 {
                out.data[oy * out_w + ox] = 0.0;
                continue;
            }

            let mut cross = 0u64;
            for ty in 0..d {
                let img_row = &img.row(y0 + oy + ty)[x0 + ox..x0 + ox + d];
                let tpl_row = &tpl_data[ty * d..(ty + 1) * d];
                let row: u32 = img_row
                    .iter()
                    .zip(tpl_row)
                    .map(|(&a, &b)| a as u32 * b as u32)
                    .sum();
                cross += row as u64;
            }
            let num = cross as f64 - tpl.mean * s;
            let score = (num / denom2.sqrt()).clamp(-1.0, 1.0);
            out.data[oy * out_w + ox] = score as f32;
        }
    }
    Ok(())
}

/// Score-weighted centroid of the 3x3 neighbourhood around `peak`.
///
/// Peaks on the map border have no full neighbourhood and are rejected.
pub fn subpixel_point_refine(
    map: &ScoreMap,
    peak: (usize, usize),
) -> Result<Point2<f64>, BowtieError> {
    let (px, py) = peak;
    if map.on_border(px, py) {
        return Err(BowtieError::PeakOnBorder { x: px, y: py });
    }

    let (mut total, mut tx, mut ty) = (0.0f64, 0.0f64, 0.0f64);
    for y in py - 1..=py + 1 {
        for x in px - 1..=px + 1 {
            let v = map.get(x, y) as f64;
            total += v;
            tx += v * x as f64;
            ty += v * y as f64;
        }
    }
    if total.abs() < f64::EPSILON || !total.is_finite() {
        return Ok(Point2::new(px as f64, py as f64));
    }
    // negative neighbours can push the centroid out of the window
    let x = (tx / total).clamp(px as f64 - 1.0, px as f64 + 1.0);
    let y = (ty / total).clamp(py as f64 - 1.0, py as f64 + 1.0);
    Ok(Point2::new(x, y))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn full(img: &GrayImage) -> PixelRect {
        PixelRect::new(0, 0, img.width as i32, img.height as i32)
    }

    fn textured(w: usize, h: usize) -> GrayImage {
        GrayImage::from_fn(w, h, |x, y| ((x * 37 + y * 91 + (x * y) % 13) % 251) as u8)
    }

    #[test]
    fn exact_patch_scores_one_at_its_location() {
        let img = textured(40, 30);
        let patch = GrayImage::crop(&img.view(), PixelRect::new(11, 7, 10, 10)).unwrap();
        let tpl = PreparedTemplate::new(patch);
        let mut map = ScoreMap::default();
        correlate(&img.view(), full(&img), &tpl, &mut map).unwrap();

        assert_eq!((map.width, map.height), (31, 21));
        let ((x, y), v) = map.max_loc().unwrap();
        assert_eq!((x, y), (11, 7));
        assert_abs_diff_eq!(v, 1.0, epsilon = 1e-5);
    }

    #[test]
    fn flat_window_and_inverted_patch() {
        let mut img = GrayImage::filled(30, 30, 90);
        let tpl_img = textured(8, 8);
        let inverted = GrayImage::from_fn(8, 8, |x, y| 255 - tpl_img.get(x, y));
        img.paste(&inverted.view(), 15, 15);

        let tpl = PreparedTemplate::new(tpl_img);
        let mut map = ScoreMap::default();
        correlate(&img.view(), full(&img), &tpl, &mut map).unwrap();
        assert_eq!(map.get(0, 0), 0.0);
        assert_abs_diff_eq!(map.get(15, 15), -1.0, epsilon = 1e-5);
    }

    #[test]
    fn region_smaller_than_template_is_rejected() {
        let img = textured(20, 20);
        let tpl = PreparedTemplate::new(textured(10, 10));
        let mut map = ScoreMap::default();
        let err = correlate(&img.view(), PixelRect::new(0, 0, 9, 20), &tpl, &mut map).unwrap_err();
        assert!(matches!(err, BowtieError::ImageTooSmall { .. }));
    }

    #[test]
    fn suppression_removes_a_disk() {
        let mut map = ScoreMap::new(9, 9);
        map.data.iter_mut().for_each(|v| *v = 0.5);
        map.suppress_disk(4, 4, 2);
        assert_eq!(map.get(4, 4), f32::NEG_INFINITY);
        assert_eq!(map.get(6, 4), f32::NEG_INFINITY);
        assert_eq!(map.get(6, 6), 0.5);
    }

    #[test]
    fn centroid_shifts_toward_heavier_neighbour() {
        let mut map = ScoreMap::new(5, 5);
        map.data[2 * 5 + 2] = 1.0;
        map.data[2 * 5 + 3] = 1.0;
        let p = subpixel_point_refine(&map, (2, 2)).unwrap();
        assert_abs_diff_eq!(p.x, 2.5, epsilon = 1e-12);
        assert_abs_diff_eq!(p.y, 2.0, epsilon = 1e-12);
        assert!(subpixel_point_refine(&map, (0, 2)).is_err());
        assert!(subpixel_point_refine(&map, (2, 4)).is_err());
    }
}
