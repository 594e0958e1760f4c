use nalgebra::Point2;
use serde::{Deserialize, Serialize};

/// Image dimensions in pixels.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImageSize {
    pub width: usize,
    pub height: usize,
}

impl ImageSize {
    pub const fn new(width: usize, height: usize) -> Self {
        Self { width, height }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    #[inline]
    pub fn area(&self) -> usize {
        self.width * self.height
    }
}

/// Marker grid dimensions. Points are stored row-major, top-left first.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridSize {
    pub columns: usize,
    pub rows: usize,
}

impl GridSize {
    pub const fn new(columns: usize, rows: usize) -> Self {
        Self { columns, rows }
    }

    #[inline]
    pub fn count(&self) -> usize {
        self.columns * self.rows
    }

    /// Flat index of `(col, row)` in a row-major point list.
    #[inline]
    pub fn index(&self, col: usize, row: usize) -> usize {
        row * self.columns + col
    }
}

/// Which of the two move-reference markers (top-left or top-right of the grid).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Left,
    Right,
}

impl Side {
    pub fn as_str(self) -> &'static str {
        match self {
            Side::Left => "left",
            Side::Right => "right",
        }
    }
}

/// Axis-aligned integer rectangle in pixel space.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct PixelRect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl PixelRect {
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Box of `2 * half_size` centered on `center`, intersected with the image.
    pub fn centered_clamped(center: Point2<f64>, half_size: i32, img: ImageSize) -> Self {
        let cx = center.x.round() as i32;
        let cy = center.y.round() as i32;
        let x0 = cx.saturating_sub(half_size).max(0);
        let y0 = cy.saturating_sub(half_size).max(0);
        let x1 = cx.saturating_add(half_size).min(img.width as i32);
        let y1 = cy.saturating_add(half_size).min(img.height as i32);
        Self {
            x: x0,
            y: y0,
            width: (x1 - x0).max(0),
            height: (y1 - y0).max(0),
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.width <= 0 || self.height <= 0
    }

    #[inline]
    pub fn right(&self) -> i32 {
        self.x + self.width
    }

    #[inline]
    pub fn bottom(&self) -> i32 {
        self.y + self.height
    }

    /// True if the rectangle is non-empty and lies fully inside the image.
    pub fn fits_in(&self, img: ImageSize) -> bool {
        !self.is_empty()
            && self.x >= 0
            && self.y >= 0
            && self.right() <= img.width as i32
            && self.bottom() <= img.height as i32
    }

    pub fn contains(&self, p: Point2<f64>) -> bool {
        p.x >= self.x as f64
            && p.y >= self.y as f64
            && p.x < self.right() as f64
            && p.y < self.bottom() as f64
    }

    pub fn center(&self) -> Point2<f64> {
        Point2::new(
            self.x as f64 + self.width as f64 / 2.0,
            self.y as f64 + self.height as f64 / 2.0,
        )
    }
}

/// One near-vertical segment of the water-line search band.
///
/// `top` is the end above the expected water line, `bot` the end below it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchLine {
    pub top: Point2<i32>,
    pub bot: Point2<i32>,
}

impl SearchLine {
    pub fn new(top: Point2<i32>, bot: Point2<i32>) -> Self {
        Self { top, bot }
    }

    /// Number of one-pixel steps between the two ends (Chebyshev length).
    pub fn pixel_length(&self) -> usize {
        let dx = (self.bot.x - self.top.x).unsigned_abs() as usize;
        let dy = (self.bot.y - self.top.y).unsigned_abs() as usize;
        dx.max(dy)
    }

    /// Point at parameter `t` in `[0, 1]` from `top` to `bot`.
    pub fn point_at(&self, t: f64) -> Point2<f64> {
        let tx = self.top.x as f64;
        let ty = self.top.y as f64;
        Point2::new(
            tx + t * (self.bot.x as f64 - tx),
            ty + t * (self.bot.y as f64 - ty),
        )
    }

    /// True if any coordinate carries the "missing" sentinel (`i32::MIN`).
    pub fn has_sentinel(&self) -> bool {
        [self.top.x, self.top.y, self.bot.x, self.bot.y].contains(&i32::MIN)
    }

    pub fn fits_in(&self, img: ImageSize) -> bool {
        let inside = |p: Point2<i32>| {
            p.x >= 0 && p.y >= 0 && (p.x as usize) < img.width && (p.y as usize) < img.height
        };
        inside(self.top) && inside(self.bot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn centered_rect_is_clamped_to_image() {
        let img = ImageSize::new(100, 80);
        let r = PixelRect::centered_clamped(Point2::new(10.0, 75.0), 20, img);
        assert_eq!(r, PixelRect::new(0, 55, 30, 25));
        assert!(r.fits_in(img));
    }

    #[test]
    fn far_away_centers_give_empty_rects() {
        let img = ImageSize::new(100, 80);
        for c in [
            Point2::new(1e12, 1e12),
            Point2::new(-1e12, 40.0),
            Point2::new(f64::INFINITY, f64::NEG_INFINITY),
        ] {
            let r = PixelRect::centered_clamped(c, 56, img);
            assert!(r.is_empty(), "{c:?} gave {r:?}");
            assert!(!r.fits_in(img));
        }
    }

    #[test]
    fn rect_outside_image_does_not_fit() {
        let img = ImageSize::new(50, 50);
        assert!(!PixelRect::new(-1, 0, 10, 10).fits_in(img));
        assert!(!PixelRect::new(45, 0, 10, 10).fits_in(img));
        assert!(!PixelRect::new(5, 5, 0, 10).fits_in(img));
        assert!(PixelRect::new(40, 40, 10, 10).fits_in(img));
    }

    #[test]
    fn grid_index_is_row_major() {
        let grid = GridSize::new(2, 4);
        assert_eq!(grid.count(), 8);
        assert_eq!(grid.index(1, 0), 1);
        assert_eq!(grid.index(0, 3), 6);
    }

    #[test]
    fn side_and_rect_serialize_as_plain_json() {
        let json = serde_json::to_string(&Side::Left).unwrap();
        assert_eq!(json, "\"left\"");
        let rect: PixelRect =
            serde_json::from_str(r#"{"x":1,"y":2,"width":3,"height":4}"#).unwrap();
        assert_eq!(rect, PixelRect::new(1, 2, 3, 4));
    }

    #[test]
    fn search_line_interpolates_between_ends() {
        let line = SearchLine::new(Point2::new(10, 20), Point2::new(14, 120));
        assert_eq!(line.pixel_length(), 100);
        let mid = line.point_at(0.5);
        assert_relative_eq!(mid.x, 12.0);
        assert_relative_eq!(mid.y, 70.0);
        assert!(!line.has_sentinel());
        assert!(SearchLine::new(Point2::new(i32::MIN, 0), Point2::new(0, 0)).has_sentinel());
    }
}
