use crate::{ImageSize, PixelRect};

#[derive(Clone, Copy, Debug)]
pub struct GrayImageView<'a> {
    pub width: usize,
    pub height: usize,
    pub data: &'a [u8], // row-major, len = w*h
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GrayImage {
    pub width: usize,
    pub height: usize,
    pub data: Vec<u8>,
}

impl GrayImageView<'_> {
    #[inline]
    pub fn size(&self) -> ImageSize {
        ImageSize::new(self.width, self.height)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0 || self.data.len() < self.width * self.height
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> u8 {
        self.data[y * self.width + x]
    }

    #[inline]
    pub fn row(&self, y: usize) -> &[u8] {
        &self.data[y * self.width..(y + 1) * self.width]
    }
}

impl GrayImage {
    pub fn new(width: usize, height: usize) -> Self {
        Self::filled(width, height, 0)
    }

    pub fn filled(width: usize, height: usize, value: u8) -> Self {
        Self {
            width,
            height,
            data: vec![value; width * height],
        }
    }

    pub fn from_fn(width: usize, height: usize, mut f: impl FnMut(usize, usize) -> u8) -> Self {
        let mut data = Vec::with_capacity(width * height);
        for y in 0..height {
            for x in 0..width {
                data.push(f(x, y));
            }
        }
        Self {
            width,
            height,
            data,
        }
    }

    #[inline]
    pub fn view(&self) -> GrayImageView<'_> {
        GrayImageView {
            width: self.width,
            height: self.height,
            data: &self.data,
        }
    }

    #[inline]
    pub fn size(&self) -> ImageSize {
        ImageSize::new(self.width, self.height)
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> u8 {
        self.data[y * self.width + x]
    }

    #[inline]
    pub fn set(&mut self, x: usize, y: usize, v: u8) {
        self.data[y * self.width + x] = v;
    }

    /// Copy `src` into this image with its top-left corner at `(x0, y0)`.
    ///
    /// Pixels falling outside this image are dropped.
    pub fn paste(&mut self, src: &GrayImageView<'_>, x0: i32, y0: i32) {
        for sy in 0..src.height {
            let dy = y0 + sy as i32;
            if dy < 0 || dy >= self.height as i32 {
                continue;
            }
            for sx in 0..src.width {
                let dx = x0 + sx as i32;
                if dx < 0 || dx >= self.width as i32 {
                    continue;
                }
                self.set(dx as usize, dy as usize, src.get(sx, sy));
            }
        }
    }

    /// Copy of the pixels covered by `rect`; the rectangle must fit in the image.
    pub fn crop(src: &GrayImageView<'_>, rect: PixelRect) -> Option<GrayImage> {
        if !rect.fits_in(src.size()) {
            return None;
        }
        let (x0, y0) = (rect.x as usize, rect.y as usize);
        Some(GrayImage::from_fn(
            rect.width as usize,
            rect.height as usize,
            |x, y| src.get(x0 + x, y0 + y),
        ))
    }

    /// Rotate `src` by `angle_deg` about its center into an image of the same size.
    ///
    /// Positive angles rotate counter-clockwise as displayed (y axis pointing
    /// down). Pixels that map outside the source are 0.
    pub fn rotated(src: &GrayImageView<'_>, angle_deg: f64) -> GrayImage {
        let (sin_a, cos_a) = angle_deg.to_radians().sin_cos();
        let cx = src.width as f64 / 2.0;
        let cy = src.height as f64 / 2.0;
        GrayImage::from_fn(src.width, src.height, |x, y| {
            let dx = x as f64 - cx;
            let dy = y as f64 - cy;
            let sx = cos_a * dx - sin_a * dy + cx;
            let sy = sin_a * dx + cos_a * dy + cy;
            sample_bilinear(src, sx as f32, sy as f32)
                .round()
                .clamp(0.0, 255.0) as u8
        })
    }
}

#[inline]
fn get_gray(src: &GrayImageView<'_>, x: i32, y: i32) -> u8 {
    if x < 0 || y < 0 || x >= src.width as i32 || y >= src.height as i32 {
        return 0;
    }
    src.data[y as usize * src.width + x as usize]
}

#[inline]
pub fn sample_bilinear(src: &GrayImageView<'_>, x: f32, y: f32) -> f32 {
    let x0 = x.floor() as i32;
    let y0 = y.floor() as i32;
    let fx = x - x0 as f32;
    let fy = y - y0 as f32;

    let p00 = get_gray(src, x0, y0) as f32;
    let p10 = get_gray(src, x0 + 1, y0) as f32;
    let p01 = get_gray(src, x0, y0 + 1) as f32;
    let p11 = get_gray(src, x0 + 1, y0 + 1) as f32;

    let a = p00 + fx * (p10 - p00);
    let b = p01 + fx * (p11 - p01);
    a + fy * (b - a)
}
