//! Intensity profiles along the search band and their transition points.

use std::ops::Range;

use nalgebra::Point2;
use waterline_core::{sample_bilinear, GrayImageView, SearchLine};

use crate::{FindLineError, FindLineParams};

/// Sum of bilinear samples across `lines`, one entry per position along them.
///
/// Every line is sampled at the same number of evenly spaced positions (the
/// longest line's pixel length plus one), so entry `k` sums the pixels at the
/// same relative height on each line.
pub fn calc_row_sums(
    img: &GrayImageView<'_>,
    lines: &[SearchLine],
) -> Result<Vec<f64>, FindLineError> {
    if lines.is_empty() {
        return Err(FindLineError::TooFewLines(0));
    }
    let size = img.size();
    if let Some(bad) = lines
        .iter()
        .find(|l| l.has_sentinel() || !l.fits_in(size))
    {
        return Err(FindLineError::LineOutsideImage {
            line: *bad,
            width: size.width,
            height: size.height,
        });
    }

    let samples = lines.iter().map(SearchLine::pixel_length).max().unwrap_or(0) + 1;
    let step = if samples > 1 {
        1.0 / (samples - 1) as f64
    } else {
        0.0
    };
    let mut sums = vec![0.0f64; samples];
    for line in lines {
        for (k, sum) in sums.iter_mut().enumerate() {
            let p = line.point_at(k as f64 * step);
            *sum += sample_bilinear(img, p.x as f32, p.y as f32) as f64;
        }
    }
    Ok(sums)
}

/// Running median with an odd `kernel`, replicating the edge values.
/// A kernel of 0 or 1 returns the input unchanged.
pub fn median_filter(values: &[f64], kernel: usize) -> Vec<f64> {
    if kernel <= 1 || values.len() < 2 {
        return values.to_vec();
    }
    let half = kernel / 2;
    let last = values.len() - 1;
    let mut window = Vec::with_capacity(2 * half + 1);
    (0..values.len())
        .map(|i| {
            window.clear();
            window.extend(
                (i as isize - half as isize..=i as isize + half as isize)
                    .map(|j| values[j.clamp(0, last as isize) as usize]),
            );
            window.sort_by(f64::total_cmp);
            window[half]
        })
        .collect()
}

/// Locate the strongest step in `profile` and map it onto the middle line of `swath`.
///
/// The step at index `i` is the difference between the mean of the `window`
/// samples starting at `i` and the mean of the `window` samples before it;
/// the largest absolute step wins (first on ties) and the boundary is placed
/// half a sample before `i`.
pub fn calc_swath_point(
    swath: &[SearchLine],
    profile: &[f64],
    window: usize,
) -> Result<Point2<f64>, FindLineError> {
    let middle = swath
        .get(swath.len() / 2)
        .ok_or(FindLineError::TooFewLines(0))?;
    let n = profile.len();
    if window == 0 || n < 2 * window || n < 2 {
        return Err(FindLineError::ProfileTooShort { len: n, window });
    }

    let w = window as f64;
    let mut best: Option<(usize, f64)> = None;
    for i in window..=n - window {
        let above: f64 = profile[i - window..i].iter().sum::<f64>() / w;
        let below: f64 = profile[i..i + window].iter().sum::<f64>() / w;
        let step = (below - above).abs();
        if best.is_none_or(|(_, b)| step > b) {
            best = Some((i, step));
        }
    }
    match best {
        Some((i, step)) if step > f64::EPSILON => {
            let t = (i as f64 - 0.5) / (n - 1) as f64;
            Ok(middle.point_at(t))
        }
        _ => Err(FindLineError::FlatProfile),
    }
}

/// Candidate water-line point for `lines[range]`: row sums, median filter, transition.
pub fn evaluate_swath(
    img: &GrayImageView<'_>,
    lines: &[SearchLine],
    range: Range<usize>,
    params: &FindLineParams,
) -> Result<Point2<f64>, FindLineError> {
    let swath = lines
        .get(range)
        .ok_or(FindLineError::InvalidParams("swath range outside the search lines"))?;
    let sums = calc_row_sums(img, swath)?;
    let filtered = median_filter(&sums, params.median_kernel);
    calc_swath_point(swath, &filtered, params.transition_window)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use waterline_core::GrayImage;

    fn vline(x: i32, y0: i32, y1: i32) -> SearchLine {
        SearchLine::new(Point2::new(x, y0), Point2::new(x, y1))
    }

    #[test]
    fn row_sums_add_across_lines() {
        let img = GrayImage::from_fn(10, 10, |_, y| (y * 10) as u8);
        let sums = calc_row_sums(&img.view(), &[vline(2, 0, 9), vline(5, 0, 9)]).unwrap();
        assert_eq!(sums.len(), 10);
        assert_abs_diff_eq!(sums[0], 0.0, epsilon = 1e-3);
        assert_abs_diff_eq!(sums[4], 80.0, epsilon = 1e-3);
        assert_abs_diff_eq!(sums[9], 180.0, epsilon = 1e-3);
    }

    #[test]
    fn shorter_lines_are_stretched_to_common_length() {
        let img = GrayImage::from_fn(10, 10, |_, y| (y * 10) as u8);
        let sums = calc_row_sums(&img.view(), &[vline(1, 0, 8), vline(2, 0, 4)]).unwrap();
        assert_eq!(sums.len(), 9);
        // last sample is y=8 on the long line and y=4 on the short one
        assert_abs_diff_eq!(sums[8], 120.0, epsilon = 1e-4);
    }

    #[test]
    fn lines_outside_the_image_are_rejected() {
        let img = GrayImage::new(10, 10);
        let err = calc_row_sums(&img.view(), &[vline(2, 0, 10)]).unwrap_err();
        assert!(matches!(err, FindLineError::LineOutsideImage { .. }));
        let sentinel = SearchLine::new(Point2::new(1, 1), Point2::new(1, i32::MIN));
        assert!(calc_row_sums(&img.view(), &[sentinel]).is_err());
    }

    #[test]
    fn median_removes_spikes_and_keeps_steps() {
        let v = [1.0, 1.0, 9.0, 1.0, 1.0, 5.0, 5.0, 5.0, 5.0];
        let m = median_filter(&v, 3);
        assert_eq!(m, vec![1.0, 1.0, 1.0, 1.0, 1.0, 5.0, 5.0, 5.0, 5.0]);
        assert_eq!(median_filter(&v, 1), v.to_vec());
    }

    #[test]
    fn swath_point_sits_on_the_step() {
        let profile: Vec<f64> = (0..21).map(|k| if k < 12 { 200.0 } else { 40.0 }).collect();
        let swath = [vline(10, 100, 120), vline(11, 100, 120), vline(12, 100, 120)];
        let p = calc_swath_point(&swath, &profile, 3).unwrap();
        assert_abs_diff_eq!(p.x, 11.0);
        assert_abs_diff_eq!(p.y, 111.5);
    }

    #[test]
    fn flat_and_short_profiles_fail() {
        let swath = [vline(0, 0, 9)];
        let flat = vec![10.0; 10];
        assert_eq!(
            calc_swath_point(&swath, &flat, 3).unwrap_err(),
            FindLineError::FlatProfile
        );
        assert!(matches!(
            calc_swath_point(&swath, &flat[..5], 3).unwrap_err(),
            FindLineError::ProfileTooShort { len: 5, window: 3 }
        ));
    }
}
