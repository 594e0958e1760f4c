//! Angle-gated RANSAC for near-horizontal lines.

use log::debug;
use nalgebra::Point2;
use rand::prelude::IndexedRandom;
use rand::{rngs::StdRng, SeedableRng};
use waterline_core::ImageSize;

use crate::{FindLineError, FindPointSet, LineFit, LineFitParams};

/// Line `a*x + b*y + c = 0` with `a^2 + b^2 = 1`.
#[derive(Clone, Copy, Debug)]
struct NormalLine {
    a: f64,
    b: f64,
    c: f64,
}

impl NormalLine {
    fn through(p: Point2<f64>, q: Point2<f64>) -> Option<Self> {
        let d = q - p;
        let len = d.norm();
        if len < 1e-9 {
            return None;
        }
        let (a, b) = (-d.y / len, d.x / len);
        Some(Self {
            a,
            b,
            c: -(a * p.x + b * p.y),
        })
    }

    /// Same line as `y = slope * x + intercept`.
    fn from_slope_intercept(slope: f64, intercept: f64) -> Self {
        let n = (1.0 + slope * slope).sqrt();
        Self {
            a: -slope / n,
            b: 1.0 / n,
            c: -intercept / n,
        }
    }

    /// `(slope, intercept)` of the line, `None` for vertical lines.
    fn slope_intercept(&self) -> Option<(f64, f64)> {
        (self.b.abs() > 1e-12).then(|| (-self.a / self.b, -self.c / self.b))
    }

    #[inline]
    fn distance(&self, p: Point2<f64>) -> f64 {
        (self.a * p.x + self.b * p.y + self.c).abs()
    }
}

/// Angle of the segment `p -> q` in degrees, folded into `(-90, 90]`.
fn pair_angle_deg(p: Point2<f64>, q: Point2<f64>) -> f64 {
    let (mut dx, mut dy) = (q.x - p.x, q.y - p.y);
    if dx < 0.0 {
        dx = -dx;
        dy = -dy;
    }
    dy.atan2(dx).to_degrees()
}

fn rms(vals: impl Iterator<Item = f64>) -> f64 {
    let (mut ss, mut n) = (0.0, 0usize);
    for v in vals {
        ss += v * v;
        n += 1;
    }
    if n == 0 {
        f64::INFINITY
    } else {
        (ss / n as f64).sqrt()
    }
}

/// Least-squares fit of `y = slope * x + intercept`.
fn fit_y_on_x(points: impl Iterator<Item = Point2<f64>> + Clone) -> Option<(f64, f64)> {
    let n = points.clone().count() as f64;
    if n < 2.0 {
        return None;
    }
    let (sx, sy) = points
        .clone()
        .fold((0.0, 0.0), |(sx, sy), p| (sx + p.x, sy + p.y));
    let (mx, my) = (sx / n, sy / n);
    let (sxx, sxy) = points.fold((0.0, 0.0), |(sxx, sxy), p| {
        let dx = p.x - mx;
        (sxx + dx * dx, sxy + dx * (p.y - my))
    });
    if sxx < 1e-12 {
        return None;
    }
    let slope = sxy / sxx;
    Some((slope, my - slope * mx))
}

/// Fit a line to water-line candidates, ignoring outliers.
///
/// Each iteration draws two distinct candidates; pairs whose angle falls
/// outside `[min_angle_deg, max_angle_deg]` are skipped. The trial line with
/// the most candidates within `inlier_tolerance_px` wins, ties going to the
/// lower inlier RMS. The result is a least-squares refit of y on x over the
/// winning inliers, reported at `x = 0`, `x = x_center` and the last image
/// column. Inliers are recounted against the refit line; when the refit
/// leaves the angle bounds or loses support, the winning pair line is kept.
pub fn fit_line_ransac(
    points: &[Point2<f64>],
    x_center: f64,
    img_size: ImageSize,
    params: &LineFitParams,
) -> Result<LineFit, FindLineError> {
    params.validate()?;
    if points.len() < 2 {
        return Err(FindLineError::TooFewPoints(points.len()));
    }
    if !x_center.is_finite() {
        return Err(FindLineError::NonFiniteCenter(x_center));
    }
    if let Some(i) = points
        .iter()
        .position(|p| !(p.x.is_finite() && p.y.is_finite()))
    {
        return Err(FindLineError::NonFinitePoint(i));
    }

    let indices: Vec<usize> = (0..points.len()).collect();
    let mut rng = StdRng::seed_from_u64(params.seed);
    let mut best: Option<(NormalLine, Vec<usize>, f64)> = None;
    let mut gated = 0usize;
    let mut support = Vec::with_capacity(points.len());

    for _ in 0..params.iterations {
        let mut pair = indices.choose_multiple(&mut rng, 2);
        let (Some(&i), Some(&j)) = (pair.next(), pair.next()) else {
            break;
        };
        let (p, q) = (points[i], points[j]);
        let angle = pair_angle_deg(p, q);
        if angle < params.min_angle_deg || angle > params.max_angle_deg {
            continue;
        }
        let Some(line) = NormalLine::through(p, q) else {
            continue;
        };
        gated += 1;

        support.clear();
        support.extend(
            indices
                .iter()
                .copied()
                .filter(|&k| line.distance(points[k]) <= params.inlier_tolerance_px),
        );
        let residual = rms(support.iter().map(|&k| line.distance(points[k])));
        let better = match &best {
            None => true,
            Some((_, inl, r)) => {
                support.len() > inl.len() || (support.len() == inl.len() && residual < *r)
            }
        };
        if better {
            best = Some((line, support.clone(), residual));
        }
    }

    let Some((pair_line, inliers, _)) = best else {
        return Err(FindLineError::NoPairInAngleBounds);
    };
    let needed = params.min_inliers.max(2);
    if inliers.len() < needed {
        return Err(FindLineError::TooFewInliers {
            found: inliers.len(),
            needed,
        });
    }

    let in_bounds = |slope: f64| {
        let angle = slope.atan().to_degrees();
        (params.min_angle_deg..=params.max_angle_deg).contains(&angle)
    };
    let support_of = |line: &NormalLine| -> Vec<usize> {
        indices
            .iter()
            .copied()
            .filter(|&k| line.distance(points[k]) <= params.inlier_tolerance_px)
            .collect()
    };
    let refit = fit_y_on_x(inliers.iter().map(|&k| points[k]))
        .filter(|&(slope, _)| in_bounds(slope))
        .map(|(slope, intercept)| {
            let line = NormalLine::from_slope_intercept(slope, intercept);
            ((slope, intercept), support_of(&line))
        })
        .filter(|(_, support)| support.len() >= needed);
    let ((slope, intercept), inliers) = match refit {
        Some(fit) => fit,
        None => {
            debug!("refit left the angle bounds or lost support, keeping the pair line");
            let model = pair_line
                .slope_intercept()
                .ok_or(FindLineError::DegenerateFit)?;
            (model, inliers)
        }
    };
    let right_x = img_size.width.saturating_sub(1) as f64;
    let line = FindPointSet::from_slope_intercept(slope, intercept, [0.0, x_center, right_x]);
    let norm = (1.0 + slope * slope).sqrt();
    let inlier_rms = rms(inliers
        .iter()
        .map(|&k| (slope * points[k].x + intercept - points[k].y).abs() / norm));
    debug!(
        "line fit: {} of {} inliers over {} gated pairs, slope {:.4}, rms {:.3}px",
        inliers.len(),
        points.len(),
        gated,
        slope,
        inlier_rms
    );
    Ok(LineFit {
        line,
        inliers,
        inlier_rms,
    })
}
