use crate::ErrorKind;
use nalgebra::{DMatrix, Matrix2, Matrix3, Point2, Vector2};
use serde::{Deserialize, Serialize};

/// Homography estimation failures.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum HomographyError {
    #[error("source and destination point counts differ ({src} vs {dst})")]
    LengthMismatch { src: usize, dst: usize },
    #[error("need at least 4 point correspondences, got {0}")]
    NotEnoughPoints(usize),
    #[error("correspondence {0} has a non-finite coordinate")]
    NonFinite(usize),
    #[error("point set is degenerate (coincident or collinear points)")]
    Degenerate,
    #[error("singular value decomposition failed")]
    SvdFailed,
    #[error("estimated homography is singular")]
    Singular,
}

impl HomographyError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            HomographyError::LengthMismatch { .. }
            | HomographyError::NotEnoughPoints(_)
            | HomographyError::NonFinite(_) => ErrorKind::Validation,
            _ => ErrorKind::Numeric,
        }
    }
}

/// Planar projective transform `dst ~ H * src`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Homography {
    pub h: Matrix3<f64>,
}

impl Homography {
    pub fn new(h: Matrix3<f64>) -> Self {
        Self { h }
    }

    /// Row-major coefficients.
    pub fn to_array(&self) -> [[f64; 3]; 3] {
        std::array::from_fn(|r| std::array::from_fn(|c| self.h[(r, c)]))
    }

    /// Map a point, returning `None` when it lands at infinity.
    #[inline]
    pub fn try_apply(&self, p: Point2<f64>) -> Option<Point2<f64>> {
        let v = self.h * p.to_homogeneous();
        if v.z.abs() < 1e-12 {
            return None;
        }
        let out = Point2::new(v.x / v.z, v.y / v.z);
        (out.x.is_finite() && out.y.is_finite()).then_some(out)
    }

    #[inline]
    pub fn apply(&self, p: Point2<f64>) -> Point2<f64> {
        let v = self.h * p.to_homogeneous();
        Point2::new(v.x / v.z, v.y / v.z)
    }

    pub fn inverse(&self) -> Option<Self> {
        self.h.try_inverse().map(|h| Self { h })
    }
}

/// Similarity that moves the centroid of `pts` to the origin and scales their
/// mean distance from it to `sqrt(2)`.
struct Conditioned {
    pts: Vec<Point2<f64>>,
    t: Matrix3<f64>,
    spread: f64,
}

fn condition(pts: &[Point2<f64>]) -> Conditioned {
    let n = pts.len() as f64;
    let centroid = pts.iter().fold(Vector2::zeros(), |acc, p| acc + p.coords) / n;
    let spread = pts.iter().map(|p| (p.coords - centroid).norm()).sum::<f64>() / n;
    let s = if spread > 1e-12 {
        std::f64::consts::SQRT_2 / spread
    } else {
        1.0
    };
    let t = Matrix3::new(
        s, 0.0, -s * centroid.x, //
        0.0, s, -s * centroid.y, //
        0.0, 0.0, 1.0,
    );
    let pts = pts
        .iter()
        .map(|p| Point2::from((p.coords - centroid) * s))
        .collect();
    Conditioned { pts, t, spread }
}

/// Points spread along a single line have a rank-1 scatter matrix.
fn is_collinear(centered: &[Point2<f64>]) -> bool {
    let scatter = centered
        .iter()
        .fold(Matrix2::zeros(), |acc, p| acc + p.coords * p.coords.transpose())
        / centered.len() as f64;
    scatter.symmetric_eigenvalues().min() < 1e-9
}

/// Estimate `H` such that `dst ~ H * src` by normalized DLT over all points.
///
/// Every correspondence contributes equally (least squares on the algebraic
/// error); at least 4 non-collinear points are required.
pub fn estimate_homography(
    src: &[Point2<f64>],
    dst: &[Point2<f64>],
) -> Result<Homography, HomographyError> {
    if src.len() != dst.len() {
        return Err(HomographyError::LengthMismatch {
            src: src.len(),
            dst: dst.len(),
        });
    }
    if src.len() < 4 {
        return Err(HomographyError::NotEnoughPoints(src.len()));
    }
    // the degeneracy thresholds below do not catch NaN
    let finite = |p: &Point2<f64>| p.x.is_finite() && p.y.is_finite();
    if let Some(i) = src.iter().zip(dst).position(|(p, q)| !(finite(p) && finite(q))) {
        return Err(HomographyError::NonFinite(i));
    }

    let s = condition(src);
    let d = condition(dst);
    if s.spread < 1e-12 || d.spread < 1e-12 || is_collinear(&s.pts) || is_collinear(&d.pts) {
        return Err(HomographyError::Degenerate);
    }

    // two equations per correspondence; at least 9 rows so V^T is 9x9
    let rows = (2 * src.len()).max(9);
    let mut a = DMatrix::<f64>::zeros(rows, 9);
    for (k, (p, q)) in s.pts.iter().zip(&d.pts).enumerate() {
        let (x, y, u, v) = (p.x, p.y, q.x, q.y);
        a.row_mut(2 * k)
            .copy_from_slice(&[-x, -y, -1.0, 0.0, 0.0, 0.0, u * x, u * y, u]);
        a.row_mut(2 * k + 1)
            .copy_from_slice(&[0.0, 0.0, 0.0, -x, -y, -1.0, v * x, v * y, v]);
    }

    let svd = a.svd(false, true);
    let vt = svd.v_t.ok_or(HomographyError::SvdFailed)?;
    let sv = &svd.singular_values;
    let tiny = sv.max() * 1e-10;
    if sv.iter().filter(|&&v| v <= tiny).count() > 1 {
        return Err(HomographyError::Degenerate);
    }
    let null = vt.row(sv.imin());
    let hn = Matrix3::from_fn(|r, c| null[3 * r + c]);

    // undo the conditioning: H = Td^-1 * Hn * Ts
    let td_inv = d.t.try_inverse().ok_or(HomographyError::Singular)?;
    let h = td_inv * hn * s.t;
    let scale = h[(2, 2)];
    if scale.abs() < 1e-12 {
        return Err(HomographyError::Singular);
    }
    let h = h / scale;
    if h.determinant().abs() < 1e-12 {
        return Err(HomographyError::Singular);
    }
    Ok(Homography::new(h))
}
