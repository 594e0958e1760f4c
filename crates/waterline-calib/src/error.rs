use waterline_core::{ErrorKind, HomographyError};

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum CalibError {
    #[error("pixel and world point counts differ ({pixel} vs {world})")]
    LengthMismatch { pixel: usize, world: usize },
    #[error("no calibration points given")]
    NoPoints,
    #[error("{points} points do not fill a {columns}x{rows} grid")]
    GridMismatch {
        columns: usize,
        rows: usize,
        points: usize,
    },
    #[error("grid {columns}x{rows} is too small, need at least 2x4")]
    GridTooSmall { columns: usize, rows: usize },
    #[error("{which} point {index} has a non-finite coordinate")]
    NonFinitePoint { which: &'static str, index: usize },
    #[error("image size {width}x{height} is empty")]
    EmptyImage { width: usize, height: usize },
    #[error("grid corners do not span a search band ({0})")]
    DegenerateGrid(&'static str),
    #[error("homography fit failed: {0}")]
    Homography(#[from] HomographyError),
    #[error("system is not calibrated")]
    Uncalibrated,
    #[error("point maps to infinity")]
    PointAtInfinity,
}

impl CalibError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CalibError::Homography(e) => e.kind(),
            CalibError::PointAtInfinity => ErrorKind::Numeric,
            _ => ErrorKind::Validation,
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum CalibIoError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error("calibration file holds {points} points for a {columns}x{rows} grid")]
    CountMismatch {
        columns: usize,
        rows: usize,
        points: usize,
    },
    #[error(transparent)]
    Calib(#[from] CalibError),
}

impl CalibIoError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CalibIoError::Io(_) | CalibIoError::Json(_) => ErrorKind::Io,
            CalibIoError::CountMismatch { .. } => ErrorKind::Validation,
            CalibIoError::Calib(e) => e.kind(),
        }
    }
}
