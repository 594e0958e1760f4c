use waterline_bowtie::BowtieError;
use waterline_calib::CalibError;
use waterline_core::{ErrorKind, SearchLine};

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum FindLineError {
    #[error("bowtie search is not initialized")]
    NotInitialized,
    #[error("invalid parameters: {0}")]
    InvalidParams(&'static str),
    #[error("line angle bounds [{min}, {max}] must satisfy -45 <= min < max <= 45")]
    AngleBounds { min: f64, max: f64 },
    #[error("need at least 2 search lines, got {0}")]
    TooFewLines(usize),
    #[error("{lines} search lines make {swaths} swaths of width {width}, need at least 2")]
    TooFewSwaths {
        lines: usize,
        swaths: usize,
        width: usize,
    },
    #[error("search line {line:?} lies outside the {width}x{height} image")]
    LineOutsideImage {
        line: SearchLine,
        width: usize,
        height: usize,
    },
    #[error("intensity profile of {len} samples is too short for a transition window of {window}")]
    ProfileTooShort { len: usize, window: usize },
    #[error("intensity profile has no transition")]
    FlatProfile,
    #[error("need at least 2 candidate points for a line fit, got {0}")]
    TooFewPoints(usize),
    #[error("candidate point {0} has a non-finite coordinate")]
    NonFinitePoint(usize),
    #[error("line center x {0} is not finite")]
    NonFiniteCenter(f64),
    #[error("no sampled point pair lies within the angle bounds")]
    NoPairInAngleBounds,
    #[error("best line has {found} inliers, need {needed}")]
    TooFewInliers { found: usize, needed: usize },
    #[error("inliers do not constrain a line")]
    DegenerateFit,
    #[error(transparent)]
    Bowtie(#[from] BowtieError),
    #[error(transparent)]
    Calib(#[from] CalibError),
}

impl FindLineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            FindLineError::Bowtie(e) => e.kind(),
            FindLineError::Calib(e) => e.kind(),
            FindLineError::FlatProfile
            | FindLineError::NoPairInAngleBounds
            | FindLineError::TooFewInliers { .. }
            | FindLineError::DegenerateFit => ErrorKind::Numeric,
            _ => ErrorKind::Validation,
        }
    }
}
