use waterline_bowtie::BowtieError;
use waterline_calib::{CalibError, CalibIoError};
use waterline_core::ErrorKind;
use waterline_findline::FindLineError;

/// Errors produced by the facade helpers.
#[derive(thiserror::Error, Debug)]
pub enum WaterlineError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error("grid has {expected} markers but {got} world points were given")]
    WorldPointCount { expected: usize, got: usize },
    #[error(transparent)]
    Bowtie(#[from] BowtieError),
    #[error(transparent)]
    Calib(#[from] CalibError),
    #[error(transparent)]
    CalibIo(#[from] CalibIoError),
    #[error(transparent)]
    FindLine(#[from] FindLineError),
}

impl WaterlineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            WaterlineError::Io(_) | WaterlineError::Json(_) => ErrorKind::Io,
            WaterlineError::WorldPointCount { .. } => ErrorKind::Validation,
            WaterlineError::Bowtie(e) => e.kind(),
            WaterlineError::Calib(e) => e.kind(),
            WaterlineError::CalibIo(e) => e.kind(),
            WaterlineError::FindLine(e) => e.kind(),
        }
    }
}
