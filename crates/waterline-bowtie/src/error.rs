use waterline_core::{ErrorKind, PixelRect, Side};

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum BowtieError {
    #[error("template dimension {0} out of range 20-1000")]
    InvalidTemplateDim(usize),
    #[error("bowtie templates are not initialized")]
    NotInitialized,
    #[error("search region {width}x{height} is smaller than the {dim}px template")]
    ImageTooSmall {
        width: usize,
        height: usize,
        dim: usize,
    },
    #[error("template index {0} out of range 0-{max}", max = crate::TEMPLATE_COUNT - 1)]
    TemplateIndex(usize),
    #[error("minimum score {value:.3} out of range {min:.2}-1.0")]
    MinScore { value: f64, min: f64 },
    #[error("requested {0} matches, must be in range 1-1000")]
    NumToFind(usize),
    #[error("invalid grid {columns}x{rows}")]
    InvalidGrid { columns: usize, rows: usize },
    #[error("invalid {side} move search region {rect:?}", side = .side.as_str())]
    InvalidRoi { side: Side, rect: PixelRect },
    #[error("no template match reached minimum score {min_score:.3}")]
    NoMatch { min_score: f64 },
    #[error("found {found} marker candidates, need {expected}")]
    NotEnoughCandidates { found: usize, expected: usize },
    #[error("found {0} move targets, expected 2")]
    MoveTargetCount(usize),
    #[error("found {found} move targets in the {side} search region, expected 1", side = .side.as_str())]
    MoveTargetRegion { side: Side, found: usize },
    #[error("correlation peak ({x}, {y}) lies on the score map border")]
    PeakOnBorder { x: usize, y: usize },
    #[error("no grid has been found yet")]
    NoGrid,
}

impl BowtieError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            BowtieError::NoMatch { .. }
            | BowtieError::NotEnoughCandidates { .. }
            | BowtieError::MoveTargetCount(_)
            | BowtieError::MoveTargetRegion { .. }
            | BowtieError::PeakOnBorder { .. } => ErrorKind::Numeric,
            _ => ErrorKind::Validation,
        }
    }
}
