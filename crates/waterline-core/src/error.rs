use serde::{Deserialize, Serialize};

/// Coarse classification of a failed operation.
///
/// Every error type in the workspace maps onto one of these through its
/// `kind()` method, so callers can tell bad input apart from a numeric
/// breakdown without matching on crate-specific variants.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Bad arguments, missing calibration, wrong state, too few points, mismatched counts.
    Validation,
    /// Degenerate geometry or a numeric routine that could not produce a result.
    Numeric,
    /// File system or serialization failure.
    Io,
}

impl ErrorKind {
    pub fn is_validation(self) -> bool {
        self == ErrorKind::Validation
    }

    pub fn is_numeric(self) -> bool {
        self == ErrorKind::Numeric
    }
}
