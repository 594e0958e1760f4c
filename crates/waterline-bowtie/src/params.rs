use serde::{Deserialize, Serialize};

/// Tunables for marker search.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BowtieParams {
    /// Radius (score-map pixels) cleared around each accepted peak.
    pub suppression_radius: usize,
    /// Minimum coarse score when re-locating the move targets.
    pub coarse_min_score: f64,
    /// Minimum score for the per-rotation refinement of move targets.
    pub refine_min_score: f64,
    /// Half side of the move-search boxes placed on a freshly found grid.
    /// Never smaller than half the template plus one pixel.
    pub move_search_half_size: i32,
}

impl Default for BowtieParams {
    fn default() -> Self {
        Self {
            suppression_radius: 17,
            coarse_min_score: 0.5,
            refine_min_score: 0.5,
            move_search_half_size: 56,
        }
    }
}
