use log::{debug, warn};
use nalgebra::Point2;
use waterline_core::{GrayImage, GrayImageView, GridSize, ImageSize, PixelRect, Side};

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::ncc::{correlate, subpixel_point_refine, PreparedTemplate, ScoreMap};
use crate::template::{
    build_templates, center_index, even_dim, TEMPLATE_COUNT, TEMPLATE_DIM_MAX, TEMPLATE_DIM_MIN,
};
use crate::{BowtieError, BowtieParams, MoveTargets, TemplateMatchItem};

const MATCH_MIN_SCORE_FLOOR: f64 = 0.05;
const FIND_MIN_SCORE_FLOOR: f64 = 0.01;
const MAX_NUM_TO_FIND: usize = 1000;

/// Rotated bowtie templates plus the score buffers used to search with them.
///
/// Search happens in two stages: a coarse pass over the whole image with the
/// unrotated template, then a per-candidate refinement in a small window with
/// every rotation. Buffers are owned by the bank and reused between calls.
#[derive(Clone, Debug)]
pub struct BowtieTemplateBank {
    params: BowtieParams,
    templates: Vec<PreparedTemplate>,
    search_size: ImageSize,
    match_space: ScoreMap,
    match_space_small: ScoreMap,
    found_grid: Vec<Vec<TemplateMatchItem>>,
    left_roi: PixelRect,
    right_roi: PixelRect,
}

impl Default for BowtieTemplateBank {
    fn default() -> Self {
        Self::new(BowtieParams::default())
    }
}

/// Half side of a move-search box for templates of side `dim`: the
/// requested size, grown so the box always holds a whole marker.
pub fn move_search_half_size(dim: usize, requested: i32) -> i32 {
    let min_half = i32::try_from(even_dim(dim) / 2 + 1).unwrap_or(i32::MAX);
    requested.max(min_half)
}

fn check_min_score(value: f64, min: f64) -> Result<(), BowtieError> {
    if !(min..=1.0).contains(&value) {
        return Err(BowtieError::MinScore { value, min });
    }
    Ok(())
}

fn check_index(index: usize) -> Result<(), BowtieError> {
    if index >= TEMPLATE_COUNT {
        return Err(BowtieError::TemplateIndex(index));
    }
    Ok(())
}

fn check_grid(grid: GridSize) -> Result<(), BowtieError> {
    if grid.columns < 2 || grid.rows < 1 {
        return Err(BowtieError::InvalidGrid {
            columns: grid.columns,
            rows: grid.rows,
        });
    }
    Ok(())
}

impl BowtieTemplateBank {
    pub fn new(params: BowtieParams) -> Self {
        Self {
            params,
            templates: Vec::new(),
            search_size: ImageSize::default(),
            match_space: ScoreMap::default(),
            match_space_small: ScoreMap::default(),
            found_grid: Vec::new(),
            left_roi: PixelRect::default(),
            right_roi: PixelRect::default(),
        }
    }

    pub fn params(&self) -> &BowtieParams {
        &self.params
    }

    pub fn is_initialized(&self) -> bool {
        !self.templates.is_empty()
    }

    /// Side of the templates in pixels, once initialized.
    pub fn template_dim(&self) -> Option<usize> {
        self.templates.first().map(PreparedTemplate::dim)
    }

    pub fn template(&self, index: usize) -> Option<GrayImageView<'_>> {
        self.templates.get(index).map(|t| t.image.view())
    }

    /// Image size the coarse score buffer was allocated for.
    pub fn search_size(&self) -> ImageSize {
        self.search_size
    }

    fn require_dim(&self) -> Result<usize, BowtieError> {
        self.template_dim().ok_or(BowtieError::NotInitialized)
    }

    /// Build the rotated template bank for markers of roughly `dim` pixels.
    ///
    /// `dim` must lie in 20..=1000 and is rounded up to even. On error the
    /// bank keeps its previous templates.
    #[cfg_attr(feature = "tracing", instrument(level = "info", skip(self)))]
    pub fn init(&mut self, dim: usize, search_size: ImageSize) -> Result<(), BowtieError> {
        if !(TEMPLATE_DIM_MIN..=TEMPLATE_DIM_MAX).contains(&dim) {
            return Err(BowtieError::InvalidTemplateDim(dim));
        }
        let dim = even_dim(dim);
        if search_size.width < dim || search_size.height < dim {
            return Err(BowtieError::ImageTooSmall {
                width: search_size.width,
                height: search_size.height,
                dim,
            });
        }

        self.templates = build_templates(dim)
            .into_iter()
            .map(PreparedTemplate::new)
            .collect();
        self.search_size = search_size;
        self.match_space = ScoreMap::new(search_size.width - dim + 1, search_size.height - dim + 1);
        self.match_space_small = ScoreMap::new(dim / 2 + 1, dim / 2 + 1);
        self.found_grid.clear();
        debug!(
            "built {} bowtie templates of {}px for {}x{} search images",
            TEMPLATE_COUNT, dim, search_size.width, search_size.height
        );
        Ok(())
    }

    /// Correlate template `index` over the whole image and return up to
    /// `num_to_find` peaks scoring at least `min_score`, best first.
    pub fn match_template(
        &mut self,
        index: usize,
        img: &GrayImageView<'_>,
        min_score: f64,
        num_to_find: usize,
    ) -> Result<Vec<TemplateMatchItem>, BowtieError> {
        self.require_dim()?;
        check_index(index)?;
        check_min_score(min_score, MATCH_MIN_SCORE_FLOOR)?;
        if !(1..=MAX_NUM_TO_FIND).contains(&num_to_find) {
            return Err(BowtieError::NumToFind(num_to_find));
        }

        let items = self.coarse_match(index, img, min_score, num_to_find)?;
        if items.is_empty() {
            return Err(BowtieError::NoMatch { min_score });
        }
        Ok(items)
    }

    fn coarse_match(
        &mut self,
        index: usize,
        img: &GrayImageView<'_>,
        min_score: f64,
        num_to_find: usize,
    ) -> Result<Vec<TemplateMatchItem>, BowtieError> {
        let tpl = &self.templates[index];
        let half = tpl.dim() as f64 / 2.0;
        if img.size() != self.search_size {
            debug!(
                "search image {}x{} differs from init size {}x{}, resizing score buffer",
                img.width, img.height, self.search_size.width, self.search_size.height
            );
        }
        let full = PixelRect::new(0, 0, img.width as i32, img.height as i32);
        correlate(img, full, tpl, &mut self.match_space)?;

        let radius = self.params.suppression_radius;
        let mut items = Vec::new();
        while items.len() < num_to_find {
            let Some(((x, y), score)) = self.match_space.max_loc() else {
                break;
            };
            let score = score as f64;
            // peaks come out in non-increasing order
            if !score.is_finite() || score < min_score {
                break;
            }
            if self.match_space.on_border(x, y) {
                self.match_space.suppress_disk(x, y, radius);
                continue;
            }
            items.push(TemplateMatchItem::new(
                Point2::new(x as f64 + half, y as f64 + half),
                score,
            ));
            self.match_space.suppress_disk(x, y, radius);
        }
        Ok(items)
    }

    /// Re-correlate template `index` in a window of 1.5 template sides around
    /// `item`. If the local peak beats `item.score`, the item takes the new
    /// score and the subpixel peak location. Returns whether it changed.
    pub fn match_refine(
        &mut self,
        index: usize,
        img: &GrayImageView<'_>,
        min_score: f64,
        item: &mut TemplateMatchItem,
    ) -> Result<bool, BowtieError> {
        self.require_dim()?;
        check_index(index)?;
        check_min_score(min_score, MATCH_MIN_SCORE_FLOOR)?;
        self.refine_one(index, img, min_score, item)
    }

    fn refine_one(
        &mut self,
        index: usize,
        img: &GrayImageView<'_>,
        min_score: f64,
        item: &mut TemplateMatchItem,
    ) -> Result<bool, BowtieError> {
        let tpl = &self.templates[index];
        let dim = tpl.dim();
        let side = dim + dim / 2;
        if img.width < side || img.height < side {
            return Err(BowtieError::ImageTooSmall {
                width: img.width,
                height: img.height,
                dim: side,
            });
        }

        let offset = (dim / 2 + dim / 4) as i64;
        let x = (item.point.x.round() as i64 - offset).clamp(0, (img.width - side) as i64);
        let y = (item.point.y.round() as i64 - offset).clamp(0, (img.height - side) as i64);
        let rect = PixelRect::new(x as i32, y as i32, side as i32, side as i32);
        correlate(img, rect, tpl, &mut self.match_space_small)?;

        let Some((peak, best)) = self.match_space_small.max_loc() else {
            return Ok(false);
        };
        let best = best as f64;
        if best <= item.score || best < min_score {
            return Ok(false);
        }

        let local = subpixel_point_refine(&self.match_space_small, peak)
            .unwrap_or_else(|_| Point2::new(peak.0 as f64, peak.1 as f64));
        let half = dim as f64 / 2.0;
        item.score = best;
        item.point = Point2::new(
            rect.x as f64 + local.x + half,
            rect.y as f64 + local.y + half,
        );
        Ok(true)
    }

    /// Locate a full marker grid: coarse search for twice the marker count,
    /// refinement of every candidate against every rotation, then
    /// [`sort_points`](Self::sort_points).
    ///
    /// Returns the markers row-major, top-left first.
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "info", skip(self, img), fields(width = img.width, height = img.height))
    )]
    pub fn find_targets(
        &mut self,
        img: &GrayImageView<'_>,
        min_score: f64,
        grid: GridSize,
    ) -> Result<Vec<TemplateMatchItem>, BowtieError> {
        self.require_dim()?;
        check_grid(grid)?;
        check_min_score(min_score, FIND_MIN_SCORE_FLOOR)?;

        let wanted = (2 * grid.count()).min(MAX_NUM_TO_FIND);
        let mut candidates = self.coarse_match(center_index(), img, min_score, wanted)?;
        if candidates.is_empty() {
            return Err(BowtieError::NoMatch { min_score });
        }
        debug!("coarse search kept {} candidates", candidates.len());

        for item in candidates.iter_mut() {
            for index in 0..TEMPLATE_COUNT {
                self.refine_one(index, img, min_score, item)?;
            }
        }

        self.sort_points(&candidates, grid, img.size())
    }

    /// Order candidates into the marker grid.
    ///
    /// The best `columns * rows` candidates by score are split into row bands
    /// by y, and each band is ordered by x. The move-search regions are reset
    /// to boxes around the top-left and top-right markers.
    pub fn sort_points(
        &mut self,
        items: &[TemplateMatchItem],
        grid: GridSize,
        img_size: ImageSize,
    ) -> Result<Vec<TemplateMatchItem>, BowtieError> {
        check_grid(grid)?;
        let expected = grid.count();
        if items.len() < expected {
            return Err(BowtieError::NotEnoughCandidates {
                found: items.len(),
                expected,
            });
        }

        let mut best = items.to_vec();
        best.sort_by(|a, b| b.score.total_cmp(&a.score));
        best.truncate(expected);
        best.sort_by(|a, b| a.point.y.total_cmp(&b.point.y));

        let rows: Vec<Vec<TemplateMatchItem>> = best
            .chunks(grid.columns)
            .map(|band| {
                let mut band = band.to_vec();
                band.sort_by(|a, b| a.point.x.total_cmp(&b.point.x));
                band
            })
            .collect();

        let half = self.move_half_size();
        let top = &rows[0];
        self.left_roi = PixelRect::centered_clamped(top[0].point, half, img_size);
        self.right_roi = PixelRect::centered_clamped(top[grid.columns - 1].point, half, img_size);
        debug!(
            "sorted {}x{} grid, move regions {:?} / {:?}",
            grid.columns, grid.rows, self.left_roi, self.right_roi
        );

        let flat = rows.iter().flatten().copied().collect();
        self.found_grid = rows;
        Ok(flat)
    }

    fn move_half_size(&self) -> i32 {
        let requested = self.params.move_search_half_size;
        self.template_dim()
            .map_or(requested, |d| move_search_half_size(d, requested))
    }

    /// Rows of the grid found by the last successful `find_targets`.
    pub fn found_grid(&self) -> &[Vec<TemplateMatchItem>] {
        &self.found_grid
    }

    /// Marker centers of the last found grid, row-major.
    pub fn found_points(&self) -> Result<Vec<Point2<f64>>, BowtieError> {
        if self.found_grid.is_empty() {
            return Err(BowtieError::NoGrid);
        }
        Ok(self.found_grid.iter().flatten().map(|m| m.point).collect())
    }

    /// Replace one move-search region. Rejected regions leave the bank unchanged.
    pub fn set_move_target_roi(
        &mut self,
        img_size: ImageSize,
        rect: PixelRect,
        side: Side,
    ) -> Result<(), BowtieError> {
        if !rect.fits_in(img_size) {
            return Err(BowtieError::InvalidRoi { side, rect });
        }
        match side {
            Side::Left => self.left_roi = rect,
            Side::Right => self.right_roi = rect,
        }
        Ok(())
    }

    /// `(left, right)` move-search regions.
    pub fn move_target_rois(&self) -> (PixelRect, PixelRect) {
        (self.left_roi, self.right_roi)
    }

    /// Re-locate the two move-reference markers inside their search regions.
    ///
    /// Everything outside the two regions is blanked before matching, so
    /// exactly one marker is expected per region. Two peaks inside the same
    /// region fail with [`BowtieError::MoveTargetRegion`].
    #[cfg_attr(
        feature = "tracing",
        instrument(level = "info", skip(self, img), fields(width = img.width, height = img.height))
    )]
    pub fn find_move_targets(&mut self, img: &GrayImageView<'_>) -> Result<MoveTargets, BowtieError> {
        self.require_dim()?;
        check_min_score(self.params.coarse_min_score, MATCH_MIN_SCORE_FLOOR)?;
        check_min_score(self.params.refine_min_score, MATCH_MIN_SCORE_FLOOR)?;

        let mut scratch = GrayImage::new(img.width, img.height);
        for (side, rect) in [(Side::Left, self.left_roi), (Side::Right, self.right_roi)] {
            let patch =
                GrayImage::crop(img, rect).ok_or(BowtieError::InvalidRoi { side, rect })?;
            scratch.paste(&patch.view(), rect.x, rect.y);
        }
        let scratch = scratch.view();

        let mut found =
            self.coarse_match(center_index(), &scratch, self.params.coarse_min_score, 2)?;
        if found.len() != 2 {
            warn!("move target search found {} markers", found.len());
            return Err(BowtieError::MoveTargetCount(found.len()));
        }

        let refine_min = self.params.refine_min_score;
        for item in found.iter_mut() {
            for index in 0..TEMPLATE_COUNT {
                self.refine_one(index, &scratch, refine_min, item)?;
            }
        }

        let (a, b) = (found[0].point, found[1].point);
        let (left, right) = match (self.left_roi.contains(a), self.left_roi.contains(b)) {
            (true, false) => (a, b),
            (false, true) => (b, a),
            (both, _) => {
                let found = if both { 2 } else { 0 };
                warn!("{found} move targets inside the left search region");
                return Err(BowtieError::MoveTargetRegion {
                    side: Side::Left,
                    found,
                });
            }
        };
        if !self.right_roi.contains(right) {
            warn!("no move target inside the right search region");
            return Err(BowtieError::MoveTargetRegion {
                side: Side::Right,
                found: 0,
            });
        }
        let targets = MoveTargets { left, right };
        debug!(
            "move targets left=({:.2}, {:.2}) right=({:.2}, {:.2})",
            targets.left.x, targets.left.y, targets.right.x, targets.right.y
        );
        Ok(targets)
    }
}
