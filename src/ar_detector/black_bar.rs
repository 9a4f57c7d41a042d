use log::trace;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;

use crate::ar_detector::edge::{pick_edge, scan_lines, select_lines, Axis, EdgeCandidate};
use crate::ar_detector::guard_line::GuardLine;
use crate::ar_detector::text_line::is_text_row;
use crate::ar_detector::threshold::ThresholdState;
use crate::ar_detector::{DetectionResult, UncertainReason};
use crate::core::settings::{ArChangeSettings, ArDetectSettings, Settings};
use crate::core::video::SampleGrid;

/// Bar thickness on each side, in grid pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct BarBorders {
    pub top: u32,
    pub bottom: u32,
    pub left: u32,
    pub right: u32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Analysis {
    pub result: DetectionResult,
    /// Borders that passed validation, or were being validated when it failed
    pub borders: Option<BarBorders>,
    pub ratio: Option<f64>,
    /// Darkest level seen inside validated bars
    pub bar_black_level: Option<u8>,
}

impl Analysis {
    fn uncertain(reason: UncertainReason, borders: Option<BarBorders>) -> Self {
        Self {
            result: DetectionResult::Uncertain(reason),
            borders,
            ratio: None,
            bar_black_level: None,
        }
    }
}

impl BarBorders {
    /// Darkest level over the four bar regions, `None` without bars.
    pub fn darkest_level(&self, grid: &SampleGrid) -> Option<u8> {
        let (w, h) = (grid.width, grid.height);
        let content_rows = self.top..h.saturating_sub(self.bottom);
        [
            grid.darkest_level_in(0..w, 0..self.top),
            grid.darkest_level_in(0..w, h.saturating_sub(self.bottom)..h),
            grid.darkest_level_in(0..self.left, content_rows.clone()),
            grid.darkest_level_in(w.saturating_sub(self.right)..w, content_rows),
        ]
        .into_iter()
        .flatten()
        .min()
    }
}

/// Finds black bars in a sample grid and converts them into an aspect ratio.
///
/// Stateless: the same grid, threshold and previous ratio always give the
/// same answer.
pub struct BlackBarDetector {
    settings: ArDetectSettings,
    sameness_threshold: f64,
}

impl BlackBarDetector {
    pub fn new(settings: &ArDetectSettings, change: &ArChangeSettings) -> Self {
        Self {
            settings: settings.clone(),
            sameness_threshold: change.sameness_threshold,
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(&settings.ar_detect, &settings.ar_change)
    }

    pub fn detect(
        &self,
        grid: &SampleGrid,
        threshold: &ThresholdState,
        previous_ratio: Option<f64>,
    ) -> DetectionResult {
        self.analyze(grid, threshold, previous_ratio).result
    }

    pub fn analyze(
        &self,
        grid: &SampleGrid,
        threshold: &ThresholdState,
        previous_ratio: Option<f64>,
    ) -> Analysis {
        if !grid.is_valid() {
            return Analysis::uncertain(UncertainReason::InvalidFrame, None);
        }

        let s = &self.settings;
        let (w, h) = (grid.width, grid.height);
        let limit = threshold.black_limit();
        let mut rng = StdRng::seed_from_u64(grid.fingerprint());

        let static_cols = select_lines(0, w - 1, s.static_sample_cols, 0, &mut rng);
        let static_rows = select_lines(0, h - 1, s.static_sample_rows, 0, &mut rng);
        let all_black = static_cols
            .iter()
            .all(|&x| static_rows.iter().all(|&y| grid.is_black(x, y, limit)));
        if all_black {
            return Analysis::uncertain(UncertainReason::BlackFrame, None);
        }

        // letterbox
        let cols = select_lines(0, w - 1, s.static_sample_cols, s.random_sample_cols, &mut rng);
        let col_edges = scan_lines(grid, Axis::Columns, &cols, limit, &s.edge_detection);
        let mut top = pick_edge(col_edges.iter().map(|e| e.start), cols.len(), true, &s.edge_detection);
        let mut bottom = pick_edge(col_edges.iter().map(|e| e.end), cols.len(), false, &s.edge_detection);

        let offset = (s.text_line_test.test_row_offset * h as f64) as u32;
        if let Some(edge) = top {
            let row = (edge.position + offset).min(h - 1);
            if is_text_row(grid, row, limit, &s.text_line_test) {
                trace!("top edge at {} sits on a text line", edge.position);
                top = None;
            }
        }
        if let Some(edge) = bottom {
            let row = edge.position.saturating_sub(offset);
            if is_text_row(grid, row, limit, &s.text_line_test) {
                trace!("bottom edge at {} sits on a text line", edge.position);
                bottom = None;
            }
        }

        let Some((first_row, last_row)) = self.resolve_sides(top, bottom, h) else {
            return Analysis::uncertain(UncertainReason::NoConsensus, None);
        };

        let mut borders = BarBorders {
            top: first_row,
            bottom: h - 1 - last_row,
            left: 0,
            right: 0,
        };

        let guards = [
            GuardLine::above(first_row, 0, w, &s.guard_line),
            GuardLine::below(last_row, h, 0, w, &s.guard_line),
        ];
        if guards.iter().flatten().any(|g| g.is_violated(grid, limit, &s.guard_line)) {
            return Analysis::uncertain(UncertainReason::GuardLineViolation, Some(borders));
        }

        // pillarbox, scanned only across the content rows
        let rows = select_lines(first_row, last_row, s.static_sample_rows, s.random_sample_rows, &mut rng);
        let row_edges = scan_lines(grid, Axis::Rows, &rows, limit, &s.edge_detection);
        let left = pick_edge(row_edges.iter().map(|e| e.start), rows.len(), true, &s.edge_detection);
        let right = pick_edge(row_edges.iter().map(|e| e.end), rows.len(), false, &s.edge_detection);

        let (first_col, last_col) = match (left, right) {
            (Some(l), Some(r)) if r.position > l.position => (l.position, r.position),
            (Some(l), None) => (l.position, w - 1 - l.position.min(w / 2)),
            (None, Some(r)) => ((w - 1 - r.position).min(w / 2), r.position),
            _ => (0, w - 1),
        };

        let thin = s.pillar_test.ignore_thin_pillars_px;
        borders.left = if first_col < thin { 0 } else { first_col };
        borders.right = match w - 1 - last_col {
            px if px < thin => 0,
            px => px,
        };

        let pillar_guards = [
            (borders.left > 0)
                .then(|| GuardLine::left_of(borders.left, first_row, last_row + 1, &s.guard_line))
                .flatten(),
            (borders.right > 0)
                .then(|| GuardLine::right_of(w - 1 - borders.right, w, first_row, last_row + 1, &s.guard_line))
                .flatten(),
        ];
        if pillar_guards.iter().flatten().any(|g| g.is_violated(grid, limit, &s.guard_line)) {
            return Analysis::uncertain(UncertainReason::GuardLineViolation, Some(borders));
        }

        if borders.left.abs_diff(borders.right) as f64 / w as f64 > s.pillar_test.allow_misaligned {
            return Analysis::uncertain(UncertainReason::PillarMisaligned, Some(borders));
        }
        if borders.top.abs_diff(borders.bottom) as f64 / h as f64 > s.allowed_misaligned {
            return Analysis::uncertain(UncertainReason::LetterboxMisaligned, Some(borders));
        }

        let content_w = (w - borders.left - borders.right) as f64;
        let content_h = (h - borders.top - borders.bottom) as f64;
        let ratio = (grid.source_width as f64 * content_w / w as f64)
            / (grid.source_height as f64 * content_h / h as f64);

        trace!("borders {:?}, ratio {:.4}", borders, ratio);

        let result = match previous_ratio {
            Some(prev) if prev > 0.0 && (ratio - prev).abs() / prev < self.sameness_threshold => {
                DetectionResult::Unchanged
            }
            _ => DetectionResult::AspectRatioFound(ratio),
        };

        Analysis {
            result,
            borders: Some(borders),
            ratio: Some(ratio),
            bar_black_level: borders.darkest_level(grid),
        }
    }

    /// First and last image row from the surviving top/bottom evidence.
    fn resolve_sides(
        &self,
        top: Option<EdgeCandidate>,
        bottom: Option<EdgeCandidate>,
        h: u32,
    ) -> Option<(u32, u32)> {
        let single_side = self.settings.edge_detection.single_side_confirmation_threshold;

        let (first, last) = match (top, bottom) {
            (Some(t), Some(b)) => (t.position, b.position),
            (Some(t), None) if t.fraction >= single_side => (t.position, h - 1 - t.position.min(h / 2)),
            (None, Some(b)) if b.fraction >= single_side => ((h - 1 - b.position).min(h / 2), b.position),
            _ => return None,
        };

        (last > first).then_some((first, last))
    }
}
