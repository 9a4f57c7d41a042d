use rand::rngs::StdRng;
use rand::Rng;
use rayon::prelude::*;

use crate::core::settings::EdgeDetectionSettings;
use crate::core::video::SampleGrid;

/// Which lines are scanned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    /// Scan columns top to bottom, for letterbox bars
    Columns,
    /// Scan rows left to right, for pillarbox bars
    Rows,
}

impl Axis {
    /// Number of pixels along one scanned line.
    pub fn line_length(&self, grid: &SampleGrid) -> u32 {
        match self {
            Axis::Columns => grid.height,
            Axis::Rows => grid.width,
        }
    }

    fn is_black(&self, grid: &SampleGrid, line: u32, pos: u32, limit: u16) -> bool {
        match self {
            Axis::Columns => grid.is_black(line, pos, limit),
            Axis::Rows => grid.is_black(pos, line, limit),
        }
    }
}

/// First and last image pixel found on one line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LineEdges {
    pub start: Option<u32>,
    pub end: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EdgeCandidate {
    pub position: u32,
    /// Share of all scanned lines agreeing on this edge
    pub fraction: f64,
}

/// `static_count` evenly spaced positions in `lo..=hi`, plus `random_count` random ones.
pub fn select_lines(lo: u32, hi: u32, static_count: u32, random_count: u32, rng: &mut StdRng) -> Vec<u32> {
    if hi < lo {
        return Vec::new();
    }
    let span = (hi - lo) as u64;
    let mut lines: Vec<u32> = (1..=static_count as u64)
        .map(|i| lo + (i * span / (static_count as u64 + 1)) as u32)
        .collect();
    lines.extend((0..random_count).map(|_| rng.gen_range(lo..=hi)));
    lines.sort_unstable();
    lines.dedup();
    lines
}

/// Scans every line from both ends towards the ignored middle band.
pub fn scan_lines(
    grid: &SampleGrid,
    axis: Axis,
    lines: &[u32],
    limit: u16,
    settings: &EdgeDetectionSettings,
) -> Vec<LineEdges> {
    lines
        .par_iter()
        .map(|&line| scan_line(grid, axis, line, limit, settings))
        .collect()
}

fn scan_line(
    grid: &SampleGrid,
    axis: Axis,
    line: u32,
    limit: u16,
    settings: &EdgeDetectionSettings,
) -> LineEdges {
    let len = axis.line_length(grid);
    let band = (len as f64 * settings.middle_ignored_area / 2.0) as u32;
    let mid = len / 2;
    let band_start = mid.saturating_sub(band);
    let band_end = (mid + band).min(len.saturating_sub(1));

    let window = settings.sample_width.max(1);
    let needed = settings.detection_threshold.max(1);
    let image = |pos: u32| !axis.is_black(grid, line, pos, limit);

    let start = (0..band_start).find(|&pos| {
        image(pos) && {
            let stop = (pos + window).min(len);
            (pos..stop).filter(|&p| image(p)).count() as u32 >= needed
        }
    });

    let end = (band_end + 1..len).rev().find(|&pos| {
        image(pos) && {
            let from = (pos + 1).saturating_sub(window);
            (from..=pos).filter(|&p| image(p)).count() as u32 >= needed
        }
    });

    LineEdges { start, end }
}

/// Clusters edges and returns the outermost cluster not dismissed as a logo.
///
/// `from_start` picks the smallest position, otherwise the largest.
pub fn pick_edge(
    edges: impl Iterator<Item = Option<u32>>,
    total_lines: usize,
    from_start: bool,
    settings: &EdgeDetectionSettings,
) -> Option<EdgeCandidate> {
    if total_lines == 0 {
        return None;
    }

    let mut positions: Vec<u32> = edges.flatten().collect();
    positions.sort_unstable();
    if !from_start {
        positions.reverse();
    }

    let tolerance = settings.edge_tolerance_px;
    let mut i = 0;
    while i < positions.len() {
        let anchor = positions[i];
        let size = positions[i..]
            .iter()
            .take_while(|&&p| p.abs_diff(anchor) <= tolerance)
            .count();

        let fraction = size as f64 / total_lines as f64;
        if fraction > settings.logo_threshold {
            return Some(EdgeCandidate {
                position: anchor,
                fraction,
            });
        }
        i += size;
    }

    None
}
