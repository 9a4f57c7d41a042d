use crate::core::settings::GuardLineSettings;
use crate::core::video::SampleGrid;

/// A line just outside a detected border that must stay black.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardLine {
    Row { y: u32, from: u32, to: u32 },
    Column { x: u32, from: u32, to: u32 },
}

impl GuardLine {
    /// Guard for the top bar. `None` when there is no bar.
    pub fn above(first_image_row: u32, from: u32, to: u32, settings: &GuardLineSettings) -> Option<Self> {
        (first_image_row > 0).then(|| GuardLine::Row {
            y: first_image_row.saturating_sub(settings.edge_tolerance_px.max(1)),
            from,
            to,
        })
    }

    pub fn below(last_image_row: u32, height: u32, from: u32, to: u32, settings: &GuardLineSettings) -> Option<Self> {
        (last_image_row + 1 < height).then(|| GuardLine::Row {
            y: (last_image_row + settings.edge_tolerance_px.max(1)).min(height - 1),
            from,
            to,
        })
    }

    pub fn left_of(first_image_col: u32, from: u32, to: u32, settings: &GuardLineSettings) -> Option<Self> {
        (first_image_col > 0).then(|| GuardLine::Column {
            x: first_image_col.saturating_sub(settings.edge_tolerance_px.max(1)),
            from,
            to,
        })
    }

    pub fn right_of(last_image_col: u32, width: u32, from: u32, to: u32, settings: &GuardLineSettings) -> Option<Self> {
        (last_image_col + 1 < width).then(|| GuardLine::Column {
            x: (last_image_col + settings.edge_tolerance_px.max(1)).min(width - 1),
            from,
            to,
        })
    }

    /// Share of non-black pixels, ignoring the configured margin at both ends.
    pub fn image_fraction(&self, grid: &SampleGrid, limit: u16, settings: &GuardLineSettings) -> f64 {
        let (from, to) = match *self {
            GuardLine::Row { from, to, .. } | GuardLine::Column { from, to, .. } => (from, to),
        };
        if to <= from {
            return 0.0;
        }
        let margin = ((to - from) as f64 * settings.ignore_edge_margin) as u32;
        let (lo, hi) = (from + margin, to - margin);
        if hi <= lo {
            return 0.0;
        }

        let image = (lo..hi)
            .filter(|&p| match *self {
                GuardLine::Row { y, .. } => !grid.is_black(p, y, limit),
                GuardLine::Column { x, .. } => !grid.is_black(x, p, limit),
            })
            .count();
        image as f64 / (hi - lo) as f64
    }

    pub fn is_violated(&self, grid: &SampleGrid, limit: u16, settings: &GuardLineSettings) -> bool {
        settings.enabled && self.image_fraction(grid, limit, settings) > settings.image_test_threshold
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 100x100 black grid with row 10 lit between `from` and `to`.
    fn grid_with_lit_row(from: u32, to: u32) -> SampleGrid {
        let mut data = vec![0u8; 100 * 100 * 4];
        for x in from..to {
            let idx = ((10 * 100 + x) * 4) as usize;
            data[idx..idx + 4].copy_from_slice(&[200, 200, 200, 255]);
        }
        SampleGrid::from_rgba(100, 100, 100, 100, data).unwrap()
    }

    #[test]
    fn test_guard_positions() {
        let settings = GuardLineSettings::default();
        assert_eq!(
            GuardLine::above(12, 0, 100, &settings),
            Some(GuardLine::Row { y: 10, from: 0, to: 100 })
        );
        assert_eq!(GuardLine::above(0, 0, 100, &settings), None);
        assert_eq!(
            GuardLine::below(89, 100, 0, 100, &settings),
            Some(GuardLine::Row { y: 91, from: 0, to: 100 })
        );
        assert_eq!(GuardLine::below(99, 100, 0, 100, &settings), None);
        assert_eq!(
            GuardLine::right_of(98, 100, 0, 100, &settings),
            Some(GuardLine::Column { x: 99, from: 0, to: 100 })
        );
    }

    #[test]
    fn test_margins_are_ignored() {
        let settings = GuardLineSettings::default();
        let guard = GuardLine::Row { y: 10, from: 0, to: 100 };

        // lit only inside the ignored 20% margins
        let grid = grid_with_lit_row(0, 20);
        assert_eq!(guard.image_fraction(&grid, 26, &settings), 0.0);
        assert!(!guard.is_violated(&grid, 26, &settings));

        let grid = grid_with_lit_row(40, 55);
        assert!((guard.image_fraction(&grid, 26, &settings) - 0.25).abs() < 1e-9);
        assert!(guard.is_violated(&grid, 26, &settings));
    }

    #[test]
    fn test_disabled_guard_never_violates() {
        let settings = GuardLineSettings {
            enabled: false,
            ..GuardLineSettings::default()
        };
        let grid = grid_with_lit_row(0, 100);
        assert!(!GuardLine::Row { y: 10, from: 0, to: 100 }.is_violated(&grid, 26, &settings));
    }
}
