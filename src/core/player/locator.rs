use log::{debug, trace, warn};

use crate::core::player::element::{
    equalish, AutoScoreDetails, ElementHandle, ElementSnapshot, ElementStackEntry,
};
use crate::core::player::selector::SelectorSet;
use crate::core::settings::{SettingsError, SiteSettings};

const AUTO_BASE_SCORE: f64 = 1000.0;
const AUTO_SIZE_TOLERANCE: f64 = 5.0;
const SIZE_PENALTY_MULTIPLIER: f64 = 0.1;
const PER_LEVEL_PENALTY: f64 = 10.0;
const QS_BASE_SCORE: f64 = 100.0;
const QS_SIZE_BONUS: f64 = 75.0;
const QS_SIZE_TOLERANCE: f64 = 2.0;

#[derive(Debug, Clone, PartialEq)]
pub enum ManualPlayerSelection {
    /// Index into the ancestor chain, 0 being the video itself
    AncestorIndex(usize),
    Selectors(SelectorSet),
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum LocatorMode {
    #[default]
    Automatic,
    Manual(ManualPlayerSelection),
}

impl LocatorMode {
    /// Picks the mode once from the site's DOM settings.
    ///
    /// Manual mode without a usable ancestor index or selector list falls
    /// back to automatic. Unparseable selectors are reported as errors.
    pub fn from_site(site: Option<&SiteSettings>) -> Result<Self, SettingsError> {
        let Some(player) = site.and_then(|s| s.player_dom()) else {
            return Ok(LocatorMode::Automatic);
        };
        if !player.manual {
            return Ok(LocatorMode::Automatic);
        }

        if player.use_relative_ancestor {
            if let Some(index) = player.video_ancestor.filter(|i| *i > 0) {
                return Ok(LocatorMode::Manual(ManualPlayerSelection::AncestorIndex(index)));
            }
        }

        match player.query_selectors.as_deref().map(str::trim) {
            Some(qs) if !qs.is_empty() => Ok(LocatorMode::Manual(
                ManualPlayerSelection::Selectors(SelectorSet::parse(qs)?),
            )),
            _ => Ok(LocatorMode::Automatic),
        }
    }
}

/// Finds the element that visually represents the player among the video's ancestors.
pub struct PlayerElementLocator {
    mode: LocatorMode,
    verbose: bool,
    element_stack: Vec<ElementStackEntry>,
}

impl PlayerElementLocator {
    pub fn new() -> Self {
        Self::with_mode(LocatorMode::Automatic)
    }

    pub fn with_mode(mode: LocatorMode) -> Self {
        Self {
            mode,
            verbose: false,
            element_stack: Vec::new(),
        }
    }

    /// Also run automatic scoring in manual mode so the heuristics are complete.
    pub fn set_verbose(&mut self, verbose: bool) {
        self.verbose = verbose;
    }

    pub fn mode(&self) -> &LocatorMode {
        &self.mode
    }

    /// `chain[0]` is the video surface, followed by its ancestors up to the root.
    pub fn locate(&mut self, chain: Vec<ElementSnapshot>) -> Option<ElementHandle> {
        self.element_stack = chain.into_iter().map(ElementStackEntry::from_snapshot).collect();

        let Some(video) = self.element_stack.first() else {
            warn!("⚠️ empty ancestor chain, no player to locate");
            return None;
        };
        let (video_w, video_h) = (video.width(), video.height());

        let manual = match self.mode.clone() {
            LocatorMode::Automatic => None,
            LocatorMode::Manual(ManualPlayerSelection::AncestorIndex(index)) => {
                self.by_ancestor_index(index)
            }
            LocatorMode::Manual(ManualPlayerSelection::Selectors(selectors)) => {
                self.by_selectors(&selectors, video_w, video_h)
            }
        };

        if let Some(handle) = manual {
            if self.verbose {
                self.score_automatic(video_w, video_h);
            }
            debug!("player located manually: {:?}", handle);
            return Some(handle);
        }

        if matches!(self.mode, LocatorMode::Manual(_)) {
            debug!("manual player selection found nothing, using automatic mode");
        }

        let found = self.score_automatic(video_w, video_h);
        debug!("player located automatically: {:?}", found);
        found
    }

    /// Snapshot from the last [`locate`](Self::locate) call.
    pub fn element_stack(&self) -> &[ElementStackEntry] {
        &self.element_stack
    }

    pub fn element_stack_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.element_stack)
    }

    fn by_ancestor_index(&mut self, index: usize) -> Option<ElementHandle> {
        let entry = self.element_stack.get_mut(index)?;
        entry.heuristics.manual_element_by_parent_index = true;
        if !entry.has_valid_size() {
            entry.heuristics.invalid_size = true;
            return None;
        }
        Some(entry.handle())
    }

    fn by_selectors(
        &mut self,
        selectors: &SelectorSet,
        video_w: f64,
        video_h: f64,
    ) -> Option<ElementHandle> {
        let mut match_index = 0.0;
        let mut best: Option<(f64, ElementHandle)> = None;

        for entry in self.element_stack.iter_mut() {
            if !selectors.matches(&entry.element) {
                continue;
            }

            let (w, h) = (entry.width(), entry.height());
            let mut score = QS_BASE_SCORE;
            if (w >= video_w && equalish(h, video_h, QS_SIZE_TOLERANCE))
                || (h >= video_h && equalish(w, video_w, QS_SIZE_TOLERANCE))
            {
                score += QS_SIZE_BONUS;
            }
            score -= PER_LEVEL_PENALTY * match_index;
            match_index += 1.0;

            entry.heuristics.qs_score = Some(score);

            if !entry.has_valid_size() {
                entry.heuristics.invalid_size = true;
                continue;
            }
            if best.map_or(true, |(s, _)| score > s) {
                best = Some((score, entry.handle()));
            }
        }

        best.map(|(_, handle)| handle)
    }

    fn score_automatic(&mut self, video_w: f64, video_h: f64) -> Option<ElementHandle> {
        let mut depth: u32 = 1;
        let mut best: Option<(f64, ElementHandle)> = None;

        // index 0 is the video itself
        for entry in self.element_stack.iter_mut().skip(1) {
            if !entry.has_valid_size() {
                entry.heuristics.invalid_size = true;
                continue;
            }

            let (w, h) = (entry.width(), entry.height());
            if !(equalish(h, video_h, AUTO_SIZE_TOLERANCE) || equalish(w, video_w, AUTO_SIZE_TOLERANCE))
            {
                continue;
            }

            let diff_x = w - video_w;
            let diff_y = h - video_h;

            let mut size_penalty = 1.0;
            if diff_y > AUTO_SIZE_TOLERANCE {
                size_penalty *= diff_y * SIZE_PENALTY_MULTIPLIER;
            }
            if diff_x > AUTO_SIZE_TOLERANCE {
                size_penalty *= diff_x * SIZE_PENALTY_MULTIPLIER;
            }

            let score = AUTO_BASE_SCORE - size_penalty - PER_LEVEL_PENALTY * depth as f64;
            trace!(
                "candidate <{}> {}x{} score {:.1} (penalty {:.1}, depth {})",
                entry.element.tag_name, w, h, score, size_penalty, depth
            );

            entry.auto_score = Some(score);
            entry.heuristics.auto_score_details = Some(AutoScoreDetails {
                player_size_penalty: size_penalty,
                diff_x,
                diff_y,
                penalty_multiplier: depth,
            });
            depth += 1;

            if best.map_or(true, |(s, _)| score > s) {
                best = Some((score, entry.handle()));
            }
        }

        best.map(|(_, handle)| handle)
    }
}

impl Default for PlayerElementLocator {
    fn default() -> Self {
        Self::new()
    }
}
