use log::debug;
use serde::Serialize;

use crate::core::settings::SizePolicy;

/// Size changes smaller than this on both axes are ignored.
pub const GEOMETRY_TOLERANCE: f64 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Viewport {
    pub screen_width: f64,
    pub screen_height: f64,
    pub inner_width: f64,
    pub inner_height: f64,
}

impl Viewport {
    pub fn new(screen_width: f64, screen_height: f64, inner_width: f64, inner_height: f64) -> Self {
        Self {
            screen_width,
            screen_height,
            inner_width,
            inner_height,
        }
    }

    pub fn is_fullscreen(&self) -> bool {
        (self.screen_width - self.inner_width).abs() < GEOMETRY_TOLERANCE
            && (self.screen_height - self.inner_height).abs() < GEOMETRY_TOLERANCE
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerGeometry {
    pub width: f64,
    pub height: f64,
    pub is_fullscreen: bool,
}

impl PlayerGeometry {
    /// Differs by at least the tolerance on an axis, or in fullscreen state.
    pub fn differs_from(&self, other: &PlayerGeometry) -> bool {
        self.is_fullscreen != other.is_fullscreen
            || (self.width - other.width).abs() >= GEOMETRY_TOLERANCE
            || (self.height - other.height).abs() >= GEOMETRY_TOLERANCE
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DisabledReason {
    TooSmall,
    NotFullscreen,
    ManuallyDisabled,
    PlayerNotFound,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum GeometryState {
    Active,
    Disabled(DisabledReason),
}

impl GeometryState {
    pub fn is_active(&self) -> bool {
        matches!(self, GeometryState::Active)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GeometryChange {
    pub previous: Option<PlayerGeometry>,
    pub current: Option<PlayerGeometry>,
    pub state: GeometryState,
    /// The resizer should re-apply the current aspect ratio
    pub restore_aspect_ratio: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome {
    NoChange,
    Changed(GeometryChange),
}

/// Decides when player geometry changed enough to matter and whether the
/// engine may run for the current player.
pub struct GeometryTracker {
    policy: SizePolicy,
    use_player_ar_in_fullscreen: bool,
    manually_disabled: bool,
    geometry: Option<PlayerGeometry>,
    /// Baseline for change detection, moves only when a change is reported
    reported: Option<PlayerGeometry>,
    player_size: Option<(f64, f64)>,
    state: Option<GeometryState>,
}

impl GeometryTracker {
    pub fn new(policy: SizePolicy, use_player_ar_in_fullscreen: bool) -> Self {
        Self {
            policy,
            use_player_ar_in_fullscreen,
            manually_disabled: false,
            geometry: None,
            reported: None,
            player_size: None,
            state: None,
        }
    }

    /// Takes effect on the next [`poll`](Self::poll).
    pub fn set_manually_disabled(&mut self, disabled: bool) {
        self.manually_disabled = disabled;
    }

    pub fn poll(&mut self, player_size: Option<(f64, f64)>, viewport: &Viewport) -> PollOutcome {
        let is_fullscreen = viewport.is_fullscreen();

        let current = player_size.map(|(width, height)| {
            if is_fullscreen {
                PlayerGeometry {
                    width: viewport.inner_width,
                    height: viewport.inner_height,
                    is_fullscreen,
                }
            } else {
                PlayerGeometry {
                    width,
                    height,
                    is_fullscreen,
                }
            }
        });

        let state = self.evaluate(current.as_ref());
        self.geometry = current;
        self.player_size = player_size;
        let previous = self.reported;
        let previous_state = self.state.replace(state);

        let restore_aspect_ratio = match (previous_state, state) {
            (Some(GeometryState::Active), GeometryState::Active) => {
                match (previous.as_ref(), current.as_ref()) {
                    (Some(prev), Some(cur)) if !cur.differs_from(prev) => return PollOutcome::NoChange,
                    _ => true,
                }
            }
            (_, GeometryState::Active) => true,
            (prev, GeometryState::Disabled(_)) if prev == Some(state) => {
                return PollOutcome::NoChange;
            }
            (_, GeometryState::Disabled(_)) => false,
        };

        debug!(
            "player geometry {:?} -> {:?}, state {:?}",
            previous, current, state
        );
        self.reported = current;

        PollOutcome::Changed(GeometryChange {
            previous,
            current,
            state,
            restore_aspect_ratio,
        })
    }

    fn evaluate(&self, geometry: Option<&PlayerGeometry>) -> GeometryState {
        if self.manually_disabled {
            return GeometryState::Disabled(DisabledReason::ManuallyDisabled);
        }
        let Some(geometry) = geometry else {
            return GeometryState::Disabled(DisabledReason::PlayerNotFound);
        };
        if geometry.is_fullscreen {
            return GeometryState::Active;
        }
        if !self.policy.disable_on_small_players {
            return GeometryState::Active;
        }
        if self.policy.only_allow_in_fullscreen {
            return GeometryState::Disabled(DisabledReason::NotFullscreen);
        }
        if geometry.width < self.policy.min_allowed_width
            || geometry.height < self.policy.min_allowed_height
        {
            return GeometryState::Disabled(DisabledReason::TooSmall);
        }
        GeometryState::Active
    }

    pub fn geometry(&self) -> Option<&PlayerGeometry> {
        self.geometry.as_ref()
    }

    pub fn state(&self) -> Option<GeometryState> {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state.map_or(false, |s| s.is_active())
    }

    /// Width / height of the area the video is fitted into.
    pub fn aspect_ratio(&self) -> Option<f64> {
        let geometry = self.geometry?;
        let (w, h) = if geometry.is_fullscreen && self.use_player_ar_in_fullscreen {
            self.player_size?
        } else {
            (geometry.width, geometry.height)
        };
        if w <= 0.0 || h <= 0.0 {
            return None;
        }
        Some(w / h)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn windowed() -> Viewport {
        Viewport::new(1920.0, 1080.0, 1600.0, 900.0)
    }

    fn fullscreen() -> Viewport {
        Viewport::new(1920.0, 1080.0, 1918.0, 1080.0)
    }

    fn small_player_policy() -> SizePolicy {
        SizePolicy {
            disable_on_small_players: true,
            ..SizePolicy::default()
        }
    }

    #[test]
    fn test_first_poll_activates_and_restores() {
        let mut tracker = GeometryTracker::new(SizePolicy::default(), false);
        match tracker.poll(Some((1280.0, 720.0)), &windowed()) {
            PollOutcome::Changed(change) => {
                assert_eq!(change.state, GeometryState::Active);
                assert!(change.restore_aspect_ratio);
                assert!(change.previous.is_none());
            }
            other => panic!("expected change, got {:?}", other),
        }
        assert!(tracker.is_active());
    }

    #[test]
    fn test_small_deltas_are_no_change() {
        let mut tracker = GeometryTracker::new(SizePolicy::default(), false);
        tracker.poll(Some((1280.0, 720.0)), &windowed());

        for (w, h) in [(1284.0, 720.0), (1281.0, 723.0), (1280.0, 719.0)] {
            assert_eq!(tracker.poll(Some((w, h)), &windowed()), PollOutcome::NoChange);
        }

        match tracker.poll(Some((1290.0, 720.0)), &windowed()) {
            PollOutcome::Changed(change) => assert!(change.restore_aspect_ratio),
            other => panic!("expected change, got {:?}", other),
        }
    }

    #[test]
    fn test_slow_growth_is_reported() {
        let mut tracker = GeometryTracker::new(SizePolicy::default(), false);
        tracker.poll(Some((1280.0, 720.0)), &windowed());

        assert_eq!(tracker.poll(Some((1284.0, 720.0)), &windowed()), PollOutcome::NoChange);
        assert_eq!(tracker.geometry().unwrap().width, 1284.0);

        match tracker.poll(Some((1288.0, 720.0)), &windowed()) {
            PollOutcome::Changed(change) => {
                assert_eq!(change.previous.unwrap().width, 1280.0);
                assert_eq!(change.current.unwrap().width, 1288.0);
            }
            other => panic!("expected change, got {:?}", other),
        }

        // the baseline moved to 1288
        assert_eq!(tracker.poll(Some((1291.0, 720.0)), &windowed()), PollOutcome::NoChange);
    }

    #[test]
    fn test_fullscreen_is_active_for_every_policy() {
        for disable_small in [false, true] {
            for only_fullscreen in [false, true] {
                let policy = SizePolicy {
                    disable_on_small_players: disable_small,
                    only_allow_in_fullscreen: only_fullscreen,
                    min_allowed_width: 4000.0,
                    min_allowed_height: 4000.0,
                };
                let mut tracker = GeometryTracker::new(policy, false);
                tracker.poll(Some((200.0, 100.0)), &fullscreen());
                assert_eq!(tracker.state(), Some(GeometryState::Active));
                // fullscreen geometry is the window's inner size
                assert_eq!(tracker.geometry().unwrap().width, 1918.0);
            }
        }
    }

    #[test]
    fn test_policy_rules() {
        let mut tracker = GeometryTracker::new(small_player_policy(), false);
        tracker.poll(Some((320.0, 180.0)), &windowed());
        assert_eq!(
            tracker.state(),
            Some(GeometryState::Disabled(DisabledReason::TooSmall))
        );

        let policy = SizePolicy {
            only_allow_in_fullscreen: true,
            ..small_player_policy()
        };
        let mut tracker = GeometryTracker::new(policy, false);
        tracker.poll(Some((1280.0, 720.0)), &windowed());
        assert_eq!(
            tracker.state(),
            Some(GeometryState::Disabled(DisabledReason::NotFullscreen))
        );

        // without small player suppression the size limits don't apply
        let mut tracker = GeometryTracker::new(SizePolicy::default(), false);
        tracker.poll(Some((320.0, 180.0)), &windowed());
        assert!(tracker.is_active());
    }

    #[test]
    fn test_transition_into_disabled_does_not_restore() {
        let mut tracker = GeometryTracker::new(small_player_policy(), false);
        tracker.poll(Some((1280.0, 720.0)), &windowed());

        match tracker.poll(Some((400.0, 225.0)), &windowed()) {
            PollOutcome::Changed(change) => {
                assert_eq!(change.state, GeometryState::Disabled(DisabledReason::TooSmall));
                assert!(!change.restore_aspect_ratio);
            }
            other => panic!("expected change, got {:?}", other),
        }

        // still disabled: size changes are not reported
        assert_eq!(
            tracker.poll(Some((500.0, 281.0)), &windowed()),
            PollOutcome::NoChange
        );

        match tracker.poll(Some((1280.0, 720.0)), &windowed()) {
            PollOutcome::Changed(change) => assert!(change.restore_aspect_ratio),
            other => panic!("expected change, got {:?}", other),
        }
    }

    #[test]
    fn test_locator_miss_and_manual_disable() {
        let mut tracker = GeometryTracker::new(SizePolicy::default(), false);
        tracker.poll(None, &windowed());
        assert_eq!(
            tracker.state(),
            Some(GeometryState::Disabled(DisabledReason::PlayerNotFound))
        );

        tracker.set_manually_disabled(true);
        tracker.poll(Some((1280.0, 720.0)), &fullscreen());
        assert_eq!(
            tracker.state(),
            Some(GeometryState::Disabled(DisabledReason::ManuallyDisabled))
        );
    }

    #[test]
    fn test_fullscreen_toggle_is_a_change() {
        let mut tracker = GeometryTracker::new(SizePolicy::default(), false);
        tracker.poll(Some((1918.0, 1080.0)), &windowed());
        match tracker.poll(Some((1918.0, 1080.0)), &fullscreen()) {
            PollOutcome::Changed(change) => {
                assert!(change.current.unwrap().is_fullscreen);
                assert!(change.restore_aspect_ratio);
            }
            other => panic!("expected change, got {:?}", other),
        }
    }

    #[test]
    fn test_aspect_ratio_in_fullscreen() {
        let mut tracker = GeometryTracker::new(SizePolicy::default(), false);
        tracker.poll(Some((1000.0, 1000.0)), &fullscreen());
        assert!((tracker.aspect_ratio().unwrap() - 1918.0 / 1080.0).abs() < 1e-9);

        let mut tracker = GeometryTracker::new(SizePolicy::default(), true);
        tracker.poll(Some((1000.0, 1000.0)), &fullscreen());
        assert!((tracker.aspect_ratio().unwrap() - 1.0).abs() < 1e-9);
    }
}
