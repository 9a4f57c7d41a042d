use log::{debug, info};
use std::time::{Duration, Instant};

use crate::ar_detector::AutoDisableReason;
use crate::core::settings::ArDetectSettings;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    Playing,
    Paused,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Running(PlaybackState),
    /// Terminal until the video source changes
    AutoDisabled(AutoDisableReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerEvent {
    Playback(PlaybackState),
    AutoDisable(AutoDisableReason),
    Reset,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerAction {
    Continue,
    /// Re-check right away, the cadence changed
    Reschedule,
    Stop,
}

impl SchedulerState {
    pub fn new() -> Self {
        SchedulerState::Running(PlaybackState::Playing)
    }

    pub fn transition(&self, event: SchedulerEvent) -> (SchedulerState, SchedulerAction) {
        match (self, event) {
            (_, SchedulerEvent::Reset) => (
                SchedulerState::Running(PlaybackState::Playing),
                SchedulerAction::Reschedule,
            ),
            (SchedulerState::AutoDisabled(reason), _) => {
                (SchedulerState::AutoDisabled(*reason), SchedulerAction::Stop)
            }
            (SchedulerState::Running(_), SchedulerEvent::AutoDisable(reason)) => {
                (SchedulerState::AutoDisabled(reason), SchedulerAction::Stop)
            }
            (SchedulerState::Running(current), SchedulerEvent::Playback(next)) => {
                if *current == next {
                    (*self, SchedulerAction::Continue)
                } else if next == PlaybackState::Playing {
                    (SchedulerState::Running(next), SchedulerAction::Reschedule)
                } else {
                    (SchedulerState::Running(next), SchedulerAction::Continue)
                }
            }
        }
    }
}

impl Default for SchedulerState {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone)]
pub struct ScheduleConfig {
    pub playing: Duration,
    pub paused: Duration,
    pub error: Duration,
    pub minimum_timeout: Duration,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self::from_settings(&ArDetectSettings::default())
    }
}

impl ScheduleConfig {
    pub fn from_settings(settings: &ArDetectSettings) -> Self {
        Self {
            playing: settings.timer_playing(),
            paused: settings.timer_paused(),
            error: settings.timer_error(),
            minimum_timeout: settings.timer_minimum_timeout(),
        }
    }

    fn interval(&self, playback: PlaybackState) -> Duration {
        match playback {
            PlaybackState::Playing => self.playing,
            PlaybackState::Paused => self.paused,
            PlaybackState::Error => self.error,
        }
    }
}

/// Decides when the next detection cycle may start.
pub struct DetectionScheduler {
    state: SchedulerState,
    config: ScheduleConfig,
    gated: bool,
    immediate: bool,
    last_start: Option<Instant>,
    cycle_counter: u64,
}

impl DetectionScheduler {
    pub fn new() -> Self {
        Self::with_config(ScheduleConfig::default())
    }

    pub fn with_config(config: ScheduleConfig) -> Self {
        Self {
            state: SchedulerState::new(),
            config,
            gated: false,
            immediate: false,
            last_start: None,
            cycle_counter: 0,
        }
    }

    fn apply(&mut self, event: SchedulerEvent) -> SchedulerAction {
        let (new_state, action) = self.state.transition(event);
        if new_state != self.state {
            debug!("scheduler {:?} -> {:?}", self.state, new_state);
        }
        self.state = new_state;
        if action == SchedulerAction::Reschedule {
            self.immediate = true;
        }
        action
    }

    pub fn set_playback_state(&mut self, playback: PlaybackState) -> SchedulerAction {
        self.apply(SchedulerEvent::Playback(playback))
    }

    pub fn auto_disable(&mut self, reason: AutoDisableReason) {
        self.apply(SchedulerEvent::AutoDisable(reason));
    }

    /// New video: leaves the terminal state and starts over.
    pub fn reset(&mut self) {
        info!("🔄 detection scheduler reset");
        self.apply(SchedulerEvent::Reset);
        self.last_start = None;
        self.cycle_counter = 0;
    }

    /// No cycles while the player geometry is disabled.
    pub fn set_gated(&mut self, gated: bool) {
        self.gated = gated;
    }

    /// Still honours the minimum timeout.
    pub fn request_immediate(&mut self) {
        self.immediate = true;
    }

    /// Time until the next cycle may start, `None` when none will.
    pub fn next_delay(&self, now: Instant) -> Option<Duration> {
        let SchedulerState::Running(playback) = self.state else {
            return None;
        };
        if self.gated {
            return None;
        }
        let Some(last) = self.last_start else {
            return Some(Duration::ZERO);
        };

        let wait = if self.immediate {
            self.config.minimum_timeout
        } else {
            self.config.interval(playback).max(self.config.minimum_timeout)
        };
        Some((last + wait).saturating_duration_since(now))
    }

    /// Marks a cycle as started if one is due at `now`.
    pub fn try_start(&mut self, now: Instant) -> bool {
        if self.next_delay(now) != Some(Duration::ZERO) {
            return false;
        }
        self.last_start = Some(now);
        self.immediate = false;
        self.cycle_counter += 1;
        true
    }

    pub fn current_state(&self) -> &SchedulerState {
        &self.state
    }

    pub fn is_auto_disabled(&self) -> bool {
        matches!(self.state, SchedulerState::AutoDisabled(_))
    }

    pub fn cycle_count(&self) -> u64 {
        self.cycle_counter
    }
}

impl Default for DetectionScheduler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    #[test]
    fn test_intervals_follow_playback_state() {
        let mut scheduler = DetectionScheduler::new();
        let t0 = Instant::now();

        assert!(scheduler.try_start(t0));
        assert_eq!(scheduler.next_delay(t0), Some(ms(666)));
        assert!(!scheduler.try_start(t0 + ms(665)));
        assert!(scheduler.try_start(t0 + ms(666)));

        let t1 = t0 + ms(666);
        scheduler.set_playback_state(PlaybackState::Paused);
        assert_eq!(scheduler.next_delay(t1), Some(ms(3000)));

        scheduler.set_playback_state(PlaybackState::Error);
        assert_eq!(scheduler.next_delay(t1 + ms(1000)), Some(ms(2000)));
    }

    #[test]
    fn test_resume_playing_rechecks_after_minimum_timeout() {
        let mut scheduler = DetectionScheduler::new();
        let t0 = Instant::now();
        scheduler.set_playback_state(PlaybackState::Paused);
        assert!(scheduler.try_start(t0));

        let action = scheduler.set_playback_state(PlaybackState::Playing);
        assert_eq!(action, SchedulerAction::Reschedule);
        assert_eq!(scheduler.next_delay(t0 + ms(1)), Some(ms(4)));
        assert!(scheduler.try_start(t0 + ms(5)));
    }

    #[test]
    fn test_immediate_request_respects_minimum_timeout() {
        let mut scheduler = DetectionScheduler::new();
        let t0 = Instant::now();
        assert!(scheduler.try_start(t0));

        scheduler.request_immediate();
        assert!(!scheduler.try_start(t0 + ms(2)));
        assert!(scheduler.try_start(t0 + ms(5)));
        // back to the regular cadence afterwards
        assert_eq!(scheduler.next_delay(t0 + ms(5)), Some(ms(666)));
    }

    #[test]
    fn test_gating_stops_cycles() {
        let mut scheduler = DetectionScheduler::new();
        let t0 = Instant::now();
        scheduler.set_gated(true);
        assert_eq!(scheduler.next_delay(t0), None);
        assert!(!scheduler.try_start(t0));

        scheduler.set_gated(false);
        assert!(scheduler.try_start(t0));
    }

    #[test]
    fn test_auto_disabled_is_terminal_until_reset() {
        let mut scheduler = DetectionScheduler::new();
        let t0 = Instant::now();
        scheduler.auto_disable(AutoDisableReason::TooSlow);

        assert!(scheduler.is_auto_disabled());
        assert_eq!(scheduler.set_playback_state(PlaybackState::Playing), SchedulerAction::Stop);
        scheduler.request_immediate();
        assert_eq!(scheduler.next_delay(t0 + ms(10_000)), None);
        assert!(!scheduler.try_start(t0 + ms(10_000)));

        scheduler.reset();
        assert_eq!(
            *scheduler.current_state(),
            SchedulerState::Running(PlaybackState::Playing)
        );
        assert!(scheduler.try_start(t0 + ms(10_000)));
    }

    #[test]
    fn test_transition_table() {
        let running = SchedulerState::Running(PlaybackState::Playing);
        assert_eq!(
            running.transition(SchedulerEvent::Playback(PlaybackState::Playing)),
            (running, SchedulerAction::Continue)
        );
        assert_eq!(
            running.transition(SchedulerEvent::AutoDisable(AutoDisableReason::ThresholdExceeded)),
            (
                SchedulerState::AutoDisabled(AutoDisableReason::ThresholdExceeded),
                SchedulerAction::Stop
            )
        );
    }
}
