use log::{debug, info, warn};
use serde::Serialize;
use std::time::Duration;

use crate::ar_detector::{AutoDisableReason, DetectionResult, UncertainReason};
use crate::core::settings::{ArDetectSettings, AutoDisableSettings, VariableThresholdSettings};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ThresholdState {
    pub black_level: u8,
    pub blackbar_threshold: u8,
    pub consecutive_resets: u32,
    pub consecutive_timeouts: u32,
}

impl ThresholdState {
    pub fn from_settings(settings: &ArDetectSettings) -> Self {
        Self {
            black_level: settings.black_level_default,
            blackbar_threshold: settings.blackbar_threshold,
            consecutive_resets: 0,
            consecutive_timeouts: 0,
        }
    }

    /// Channels below this value count as black.
    pub fn black_limit(&self) -> u16 {
        self.black_level as u16 + self.blackbar_threshold as u16
    }
}

impl Default for ThresholdState {
    fn default() -> Self {
        Self::from_settings(&ArDetectSettings::default())
    }
}

#[derive(Debug, Clone, Copy)]
pub struct CycleReport {
    pub result: DetectionResult,
    pub elapsed: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControllerVerdict {
    pub state: ThresholdState,
    pub auto_disabled: Option<AutoDisableReason>,
}

/// Adjusts the black threshold from cycle outcomes and decides when
/// detection should give up for the current video.
pub struct AdaptiveThresholdController {
    auto_disable: AutoDisableSettings,
    variable: VariableThresholdSettings,
    initial: ThresholdState,
    state: ThresholdState,
    disabled: Option<AutoDisableReason>,
}

impl AdaptiveThresholdController {
    pub fn new(settings: &ArDetectSettings) -> Self {
        let initial = ThresholdState::from_settings(settings);
        Self {
            auto_disable: settings.auto_disable.clone(),
            variable: settings.variable_threshold.clone(),
            initial,
            state: initial,
            disabled: None,
        }
    }

    pub fn state(&self) -> &ThresholdState {
        &self.state
    }

    pub fn disabled_reason(&self) -> Option<AutoDisableReason> {
        self.disabled
    }

    pub fn on_cycle_result(&mut self, report: &CycleReport) -> ControllerVerdict {
        if self.disabled.is_some() {
            return self.verdict();
        }

        if report.elapsed > self.auto_disable.max_execution_time() {
            self.state.consecutive_timeouts += 1;
            warn!(
                "detection cycle took {:?}, {} consecutive timeouts",
                report.elapsed, self.state.consecutive_timeouts
            );
            if self.state.consecutive_timeouts >= self.auto_disable.consecutive_timeout_count {
                self.disabled = Some(AutoDisableReason::TooSlow);
                return self.verdict();
            }
        } else {
            self.state.consecutive_timeouts = 0;
        }

        match report.result {
            DetectionResult::Uncertain(UncertainReason::GuardLineViolation) => {
                self.on_reset();
            }
            DetectionResult::AspectRatioFound(_) | DetectionResult::Unchanged => {
                self.state.consecutive_resets = 0;
            }
            _ => {}
        }

        self.verdict()
    }

    fn on_reset(&mut self) {
        self.state.consecutive_resets += 1;

        if !self.variable.enabled
            || self.state.consecutive_resets < self.variable.increase_after_consecutive_resets
        {
            return;
        }
        self.state.consecutive_resets = 0;

        let max = self.variable.max_blackbar_threshold;
        if self.state.blackbar_threshold >= max {
            if self.variable.disable_ar_detect_on_max {
                self.disabled = Some(AutoDisableReason::ThresholdExceeded);
            }
            return;
        }

        let next = self
            .state
            .blackbar_threshold
            .saturating_add(self.variable.threshold_step)
            .min(max);
        debug!(
            "raising black bar threshold {} -> {}",
            self.state.blackbar_threshold, next
        );
        self.state.blackbar_threshold = next;
    }

    /// Lowers the black level when a darker black shows up. Never raises it.
    pub fn observe_black_level(&mut self, level: u8) {
        if level < self.state.black_level {
            debug!("black level {} -> {}", self.state.black_level, level);
            self.state.black_level = level;
        }
    }

    /// New video source: back to the configured starting point.
    pub fn reset(&mut self) {
        info!("🔄 threshold controller reset");
        self.state = self.initial;
        self.disabled = None;
    }

    fn verdict(&self) -> ControllerVerdict {
        ControllerVerdict {
            state: self.state,
            auto_disabled: self.disabled,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(result: DetectionResult, elapsed_ms: u64) -> CycleReport {
        CycleReport {
            result,
            elapsed: Duration::from_millis(elapsed_ms),
        }
    }

    fn guard_violation() -> CycleReport {
        report(DetectionResult::Uncertain(UncertainReason::GuardLineViolation), 10)
    }

    #[test]
    fn test_guard_violation_counts_reset() {
        let mut controller = AdaptiveThresholdController::new(&ArDetectSettings::default());

        let verdict = controller.on_cycle_result(&guard_violation());
        assert_eq!(verdict.state.consecutive_resets, 1);
        assert_eq!(verdict.state.blackbar_threshold, 16);
        assert!(verdict.auto_disabled.is_none());

        let verdict = controller.on_cycle_result(&guard_violation());
        assert_eq!(verdict.state.consecutive_resets, 0);
        assert_eq!(verdict.state.blackbar_threshold, 24);
    }

    #[test]
    fn test_success_clears_resets() {
        let mut controller = AdaptiveThresholdController::new(&ArDetectSettings::default());
        controller.on_cycle_result(&guard_violation());
        let verdict = controller.on_cycle_result(&report(DetectionResult::Unchanged, 10));
        assert_eq!(verdict.state.consecutive_resets, 0);

        // not consecutive any more, so no increase
        controller.on_cycle_result(&guard_violation());
        assert_eq!(controller.state().blackbar_threshold, 16);
    }

    #[test]
    fn test_threshold_monotonic_and_capped() {
        let mut controller = AdaptiveThresholdController::new(&ArDetectSettings::default());
        let mut last = controller.state().blackbar_threshold;

        for i in 0..40 {
            let result = if i % 5 == 4 {
                report(DetectionResult::AspectRatioFound(1.78), 10)
            } else {
                guard_violation()
            };
            let verdict = controller.on_cycle_result(&result);
            assert!(verdict.state.blackbar_threshold >= last);
            assert!(verdict.state.blackbar_threshold <= 48);
            last = verdict.state.blackbar_threshold;
        }

        assert_eq!(last, 48);
        assert_eq!(
            controller.disabled_reason(),
            Some(AutoDisableReason::ThresholdExceeded)
        );
    }

    #[test]
    fn test_cap_without_disable_keeps_running() {
        let mut settings = ArDetectSettings::default();
        settings.variable_threshold.disable_ar_detect_on_max = false;
        let mut controller = AdaptiveThresholdController::new(&settings);

        for _ in 0..20 {
            let verdict = controller.on_cycle_result(&guard_violation());
            assert!(verdict.auto_disabled.is_none());
        }
        assert_eq!(controller.state().blackbar_threshold, 48);
    }

    #[test]
    fn test_variable_threshold_disabled() {
        let mut settings = ArDetectSettings::default();
        settings.variable_threshold.enabled = false;
        let mut controller = AdaptiveThresholdController::new(&settings);

        for _ in 0..10 {
            controller.on_cycle_result(&guard_violation());
        }
        assert_eq!(controller.state().blackbar_threshold, 16);
        assert_eq!(controller.state().consecutive_resets, 10);
    }

    #[test]
    fn test_consecutive_timeouts_disable() {
        let mut controller = AdaptiveThresholdController::new(&ArDetectSettings::default());
        let slow = report(DetectionResult::Unchanged, 6001);

        for _ in 0..4 {
            assert!(controller.on_cycle_result(&slow).auto_disabled.is_none());
        }
        let verdict = controller.on_cycle_result(&slow);
        assert_eq!(verdict.auto_disabled, Some(AutoDisableReason::TooSlow));
        assert_eq!(verdict.state.consecutive_timeouts, 5);

        // terminal until reset
        let verdict = controller.on_cycle_result(&report(DetectionResult::Unchanged, 1));
        assert_eq!(verdict.auto_disabled, Some(AutoDisableReason::TooSlow));

        controller.reset();
        assert_eq!(*controller.state(), ThresholdState::default());
        assert!(controller.disabled_reason().is_none());
    }

    #[test]
    fn test_fast_cycle_clears_timeouts() {
        let mut controller = AdaptiveThresholdController::new(&ArDetectSettings::default());
        for _ in 0..4 {
            controller.on_cycle_result(&report(DetectionResult::Unchanged, 7000));
        }
        let verdict = controller.on_cycle_result(&report(
            DetectionResult::Uncertain(UncertainReason::NoConsensus),
            100,
        ));
        assert_eq!(verdict.state.consecutive_timeouts, 0);
        assert!(verdict.auto_disabled.is_none());
    }

    #[test]
    fn test_black_level_only_lowers() {
        let mut controller = AdaptiveThresholdController::new(&ArDetectSettings::default());
        controller.observe_black_level(30);
        assert_eq!(controller.state().black_level, 10);
        controller.observe_black_level(2);
        assert_eq!(controller.state().black_level, 2);
        assert_eq!(controller.state().black_limit(), 18);
    }
}
