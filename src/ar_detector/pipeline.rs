use log::{debug, info, warn};
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::ar_detector::black_bar::{BarBorders, BlackBarDetector};
use crate::ar_detector::state_machine::{DetectionScheduler, PlaybackState, ScheduleConfig};
use crate::ar_detector::threshold::{AdaptiveThresholdController, CycleReport, ThresholdState};
use crate::ar_detector::{AutoDisableReason, DetectionResult};
use crate::core::settings::{Settings, DEFAULT_SETTINGS};
use crate::core::video::{FrameSampler, FrameSource};

/// What one detection cycle saw, for diagnostics.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CycleDiagnostics {
    pub cycle: u64,
    pub result: DetectionResult,
    pub borders: Option<BarBorders>,
    pub threshold: ThresholdState,
    pub elapsed: Duration,
}

pub trait TelemetrySink: Send + Sync {
    fn auto_disabled(&self, reason: AutoDisableReason);

    fn cycle(&self, diagnostics: &CycleDiagnostics);
}

/// Writes telemetry through the `log` facade.
#[derive(Debug, Default)]
pub struct LogTelemetry;

impl TelemetrySink for LogTelemetry {
    fn auto_disabled(&self, reason: AutoDisableReason) {
        warn!("⚠️ aspect ratio autodetection disabled: {:?}", reason);
    }

    fn cycle(&self, diagnostics: &CycleDiagnostics) {
        debug!(
            "cycle #{} -> {:?} in {:?} (threshold {})",
            diagnostics.cycle,
            diagnostics.result,
            diagnostics.elapsed,
            diagnostics.threshold.blackbar_threshold
        );
    }
}

/// One video's sample, detect and feedback loop, gated by the scheduler.
pub struct ArDetector {
    sampler: FrameSampler,
    detector: BlackBarDetector,
    controller: AdaptiveThresholdController,
    scheduler: DetectionScheduler,
    telemetry: Arc<dyn TelemetrySink>,
    last_ratio: Option<f64>,
}

impl ArDetector {
    pub fn new(settings: &Settings) -> Self {
        Self::with_telemetry(settings, Arc::new(LogTelemetry))
    }

    pub fn with_telemetry(settings: &Settings, telemetry: Arc<dyn TelemetrySink>) -> Self {
        let ar = &settings.ar_detect;
        info!(
            "🎬 ArDetector created: {}x{} grid, black bar threshold {}",
            ar.h_samples, ar.v_samples, ar.blackbar_threshold
        );

        Self {
            sampler: FrameSampler::new(ar.h_samples, ar.v_samples),
            detector: BlackBarDetector::from_settings(settings),
            controller: AdaptiveThresholdController::new(ar),
            scheduler: DetectionScheduler::with_config(ScheduleConfig::from_settings(ar)),
            telemetry,
            last_ratio: None,
        }
    }

    /// Runs a cycle if the scheduler allows one at `now`.
    pub fn run_cycle(&mut self, source: &mut dyn FrameSource, now: Instant) -> Option<DetectionResult> {
        if !self.scheduler.try_start(now) {
            return None;
        }
        let start = Instant::now();

        let grid = self.sampler.sample(source);
        let analysis = self
            .detector
            .analyze(&grid, self.controller.state(), self.last_ratio);
        let elapsed = start.elapsed();

        // black level comes from validated bars only
        if let Some(level) = analysis.bar_black_level {
            self.controller.observe_black_level(level);
        }

        let verdict = self.controller.on_cycle_result(&CycleReport {
            result: analysis.result,
            elapsed,
        });

        let result = match verdict.auto_disabled {
            Some(reason) => {
                self.scheduler.auto_disable(reason);
                self.telemetry.auto_disabled(reason);
                DetectionResult::AutoDisabled(reason)
            }
            None => analysis.result,
        };

        if let DetectionResult::AspectRatioFound(ratio) = result {
            self.last_ratio = Some(ratio);
        }

        self.telemetry.cycle(&CycleDiagnostics {
            cycle: self.scheduler.cycle_count(),
            result,
            borders: analysis.borders,
            threshold: verdict.state,
            elapsed,
        });

        Some(result)
    }

    pub fn set_playback_state(&mut self, playback: PlaybackState) {
        self.scheduler.set_playback_state(playback);
    }

    pub fn set_gated(&mut self, gated: bool) {
        self.scheduler.set_gated(gated);
    }

    pub fn request_immediate(&mut self) {
        self.scheduler.request_immediate();
    }

    pub fn next_delay(&self, now: Instant) -> Option<Duration> {
        self.scheduler.next_delay(now)
    }

    pub fn last_ratio(&self) -> Option<f64> {
        self.last_ratio
    }

    pub fn threshold(&self) -> &ThresholdState {
        self.controller.state()
    }

    pub fn is_auto_disabled(&self) -> bool {
        self.scheduler.is_auto_disabled()
    }

    /// New video source.
    pub fn reset(&mut self) {
        self.controller.reset();
        self.scheduler.reset();
        self.last_ratio = None;
    }
}

impl Default for ArDetector {
    fn default() -> Self {
        Self::new(&DEFAULT_SETTINGS)
    }
}
