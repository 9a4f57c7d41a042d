//! Aspect ratio autodetection - finds letterbox and pillarbox bars in video frames
//!
//! Strategy:
//! 1. Sample a small grid of the current frame
//! 2. Scan selected lines from both ends for the first real image pixel
//! 3. Vote per side, dropping logos, subtitles and unconfirmed edges
//! 4. Validate with guard lines, then convert borders into a ratio
//! 5. Feed failures back into the black threshold and the cycle scheduler

pub mod black_bar;
pub mod edge;
pub mod guard_line;
pub mod pipeline;
pub mod state_machine;
pub mod text_line;
pub mod threshold;

use serde::Serialize;

pub use black_bar::{Analysis, BarBorders, BlackBarDetector};
pub use pipeline::{ArDetector, CycleDiagnostics, LogTelemetry, TelemetrySink};
pub use state_machine::{DetectionScheduler, PlaybackState, SchedulerState};
pub use threshold::{AdaptiveThresholdController, ControllerVerdict, CycleReport, ThresholdState};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum UncertainReason {
    /// No usable frame was captured
    InvalidFrame,
    BlackFrame,
    NoConsensus,
    GuardLineViolation,
    PillarMisaligned,
    LetterboxMisaligned,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AutoDisableReason {
    ThresholdExceeded,
    TooSlow,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum DetectionResult {
    AspectRatioFound(f64),
    Unchanged,
    Uncertain(UncertainReason),
    AutoDisabled(AutoDisableReason),
}

impl DetectionResult {
    pub fn is_success(&self) -> bool {
        matches!(
            self,
            DetectionResult::AspectRatioFound(_) | DetectionResult::Unchanged
        )
    }
}
