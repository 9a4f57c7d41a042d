use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Global autodetection mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AutodetectionMode {
    /// Detect everywhere except on sites that opt out
    Blacklist,
    /// Detect only on sites that opt in
    Whitelist,
    Disabled,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ArDetectSettings {
    pub mode: AutodetectionMode,
    /// Top and bottom bar thickness may differ by this fraction of the frame height
    pub allowed_misaligned: f64,
    #[serde(rename = "timer_playing")]
    pub timer_playing_ms: u64,
    #[serde(rename = "timer_paused")]
    pub timer_paused_ms: u64,
    #[serde(rename = "timer_error")]
    pub timer_error_ms: u64,
    #[serde(rename = "timer_minimumTimeout")]
    pub timer_minimum_timeout_ms: u64,
    pub auto_disable: AutoDisableSettings,
    pub h_samples: u32,
    pub v_samples: u32,
    #[serde(rename = "blackLevel_default")]
    pub black_level_default: u8,
    #[serde(rename = "blackbarTreshold")]
    pub blackbar_threshold: u8,
    #[serde(rename = "variableBlackbarTresholdOptions")]
    pub variable_threshold: VariableThresholdSettings,
    pub static_sample_cols: u32,
    pub random_sample_cols: u32,
    pub static_sample_rows: u32,
    pub random_sample_rows: u32,
    pub guard_line: GuardLineSettings,
    pub edge_detection: EdgeDetectionSettings,
    pub pillar_test: PillarTestSettings,
    pub text_line_test: TextLineTestSettings,
}

impl Default for ArDetectSettings {
    fn default() -> Self {
        Self {
            mode: AutodetectionMode::Blacklist,
            allowed_misaligned: 0.05,
            timer_playing_ms: 666,
            timer_paused_ms: 3000,
            timer_error_ms: 3000,
            timer_minimum_timeout_ms: 5,
            auto_disable: AutoDisableSettings::default(),
            h_samples: 640,
            v_samples: 360,
            black_level_default: 10,
            blackbar_threshold: 16,
            variable_threshold: VariableThresholdSettings::default(),
            static_sample_cols: 9,
            random_sample_cols: 0,
            static_sample_rows: 9,
            random_sample_rows: 0,
            guard_line: GuardLineSettings::default(),
            edge_detection: EdgeDetectionSettings::default(),
            pillar_test: PillarTestSettings::default(),
            text_line_test: TextLineTestSettings::default(),
        }
    }
}

impl ArDetectSettings {
    pub fn timer_playing(&self) -> Duration {
        Duration::from_millis(self.timer_playing_ms)
    }

    pub fn timer_paused(&self) -> Duration {
        Duration::from_millis(self.timer_paused_ms)
    }

    pub fn timer_error(&self) -> Duration {
        Duration::from_millis(self.timer_error_ms)
    }

    pub fn timer_minimum_timeout(&self) -> Duration {
        Duration::from_millis(self.timer_minimum_timeout_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AutoDisableSettings {
    /// A cycle slower than this counts as a timeout
    #[serde(rename = "maxExecutionTime")]
    pub max_execution_time_ms: u64,
    pub consecutive_timeout_count: u32,
}

impl Default for AutoDisableSettings {
    fn default() -> Self {
        Self {
            max_execution_time_ms: 6000,
            consecutive_timeout_count: 5,
        }
    }
}

impl AutoDisableSettings {
    pub fn max_execution_time(&self) -> Duration {
        Duration::from_millis(self.max_execution_time_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VariableThresholdSettings {
    pub enabled: bool,
    pub disable_ar_detect_on_max: bool,
    #[serde(rename = "maxBlackbarTreshold")]
    pub max_blackbar_threshold: u8,
    pub threshold_step: u8,
    pub increase_after_consecutive_resets: u32,
}

impl Default for VariableThresholdSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            disable_ar_detect_on_max: true,
            max_blackbar_threshold: 48,
            threshold_step: 8,
            increase_after_consecutive_resets: 2,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GuardLineSettings {
    pub enabled: bool,
    /// Fraction of the line length ignored at both ends
    pub ignore_edge_margin: f64,
    #[serde(rename = "imageTestTreshold")]
    pub image_test_threshold: f64,
    /// Distance of the guard line from the detected border, outward
    pub edge_tolerance_px: u32,
}

impl Default for GuardLineSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            ignore_edge_margin: 0.20,
            image_test_threshold: 0.1,
            edge_tolerance_px: 2,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EdgeDetectionSettings {
    pub sample_width: u32,
    #[serde(rename = "detectionTreshold")]
    pub detection_threshold: u32,
    #[serde(rename = "singleSideConfirmationTreshold")]
    pub single_side_confirmation_threshold: f64,
    #[serde(rename = "logoTreshold")]
    pub logo_threshold: f64,
    pub edge_tolerance_px: u32,
    pub middle_ignored_area: f64,
}

impl Default for EdgeDetectionSettings {
    fn default() -> Self {
        Self {
            sample_width: 8,
            detection_threshold: 4,
            single_side_confirmation_threshold: 0.3,
            logo_threshold: 0.15,
            edge_tolerance_px: 1,
            middle_ignored_area: 0.2,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PillarTestSettings {
    pub ignore_thin_pillars_px: u32,
    pub allow_misaligned: f64,
}

impl Default for PillarTestSettings {
    fn default() -> Self {
        Self {
            ignore_thin_pillars_px: 5,
            allow_misaligned: 0.05,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TextLineTestSettings {
    /// A non-black pulse longer than this fraction of the row means image, not text
    pub non_text_pulse: f64,
    pub pulses_to_confirm: u32,
    pub pulses_to_confirm_if_half_black: u32,
    /// Tested row sits this fraction of the height inside the detected edge
    pub test_row_offset: f64,
}

impl Default for TextLineTestSettings {
    fn default() -> Self {
        Self {
            non_text_pulse: 0.10,
            pulses_to_confirm: 10,
            pulses_to_confirm_if_half_black: 5,
            test_row_offset: 0.02,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ArChangeSettings {
    /// Ratios within this relative distance of each other count as the same
    #[serde(rename = "samenessTreshold")]
    pub sameness_threshold: f64,
}

impl Default for ArChangeSettings {
    fn default() -> Self {
        Self {
            sameness_threshold: 0.025,
        }
    }
}
