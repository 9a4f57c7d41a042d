//! Extension-wide and per-site configuration.
//!
//! Keys follow the extension's stored settings so existing JSON5 exports load
//! unchanged. Everything here is read-only once a session starts.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

mod ar_detect;

pub use ar_detect::{
    ArChangeSettings, ArDetectSettings, AutoDisableSettings, AutodetectionMode,
    EdgeDetectionSettings, GuardLineSettings, PillarTestSettings, TextLineTestSettings,
    VariableThresholdSettings,
};

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("failed to parse settings: {0}")]
    Parse(#[from] json5::Error),
    #[error("invalid selector `{0}`")]
    InvalidSelector(String),
    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

pub static DEFAULT_SETTINGS: Lazy<Arc<Settings>> = Lazy::new(|| Arc::new(Settings::default()));

/// Per-site status values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SiteStatus {
    Enabled,
    /// Allowed, but without player tracking
    Basic,
    #[default]
    Default,
    Disabled,
}

/// Restrictions on which players the engine runs for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SizePolicy {
    pub disable_on_small_players: bool,
    pub only_allow_in_fullscreen: bool,
    pub min_allowed_width: f64,
    pub min_allowed_height: f64,
}

impl Default for SizePolicy {
    fn default() -> Self {
        Self {
            disable_on_small_players: false,
            only_allow_in_fullscreen: false,
            min_allowed_width: 640.0,
            min_allowed_height: 360.0,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PlayerDomSettings {
    pub manual: bool,
    pub use_relative_ancestor: bool,
    pub video_ancestor: Option<usize>,
    pub query_selectors: Option<String>,
    pub periodically_refresh_player_element: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DomSettings {
    pub player: Option<PlayerDomSettings>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SiteSettings {
    pub status: SiteStatus,
    pub ar_status: SiteStatus,
    pub restrictions: Option<SizePolicy>,
    #[serde(rename = "DOM")]
    pub dom: Option<DomSettings>,
    pub use_player_ar_in_fullscreen: bool,
}

impl SiteSettings {
    pub fn player_dom(&self) -> Option<&PlayerDomSettings> {
        self.dom.as_ref().and_then(|dom| dom.player.as_ref())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub ar_detect: ArDetectSettings,
    pub ar_change: ArChangeSettings,
    pub restrictions: SizePolicy,
    pub sites: HashMap<String, SiteSettings>,
}

impl Settings {
    pub fn from_json5(text: &str) -> Result<Self, SettingsError> {
        let settings: Settings = json5::from_str(text)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn site(&self, host: &str) -> Option<&SiteSettings> {
        self.sites.get(host)
    }

    /// Site restrictions take precedence over the global ones.
    pub fn size_policy_for(&self, host: &str) -> &SizePolicy {
        self.site(host)
            .and_then(|site| site.restrictions.as_ref())
            .unwrap_or(&self.restrictions)
    }

    /// Whether aspect ratio autodetection may run on `host` at all.
    pub fn ar_detect_allowed(&self, host: &str) -> bool {
        if self.ar_detect.mode == AutodetectionMode::Disabled {
            return false;
        }

        match self.site(host).map(|site| site.ar_status) {
            Some(SiteStatus::Disabled) => false,
            Some(SiteStatus::Enabled) | Some(SiteStatus::Basic) => true,
            Some(SiteStatus::Default) | None => {
                self.ar_detect.mode == AutodetectionMode::Blacklist
            }
        }
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        let ar = &self.ar_detect;

        if ar.h_samples == 0 || ar.v_samples == 0 {
            return Err(SettingsError::InvalidValue {
                field: "arDetect.hSamples/vSamples",
                reason: format!("sample grid {}x{} is empty", ar.h_samples, ar.v_samples),
            });
        }
        if ar.static_sample_cols == 0 || ar.static_sample_rows == 0 {
            return Err(SettingsError::InvalidValue {
                field: "arDetect.staticSampleCols/staticSampleRows",
                reason: "at least one static line per axis is required".to_string(),
            });
        }
        if ar.edge_detection.sample_width == 0 {
            return Err(SettingsError::InvalidValue {
                field: "arDetect.edgeDetection.sampleWidth",
                reason: "must be positive".to_string(),
            });
        }
        if ar.variable_threshold.max_blackbar_threshold < ar.blackbar_threshold {
            return Err(SettingsError::InvalidValue {
                field: "arDetect.variableBlackbarTresholdOptions.maxBlackbarTreshold",
                reason: format!(
                    "cap {} is below the initial threshold {}",
                    ar.variable_threshold.max_blackbar_threshold, ar.blackbar_threshold
                ),
            });
        }

        let fractions = [
            ("arDetect.allowedMisaligned", ar.allowed_misaligned),
            ("arDetect.guardLine.ignoreEdgeMargin", ar.guard_line.ignore_edge_margin),
            ("arDetect.guardLine.imageTestTreshold", ar.guard_line.image_test_threshold),
            (
                "arDetect.edgeDetection.singleSideConfirmationTreshold",
                ar.edge_detection.single_side_confirmation_threshold,
            ),
            ("arDetect.edgeDetection.logoTreshold", ar.edge_detection.logo_threshold),
            ("arDetect.edgeDetection.middleIgnoredArea", ar.edge_detection.middle_ignored_area),
            ("arDetect.pillarTest.allowMisaligned", ar.pillar_test.allow_misaligned),
            ("arDetect.textLineTest.nonTextPulse", ar.text_line_test.non_text_pulse),
            ("arDetect.textLineTest.testRowOffset", ar.text_line_test.test_row_offset),
            ("arChange.samenessTreshold", self.ar_change.sameness_threshold),
        ];
        for (field, value) in fractions {
            if !(0.0..=1.0).contains(&value) {
                return Err(SettingsError::InvalidValue {
                    field,
                    reason: format!("{} is outside 0..=1", value),
                });
            }
        }
        if ar.guard_line.ignore_edge_margin >= 0.5 {
            return Err(SettingsError::InvalidValue {
                field: "arDetect.guardLine.ignoreEdgeMargin",
                reason: "margins would cover the whole guard line".to_string(),
            });
        }

        Ok(())
    }
}
