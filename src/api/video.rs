//! Per-video session: player tracking, detection and the resizer wired together.

use log::{debug, info, warn};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::ar_detector::{ArDetector, DetectionResult, PlaybackState, TelemetrySink};
use crate::core::player::{
    ElementHandle, ElementSnapshot, GeometryTracker, LocatorMode, PlayerElementLocator,
    PollOutcome, Viewport,
};
use crate::core::settings::Settings;
use crate::core::video::FrameSource;

/// Resize notifications closer together than this are coalesced.
pub const RESIZE_DEBOUNCE: Duration = Duration::from_millis(250);
/// Fallback relocation and geometry poll.
pub const LEGACY_POLL_INTERVAL: Duration = Duration::from_millis(1000);

/// Read access to the page around the video.
pub trait DomHost: Send {
    /// The video element followed by its ancestors up to the document root.
    fn ancestor_chain(&self) -> Vec<ElementSnapshot>;

    /// Current size of an element, `None` once it left the document.
    fn element_size(&self, element: ElementHandle) -> Option<(f64, f64)>;

    fn viewport(&self) -> Viewport;
}

/// The resizer that crops the video.
pub trait AspectRatioConsumer: Send {
    fn apply_aspect_ratio(&mut self, ratio: f64);

    /// Re-apply the current aspect ratio after a geometry change.
    fn restore(&mut self);

    fn set_enabled(&mut self, enabled: bool);
}

/// Leading and trailing edge debounce.
#[derive(Debug, Clone)]
struct ResizeDebounce {
    window: Duration,
    last_fire: Option<Instant>,
    trailing: Option<Instant>,
}

impl ResizeDebounce {
    fn new(window: Duration) -> Self {
        Self {
            window,
            last_fire: None,
            trailing: None,
        }
    }

    /// Whether the event should be handled right away.
    fn trigger(&mut self, now: Instant) -> bool {
        match self.last_fire {
            Some(last) if now.saturating_duration_since(last) < self.window => {
                self.trailing = Some(last + self.window);
                false
            }
            _ => {
                self.last_fire = Some(now);
                true
            }
        }
    }

    fn take_due(&mut self, now: Instant) -> bool {
        match self.trailing {
            Some(due) if now >= due => {
                self.trailing = None;
                self.last_fire = Some(now);
                true
            }
            _ => false,
        }
    }

    fn next_due(&self) -> Option<Instant> {
        self.trailing
    }
}

pub struct VideoSession {
    host: String,
    settings: Arc<Settings>,
    dom: Box<dyn DomHost>,
    frames: Box<dyn FrameSource>,
    resizer: Box<dyn AspectRatioConsumer>,
    locator: PlayerElementLocator,
    tracker: GeometryTracker,
    detector: Option<ArDetector>,
    player: Option<ElementHandle>,
    periodic_refresh: bool,
    resize: ResizeDebounce,
    next_legacy_poll: Option<Instant>,
    released: bool,
}

impl VideoSession {
    pub fn new(
        host: &str,
        settings: Arc<Settings>,
        dom: Box<dyn DomHost>,
        frames: Box<dyn FrameSource>,
        resizer: Box<dyn AspectRatioConsumer>,
    ) -> Self {
        let site = settings.site(host);

        let mode = LocatorMode::from_site(site).unwrap_or_else(|e| {
            warn!("⚠️ {}: {}, falling back to automatic player detection", host, e);
            LocatorMode::Automatic
        });
        let periodic_refresh = site
            .and_then(|s| s.player_dom())
            .map_or(false, |p| p.periodically_refresh_player_element);
        let use_player_ar = site.map_or(false, |s| s.use_player_ar_in_fullscreen);

        let detector = if settings.ar_detect_allowed(host) {
            Some(ArDetector::new(&settings))
        } else {
            info!("aspect ratio autodetection not allowed on {}", host);
            None
        };

        let mut session = Self {
            host: host.to_string(),
            settings: Arc::clone(&settings),
            dom,
            frames,
            resizer,
            locator: PlayerElementLocator::with_mode(mode),
            tracker: GeometryTracker::new(settings.size_policy_for(host).clone(), use_player_ar),
            detector,
            player: None,
            periodic_refresh,
            resize: ResizeDebounce::new(RESIZE_DEBOUNCE),
            next_legacy_poll: None,
            released: false,
        };

        info!("🎬 VideoSession created for {}", session.host);
        session.refresh_player();
        session.poll_geometry();
        session
    }

    /// Replaces the telemetry sink of the detector.
    pub fn with_telemetry(mut self, telemetry: Arc<dyn TelemetrySink>) -> Self {
        if self.detector.is_some() {
            let mut detector = ArDetector::with_telemetry(&self.settings, telemetry);
            detector.set_gated(!self.tracker.is_active());
            self.detector = Some(detector);
        }
        self
    }

    pub fn set_verbose_heuristics(&mut self, verbose: bool) {
        self.locator.set_verbose(verbose);
    }

    /// Heuristics from the last player search, as JSON.
    pub fn element_stack_json(&self) -> serde_json::Result<String> {
        self.locator.element_stack_json()
    }

    pub fn player(&self) -> Option<ElementHandle> {
        self.player
    }

    pub fn tracker(&self) -> &GeometryTracker {
        &self.tracker
    }

    pub fn detector(&self) -> Option<&ArDetector> {
        self.detector.as_ref()
    }

    pub fn refresh_player(&mut self) -> Option<ElementHandle> {
        let found = self.locator.locate(self.dom.ancestor_chain());
        if found != self.player {
            debug!("player element {:?} -> {:?}", self.player, found);
        }
        self.player = found;
        found
    }

    pub fn poll_geometry(&mut self) -> PollOutcome {
        let size = self.player.and_then(|p| self.dom.element_size(p));
        let outcome = self.tracker.poll(size, &self.dom.viewport());

        if let PollOutcome::Changed(change) = &outcome {
            let active = change.state.is_active();
            self.resizer.set_enabled(active);
            if let Some(detector) = self.detector.as_mut() {
                detector.set_gated(!active);
                if active {
                    detector.request_immediate();
                }
            }
            if change.restore_aspect_ratio {
                self.resizer.restore();
            }
        }

        outcome
    }

    pub fn on_resize(&mut self, now: Instant) {
        if self.resize.trigger(now) {
            self.poll_geometry();
        }
    }

    pub fn set_playback_state(&mut self, playback: PlaybackState) {
        if let Some(detector) = self.detector.as_mut() {
            detector.set_playback_state(playback);
        }
    }

    pub fn request_recheck(&mut self) {
        if let Some(detector) = self.detector.as_mut() {
            detector.request_immediate();
        }
    }

    pub fn set_manually_disabled(&mut self, disabled: bool) {
        self.tracker.set_manually_disabled(disabled);
        self.poll_geometry();
    }

    /// The video element switched to a new source.
    pub fn on_source_changed(&mut self) {
        if let Some(detector) = self.detector.as_mut() {
            detector.reset();
            detector.set_gated(!self.tracker.is_active());
        }
    }

    /// Runs whatever is due at `now`; returns the detection result if a cycle ran.
    pub fn tick(&mut self, now: Instant) -> Option<DetectionResult> {
        if self.released {
            return None;
        }

        if self.resize.take_due(now) {
            self.poll_geometry();
        }

        match self.next_legacy_poll {
            Some(due) if now >= due => {
                self.legacy_poll();
                self.next_legacy_poll = Some(now + LEGACY_POLL_INTERVAL);
            }
            Some(_) => {}
            None => self.next_legacy_poll = Some(now + LEGACY_POLL_INTERVAL),
        }

        let result = self.detector.as_mut()?.run_cycle(self.frames.as_mut(), now)?;
        if let DetectionResult::AspectRatioFound(ratio) = result {
            debug!("applying aspect ratio {:.4}", ratio);
            self.resizer.apply_aspect_ratio(ratio);
        }
        Some(result)
    }

    fn legacy_poll(&mut self) {
        let attached = self.player.and_then(|p| self.dom.element_size(p)).is_some();
        if self.periodic_refresh || !attached {
            self.refresh_player();
        }
        self.poll_geometry();
    }

    /// Time until [`tick`](Self::tick) has something to do.
    pub fn next_wakeup(&self, now: Instant) -> Duration {
        let legacy = self
            .next_legacy_poll
            .map_or(Duration::ZERO, |due| due.saturating_duration_since(now));
        let resize = self
            .resize
            .next_due()
            .map(|due| due.saturating_duration_since(now));
        let detection = self.detector.as_ref().and_then(|d| d.next_delay(now));

        [Some(legacy), resize, detection]
            .into_iter()
            .flatten()
            .min()
            .unwrap_or(LEGACY_POLL_INTERVAL)
    }

    /// Releases the frame source. Safe to call more than once.
    pub fn destroy(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        self.frames.release();
        info!("🗑️ VideoSession for {} released", self.host);
    }
}

impl Drop for VideoSession {
    fn drop(&mut self) {
        self.destroy();
    }
}
