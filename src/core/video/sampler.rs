use log::{trace, warn};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::ops::Range;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::core::video::error::VideoError;
use crate::core::video::frame::Frame;

/// Host capability that renders the current video frame off-screen.
pub trait FrameSource: Send {
    /// `Ok(None)` when no frame is available yet.
    fn capture(&mut self) -> Result<Option<Frame>, VideoError>;

    /// Frees host-side capture resources. Called once when the session ends.
    fn release(&mut self);
}

type CaptureFn = Box<dyn FnMut(u64) -> Result<Option<Frame>, VideoError> + Send>;

/// Scripted frame source for tests and host-less runs.
pub struct MockFrameSource {
    capture_fn: CaptureFn,
    delay: Duration,
    captures: u64,
    released: Arc<AtomicUsize>,
}

impl MockFrameSource {
    /// Returns the same frame on every capture.
    pub fn new(frame: Option<Frame>) -> Self {
        Self::with_pattern(move |_| Ok(frame.clone()))
    }

    /// `pattern` receives the 0-based capture index.
    pub fn with_pattern<F>(pattern: F) -> Self
    where
        F: FnMut(u64) -> Result<Option<Frame>, VideoError> + Send + 'static,
    {
        Self {
            capture_fn: Box::new(pattern),
            delay: Duration::ZERO,
            captures: 0,
            released: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Blocks every capture for `delay`, emulating a slow host.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Shared counter of `release()` calls.
    pub fn release_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.released)
    }

    pub fn captures(&self) -> u64 {
        self.captures
    }
}

impl FrameSource for MockFrameSource {
    fn capture(&mut self) -> Result<Option<Frame>, VideoError> {
        if !self.delay.is_zero() {
            std::thread::sleep(self.delay);
        }
        let index = self.captures;
        self.captures += 1;
        (self.capture_fn)(index)
    }

    fn release(&mut self) {
        self.released.fetch_add(1, Ordering::SeqCst);
    }
}

/// Downscaled RGBA copy of one frame, plus the frame's intrinsic size.
///
/// An invalid grid carries no pixels and stands for "no usable frame".
#[derive(Debug, Clone, PartialEq)]
pub struct SampleGrid {
    pub width: u32,
    pub height: u32,
    pub source_width: u32,
    pub source_height: u32,
    data: Vec<u8>,
}

impl SampleGrid {
    pub fn from_rgba(
        width: u32,
        height: u32,
        source_width: u32,
        source_height: u32,
        data: Vec<u8>,
    ) -> Result<Self, VideoError> {
        if width == 0 || height == 0 || source_width == 0 || source_height == 0 {
            return Err(VideoError::InvalidDimensions { width, height });
        }
        let expected = width as usize * height as usize * 4;
        if data.len() != expected {
            return Err(VideoError::BufferSize {
                expected,
                actual: data.len(),
            });
        }

        Ok(Self {
            width,
            height,
            source_width,
            source_height,
            data,
        })
    }

    pub fn invalid() -> Self {
        Self {
            width: 0,
            height: 0,
            source_width: 0,
            source_height: 0,
            data: Vec::new(),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.width > 0 && self.height > 0 && !self.data.is_empty()
    }

    /// RGB of the pixel at `(x, y)`.
    pub fn rgb(&self, x: u32, y: u32) -> [u8; 3] {
        let idx = (y as usize * self.width as usize + x as usize) * 4;
        [self.data[idx], self.data[idx + 1], self.data[idx + 2]]
    }

    /// Every colour channel is below `limit`.
    pub fn is_black(&self, x: u32, y: u32, limit: u16) -> bool {
        self.rgb(x, y).iter().all(|&c| (c as u16) < limit)
    }

    /// Brightest channel of the darkest pixel inside `cols` x `rows`.
    pub fn darkest_level_in(&self, cols: Range<u32>, rows: Range<u32>) -> Option<u8> {
        if !self.is_valid() {
            return None;
        }
        let cols = cols.start..cols.end.min(self.width);
        let rows = rows.start..rows.end.min(self.height);
        rows.flat_map(move |y| cols.clone().map(move |x| (x, y)))
            .map(|(x, y)| {
                let [r, g, b] = self.rgb(x, y);
                r.max(g).max(b)
            })
            .min()
    }

    /// Content hash, stable for identical grids.
    pub fn fingerprint(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.width.hash(&mut hasher);
        self.height.hash(&mut hasher);
        self.data.hash(&mut hasher);
        hasher.finish()
    }
}

/// Captures frames and scales them to the detection grid size.
pub struct FrameSampler {
    width: u32,
    height: u32,
}

impl FrameSampler {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn grid_size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn sample(&self, source: &mut dyn FrameSource) -> SampleGrid {
        let start = Instant::now();

        let frame = match source.capture() {
            Ok(Some(frame)) => frame,
            Ok(None) => {
                trace!("no frame available");
                return SampleGrid::invalid();
            }
            Err(e) => {
                warn!("frame capture failed: {}", e);
                return SampleGrid::invalid();
            }
        };

        match self.scale(&frame) {
            Ok(grid) => {
                trace!(
                    "sampled {}x{} frame into {}x{} grid in {:?}",
                    frame.width,
                    frame.height,
                    grid.width,
                    grid.height,
                    start.elapsed()
                );
                grid
            }
            Err(e) => {
                warn!("frame sampling failed: {}", e);
                SampleGrid::invalid()
            }
        }
    }

    fn scale(&self, frame: &Frame) -> Result<SampleGrid, VideoError> {
        if frame.width == 0 || frame.height == 0 {
            return Err(VideoError::InvalidDimensions {
                width: frame.width,
                height: frame.height,
            });
        }
        if frame.data.len() != frame.pixel_count() * 4 {
            return Err(VideoError::BufferSize {
                expected: frame.pixel_count() * 4,
                actual: frame.data.len(),
            });
        }

        let scaled = if frame.width == self.width && frame.height == self.height {
            frame.data.clone()
        } else {
            frame.resize_to(self.width, self.height)?.data
        };

        SampleGrid::from_rgba(self.width, self.height, frame.width, frame.height, scaled)
    }
}
