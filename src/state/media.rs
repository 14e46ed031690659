//! Image slots, upload/analysis progress and background task handles.

use crate::geometry::Size;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Load state of one image pane.
#[derive(Debug, Clone, PartialEq)]
pub enum SlotState {
    Empty,
    Loading,
    Loaded { natural: Size },
    Failed(String),
}

/// One image pane (baseline or current). Loads are tagged with a
/// generation so a slow response for an old URL cannot overwrite a newer one.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageSlot {
    url: Option<String>,
    timestamp: Option<String>,
    state: SlotState,
    generation: u64,
}

impl Default for ImageSlot {
    fn default() -> Self {
        Self {
            url: None,
            timestamp: None,
            state: SlotState::Empty,
            generation: 0,
        }
    }
}

impl ImageSlot {
    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    pub fn timestamp(&self) -> Option<&str> {
        self.timestamp.as_deref()
    }

    pub fn state(&self) -> &SlotState {
        &self.state
    }

    pub fn is_loading(&self) -> bool {
        self.state == SlotState::Loading
    }

    pub fn natural_size(&self) -> Option<Size> {
        match self.state {
            SlotState::Loaded { natural } => Some(natural),
            _ => None,
        }
    }

    /// Point the slot at a new source. Returns the generation to report the
    /// load result with, or `None` when there is nothing to load.
    pub fn begin(&mut self, url: Option<String>, timestamp: Option<String>) -> Option<u64> {
        self.generation += 1;
        self.url = url.filter(|u| !u.trim().is_empty());
        self.timestamp = timestamp;
        if self.url.is_some() {
            self.state = SlotState::Loading;
            Some(self.generation)
        } else {
            self.state = SlotState::Empty;
            None
        }
    }

    /// Mark the slot failed without a source, e.g. when the image
    /// locations themselves could not be fetched. Pending loads are dropped.
    pub fn fail(&mut self, reason: impl Into<String>) {
        self.generation += 1;
        self.url = None;
        self.state = SlotState::Failed(reason.into());
    }

    /// Record a finished load. Results for superseded generations are
    /// dropped; returns whether this one was applied.
    pub fn finish(&mut self, generation: u64, result: Result<Size, String>) -> bool {
        if generation != self.generation {
            return false;
        }
        self.state = match result {
            Ok(natural) => SlotState::Loaded { natural },
            Err(e) => {
                log::warn!(
                    "image {} failed to load: {e}",
                    self.url.as_deref().unwrap_or("<none>")
                );
                SlotState::Failed(e)
            }
        };
        true
    }
}

/// Decode an image and return it as RGBA with its natural size.
pub fn decode_image(bytes: &[u8]) -> Result<(image::RgbaImage, Size), image::ImageError> {
    let rgba = image::load_from_memory(bytes)?.to_rgba8();
    let size = Size::new(f64::from(rgba.width()), f64::from(rgba.height()));
    Ok((rgba, size))
}

/// Upload progress as shown to the user.
///
/// Real byte progress is held at 98% until a minimum display time has passed
/// so very fast uploads still show the bar move.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UploadProgress {
    min_duration: Duration,
}

impl Default for UploadProgress {
    fn default() -> Self {
        Self {
            min_duration: Duration::from_millis(800),
        }
    }
}

impl UploadProgress {
    pub const HOLD_PERCENT: f64 = 98.0;

    pub fn new(min_duration: Duration) -> Self {
        Self { min_duration }
    }

    pub fn percent(&self, sent: u64, total: u64, elapsed: Duration) -> f64 {
        if total == 0 {
            return 0.0;
        }
        let real = (sent as f64 / total as f64 * 100.0).clamp(0.0, 100.0);
        if elapsed < self.min_duration {
            real.min(Self::HOLD_PERCENT)
        } else {
            real
        }
    }

    /// Time left before the bar may reach 100%.
    pub fn remaining(&self, elapsed: Duration) -> Duration {
        self.min_duration.saturating_sub(elapsed)
    }

    /// Fallback curve when the transport reports nothing: eases toward the
    /// hold value.
    pub fn simulated(&self, elapsed: Duration) -> f64 {
        let t = elapsed.as_secs_f64() / self.min_duration.as_secs_f64().max(f64::EPSILON);
        Self::HOLD_PERCENT * (1.0 - (-t).exp())
    }
}

/// Only one analysis request may run at a time. Progress is simulated up
/// to 90% until the answer arrives.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AnalysisGuard {
    in_flight: bool,
    percent: f64,
}

impl AnalysisGuard {
    pub const SIMULATED_CEILING: f64 = 90.0;

    pub fn is_in_flight(&self) -> bool {
        self.in_flight
    }

    pub fn percent(&self) -> f64 {
        self.percent
    }

    /// Returns false if a request is already running.
    pub fn begin(&mut self) -> bool {
        if self.in_flight {
            return false;
        }
        self.in_flight = true;
        self.percent = 0.0;
        true
    }

    /// Advance the simulated progress by one timer tick.
    pub fn tick(&mut self) -> f64 {
        if self.in_flight {
            let step = ((Self::SIMULATED_CEILING - self.percent) * 0.15).max(0.5);
            self.percent = (self.percent + step).min(Self::SIMULATED_CEILING);
        }
        self.percent
    }

    pub fn finish(&mut self, success: bool) {
        self.in_flight = false;
        self.percent = if success { 100.0 } else { 0.0 };
    }
}

/// A background task that is aborted when replaced or dropped.
#[derive(Debug, Default)]
pub struct TaskSlot {
    handle: Option<JoinHandle<()>>,
}

impl TaskSlot {
    pub fn replace(&mut self, handle: JoinHandle<()>) {
        if let Some(old) = self.handle.replace(handle) {
            old.abort();
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    pub fn abort(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

impl Drop for TaskSlot {
    fn drop(&mut self) {
        self.abort();
    }
}
