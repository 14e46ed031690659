//! Zoom and pan applied on top of the rendered image.
//!
//! Zoom scales around the container center, then the pan offset is added:
//!
//! ```text
//! screen = zoom * p + pan + center * (1 - zoom)
//! ```

use crate::geometry::{Point, Size};

pub const MIN_ZOOM: f64 = 1.0;
pub const MAX_ZOOM: f64 = 5.0;
pub const ZOOM_STEP: f64 = 1.2;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    zoom: f64,
    pan_x: f64,
    pan_y: f64,
    container: Size,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            zoom: MIN_ZOOM,
            pan_x: 0.0,
            pan_y: 0.0,
            container: Size::default(),
        }
    }
}

impl Viewport {
    pub fn new(container: Size) -> Self {
        Self {
            container,
            ..Self::default()
        }
    }

    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    pub fn pan(&self) -> (f64, f64) {
        (self.pan_x, self.pan_y)
    }

    pub fn container(&self) -> Size {
        self.container
    }

    /// Update the container size, re-clamping the pan for the new extent.
    pub fn set_container(&mut self, container: Size) {
        self.container = container;
        self.clamp_pan();
    }

    pub fn zoom_in(&mut self) {
        self.set_zoom(self.zoom * ZOOM_STEP);
    }

    pub fn zoom_out(&mut self) {
        self.set_zoom(self.zoom / ZOOM_STEP);
    }

    pub fn set_zoom(&mut self, zoom: f64) {
        self.zoom = zoom.clamp(MIN_ZOOM, MAX_ZOOM);
        if self.zoom <= MIN_ZOOM {
            self.pan_x = 0.0;
            self.pan_y = 0.0;
        } else {
            self.clamp_pan();
        }
    }

    pub fn reset(&mut self) {
        self.zoom = MIN_ZOOM;
        self.pan_x = 0.0;
        self.pan_y = 0.0;
    }

    pub fn is_reset(&self) -> bool {
        self.zoom == MIN_ZOOM && self.pan_x == 0.0 && self.pan_y == 0.0
    }

    pub fn can_zoom_in(&self) -> bool {
        self.zoom < MAX_ZOOM
    }

    pub fn can_zoom_out(&self) -> bool {
        self.zoom > MIN_ZOOM
    }

    /// Panning is only meaningful once zoomed in.
    pub fn can_pan(&self) -> bool {
        self.zoom > MIN_ZOOM
    }

    /// Shift the pan offset by a screen delta. Ignored at 1x.
    pub fn pan_by(&mut self, dx: f64, dy: f64) {
        if !self.can_pan() {
            return;
        }
        self.pan_x += dx;
        self.pan_y += dy;
        self.clamp_pan();
    }

    /// Largest pan magnitude per axis that keeps the scaled image covering
    /// the container.
    pub fn max_pan(&self) -> (f64, f64) {
        let max_x = (self.container.width * self.zoom - self.container.width) / 2.0;
        let max_y = (self.container.height * self.zoom - self.container.height) / 2.0;
        (max_x.max(0.0), max_y.max(0.0))
    }

    fn clamp_pan(&mut self) {
        let (max_x, max_y) = self.max_pan();
        self.pan_x = self.pan_x.clamp(-max_x, max_x);
        self.pan_y = self.pan_y.clamp(-max_y, max_y);
    }

    fn center(&self) -> Point {
        Point::new(self.container.width / 2.0, self.container.height / 2.0)
    }

    /// Unzoomed container point -> on-screen point.
    pub fn forward(&self, p: Point) -> Point {
        let c = self.center();
        Point::new(
            self.zoom * p.x + self.pan_x + c.x * (1.0 - self.zoom),
            self.zoom * p.y + self.pan_y + c.y * (1.0 - self.zoom),
        )
    }

    /// On-screen point -> unzoomed container point.
    pub fn inverse(&self, s: Point) -> Point {
        let c = self.center();
        Point::new(
            (s.x - self.pan_x - c.x * (1.0 - self.zoom)) / self.zoom,
            (s.y - self.pan_y - c.y * (1.0 - self.zoom)) / self.zoom,
        )
    }

    /// Zoom as a whole percentage for display.
    pub fn zoom_percent(&self) -> u32 {
        (self.zoom * 100.0).round() as u32
    }
}
