//! Layout of a naturally-sized photo inside a fixed-aspect, cropping
//! ("cover") container.

use crate::geometry::{Point, Size};

/// How a loaded image is actually laid out inside its container.
///
/// Offsets are negative on the cropped axis: the image overflows the
/// container and is centered.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderInfo {
    pub display_width: f64,
    pub display_height: f64,
    pub offset_x: f64,
    pub offset_y: f64,
    pub scale_x: f64,
    pub scale_y: f64,
    pub container_width: f64,
    pub container_height: f64,
}

impl RenderInfo {
    /// Returns `None` while either size is still unknown (zero).
    pub fn compute(natural: Size, container: Size) -> Option<Self> {
        if natural.is_empty() || container.is_empty() {
            return None;
        }

        let (display_width, display_height, offset_x, offset_y) =
            if natural.aspect_ratio() > container.aspect_ratio() {
                // Wider than the container: fit height, crop left/right.
                let dh = container.height;
                let dw = dh * natural.aspect_ratio();
                (dw, dh, (container.width - dw) / 2.0, 0.0)
            } else {
                let dw = container.width;
                let dh = dw / natural.aspect_ratio();
                (dw, dh, 0.0, (container.height - dh) / 2.0)
            };

        Some(Self {
            display_width,
            display_height,
            offset_x,
            offset_y,
            scale_x: display_width / natural.width,
            scale_y: display_height / natural.height,
            container_width: container.width,
            container_height: container.height,
        })
    }

    pub fn container(&self) -> Size {
        Size::new(self.container_width, self.container_height)
    }

    /// Original image pixel -> unzoomed container pixel.
    pub fn image_to_container(&self, p: Point) -> Point {
        Point::new(
            p.x * self.scale_x + self.offset_x,
            p.y * self.scale_y + self.offset_y,
        )
    }

    /// Unzoomed container pixel -> original image pixel.
    pub fn container_to_image(&self, p: Point) -> Point {
        Point::new(
            (p.x - self.offset_x) / self.scale_x,
            (p.y - self.offset_y) / self.scale_y,
        )
    }
}

/// Computes [`RenderInfo`] once per image load.
///
/// Layout passes and pointer interaction can fire the load notification
/// again for the same image; those repeats are ignored until [`reset`]
/// is called for a new image.
///
/// [`reset`]: RenderTracker::reset
#[derive(Debug, Default)]
pub struct RenderTracker {
    info: Option<RenderInfo>,
    computed: bool,
    computations: usize,
}

impl RenderTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle an image-load notification. Returns `true` when render info was
    /// (re)computed by this call.
    pub fn on_image_loaded(&mut self, natural: Size, container: Size) -> bool {
        if self.computed {
            log::trace!("render info already computed for this image; ignoring load event");
            return false;
        }
        let Some(info) = RenderInfo::compute(natural, container) else {
            log::debug!(
                "image load reported empty size (natural {:?}, container {:?})",
                natural,
                container
            );
            return false;
        };
        log::debug!(
            "render info: display {:.1}x{:.1} offset ({:.1}, {:.1}) scale ({:.4}, {:.4})",
            info.display_width,
            info.display_height,
            info.offset_x,
            info.offset_y,
            info.scale_x,
            info.scale_y
        );
        self.info = Some(info);
        self.computed = true;
        self.computations += 1;
        true
    }

    /// Forget the current layout; the next load notification recomputes it.
    pub fn reset(&mut self) {
        self.info = None;
        self.computed = false;
    }

    pub fn info(&self) -> Option<&RenderInfo> {
        self.info.as_ref()
    }

    /// Number of times render info has actually been computed.
    pub fn computations(&self) -> usize {
        self.computations
    }
}
