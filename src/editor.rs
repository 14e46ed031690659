//! Contour editor: the interaction state machine over the detection store.
//!
//! Pointer positions are container-relative screen pixels, i.e. what the
//! user sees after zoom and pan. The editor converts them back to image
//! pixels through the viewport and the render info.

use crate::classes::ClassLabel;
use crate::detection::Detection;
use crate::geometry::{BoundingBox, MIN_BOX_SIDE, Point, Rect, Size};
use crate::render::RenderInfo;
use crate::store::{DeleteOutcome, DetectionStore, StoreSnapshot};
use crate::viewport::Viewport;

/// Smallest on-screen rectangle, in container pixels, accepted as a drawing.
pub const MIN_DRAW_SIDE: f64 = 20.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResizeHandle {
    NorthWest,
    NorthEast,
    SouthWest,
    SouthEast,
    North,
    South,
    East,
    West,
}

impl ResizeHandle {
    pub const ALL: [ResizeHandle; 8] = [
        ResizeHandle::NorthWest,
        ResizeHandle::NorthEast,
        ResizeHandle::SouthWest,
        ResizeHandle::SouthEast,
        ResizeHandle::North,
        ResizeHandle::South,
        ResizeHandle::East,
        ResizeHandle::West,
    ];

    pub fn parse(raw: &str) -> Option<Self> {
        Some(match raw {
            "nw" => ResizeHandle::NorthWest,
            "ne" => ResizeHandle::NorthEast,
            "sw" => ResizeHandle::SouthWest,
            "se" => ResizeHandle::SouthEast,
            "n" => ResizeHandle::North,
            "s" => ResizeHandle::South,
            "e" => ResizeHandle::East,
            "w" => ResizeHandle::West,
            _ => return None,
        })
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ResizeHandle::NorthWest => "nw",
            ResizeHandle::NorthEast => "ne",
            ResizeHandle::SouthWest => "sw",
            ResizeHandle::SouthEast => "se",
            ResizeHandle::North => "n",
            ResizeHandle::South => "s",
            ResizeHandle::East => "e",
            ResizeHandle::West => "w",
        }
    }

    fn moves_west(self) -> bool {
        matches!(self, ResizeHandle::NorthWest | ResizeHandle::SouthWest | ResizeHandle::West)
    }

    fn moves_east(self) -> bool {
        matches!(self, ResizeHandle::NorthEast | ResizeHandle::SouthEast | ResizeHandle::East)
    }

    fn moves_north(self) -> bool {
        matches!(self, ResizeHandle::NorthWest | ResizeHandle::NorthEast | ResizeHandle::North)
    }

    fn moves_south(self) -> bool {
        matches!(self, ResizeHandle::SouthWest | ResizeHandle::SouthEast | ResizeHandle::South)
    }

    /// Where the handle sits on a rectangle.
    pub fn anchor(self, r: &Rect) -> Point {
        let cx = r.x + r.width / 2.0;
        let cy = r.y + r.height / 2.0;
        let x = if self.moves_west() {
            r.x
        } else if self.moves_east() {
            r.right()
        } else {
            cx
        };
        let y = if self.moves_north() {
            r.y
        } else if self.moves_south() {
            r.bottom()
        } else {
            cy
        };
        Point::new(x, y)
    }

    /// Resize `b` by an image-pixel delta. Moving edges stop at the image
    /// boundary and no resized side ends up below [`MIN_BOX_SIDE`]. The
    /// opposite edges stay put unless a box pinned against the boundary has
    /// to grow to reach that minimum.
    pub fn apply(self, b: &BoundingBox, dx: f64, dy: f64, image: Size) -> BoundingBox {
        let (mut left, mut top, mut right, mut bottom) = (b.left(), b.top(), b.right(), b.bottom());
        if self.moves_west() {
            left = (left + dx).min(right - MIN_BOX_SIDE).max(0.0);
        }
        if self.moves_east() {
            right = (right + dx).max(left + MIN_BOX_SIDE).min(image.width);
        }
        if self.moves_north() {
            top = (top + dy).min(bottom - MIN_BOX_SIDE).max(0.0);
        }
        if self.moves_south() {
            bottom = (bottom + dy).max(top + MIN_BOX_SIDE).min(image.height);
        }
        if self.moves_west() || self.moves_east() {
            (left, right) = widen_to_min(left, right, image.width);
        }
        if self.moves_north() || self.moves_south() {
            (top, bottom) = widen_to_min(top, bottom, image.height);
        }
        BoundingBox::from_edges(left, top, right, bottom)
    }
}

/// Grow `[lo, hi]` to [`MIN_BOX_SIDE`] inside `[0, limit]`, far edge first.
fn widen_to_min(lo: f64, hi: f64, limit: f64) -> (f64, f64) {
    if hi - lo >= MIN_BOX_SIDE {
        return (lo, hi);
    }
    let hi = (lo + MIN_BOX_SIDE).min(limit);
    let lo = lo.min(hi - MIN_BOX_SIDE).max(0.0);
    (lo, hi)
}

/// Current interaction. Exactly one is active at a time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EditorMode {
    Viewing,
    Editing,
    Dragging { index: usize, last: Point },
    Resizing { index: usize, handle: ResizeHandle, last: Point },
    AddingContour,
    Drawing { start: Point, end: Point },
    /// A drawn box waits for class and note in the confirmation dialog.
    ConfirmingContour { pending: BoundingBox },
}

/// Why a finished drawing produced no contour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawRejection {
    NotReady,
    TooSmallOnScreen,
    TooSmallInImage,
    OutOfBounds,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DrawOutcome {
    Pending(BoundingBox),
    Rejected(DrawRejection),
}

/// Convert a finished on-screen rectangle into an image-space box.
pub fn finish_drawing(
    start: Point,
    end: Point,
    info: Option<&RenderInfo>,
    viewport: &Viewport,
    image: Option<Size>,
) -> DrawOutcome {
    let rect = Rect::from_corners(start, end);
    if rect.width < MIN_DRAW_SIDE || rect.height < MIN_DRAW_SIDE {
        return DrawOutcome::Rejected(DrawRejection::TooSmallOnScreen);
    }
    let (Some(info), Some(image)) = (info, image) else {
        return DrawOutcome::Rejected(DrawRejection::NotReady);
    };

    let p1 = info.container_to_image(viewport.inverse(Point::new(rect.x, rect.y)));
    let p2 = info.container_to_image(viewport.inverse(Point::new(rect.right(), rect.bottom())));
    let bbox = BoundingBox::from_edges(p1.x, p1.y, p2.x, p2.y);

    if bbox.width < MIN_BOX_SIDE || bbox.height < MIN_BOX_SIDE {
        DrawOutcome::Rejected(DrawRejection::TooSmallInImage)
    } else if !bbox.fits_within(image) {
        DrawOutcome::Rejected(DrawRejection::OutOfBounds)
    } else {
        DrawOutcome::Pending(bbox)
    }
}

/// Interaction controller for one image. Owns the edit-mode snapshot used
/// by cancel and the selected index.
#[derive(Debug)]
pub struct ContourEditor {
    mode: EditorMode,
    selected: Option<usize>,
    snapshot: Option<StoreSnapshot>,
}

impl Default for ContourEditor {
    fn default() -> Self {
        Self {
            mode: EditorMode::Viewing,
            selected: None,
            snapshot: None,
        }
    }
}

impl ContourEditor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mode(&self) -> EditorMode {
        self.mode
    }

    pub fn selected(&self) -> Option<usize> {
        self.selected
    }

    pub fn is_editing(&self) -> bool {
        self.mode != EditorMode::Viewing
    }

    /// Drag, resize or draw in progress.
    pub fn is_busy(&self) -> bool {
        matches!(
            self.mode,
            EditorMode::Dragging { .. } | EditorMode::Resizing { .. } | EditorMode::Drawing { .. }
        )
    }

    pub fn is_adding_contour(&self) -> bool {
        matches!(
            self.mode,
            EditorMode::AddingContour | EditorMode::Drawing { .. } | EditorMode::ConfirmingContour { .. }
        )
    }

    pub fn pending_contour(&self) -> Option<BoundingBox> {
        match self.mode {
            EditorMode::ConfirmingContour { pending } => Some(pending),
            _ => None,
        }
    }

    /// Enter edit mode. Needs at least one detection.
    pub fn enter_edit_mode(&mut self, store: &DetectionStore) -> bool {
        if self.is_editing() || store.is_empty() {
            return false;
        }
        self.snapshot = Some(store.snapshot());
        self.selected = None;
        self.mode = EditorMode::Editing;
        log::debug!("entered edit mode with {} detections", store.len());
        true
    }

    /// Keep the edits and return to viewing.
    pub fn confirm_edits(&mut self) -> bool {
        if !self.is_editing() {
            return false;
        }
        self.snapshot = None;
        self.exit();
        true
    }

    /// Discard every change made since entering edit mode.
    pub fn cancel_edits(&mut self, store: &mut DetectionStore) -> bool {
        if !self.is_editing() {
            return false;
        }
        if let Some(snapshot) = self.snapshot.take() {
            store.replace_all(snapshot);
        }
        self.exit();
        log::debug!("edits cancelled");
        true
    }

    /// Leave edit mode without touching the store (e.g. when the list is
    /// replaced by a new analysis).
    pub fn reset(&mut self) {
        self.snapshot = None;
        self.exit();
    }

    fn exit(&mut self) {
        self.mode = EditorMode::Viewing;
        self.selected = None;
    }

    pub fn select(&mut self, index: usize, store: &DetectionStore) -> bool {
        if self.mode != EditorMode::Editing {
            return false;
        }
        match store.get(index) {
            Some(d) if !d.is_deleted() => {
                self.selected = Some(index);
                true
            }
            _ => false,
        }
    }

    pub fn clear_selection(&mut self) {
        if self.mode == EditorMode::Editing {
            self.selected = None;
        }
    }

    pub fn begin_drag(&mut self, index: usize, at: Point, store: &DetectionStore) -> bool {
        if !self.select(index, store) {
            return false;
        }
        log::debug!("drag start on #{index}");
        self.mode = EditorMode::Dragging { index, last: at };
        true
    }

    pub fn begin_resize(
        &mut self,
        index: usize,
        handle: ResizeHandle,
        at: Point,
        store: &DetectionStore,
    ) -> bool {
        if !self.select(index, store) {
            return false;
        }
        log::debug!("resize start on #{index} ({})", handle.as_str());
        self.mode = EditorMode::Resizing { index, handle, last: at };
        true
    }

    pub fn begin_add_contour(&mut self) -> bool {
        if self.mode != EditorMode::Editing {
            return false;
        }
        self.selected = None;
        self.mode = EditorMode::AddingContour;
        true
    }

    pub fn begin_draw(&mut self, at: Point) -> bool {
        if self.mode != EditorMode::AddingContour {
            return false;
        }
        self.mode = EditorMode::Drawing { start: at, end: at };
        true
    }

    /// Pointer movement anywhere on screen while an interaction is active.
    /// Returns whether anything visible changed.
    pub fn pointer_move(
        &mut self,
        at: Point,
        store: &mut DetectionStore,
        info: Option<&RenderInfo>,
        zoom: f64,
    ) -> bool {
        match self.mode {
            EditorMode::Dragging { index, last } => {
                let Some((dx, dy)) = image_delta(last, at, info, zoom) else {
                    return false;
                };
                self.mode = EditorMode::Dragging { index, last: at };
                let Some(current) = store.get(index).map(|d| d.bounding_box) else {
                    return false;
                };
                let moved = BoundingBox { x: current.x + dx, y: current.y + dy, ..current };
                store.update_geometry_at(index, moved)
            }
            EditorMode::Resizing { index, handle, last } => {
                let Some((dx, dy)) = image_delta(last, at, info, zoom) else {
                    return false;
                };
                self.mode = EditorMode::Resizing { index, handle, last: at };
                let (Some(current), Some(image)) =
                    (store.get(index).map(|d| d.bounding_box), store.image_size())
                else {
                    return false;
                };
                store.update_geometry_at(index, handle.apply(&current, dx, dy, image))
            }
            EditorMode::Drawing { start, .. } => {
                self.mode = EditorMode::Drawing { start, end: at };
                true
            }
            _ => false,
        }
    }

    /// Pointer released. Ends drags and resizes; a finished drawing either
    /// opens the confirmation step or is discarded.
    pub fn pointer_up(
        &mut self,
        at: Point,
        store: &DetectionStore,
        info: Option<&RenderInfo>,
        viewport: &Viewport,
    ) -> Option<DrawOutcome> {
        match self.mode {
            EditorMode::Dragging { .. } | EditorMode::Resizing { .. } => {
                self.mode = EditorMode::Editing;
                None
            }
            EditorMode::Drawing { start, .. } => {
                let outcome = finish_drawing(start, at, info, viewport, store.image_size());
                self.mode = match outcome {
                    DrawOutcome::Pending(pending) => EditorMode::ConfirmingContour { pending },
                    DrawOutcome::Rejected(reason) => {
                        log::debug!("drawing discarded: {reason:?}");
                        EditorMode::Editing
                    }
                };
                Some(outcome)
            }
            _ => None,
        }
    }

    /// Escape cancels adding a contour (including the confirmation dialog).
    pub fn escape(&mut self) -> bool {
        if self.is_adding_contour() {
            self.mode = EditorMode::Editing;
            true
        } else {
            false
        }
    }

    /// Accept the pending contour. Returns its index in the store.
    pub fn confirm_new_contour(
        &mut self,
        class: ClassLabel,
        note: Option<String>,
        user: &str,
        store: &mut DetectionStore,
    ) -> Option<usize> {
        let pending = self.pending_contour()?;
        let index = store.append(Detection::manual(class, pending, note, user));
        self.mode = EditorMode::Editing;
        Some(index)
    }

    pub fn cancel_new_contour(&mut self) -> bool {
        if self.pending_contour().is_none() {
            return false;
        }
        self.mode = EditorMode::Editing;
        true
    }

    /// Delete the detection at `index` and keep the selection pointing at
    /// the same entry.
    pub fn delete(&mut self, index: usize, store: &mut DetectionStore, user: &str) -> Option<DeleteOutcome> {
        if !self.is_editing() {
            return None;
        }
        let id = store.get(index)?.id.clone();
        let outcome = store.soft_delete(&id, user)?;
        self.selected = match (self.selected, outcome) {
            (Some(s), _) if s == index => None,
            (Some(s), DeleteOutcome::Removed { .. }) if s > index => Some(s - 1),
            (other, _) => other,
        };
        if matches!(self.mode, EditorMode::Dragging { .. } | EditorMode::Resizing { .. }) {
            self.mode = EditorMode::Editing;
        }
        Some(outcome)
    }

    pub fn restore(&mut self, index: usize, store: &mut DetectionStore) -> bool {
        if !self.is_editing() {
            return false;
        }
        let Some(id) = store.get(index).map(|d| d.id.clone()) else {
            return false;
        };
        store.restore(&id)
    }
}

/// Screen delta -> image delta.
fn image_delta(from: Point, to: Point, info: Option<&RenderInfo>, zoom: f64) -> Option<(f64, f64)> {
    let info = info?;
    Some((
        (to.x - from.x) / (info.scale_x * zoom),
        (to.y - from.y) / (info.scale_y * zoom),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::AnnotationType;
    use assert_matches::assert_matches;
    use serde_json::json;

    const CONTAINER: Size = Size::new(400.0, 300.0);

    fn info() -> RenderInfo {
        // scale 0.625 on both axes, no offsets
        RenderInfo::compute(Size::new(640.0, 480.0), CONTAINER).unwrap()
    }

    fn store() -> DetectionStore {
        let mut s = DetectionStore::new();
        s.set_image_size(Size::new(640.0, 480.0));
        let detections = (1..=2)
            .map(|i| {
                serde_json::from_value(json!({
                    "detection_id": format!("ai_{i}"),
                    "class": "point_overload_red",
                    "confidence": 0.9,
                    "labelNumber": i,
                    "bounding_box": {"x": 100.0 * i as f64, "y": 100.0, "width": 40.0, "height": 40.0}
                }))
                .unwrap()
            })
            .collect();
        s.load_bulk(detections);
        s
    }

    fn editing(store: &DetectionStore) -> ContourEditor {
        let mut e = ContourEditor::new();
        assert!(e.enter_edit_mode(store));
        e
    }

    // -- mode transitions --

    #[test]
    fn edit_mode_requires_detections() {
        let mut e = ContourEditor::new();
        assert!(!e.enter_edit_mode(&DetectionStore::new()));
        assert_eq!(e.mode(), EditorMode::Viewing);
    }

    #[test]
    fn escape_cancels_adding_contour() {
        let s = store();
        let mut e = editing(&s);
        assert!(e.begin_add_contour());
        assert!(e.begin_draw(Point::new(10.0, 10.0)));
        assert!(e.escape());
        assert_eq!(e.mode(), EditorMode::Editing);
        assert!(!e.escape());
    }

    #[test]
    fn deleted_boxes_cannot_be_selected() {
        let mut s = store();
        let mut e = editing(&s);
        e.delete(0, &mut s, "alice");
        assert!(!e.select(0, &s));
        assert!(!e.begin_drag(0, Point::default(), &s));
    }

    // -- drag --

    #[test]
    fn drag_converts_screen_delta_with_zoom() {
        let mut s = store();
        let mut e = editing(&s);
        let info = info();
        assert!(e.begin_drag(0, Point::new(0.0, 0.0), &s));
        // 25 screen px at zoom 2 and scale 0.625 is 20 image px.
        assert!(e.pointer_move(Point::new(25.0, 0.0), &mut s, Some(&info), 2.0));
        e.pointer_up(Point::new(25.0, 0.0), &s, Some(&info), &Viewport::new(CONTAINER));
        let d = s.get(0).unwrap();
        assert_eq!(d.bounding_box.x, 120.0);
        assert_eq!(d.annotation_type, AnnotationType::Edited);
        assert_eq!(e.mode(), EditorMode::Editing);
        assert_eq!(e.selected(), Some(0));
    }

    #[test]
    fn drag_past_edge_stops_at_boundary() {
        let mut s = store();
        let mut e = editing(&s);
        let info = info();
        e.begin_drag(1, Point::new(0.0, 0.0), &s);
        e.pointer_move(Point::new(10_000.0, -10_000.0), &mut s, Some(&info), 1.0);
        let b = s.get(1).unwrap().bounding_box;
        assert_eq!(b.right(), 640.0);
        assert_eq!(b.top(), 0.0);
    }

    // -- resize --

    #[test]
    fn east_handle_keeps_west_edge() {
        let b = BoundingBox::new(100.0, 100.0, 40.0, 40.0);
        let r = ResizeHandle::East.apply(&b, 20.0, 5.0, Size::new(640.0, 480.0));
        assert_eq!(r.left(), 80.0);
        assert_eq!(r.right(), 140.0);
        assert_eq!(r.height, 40.0);
    }

    #[test]
    fn corner_handle_adjusts_both_axes_and_recenters() {
        let b = BoundingBox::new(100.0, 100.0, 40.0, 40.0);
        let r = ResizeHandle::NorthWest.apply(&b, -10.0, -20.0, Size::new(640.0, 480.0));
        assert_eq!((r.left(), r.top(), r.right(), r.bottom()), (70.0, 60.0, 120.0, 120.0));
        assert_eq!(r.center(), Point::new(95.0, 90.0));
    }

    #[test]
    fn resize_enforces_minimum_side() {
        let b = BoundingBox::new(100.0, 100.0, 40.0, 40.0);
        let r = ResizeHandle::South.apply(&b, 0.0, -500.0, Size::new(640.0, 480.0));
        assert_eq!(r.height, MIN_BOX_SIDE);
        assert_eq!(r.top(), 80.0);
        let r = ResizeHandle::West.apply(&b, 500.0, 0.0, Size::new(640.0, 480.0));
        assert_eq!(r.width, MIN_BOX_SIDE);
        assert_eq!(r.right(), 120.0);
    }

    #[test]
    fn undersized_box_at_the_border_grows_to_minimum() {
        let image = Size::new(640.0, 480.0);
        let west = BoundingBox::new(2.0, 50.0, 4.0, 4.0);
        let r = ResizeHandle::West.apply(&west, -5.0, 0.0, image);
        assert_eq!((r.left(), r.right()), (0.0, MIN_BOX_SIDE));

        let corner = BoundingBox::new(638.0, 478.0, 4.0, 4.0);
        let r = ResizeHandle::SouthEast.apply(&corner, 3.0, 3.0, image);
        assert_eq!((r.left(), r.right()), (630.0, 640.0));
        assert_eq!((r.top(), r.bottom()), (470.0, 480.0));
    }

    #[test]
    fn resize_stops_at_image_edge() {
        let b = BoundingBox::new(100.0, 100.0, 40.0, 40.0);
        let r = ResizeHandle::NorthWest.apply(&b, -500.0, -500.0, Size::new(640.0, 480.0));
        assert_eq!((r.left(), r.top()), (0.0, 0.0));
    }

    #[test]
    fn resize_through_editor_marks_edited() {
        let mut s = store();
        let mut e = editing(&s);
        let info = info();
        e.begin_resize(0, ResizeHandle::SouthEast, Point::new(0.0, 0.0), &s);
        e.pointer_move(Point::new(12.5, 12.5), &mut s, Some(&info), 1.0);
        let d = s.get(0).unwrap();
        assert_eq!(d.bounding_box.width, 60.0);
        assert_eq!(d.annotation_type, AnnotationType::Edited);
    }

    // -- drawing --

    #[test]
    fn tiny_screen_rectangle_is_discarded() {
        let v = Viewport::new(CONTAINER);
        let out = finish_drawing(Point::new(10.0, 10.0), Point::new(29.0, 60.0), Some(&info()), &v, Some(Size::new(640.0, 480.0)));
        assert_eq!(out, DrawOutcome::Rejected(DrawRejection::TooSmallOnScreen));
    }

    #[test]
    fn twenty_pixels_on_screen_is_enough() {
        let v = Viewport::new(CONTAINER);
        let out = finish_drawing(Point::new(10.0, 10.0), Point::new(30.0, 30.0), Some(&info()), &v, Some(Size::new(640.0, 480.0)));
        assert_matches!(out, DrawOutcome::Pending(b) if b.width == 32.0 && b.height == 32.0);
    }

    #[test]
    fn drawing_outside_image_is_rejected() {
        // Released left of the container: maps past the image's left edge.
        let v = Viewport::new(CONTAINER);
        let out = finish_drawing(Point::new(-20.0, 10.0), Point::new(60.0, 80.0), Some(&info()), &v, Some(Size::new(640.0, 480.0)));
        assert_eq!(out, DrawOutcome::Rejected(DrawRejection::OutOfBounds));
    }

    #[test]
    fn drawing_too_small_in_image_is_rejected() {
        // Zoomed 5x: a 30px screen box is 6 container px, under 10 image px.
        let mut v = Viewport::new(Size::new(640.0, 480.0));
        v.set_zoom(5.0);
        let info = RenderInfo::compute(Size::new(640.0, 480.0), Size::new(640.0, 480.0)).unwrap();
        let out = finish_drawing(Point::new(300.0, 200.0), Point::new(330.0, 230.0), Some(&info), &v, Some(Size::new(640.0, 480.0)));
        assert_eq!(out, DrawOutcome::Rejected(DrawRejection::TooSmallInImage));
    }

    #[test]
    fn drawing_inverts_zoom_and_pan() {
        let mut v = Viewport::new(CONTAINER);
        v.set_zoom(2.0);
        v.pan_by(40.0, 0.0);
        let info = info();
        let start = v.forward(info.image_to_container(Point::new(200.0, 160.0)));
        let end = v.forward(info.image_to_container(Point::new(260.0, 240.0)));
        let out = finish_drawing(start, end, Some(&info), &v, Some(Size::new(640.0, 480.0)));
        let DrawOutcome::Pending(b) = out else {
            panic!("expected a pending contour, got {out:?}");
        };
        assert!((b.x - 230.0).abs() < 1e-9);
        assert!((b.y - 200.0).abs() < 1e-9);
        assert!((b.width - 60.0).abs() < 1e-9);
        assert!((b.height - 80.0).abs() < 1e-9);
    }

    #[test]
    fn confirmed_drawing_appends_manual_detection() {
        let mut s = store();
        let mut e = editing(&s);
        let info = info();
        let v = Viewport::new(CONTAINER);
        e.begin_add_contour();
        e.begin_draw(Point::new(200.0, 150.0));
        e.pointer_move(Point::new(250.0, 200.0), &mut s, Some(&info), 1.0);
        assert_matches!(e.pointer_up(Point::new(250.0, 200.0), &s, Some(&info), &v), Some(DrawOutcome::Pending(_)));
        assert_matches!(e.mode(), EditorMode::ConfirmingContour { .. });

        let idx = e
            .confirm_new_contour(ClassLabel::default_for_new_contour(), None, "alice", &mut s)
            .unwrap();
        let d = s.get(idx).unwrap();
        assert_eq!(d.label_number, 3);
        assert_eq!(d.annotation_type, AnnotationType::Manual);
        assert_eq!(d.created_by.as_deref(), Some("alice"));
        assert_eq!(e.mode(), EditorMode::Editing);
    }

    // -- delete / selection --

    fn add_contour(e: &mut ContourEditor, s: &mut DetectionStore) -> usize {
        e.begin_add_contour();
        e.begin_draw(Point::new(200.0, 150.0));
        e.pointer_up(Point::new(250.0, 200.0), s, Some(&info()), &Viewport::new(CONTAINER));
        e.confirm_new_contour(ClassLabel::LooseJointRed, None, "alice", s).unwrap()
    }

    #[test]
    fn removing_earlier_entry_shifts_selection() {
        let mut s = store();
        let mut e = editing(&s);
        let first = add_contour(&mut e, &mut s);
        let second = add_contour(&mut e, &mut s);
        assert_eq!((first, second), (2, 3));

        e.select(second, &s);
        assert_eq!(e.delete(first, &mut s, "alice"), Some(DeleteOutcome::Removed { index: 2 }));
        assert_eq!(e.selected(), Some(2));
        assert_eq!(s.get(2).unwrap().label_number, 4);

        e.select(0, &s);
        assert_eq!(e.delete(0, &mut s, "alice"), Some(DeleteOutcome::SoftDeleted));
        assert_eq!(e.selected(), None);
    }

    #[test]
    fn cancel_restores_pre_edit_state() {
        let mut s = store();
        let before = s.detections().to_vec();
        let mut e = editing(&s);
        e.begin_drag(0, Point::new(0.0, 0.0), &s);
        e.pointer_move(Point::new(50.0, 50.0), &mut s, Some(&info()), 1.0);
        e.pointer_up(Point::new(50.0, 50.0), &s, Some(&info()), &Viewport::new(CONTAINER));
        e.delete(1, &mut s, "alice");
        assert!(e.cancel_edits(&mut s));
        assert_eq!(s.detections(), &before[..]);
        assert_eq!(e.mode(), EditorMode::Viewing);
    }

    #[test]
    fn confirm_keeps_changes() {
        let mut s = store();
        let mut e = editing(&s);
        e.delete(0, &mut s, "alice");
        assert!(e.confirm_edits());
        assert!(s.get(0).unwrap().is_deleted());
        assert!(!e.cancel_edits(&mut s));
    }
}
