//! One open inspection: the detections, how they are laid out on the
//! current image, and the user's interaction with them.
//!
//! All pointer coordinates are pane-local screen pixels, i.e. the space
//! [`Viewport::forward`] maps into.

use super::media::{AnalysisGuard, ImageSlot};
use crate::classes::ClassLabel;
use crate::detection::{AnnotationType, Detection, format_timestamp};
use crate::editor::{ContourEditor, DrawOutcome, EditorMode, ResizeHandle};
use crate::geometry::{Point, Rect, Size};
use crate::overlay::{
    BoxTone, ConfidenceFilter, OverlayItem, active_count, build_overlay, card_order, provenance_color,
    screen_rect,
};
use crate::render::{RenderInfo, RenderTracker};
use crate::repository::{Loaded, Source};
use crate::store::{DeleteOutcome, DetectionStore};
use crate::viewport::Viewport;

/// Grab radius around a resize handle, screen pixels.
pub const HANDLE_RADIUS: f64 = 7.0;

/// Side of the delete / restore button drawn on a box's top-right corner.
pub const BUTTON_SIZE: f64 = 18.0;

/// What lies under the pointer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hit {
    Handle { index: usize, handle: ResizeHandle },
    DeleteButton(usize),
    RestoreButton(usize),
    Body(usize),
    Empty,
}

/// One entry of the detection list panel.
#[derive(Debug, Clone, PartialEq)]
pub struct DetectionCard {
    pub index: usize,
    pub label_number: u32,
    pub class_name: String,
    pub confidence_percent: u32,
    pub annotation_type: AnnotationType,
    pub provenance_color: &'static str,
    pub tone: BoxTone,
    pub note: Option<String>,
    pub created_by: Option<String>,
    pub created_at: String,
    pub deleted_by: Option<String>,
    pub deleted: bool,
    pub low_confidence: bool,
    pub selected: bool,
}

/// Everything needed to persist confirmed edits.
#[derive(Debug, Clone, PartialEq)]
pub struct CommitPayload {
    pub transformer_id: String,
    pub inspection_id: String,
    pub detections: Vec<Detection>,
}

#[derive(Debug)]
pub struct InspectionSession {
    transformer_id: String,
    inspection_id: String,
    store: DetectionStore,
    tracker: RenderTracker,
    viewport: Viewport,
    editor: ContourEditor,
    filter: ConfidenceFilter,
    show_boxes: bool,
    source: Source,
    /// Last pointer position of an active pan gesture.
    panning: Option<Point>,
    pub baseline: ImageSlot,
    pub current: ImageSlot,
    pub analysis: AnalysisGuard,
}

impl InspectionSession {
    pub fn new(transformer_id: impl Into<String>, inspection_id: impl Into<String>, container: Size) -> Self {
        Self {
            transformer_id: transformer_id.into(),
            inspection_id: inspection_id.into(),
            store: DetectionStore::new(),
            tracker: RenderTracker::new(),
            viewport: Viewport::new(container),
            editor: ContourEditor::new(),
            filter: ConfidenceFilter::default(),
            show_boxes: true,
            source: Source::Empty,
            panning: None,
            baseline: ImageSlot::default(),
            current: ImageSlot::default(),
            analysis: AnalysisGuard::default(),
        }
    }

    pub fn transformer_id(&self) -> &str {
        &self.transformer_id
    }

    pub fn inspection_id(&self) -> &str {
        &self.inspection_id
    }

    pub fn store(&self) -> &DetectionStore {
        &self.store
    }

    pub fn editor(&self) -> &ContourEditor {
        &self.editor
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn render_info(&self) -> Option<&RenderInfo> {
        self.tracker.info()
    }

    pub fn filter(&self) -> ConfidenceFilter {
        self.filter
    }

    pub fn set_filter(&mut self, filter: ConfidenceFilter) {
        self.filter = filter;
    }

    pub fn show_boxes(&self) -> bool {
        self.show_boxes
    }

    pub fn set_show_boxes(&mut self, show: bool) {
        self.show_boxes = show;
    }

    /// Where the current list came from.
    pub fn source(&self) -> Source {
        self.source
    }

    pub fn is_offline_copy(&self) -> bool {
        matches!(self.source, Source::Cache { stale: true })
    }

    // ---- loading ----

    pub fn load_detections(&mut self, loaded: Loaded) {
        self.editor.reset();
        self.store.load_bulk(loaded.detections);
        self.source = loaded.source;
    }

    /// Replace the list with a fresh analysis result and lay the image out
    /// again.
    pub fn apply_analysis(&mut self, detections: Vec<Detection>) {
        self.editor.reset();
        self.store.load_bulk(detections);
        self.source = Source::Remote;
        self.tracker.reset();
        if let Some(natural) = self.store.image_size() {
            self.tracker.on_image_loaded(natural, self.viewport.container());
        }
    }

    /// The current image finished loading in a pane of size `container`.
    pub fn image_loaded(&mut self, natural: Size, container: Size) -> bool {
        self.store.set_image_size(natural);
        if self.viewport.container() != container {
            self.viewport.set_container(container);
        }
        self.tracker.on_image_loaded(natural, container)
    }

    /// A new image is about to be shown; forget the old layout.
    pub fn image_changed(&mut self) {
        self.tracker.reset();
        self.viewport.reset();
    }

    /// The pane was resized; recompute the layout for the same image.
    pub fn container_resized(&mut self, container: Size) {
        if container == self.viewport.container() {
            return;
        }
        self.viewport.set_container(container);
        self.tracker.reset();
        if let Some(natural) = self.store.image_size() {
            self.tracker.on_image_loaded(natural, container);
        }
    }

    // ---- viewport ----

    pub fn zoom_in(&mut self) {
        self.viewport.zoom_in();
    }

    pub fn zoom_out(&mut self) {
        self.viewport.zoom_out();
    }

    pub fn reset_view(&mut self) {
        self.viewport.reset();
    }

    pub fn is_panning(&self) -> bool {
        self.panning.is_some()
    }

    // ---- edit mode ----

    pub fn enter_edit_mode(&mut self) -> bool {
        self.editor.enter_edit_mode(&self.store)
    }

    /// Leave edit mode keeping the changes. Returns what must be persisted.
    pub fn confirm_edits(&mut self) -> Option<CommitPayload> {
        if !self.editor.confirm_edits() {
            return None;
        }
        let breakdown = self.store.type_breakdown();
        log::info!(
            "confirmed {} detections for inspection {}: {:?}",
            self.store.len(),
            self.inspection_id,
            breakdown
        );
        Some(self.commit_payload())
    }

    pub fn cancel_edits(&mut self) -> bool {
        self.editor.cancel_edits(&mut self.store)
    }

    pub fn commit_payload(&self) -> CommitPayload {
        CommitPayload {
            transformer_id: self.transformer_id.clone(),
            inspection_id: self.inspection_id.clone(),
            detections: self.store.detections().to_vec(),
        }
    }

    pub fn begin_add_contour(&mut self) -> bool {
        self.editor.begin_add_contour()
    }

    pub fn pending_contour(&self) -> bool {
        self.editor.pending_contour().is_some()
    }

    pub fn confirm_new_contour(&mut self, class: ClassLabel, note: Option<String>, user: &str) -> Option<usize> {
        self.editor.confirm_new_contour(class, note, user, &mut self.store)
    }

    pub fn cancel_new_contour(&mut self) -> bool {
        self.editor.cancel_new_contour()
    }

    pub fn delete_at(&mut self, index: usize, user: &str) -> Option<DeleteOutcome> {
        self.editor.delete(index, &mut self.store, user)
    }

    pub fn restore_at(&mut self, index: usize) -> bool {
        self.editor.restore(index, &mut self.store)
    }

    pub fn select(&mut self, index: usize) -> bool {
        self.editor.select(index, &self.store)
    }

    pub fn escape(&mut self) -> bool {
        self.panning = None;
        self.editor.escape()
    }

    // ---- pointer ----

    /// Topmost thing under `at`. Later boxes are drawn over earlier ones.
    pub fn hit_test(&self, at: Point) -> Hit {
        let items = self.overlay();
        let editing = self.editor.is_editing();

        let selected = self.editor.selected().filter(|_| editing);
        if let Some(item) = selected.and_then(|s| items.iter().find(|i| i.index == s)) {
            for handle in ResizeHandle::ALL {
                if Rect::around(handle.anchor(&item.screen), HANDLE_RADIUS).contains(at) {
                    return Hit::Handle { index: item.index, handle };
                }
            }
        }

        for item in items.iter().rev() {
            if editing && button_rect(&item.screen).contains(at) {
                return if item.deleted {
                    Hit::RestoreButton(item.index)
                } else {
                    Hit::DeleteButton(item.index)
                };
            }
            if !item.deleted && item.screen.contains(at) {
                return Hit::Body(item.index);
            }
        }
        Hit::Empty
    }

    /// Returns whether anything visible changed.
    pub fn pointer_down(&mut self, at: Point, user: &str) -> bool {
        match self.editor.mode() {
            EditorMode::AddingContour => self.editor.begin_draw(at),
            EditorMode::Editing => match self.hit_test(at) {
                Hit::Handle { index, handle } => self.editor.begin_resize(index, handle, at, &self.store),
                Hit::DeleteButton(index) => self.delete_at(index, user).is_some(),
                Hit::RestoreButton(index) => self.restore_at(index),
                Hit::Body(index) => self.editor.begin_drag(index, at, &self.store),
                Hit::Empty => {
                    self.editor.clear_selection();
                    self.start_pan(at);
                    true
                }
            },
            EditorMode::Viewing => self.start_pan(at),
            _ => false,
        }
    }

    pub fn pointer_move(&mut self, at: Point) -> bool {
        if let Some(last) = self.panning {
            self.viewport.pan_by(at.x - last.x, at.y - last.y);
            self.panning = Some(at);
            return true;
        }
        let zoom = self.viewport.zoom();
        self.editor
            .pointer_move(at, &mut self.store, self.tracker.info(), zoom)
    }

    pub fn pointer_up(&mut self, at: Point) -> Option<DrawOutcome> {
        if self.panning.take().is_some() {
            return None;
        }
        self.editor
            .pointer_up(at, &self.store, self.tracker.info(), &self.viewport)
    }

    fn start_pan(&mut self, at: Point) -> bool {
        if !self.viewport.can_pan() {
            return false;
        }
        self.panning = Some(at);
        true
    }

    // ---- presentation ----

    /// Boxes to paint; empty until the image has been laid out.
    pub fn overlay(&self) -> Vec<OverlayItem> {
        match (self.show_boxes, self.tracker.info()) {
            (true, Some(info)) => build_overlay(self.store.detections(), info, &self.viewport, &self.filter),
            _ => Vec::new(),
        }
    }

    /// Where the displayed image lands on screen after zoom and pan.
    pub fn image_screen_rect(&self) -> Option<Rect> {
        self.tracker.info().map(|info| {
            let displayed = Rect {
                x: info.offset_x,
                y: info.offset_y,
                width: info.display_width,
                height: info.display_height,
            };
            screen_rect(&displayed, &self.viewport)
        })
    }

    /// Rectangle being drawn, in screen pixels.
    pub fn drawing_rect(&self) -> Option<Rect> {
        match self.editor.mode() {
            EditorMode::Drawing { start, end } => Some(Rect::from_corners(start, end)),
            _ => None,
        }
    }

    pub fn detection_cards(&self) -> Vec<DetectionCard> {
        let detections = self.store.detections();
        card_order(detections, &self.filter)
            .into_iter()
            .map(|index| {
                let d = &detections[index];
                DetectionCard {
                    index,
                    label_number: d.label_number,
                    class_name: d.class.display_name().to_string(),
                    confidence_percent: (d.confidence * 100.0).round().clamp(0.0, 100.0) as u32,
                    annotation_type: d.annotation_type,
                    provenance_color: provenance_color(d),
                    tone: BoxTone::classify(d, &self.filter),
                    note: d.note.clone(),
                    created_by: d.created_by.clone(),
                    created_at: d.created_at.as_deref().map(format_timestamp).unwrap_or_default(),
                    deleted_by: d.deleted_by.clone(),
                    deleted: d.is_deleted(),
                    low_confidence: self.filter.is_low(d.confidence),
                    selected: self.editor.selected() == Some(index),
                }
            })
            .collect()
    }

    /// Visible, non-deleted detections.
    pub fn active_count(&self) -> usize {
        active_count(self.store.detections(), &self.filter)
    }
}

/// The delete / restore button centered on the box's top-right corner.
pub fn button_rect(screen: &Rect) -> Rect {
    Rect::around(Point::new(screen.right(), screen.y), BUTTON_SIZE / 2.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editor::DrawRejection;
    use assert_matches::assert_matches;
    use serde_json::json;

    const PANE: Size = Size::new(400.0, 300.0);
    const IMAGE: Size = Size::new(640.0, 480.0);

    fn det(id: &str, label: u32, x: f64, y: f64) -> Detection {
        serde_json::from_value(json!({
            "detection_id": id,
            "class": "loose_joint_red",
            "confidence": 0.9,
            "labelNumber": label,
            "bounding_box": {"x": x, "y": y, "width": 64.0, "height": 48.0}
        }))
        .unwrap()
    }

    /// Scale 0.625, no offsets: image (320,240) sits at screen (200,150).
    fn session() -> InspectionSession {
        let mut s = InspectionSession::new("T-100", "7", PANE);
        s.load_detections(Loaded {
            detections: vec![det("a", 1, 160.0, 120.0), det("b", 2, 480.0, 360.0)],
            source: Source::Remote,
        });
        assert!(s.image_loaded(IMAGE, PANE));
        s
    }

    #[test]
    fn overlay_waits_for_layout() {
        let mut s = InspectionSession::new("T-100", "7", PANE);
        s.load_detections(Loaded {
            detections: vec![det("a", 1, 160.0, 120.0)],
            source: Source::Remote,
        });
        assert!(s.overlay().is_empty());
        s.image_loaded(IMAGE, PANE);
        assert_eq!(s.overlay().len(), 1);
        assert!(!s.image_loaded(IMAGE, PANE));
    }

    #[test]
    fn hit_test_finds_body_and_buttons() {
        let mut s = session();
        // Box a: center (100, 75) on screen, 40x30.
        assert_eq!(s.hit_test(Point::new(100.0, 75.0)), Hit::Body(0));
        assert_eq!(s.hit_test(Point::new(5.0, 295.0)), Hit::Empty);

        s.enter_edit_mode();
        assert_eq!(s.hit_test(Point::new(120.0, 60.0)), Hit::DeleteButton(0));
    }

    #[test]
    fn handles_only_on_selected_box() {
        let mut s = session();
        s.enter_edit_mode();
        let corner = Point::new(120.0, 90.0);
        assert_eq!(s.hit_test(corner), Hit::Body(0));
        assert!(s.select(0));
        assert_eq!(
            s.hit_test(corner),
            Hit::Handle { index: 0, handle: ResizeHandle::SouthEast }
        );
    }

    #[test]
    fn drag_moves_box_in_image_pixels() {
        let mut s = session();
        s.enter_edit_mode();
        assert!(s.pointer_down(Point::new(100.0, 75.0), "ann"));
        assert!(s.pointer_move(Point::new(110.0, 80.0)));
        assert_eq!(s.pointer_up(Point::new(110.0, 80.0)), None);

        let moved = &s.store().detections()[0];
        assert!((moved.bounding_box.x - 176.0).abs() < 1e-9);
        assert!((moved.bounding_box.y - 128.0).abs() < 1e-9);
        assert_eq!(moved.annotation_type, AnnotationType::Edited);
    }

    #[test]
    fn delete_button_soft_deletes_ai_detection() {
        let mut s = session();
        s.enter_edit_mode();
        assert!(s.pointer_down(Point::new(120.0, 60.0), "ann"));
        assert!(s.store().detections()[0].is_deleted());
        assert_eq!(s.hit_test(Point::new(120.0, 60.0)), Hit::RestoreButton(0));
        assert_eq!(s.active_count(), 1);

        assert!(s.pointer_down(Point::new(120.0, 60.0), "ann"));
        assert!(!s.store().detections()[0].is_deleted());
    }

    #[test]
    fn drawing_a_contour_adds_manual_detection() {
        let mut s = session();
        s.enter_edit_mode();
        assert!(s.begin_add_contour());
        assert!(s.pointer_down(Point::new(250.0, 20.0), "ann"));
        s.pointer_move(Point::new(300.0, 60.0));
        assert!(s.drawing_rect().is_some());
        assert_matches!(s.pointer_up(Point::new(300.0, 60.0)), Some(DrawOutcome::Pending(_)));
        assert!(s.pending_contour());

        let index = s.confirm_new_contour(ClassLabel::PointOverloadYellow, None, "ann").unwrap();
        let added = &s.store().detections()[index];
        assert_eq!(added.label_number, 3);
        assert_eq!(added.annotation_type, AnnotationType::Manual);
    }

    #[test]
    fn tiny_drawing_is_discarded() {
        let mut s = session();
        s.enter_edit_mode();
        s.begin_add_contour();
        s.pointer_down(Point::new(250.0, 20.0), "ann");
        assert_matches!(
            s.pointer_up(Point::new(260.0, 25.0)),
            Some(DrawOutcome::Rejected(DrawRejection::TooSmallOnScreen))
        );
        assert!(!s.pending_contour());
        assert_eq!(s.editor().mode(), EditorMode::Editing);
    }

    #[test]
    fn cancel_restores_and_confirm_returns_payload() {
        let mut s = session();
        s.enter_edit_mode();
        s.delete_at(1, "ann");
        assert!(s.cancel_edits());
        assert!(!s.store().detections()[1].is_deleted());

        s.enter_edit_mode();
        s.delete_at(1, "ann");
        let payload = s.confirm_edits().unwrap();
        assert_eq!(payload.transformer_id, "T-100");
        assert_eq!(payload.detections.len(), 2);
        assert!(payload.detections[1].is_deleted());
        assert!(s.confirm_edits().is_none());
    }

    #[test]
    fn pan_only_when_zoomed() {
        let mut s = session();
        assert!(!s.pointer_down(Point::new(10.0, 10.0), "ann"));
        s.zoom_in();
        assert!(s.pointer_down(Point::new(10.0, 10.0), "ann"));
        s.pointer_move(Point::new(30.0, 10.0));
        assert_eq!(s.pointer_up(Point::new(30.0, 10.0)), None);
        assert_eq!(s.viewport().pan(), (20.0, 0.0));
    }

    #[test]
    fn image_rect_follows_zoom() {
        let mut s = session();
        assert_eq!(s.image_screen_rect(), Some(Rect { x: 0.0, y: 0.0, width: 400.0, height: 300.0 }));
        s.zoom_in();
        let r = s.image_screen_rect().unwrap();
        assert!((r.width - 480.0).abs() < 1e-9);
        assert!((r.x + 40.0).abs() < 1e-9);
    }

    #[test]
    fn cards_follow_filter_and_selection() {
        let mut s = session();
        s.enter_edit_mode();
        s.select(1);
        let cards = s.detection_cards();
        assert_eq!(cards.len(), 2);
        assert_eq!(cards[0].class_name, "Loose Joint Faulty");
        assert_eq!(cards[0].confidence_percent, 90);
        assert!(cards[1].selected);

        s.set_filter(ConfidenceFilter::new(95.0, false));
        assert!(s.detection_cards().is_empty());
        assert!(s.overlay().is_empty());
    }

    #[test]
    fn stale_source_is_reported() {
        let mut s = InspectionSession::new("T-100", "7", PANE);
        s.load_detections(Loaded {
            detections: vec![det("a", 1, 160.0, 120.0)],
            source: Source::Cache { stale: true },
        });
        assert!(s.is_offline_copy());
        s.apply_analysis(vec![det("n", 0, 100.0, 100.0)]);
        assert!(!s.is_offline_copy());
        assert_eq!(s.store().detections()[0].label_number, 1);
    }
}
