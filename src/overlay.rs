//! Bounding-box overlay: where each detection is drawn and how it looks.

use crate::classes::Severity;
use crate::detection::{AnnotationType, Detection};
use crate::geometry::{Point, Rect};
use crate::render::RenderInfo;
use crate::viewport::Viewport;
use std::cmp::Ordering;

/// Confidence threshold (percent) plus the "show low confidence" toggle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConfidenceFilter {
    pub threshold_percent: f64,
    pub show_low_confidence: bool,
}

impl Default for ConfidenceFilter {
    fn default() -> Self {
        Self {
            threshold_percent: 50.0,
            show_low_confidence: false,
        }
    }
}

impl ConfidenceFilter {
    pub fn new(threshold_percent: f64, show_low_confidence: bool) -> Self {
        Self {
            threshold_percent: threshold_percent.clamp(0.0, 100.0),
            show_low_confidence,
        }
    }

    pub fn is_low(&self, confidence: f64) -> bool {
        confidence * 100.0 < self.threshold_percent
    }

    pub fn is_visible(&self, detection: &Detection) -> bool {
        self.show_low_confidence || !self.is_low(detection.confidence)
    }
}

/// Box position as percentages of the unzoomed container.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PercentRect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl PercentRect {
    pub fn from_detection(detection: &Detection, info: &RenderInfo) -> Self {
        let b = &detection.bounding_box;
        let left = b.left() * info.scale_x + info.offset_x;
        let top = b.top() * info.scale_y + info.offset_y;
        Self {
            left: left / info.container_width * 100.0,
            top: top / info.container_height * 100.0,
            width: b.width * info.scale_x / info.container_width * 100.0,
            height: b.height * info.scale_y / info.container_height * 100.0,
        }
    }

    /// Unzoomed container pixels.
    pub fn to_container(&self, info: &RenderInfo) -> Rect {
        Rect {
            x: self.left / 100.0 * info.container_width,
            y: self.top / 100.0 * info.container_height,
            width: self.width / 100.0 * info.container_width,
            height: self.height / 100.0 * info.container_height,
        }
    }
}

/// Box color scheme, picked in priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoxTone {
    Deleted,
    LowConfidence,
    Normal,
    Critical,
    Potential,
}

impl BoxTone {
    pub fn classify(detection: &Detection, filter: &ConfidenceFilter) -> Self {
        if detection.is_deleted() {
            BoxTone::Deleted
        } else if filter.is_low(detection.confidence) {
            BoxTone::LowConfidence
        } else if detection.class.is_normal() {
            BoxTone::Normal
        } else if detection.class.severity() == Severity::Critical {
            BoxTone::Critical
        } else {
            BoxTone::Potential
        }
    }

    pub fn border_color(self) -> &'static str {
        match self {
            BoxTone::Deleted => "#f87171",
            BoxTone::LowConfidence => "#9ca3af",
            BoxTone::Normal => "#4ade80",
            BoxTone::Critical => "#f87171",
            BoxTone::Potential => "#facc15",
        }
    }

    /// Fill with alpha; `#rrggbbaa`.
    pub fn fill_color(self) -> &'static str {
        match self {
            BoxTone::Deleted => "#00000000",
            BoxTone::LowConfidence => "#9ca3af33",
            BoxTone::Normal => "#4ade8033",
            BoxTone::Critical => "#f8717133",
            BoxTone::Potential => "#facc1533",
        }
    }

    pub fn badge_color(self) -> &'static str {
        match self {
            BoxTone::Deleted => "#dc2626",
            BoxTone::LowConfidence => "#6b7280",
            BoxTone::Normal => "#22c55e",
            BoxTone::Critical => "#ef4444",
            BoxTone::Potential => "#eab308",
        }
    }

    pub fn is_dashed(self) -> bool {
        matches!(self, BoxTone::Deleted | BoxTone::LowConfidence)
    }
}

/// Provenance badge color in the detection list.
pub fn provenance_color(detection: &Detection) -> &'static str {
    match detection.annotation_type {
        AnnotationType::Manual => "#4f46e5",
        AnnotationType::Edited => "#0891b2",
        AnnotationType::Deleted => "#dc2626",
        AnnotationType::DetectedByAI if detection.class.is_normal() => "#16a34a",
        AnnotationType::DetectedByAI => match detection.class.severity() {
            Severity::Critical => "#dc2626",
            Severity::Potential => "#ca8a04",
        },
    }
}

/// One box ready to paint.
#[derive(Debug, Clone, PartialEq)]
pub struct OverlayItem {
    /// Position in the detection store.
    pub index: usize,
    pub label_number: u32,
    pub percent: PercentRect,
    /// On-screen rectangle after zoom and pan.
    pub screen: Rect,
    pub tone: BoxTone,
    pub deleted: bool,
    pub low_confidence: bool,
}

/// Visible boxes for the current render info and viewport, in store order.
pub fn build_overlay(
    detections: &[Detection],
    info: &RenderInfo,
    viewport: &Viewport,
    filter: &ConfidenceFilter,
) -> Vec<OverlayItem> {
    detections
        .iter()
        .enumerate()
        .filter(|(_, d)| filter.is_visible(d))
        .map(|(index, d)| {
            let percent = PercentRect::from_detection(d, info);
            OverlayItem {
                index,
                label_number: d.label_number,
                percent,
                screen: screen_rect(&percent.to_container(info), viewport),
                tone: BoxTone::classify(d, filter),
                deleted: d.is_deleted(),
                low_confidence: filter.is_low(d.confidence),
            }
        })
        .collect()
}

/// Map an unzoomed container rectangle to the screen.
pub fn screen_rect(rect: &Rect, viewport: &Viewport) -> Rect {
    let tl = viewport.forward(Point::new(rect.x, rect.y));
    let br = viewport.forward(Point::new(rect.right(), rect.bottom()));
    Rect::from_corners(tl, br)
}

/// Indices of visible detections ordered for the list panel: labelled
/// entries by label, unlabelled ones after them by confidence descending.
pub fn card_order(detections: &[Detection], filter: &ConfidenceFilter) -> Vec<usize> {
    let mut order: Vec<usize> = detections
        .iter()
        .enumerate()
        .filter(|(_, d)| filter.is_visible(d))
        .map(|(i, _)| i)
        .collect();
    order.sort_by(|&a, &b| {
        let (da, db) = (&detections[a], &detections[b]);
        match (da.label_number, db.label_number) {
            (0, 0) => db
                .confidence
                .partial_cmp(&da.confidence)
                .unwrap_or(Ordering::Equal),
            (0, _) => Ordering::Greater,
            (_, 0) => Ordering::Less,
            (la, lb) => la.cmp(&lb),
        }
    });
    order
}

/// Visible detections that are not deleted.
pub fn active_count(detections: &[Detection], filter: &ConfidenceFilter) -> usize {
    detections
        .iter()
        .filter(|d| filter.is_visible(d) && !d.is_deleted())
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Size;
    use serde_json::json;

    fn det(conf: f64, class: &str, label: u32) -> Detection {
        serde_json::from_value(json!({
            "class": class,
            "confidence": conf,
            "labelNumber": label,
            "bounding_box": {"x": 320.0, "y": 240.0, "width": 64.0, "height": 48.0}
        }))
        .unwrap()
    }

    fn info() -> RenderInfo {
        // 640x480 into 400x300: same aspect, scale 0.625, no offset.
        RenderInfo::compute(Size::new(640.0, 480.0), Size::new(400.0, 300.0)).unwrap()
    }

    #[test]
    fn low_confidence_is_hidden_unless_toggled() {
        let list = vec![
            det(0.9, "point_overload_red", 1),
            det(0.4, "point_overload_red", 2),
            det(0.6, "point_overload_red", 3),
        ];
        let viewport = Viewport::new(Size::new(400.0, 300.0));

        let hidden = ConfidenceFilter::new(50.0, false);
        let items = build_overlay(&list, &info(), &viewport, &hidden);
        assert_eq!(items.iter().map(|i| i.index).collect::<Vec<_>>(), vec![0, 2]);
        assert_eq!(active_count(&list, &hidden), 2);

        let shown = ConfidenceFilter::new(50.0, true);
        let items = build_overlay(&list, &info(), &viewport, &shown);
        assert_eq!(items.len(), 3);
        assert_eq!(items[1].tone, BoxTone::LowConfidence);
        assert!(items[1].low_confidence);
        assert!(items[1].tone.is_dashed());
    }

    #[test]
    fn threshold_is_inclusive_at_boundary() {
        let f = ConfidenceFilter::new(50.0, false);
        assert!(!f.is_low(0.5));
        assert!(f.is_low(0.499));
    }

    #[test]
    fn percent_rect_uses_top_left_from_center() {
        let p = PercentRect::from_detection(&det(0.9, "x", 1), &info());
        // left = (320 - 32) * 0.625 = 180 -> 45%
        assert!((p.left - 45.0).abs() < 1e-9);
        assert!((p.top - 45.0).abs() < 1e-9);
        assert!((p.width - 10.0).abs() < 1e-9);
        assert!((p.height - 10.0).abs() < 1e-9);
    }

    #[test]
    fn screen_rect_follows_zoom() {
        let mut viewport = Viewport::new(Size::new(400.0, 300.0));
        viewport.set_zoom(2.0);
        let r = screen_rect(&Rect { x: 180.0, y: 135.0, width: 40.0, height: 30.0 }, &viewport);
        assert_eq!(r, Rect { x: 160.0, y: 120.0, width: 80.0, height: 60.0 });
    }

    #[test]
    fn tone_priority_order() {
        let f = ConfidenceFilter::default();
        let mut d = det(0.3, "normal", 1);
        d.annotation_type = AnnotationType::Deleted;
        assert_eq!(BoxTone::classify(&d, &f), BoxTone::Deleted);
        assert_eq!(BoxTone::classify(&det(0.3, "normal", 1), &f), BoxTone::LowConfidence);
        assert_eq!(BoxTone::classify(&det(0.9, "normal_red", 1), &f), BoxTone::Normal);
        assert_eq!(BoxTone::classify(&det(0.9, "loose_joint_red", 1), &f), BoxTone::Critical);
        assert_eq!(BoxTone::classify(&det(0.9, "loose_joint_yellow", 1), &f), BoxTone::Potential);
    }

    #[test]
    fn cards_sort_by_label_then_confidence() {
        let list = vec![det(0.7, "a", 3), det(0.6, "a", 0), det(0.9, "a", 1), det(0.8, "a", 0)];
        let order = card_order(&list, &ConfidenceFilter::new(0.0, false));
        assert_eq!(order, vec![2, 0, 3, 1]);
    }

    #[test]
    fn provenance_badges() {
        let mut d = det(0.9, "point_overload_yellow", 1);
        assert_eq!(provenance_color(&d), "#ca8a04");
        d.annotation_type = AnnotationType::Manual;
        assert_eq!(provenance_color(&d), "#4f46e5");
    }
}
