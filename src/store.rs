//! In-memory detection list for one inspection.

use crate::detection::{AnnotationType, Detection, USER_ID_PREFIX, now_timestamp};
use crate::geometry::{BoundingBox, Size};
use std::collections::{BTreeMap, HashSet};
use uuid::Uuid;

/// What a delete request did to the list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// The entry was physically removed from position `index`.
    Removed { index: usize },
    /// The entry stays in the list with type `Deleted`.
    SoftDeleted,
}

/// Owns the detection list and enforces label uniqueness.
///
/// Operations addressing an unknown id are no-ops.
#[derive(Debug, Default, Clone)]
pub struct DetectionStore {
    detections: Vec<Detection>,
    image_size: Option<Size>,
    /// Manual entries appended since the last bulk load.
    session_created: HashSet<String>,
}

impl DetectionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn detections(&self) -> &[Detection] {
        &self.detections
    }

    pub fn len(&self) -> usize {
        self.detections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.detections.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Detection> {
        self.detections.get(index)
    }

    pub fn index_of(&self, id: &str) -> Option<usize> {
        self.detections.iter().position(|d| d.id == id)
    }

    pub fn find(&self, id: &str) -> Option<&Detection> {
        self.index_of(id).map(|i| &self.detections[i])
    }

    /// Natural size of the inspected image; geometry updates are confined to it.
    pub fn set_image_size(&mut self, size: Size) {
        self.image_size = (!size.is_empty()).then_some(size);
    }

    pub fn image_size(&self) -> Option<Size> {
        self.image_size
    }

    /// Replace the whole list (backend load, cache load or fresh analysis).
    pub fn load_bulk(&mut self, detections: Vec<Detection>) {
        self.detections = normalize_labels(detections);
        self.session_created.clear();
        let mut seen = HashSet::new();
        for (i, d) in self.detections.iter_mut().enumerate() {
            if d.id.is_empty() || !seen.insert(d.id.clone()) {
                d.id = format!("det_{}_{}", d.label_number, i);
                seen.insert(d.id.clone());
            }
        }
        log::debug!("loaded {} detections", self.detections.len());
    }

    pub fn max_label(&self) -> u32 {
        self.detections.iter().map(|d| d.label_number).max().unwrap_or(0)
    }

    /// Label for a new detection: one past the highest, or the smallest
    /// free one once the highest is `u32::MAX`.
    fn next_label(&self) -> u32 {
        if let Some(next) = self.max_label().checked_add(1) {
            return next;
        }
        let used: HashSet<u32> = self.detections.iter().map(|d| d.label_number).collect();
        (1..=u32::MAX).find(|n| !used.contains(n)).unwrap_or(u32::MAX)
    }

    /// Append a user-created detection. Assigns the next label number and a
    /// fresh `user_` id. Returns the new index.
    pub fn append(&mut self, mut detection: Detection) -> usize {
        detection.label_number = self.next_label();
        detection.id = format!("{USER_ID_PREFIX}{}", Uuid::now_v7().simple());
        if detection.is_manual() {
            self.session_created.insert(detection.id.clone());
        }
        log::debug!(
            "appended {} as #{} ({})",
            detection.id,
            detection.label_number,
            detection.class
        );
        self.detections.push(detection);
        self.detections.len() - 1
    }

    /// True for Manual entries appended since the last bulk load.
    pub fn is_session_created(&self, id: &str) -> bool {
        self.session_created.contains(id) && self.find(id).is_some_and(Detection::is_manual)
    }

    /// Replace a detection's box. The box is confined to the image, and an
    /// AI detection whose geometry really changed becomes `Edited`.
    /// Deleted detections are not editable. Returns whether the box changed.
    pub fn update_geometry(&mut self, id: &str, new_box: BoundingBox) -> bool {
        let Some(index) = self.index_of(id) else {
            return false;
        };
        self.update_geometry_at(index, new_box)
    }

    pub(crate) fn update_geometry_at(&mut self, index: usize, new_box: BoundingBox) -> bool {
        let image_size = self.image_size;
        let Some(detection) = self.detections.get_mut(index) else {
            return false;
        };
        if detection.is_deleted() {
            return false;
        }
        let new_box = match image_size {
            Some(size) => new_box.confined_to(size),
            None => new_box,
        };
        let changed = detection.bounding_box.differs(&new_box);
        detection.bounding_box = new_box;
        if changed && detection.annotation_type == AnnotationType::DetectedByAI {
            log::debug!("detection {} edited", detection.id);
            detection.annotation_type = AnnotationType::Edited;
        }
        changed
    }

    /// Delete by id: session-created Manual entries are removed, everything
    /// else is marked `Deleted` with the deleting user and time.
    pub fn soft_delete(&mut self, id: &str, user: &str) -> Option<DeleteOutcome> {
        let index = self.index_of(id)?;
        if self.is_session_created(id) {
            self.detections.remove(index);
            self.session_created.remove(id);
            log::debug!("removed unsaved contour {id}");
            return Some(DeleteOutcome::Removed { index });
        }

        let detection = &mut self.detections[index];
        if detection.is_deleted() {
            return Some(DeleteOutcome::SoftDeleted);
        }
        detection.previous_annotation_type = Some(detection.annotation_type);
        detection.annotation_type = AnnotationType::Deleted;
        detection.deleted_by = Some(user.to_string());
        detection.deleted_at = Some(now_timestamp());
        log::debug!("soft-deleted {id}");
        Some(DeleteOutcome::SoftDeleted)
    }

    /// Undo a soft delete. Returns false when the id is unknown or the entry
    /// is not deleted.
    pub fn restore(&mut self, id: &str) -> bool {
        let Some(detection) = self.detections.iter_mut().find(|d| d.id == id) else {
            return false;
        };
        if !detection.is_deleted() {
            return false;
        }
        detection.annotation_type = detection
            .previous_annotation_type
            .take()
            .filter(|t| *t != AnnotationType::Deleted)
            .unwrap_or_default();
        detection.deleted_by = None;
        detection.deleted_at = None;
        log::debug!("restored {id} as {}", detection.annotation_type);
        true
    }

    /// Copy of the list, e.g. to restore on cancel.
    pub fn snapshot(&self) -> StoreSnapshot {
        StoreSnapshot {
            detections: self.detections.clone(),
            session_created: self.session_created.clone(),
        }
    }

    pub fn replace_all(&mut self, snapshot: StoreSnapshot) {
        self.detections = snapshot.detections;
        self.session_created = snapshot.session_created;
    }

    /// Remove everything, e.g. before a fresh analysis.
    pub fn clear(&mut self) {
        self.detections.clear();
        self.session_created.clear();
    }

    /// Number of detections per annotation type.
    pub fn type_breakdown(&self) -> BTreeMap<String, usize> {
        type_breakdown(&self.detections)
    }
}

#[derive(Debug, Clone, Default)]
pub struct StoreSnapshot {
    detections: Vec<Detection>,
    session_created: HashSet<String>,
}

/// Give every detection a unique positive label.
///
/// The first holder of each valid label keeps it; missing, invalid and
/// duplicate labels get the smallest unused positive integer, in list order.
pub fn normalize_labels(mut detections: Vec<Detection>) -> Vec<Detection> {
    let mut used = HashSet::new();
    let keeps: Vec<bool> = detections
        .iter()
        .map(|d| d.label_number != 0 && used.insert(d.label_number))
        .collect();

    let mut next = 1u32;
    for (d, keep) in detections.iter_mut().zip(keeps) {
        if keep {
            continue;
        }
        while used.contains(&next) {
            next += 1;
        }
        d.label_number = next;
        used.insert(next);
    }
    detections
}

pub fn type_breakdown(detections: &[Detection]) -> BTreeMap<String, usize> {
    let mut counts: BTreeMap<String, usize> = AnnotationType::ALL
        .iter()
        .map(|t| (t.wire_name().to_string(), 0))
        .collect();
    for d in detections {
        *counts
            .entry(d.annotation_type.wire_name().to_string())
            .or_default() += 1;
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classes::ClassLabel;
    use assert_matches::assert_matches;

    fn ai(id: &str, label: u32) -> Detection {
        let mut d: Detection = serde_json::from_value(serde_json::json!({
            "detection_id": id,
            "class": "point_overload_red",
            "confidence": 0.9,
            "bounding_box": {"x": 100.0, "y": 100.0, "width": 40.0, "height": 40.0}
        }))
        .unwrap();
        d.label_number = label;
        d
    }

    fn manual() -> Detection {
        Detection::manual(
            ClassLabel::LooseJointYellow,
            BoundingBox::new(50.0, 50.0, 20.0, 20.0),
            Some("hot spot".into()),
            "alice",
        )
    }

    fn store() -> DetectionStore {
        let mut s = DetectionStore::new();
        s.set_image_size(Size::new(640.0, 480.0));
        s.load_bulk(vec![ai("a", 1), ai("b", 2)]);
        s
    }

    fn labels(s: &DetectionStore) -> Vec<u32> {
        s.detections().iter().map(|d| d.label_number).collect()
    }

    // -- label normalization --

    #[test]
    fn normalization_keeps_valid_and_fills_gaps_in_order() {
        let out = normalize_labels(vec![ai("a", 0), ai("b", 2), ai("c", 2), ai("d", 5), ai("e", 0)]);
        let got: Vec<u32> = out.iter().map(|d| d.label_number).collect();
        assert_eq!(got, vec![1, 2, 3, 5, 4]);
    }

    #[test]
    fn normalization_never_steals_a_valid_label() {
        let out = normalize_labels(vec![ai("a", 0), ai("b", 1), ai("c", 0)]);
        let got: Vec<u32> = out.iter().map(|d| d.label_number).collect();
        assert_eq!(got, vec![2, 1, 3]);
    }

    #[test]
    fn bulk_load_assigns_missing_and_duplicate_ids() {
        let mut s = DetectionStore::new();
        s.load_bulk(vec![ai("", 0), ai("x", 0), ai("x", 0)]);
        let ids: HashSet<&str> = s.detections().iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids.len(), 3);
        assert!(ids.contains("x"));
    }

    // -- append --

    #[test]
    fn append_uses_next_label_and_user_prefix() {
        let mut s = store();
        let idx = s.append(manual());
        let id = s.get(idx).unwrap().id.clone();
        let d = s.get(idx).unwrap();
        assert_eq!(d.label_number, 3);
        assert!(d.id.starts_with(USER_ID_PREFIX));
        assert_eq!(d.confidence, 1.0);
        assert!(s.is_session_created(&id));
    }

    #[test]
    fn append_after_the_highest_label_reuses_a_free_one() {
        let mut s = DetectionStore::new();
        s.load_bulk(vec![ai("a", 1), ai("top", u32::MAX)]);
        let idx = s.append(manual());
        assert_eq!(s.get(idx).unwrap().label_number, 2);
        assert_eq!(labels(&s), vec![1, u32::MAX, 2]);
    }

    // -- geometry --

    #[test]
    fn moving_ai_detection_marks_it_edited() {
        let mut s = store();
        assert!(s.update_geometry("a", BoundingBox::new(120.0, 100.0, 40.0, 40.0)));
        assert_eq!(s.find("a").unwrap().annotation_type, AnnotationType::Edited);
    }

    #[test]
    fn negligible_move_keeps_type() {
        let mut s = store();
        assert!(!s.update_geometry("a", BoundingBox::new(100.05, 100.0, 40.0, 40.0)));
        assert_eq!(s.find("a").unwrap().annotation_type, AnnotationType::DetectedByAI);
    }

    #[test]
    fn manual_stays_manual_after_move() {
        let mut s = store();
        let idx = s.append(manual());
        let id = s.get(idx).unwrap().id.clone();
        s.update_geometry(&id, BoundingBox::new(80.0, 80.0, 20.0, 20.0));
        assert_eq!(s.find(&id).unwrap().annotation_type, AnnotationType::Manual);
    }

    #[test]
    fn geometry_is_confined_to_image() {
        let mut s = store();
        s.update_geometry("a", BoundingBox::new(700.0, -30.0, 40.0, 40.0));
        let b = s.find("a").unwrap().bounding_box;
        assert_eq!(b.right(), 640.0);
        assert_eq!(b.top(), 0.0);
    }

    #[test]
    fn unknown_ids_are_noops() {
        let mut s = store();
        let before = s.detections().to_vec();
        assert!(!s.update_geometry("nope", BoundingBox::new(1.0, 1.0, 1.0, 1.0)));
        assert_eq!(s.soft_delete("nope", "alice"), None);
        assert!(!s.restore("nope"));
        assert_eq!(s.detections(), &before[..]);
    }

    // -- delete / restore --

    #[test]
    fn deleting_ai_detection_is_soft_and_restorable() {
        let mut s = store();
        assert_eq!(s.soft_delete("a", "alice"), Some(DeleteOutcome::SoftDeleted));
        assert_eq!(s.len(), 2);
        let d = s.find("a").unwrap();
        assert!(d.is_deleted());
        assert_eq!(d.previous_annotation_type, Some(AnnotationType::DetectedByAI));
        assert_eq!(d.deleted_by.as_deref(), Some("alice"));
        assert!(d.deleted_at.is_some());

        assert!(s.restore("a"));
        let d = s.find("a").unwrap();
        assert_eq!(d.annotation_type, AnnotationType::DetectedByAI);
        assert!(d.deleted_by.is_none() && d.deleted_at.is_none());
        assert!(d.previous_annotation_type.is_none());
    }

    #[test]
    fn restoring_edited_detection_returns_to_edited() {
        let mut s = store();
        s.update_geometry("b", BoundingBox::new(140.0, 100.0, 40.0, 40.0));
        s.soft_delete("b", "alice");
        s.restore("b");
        assert_eq!(s.find("b").unwrap().annotation_type, AnnotationType::Edited);
    }

    #[test]
    fn restore_without_previous_type_defaults_to_ai() {
        let mut s = DetectionStore::new();
        let mut d = ai("z", 1);
        d.annotation_type = AnnotationType::Deleted;
        s.load_bulk(vec![d]);
        assert!(s.restore("z"));
        assert_eq!(s.find("z").unwrap().annotation_type, AnnotationType::DetectedByAI);
    }

    #[test]
    fn deleting_unsaved_manual_contour_removes_it() {
        let mut s = store();
        let idx = s.append(manual());
        let id = s.get(idx).unwrap().id.clone();
        assert_matches!(s.soft_delete(&id, "alice"), Some(DeleteOutcome::Removed { index: 2 }));
        assert_eq!(s.len(), 2);
    }

    #[test]
    fn reloaded_manual_contour_is_soft_deleted() {
        let mut s = store();
        let idx = s.append(manual());
        let persisted = s.detections().to_vec();
        let id = persisted[idx].id.clone();
        s.load_bulk(persisted);
        assert_eq!(s.soft_delete(&id, "alice"), Some(DeleteOutcome::SoftDeleted));
        assert_eq!(s.len(), 3);
        s.restore(&id);
        assert_eq!(s.find(&id).unwrap().annotation_type, AnnotationType::Manual);
    }

    #[test]
    fn deleted_detections_ignore_geometry_updates() {
        let mut s = store();
        s.soft_delete("a", "alice");
        assert!(!s.update_geometry("a", BoundingBox::new(300.0, 300.0, 40.0, 40.0)));
        assert_eq!(s.find("a").unwrap().bounding_box.x, 100.0);
    }

    #[test]
    fn labels_stay_unique_through_edits() {
        let mut s = store();
        s.append(manual());
        s.soft_delete("a", "alice");
        let idx = s.append(manual());
        assert_eq!(s.get(idx).unwrap().label_number, 4);
        let mut l = labels(&s);
        l.sort();
        l.dedup();
        assert_eq!(l.len(), s.len());
    }

    #[test]
    fn snapshot_round_trip_restores_list() {
        let mut s = store();
        let snap = s.snapshot();
        s.update_geometry("a", BoundingBox::new(200.0, 200.0, 40.0, 40.0));
        s.append(manual());
        s.replace_all(snap);
        assert_eq!(s.len(), 2);
        assert_eq!(s.find("a").unwrap().annotation_type, AnnotationType::DetectedByAI);
    }

    #[test]
    fn breakdown_counts_every_type() {
        let mut s = store();
        s.append(manual());
        s.soft_delete("a", "alice");
        let b = s.type_breakdown();
        assert_eq!(b["Detected by AI"], 1);
        assert_eq!(b["Manual"], 1);
        assert_eq!(b["Deleted"], 1);
        assert_eq!(b["Edited"], 0);
    }
}
