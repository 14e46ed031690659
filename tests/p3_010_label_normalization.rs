// P3-010: Label numbers after a bulk load
// Test: Missing, garbage and duplicate labels are renumbered
// Expected: Every detection ends with a unique positive label; first holders keep theirs

mod common;

use common::detection;
use serde_json::json;
use std::collections::HashSet;
use thermal_inspector::repository::{Loaded, Source};
use thermal_inspector::state::InspectionSession;
use thermal_inspector::geometry::Size;
use thermal_inspector::store::{DetectionStore, normalize_labels};

fn labelled(raw: serde_json::Value) -> thermal_inspector::detection::Detection {
    detection(json!({
        "class": "loose_joint_red",
        "confidence": 0.8,
        "bounding_box": {"x": 50.0, "y": 50.0, "width": 20.0, "height": 20.0},
        "labelNumber": raw
    }))
}

#[test]
fn first_holders_keep_their_labels() {
    let input = vec![
        labelled(json!(3)),
        labelled(json!(null)),
        labelled(json!("3")),
        labelled(json!(1)),
        labelled(json!("seven")),
    ];
    let labels: Vec<u32> = normalize_labels(input).iter().map(|d| d.label_number).collect();
    assert_eq!(labels, vec![3, 2, 4, 1, 5]);
}

#[test]
fn labels_are_unique_for_awkward_inputs() {
    let cases = [
        vec![json!(0), json!(-4), json!(2.5), json!("")],
        vec![json!(2), json!(2), json!(2)],
        vec![json!(100), json!(null), json!(1)],
        vec![],
    ];
    for raw in cases {
        let n = raw.len();
        let out = normalize_labels(raw.into_iter().map(labelled).collect());
        let labels: HashSet<u32> = out.iter().map(|d| d.label_number).collect();
        assert_eq!(labels.len(), n);
        assert!(labels.iter().all(|&l| l >= 1));
    }
}

#[test]
fn bulk_load_assigns_ids_and_next_label_follows_max() {
    let mut store = DetectionStore::new();
    store.load_bulk(vec![labelled(json!(5)), labelled(json!(null))]);

    let ids: Vec<&str> = store.detections().iter().map(|d| d.id.as_str()).collect();
    assert_eq!(ids, vec!["det_5_0", "det_1_1"]);
    assert_eq!(store.max_label(), 5);
}

#[test]
fn session_load_renumbers_cached_lists() {
    let mut session = InspectionSession::new("T-1", "9", Size::new(400.0, 300.0));
    session.load_detections(Loaded {
        detections: vec![labelled(json!(2)), labelled(json!(2))],
        source: Source::Cache { stale: true },
    });

    let labels: Vec<u32> = session.store().detections().iter().map(|d| d.label_number).collect();
    assert_eq!(labels, vec![2, 1]);
    assert!(session.is_offline_copy());
}
