//! Feedback report: what the model predicted versus what annotators
//! accepted, for every inspection in the table.

use super::ExportError;
use crate::detection::{AnnotationType, Detection};
use crate::gateway::InspectionRow;
use crate::geometry::BoundingBox;
use crate::repository::AnnotationGateway;
use chrono::NaiveDate;
use serde::Serialize;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackEntry {
    pub image_id: String,
    pub model_predicted: ModelPredicted,
    pub final_accepted: Vec<AcceptedItem>,
    pub annotator_metadata: AnnotatorMetadata,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ModelPredicted {
    pub count: usize,
    pub items: Vec<PredictedItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictedItem {
    pub class: String,
    pub confidence: f64,
    pub bbox: BoundingBox,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detection_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AcceptedItem {
    pub class: String,
    pub confidence: f64,
    pub bbox: BoundingBox,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    pub annotation_type: AnnotationType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AnnotatorMetadata {
    pub total: usize,
    pub annotators: Vec<AnnotatorCount>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AnnotatorCount {
    pub user: String,
    pub count: usize,
}

impl FeedbackEntry {
    /// Placeholder for an inspection whose annotations could not be read.
    pub fn empty(image_id: impl Into<String>) -> Self {
        Self {
            image_id: image_id.into(),
            model_predicted: ModelPredicted::default(),
            final_accepted: Vec::new(),
            annotator_metadata: AnnotatorMetadata::default(),
        }
    }

    pub fn from_detections(image_id: impl Into<String>, detections: &[Detection]) -> Self {
        let items: Vec<PredictedItem> = detections
            .iter()
            .filter(|d| d.annotation_type == AnnotationType::DetectedByAI)
            .map(|d| PredictedItem {
                class: d.class.to_string(),
                confidence: d.confidence,
                bbox: d.bounding_box,
                detection_id: non_empty(&d.id),
            })
            .collect();

        let accepted: Vec<&Detection> = detections
            .iter()
            .filter(|d| matches!(d.annotation_type, AnnotationType::Manual | AnnotationType::Edited))
            .collect();

        // First-seen order.
        let mut annotators: Vec<AnnotatorCount> = Vec::new();
        for d in &accepted {
            let user = d
                .created_by
                .as_deref()
                .filter(|u| !u.is_empty())
                .unwrap_or("unknown");
            match annotators.iter_mut().find(|a| a.user == user) {
                Some(a) => a.count += 1,
                None => annotators.push(AnnotatorCount {
                    user: user.to_string(),
                    count: 1,
                }),
            }
        }

        Self {
            image_id: image_id.into(),
            model_predicted: ModelPredicted {
                count: items.len(),
                items,
            },
            final_accepted: accepted
                .iter()
                .map(|d| AcceptedItem {
                    class: d.class.to_string(),
                    confidence: d.confidence,
                    bbox: d.bounding_box,
                    note: d.note.as_deref().and_then(non_empty),
                    annotation_type: d.annotation_type,
                    created_by: d.created_by.as_deref().and_then(non_empty),
                    created_at: d.created_at.as_deref().and_then(non_empty),
                })
                .collect(),
            annotator_metadata: AnnotatorMetadata {
                total: accepted.len(),
                annotators,
            },
        }
    }
}

fn non_empty(s: &str) -> Option<String> {
    (!s.is_empty()).then(|| s.to_string())
}

/// Fetch annotations for every inspection row with a numeric id, in table
/// order. Failures become empty entries.
pub async fn build_report<G: AnnotationGateway>(gateway: &G, rows: &[InspectionRow]) -> Vec<FeedbackEntry> {
    let mut entries = Vec::new();
    for id in rows.iter().filter_map(InspectionRow::inspection_id) {
        let image_id = id.to_string();
        let entry = match gateway.fetch_annotations(&image_id).await {
            Ok(detections) => FeedbackEntry::from_detections(image_id, &detections),
            Err(e) => {
                log::warn!("feedback report: annotations for inspection {id} unavailable: {e}");
                FeedbackEntry::empty(image_id)
            }
        };
        entries.push(entry);
    }
    entries
}

/// `annotations_all_YYYY-MM-DD.json`
pub fn report_file_name(date: NaiveDate) -> String {
    format!("annotations_all_{}.json", date.format("%Y-%m-%d"))
}

pub fn write_report(path: &Path, entries: &[FeedbackEntry]) -> Result<(), ExportError> {
    let json = serde_json::to_string_pretty(entries)?;
    std::fs::write(path, json)?;
    log::info!("wrote feedback report for {} inspections to {}", entries.len(), path.display());
    Ok(())
}
