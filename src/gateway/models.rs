//! Request and response payloads of the inspection backend.
//!
//! The backend is loose about optional fields, so nearly everything is
//! `#[serde(default)]`. Unknown fields are ignored.

use crate::detection::Detection;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A transformer as returned by `/api/transformers`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Transformer {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub transformer_no: Option<String>,
    pub pole_no: Option<String>,
    pub region: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub capacity: Option<String>,
    pub starred: bool,
    pub location_details: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

impl Transformer {
    /// The public transformer number, falling back to the database id.
    pub fn number(&self) -> String {
        match (&self.transformer_no, self.id) {
            (Some(no), _) if !no.trim().is_empty() => no.clone(),
            (_, Some(id)) => id.to_string(),
            _ => String::new(),
        }
    }
}

/// List endpoints answer either with a bare array or a page object.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ListPayload<T> {
    Bare(Vec<T>),
    Page {
        #[serde(default = "Vec::new")]
        content: Vec<T>,
    },
}

impl<T> ListPayload<T> {
    pub fn into_vec(self) -> Vec<T> {
        match self {
            ListPayload::Bare(items) | ListPayload::Page { content: items } => items,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InspectionStatus {
    InProgress,
    Completed,
    NeedsReview,
}

impl InspectionStatus {
    pub const ALL: [InspectionStatus; 3] = [
        InspectionStatus::InProgress,
        InspectionStatus::Completed,
        InspectionStatus::NeedsReview,
    ];

    pub fn display_name(self) -> &'static str {
        match self {
            InspectionStatus::InProgress => "In Progress",
            InspectionStatus::Completed => "Completed",
            InspectionStatus::NeedsReview => "Needs Review",
        }
    }

    /// Accepts `IN_PROGRESS`, `in-progress`, `In Progress`, ...
    pub fn parse(raw: &str) -> Option<Self> {
        let key: String = raw
            .trim()
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_ascii_lowercase();
        match key.as_str() {
            "inprogress" => Some(InspectionStatus::InProgress),
            "completed" => Some(InspectionStatus::Completed),
            "needsreview" => Some(InspectionStatus::NeedsReview),
            _ => None,
        }
    }
}

impl fmt::Display for InspectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Body of `POST /api/transformers/{no}/inspections`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InspectionReq {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inspected_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maintenance_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<InspectionStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub starred: bool,
}

/// Partial update for `PATCH /api/inspections/{id}`. Absent fields are left
/// untouched by the backend.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InspectionPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<InspectionStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub starred: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inspected_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maintenance_date: Option<String>,
}

impl InspectionPatch {
    pub fn star(starred: bool) -> Self {
        Self {
            starred: Some(starred),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// An inspection entity as stored by the backend.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Inspection {
    pub id: i64,
    pub inspected_at: Option<String>,
    pub maintenance_at: Option<String>,
    pub status: Option<InspectionStatus>,
    pub notes: Option<String>,
    pub starred: bool,
    pub thermal_uploader_name: Option<String>,
    pub weather_condition: Option<String>,
}

/// Row of `GET /api/get-inspection-table`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InspectionRow {
    pub transformer_no: Option<String>,
    /// Zero-padded to nine digits.
    pub inspection_no: Option<String>,
    pub inspected_date: String,
    pub maintenance_date: String,
    pub status: String,
    pub starred: bool,
    pub inspected_at_iso: Option<String>,
    pub maintenance_at_iso: Option<String>,
}

impl InspectionRow {
    /// Numeric inspection id behind the padded display number.
    pub fn inspection_id(&self) -> Option<i64> {
        self.inspection_no.as_deref()?.trim().parse().ok()
    }
}

/// `GET /api/get-transformer-data?id=`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct TransformerData {
    pub transformer: TransformerSummary,
    pub inspections: Vec<TransformerInspection>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TransformerSummary {
    pub transformer_no: Option<String>,
    pub pole_no: Option<String>,
    pub region: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub capacity: Option<String>,
    pub starred: bool,
    pub created_at: Option<String>,
    pub baseline_url: Option<String>,
    pub last_inspected_at: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TransformerInspection {
    pub id: i64,
    pub inspected_date: Option<String>,
    pub maintenance_date: Option<String>,
    pub status: Option<String>,
    pub starred: bool,
    pub notes: Option<String>,
}

/// Image locations for one inspection, already made absolute.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InspectionImages {
    pub baseline_image: Option<String>,
    pub baseline_timestamp: Option<String>,
    pub current_image: Option<String>,
    pub current_timestamp: Option<String>,
    pub inspection_no: Option<i64>,
    pub status: Option<String>,
}

/// Per-type counts reported by `get-annotations`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AnnotationStatistics {
    pub ai_detected: usize,
    pub edited: usize,
    pub manual: usize,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AnnotationsResponse {
    pub success: Option<bool>,
    pub error: Option<String>,
    pub detections: Vec<Detection>,
    pub annotation_count: usize,
    pub statistics: AnnotationStatistics,
}

/// Body of `POST /api/save-annotations`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveRequest<'a> {
    pub transformer_id: &'a str,
    pub inspection_id: &'a str,
    pub annotations: &'a [Detection],
    pub timestamp: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SaveResponse {
    pub success: Option<bool>,
    pub error: Option<String>,
    pub message: Option<String>,
    pub annotation_count: usize,
    pub timestamp: Option<String>,
}

/// Body of `POST /api/analyze-thermal-image`. Some deployments answer with
/// only `{detections}`, so a missing `success` counts as accepted.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AnalysisResponse {
    pub success: Option<bool>,
    pub error: Option<String>,
    pub detections: Vec<Detection>,
    /// Epoch milliseconds.
    pub analysis_timestamp: Option<i64>,
    pub image_file_name: Option<String>,
}

/// `POST /api/retrain/export-dataset`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DatasetExportResult {
    pub ok: bool,
    pub error: Option<String>,
    pub export_root: Option<String>,
    pub images_dir: Option<String>,
    pub labels_dir: Option<String>,
    pub images_copied: u64,
    pub labels_written: u64,
    pub items: u64,
}

/// Weather recorded with a current-image upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Weather {
    Sunny,
    Cloudy,
    Rainy,
    Windy,
}

impl Weather {
    pub const ALL: [Weather; 4] = [Weather::Sunny, Weather::Cloudy, Weather::Rainy, Weather::Windy];

    pub fn as_str(self) -> &'static str {
        match self {
            Weather::Sunny => "sunny",
            Weather::Cloudy => "cloudy",
            Weather::Rainy => "rainy",
            Weather::Windy => "windy",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim().to_ascii_lowercase();
        Self::ALL.into_iter().find(|w| w.as_str() == raw)
    }
}

impl fmt::Display for Weather {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
