//! Detection records as exchanged with the backend.
//!
//! Field names follow the backend's JSON (`detection_id`, `bounding_box`,
//! `labelNumber`, `annotationType`, ...). Fields this crate does not model are
//! kept in [`Detection::extra`] so a load/save cycle never drops them.

use crate::classes::ClassLabel;
use crate::geometry::BoundingBox;
use chrono::{DateTime, Local, NaiveDateTime, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Prefix of ids generated for user-drawn contours.
pub const USER_ID_PREFIX: &str = "user_";

/// Note attached to user-drawn contours when none is given.
pub const DEFAULT_MANUAL_NOTE: &str = "User-added annotation";

/// `createdBy` recorded on AI detections.
pub const AI_CREATOR: &str = "AI";

/// Provenance of a detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum AnnotationType {
    #[default]
    DetectedByAI,
    Manual,
    Edited,
    Deleted,
}

impl AnnotationType {
    pub const ALL: [AnnotationType; 4] = [
        AnnotationType::DetectedByAI,
        AnnotationType::Manual,
        AnnotationType::Edited,
        AnnotationType::Deleted,
    ];

    pub fn wire_name(self) -> &'static str {
        match self {
            AnnotationType::DetectedByAI => "Detected by AI",
            AnnotationType::Manual => "Manual",
            AnnotationType::Edited => "Edited",
            AnnotationType::Deleted => "Deleted",
        }
    }

    /// Case-insensitive parse; anything unrecognised is treated as an AI
    /// detection.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "manual" => AnnotationType::Manual,
            "edited" => AnnotationType::Edited,
            "deleted" => AnnotationType::Deleted,
            _ => AnnotationType::DetectedByAI,
        }
    }
}

impl From<String> for AnnotationType {
    fn from(raw: String) -> Self {
        AnnotationType::parse(&raw)
    }
}

impl From<AnnotationType> for String {
    fn from(t: AnnotationType) -> Self {
        t.wire_name().to_string()
    }
}

impl fmt::Display for AnnotationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_name())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    #[serde(rename = "detection_id", default)]
    pub id: String,
    #[serde(rename = "class", default)]
    pub class: ClassLabel,
    #[serde(default)]
    pub confidence: f64,
    #[serde(default)]
    pub bounding_box: BoundingBox,
    /// Zero means "not assigned yet"; the store normalizes it on load.
    #[serde(
        rename = "labelNumber",
        default,
        deserialize_with = "lenient_label_number"
    )]
    pub label_number: u32,
    #[serde(rename = "annotationType", default)]
    pub annotation_type: AnnotationType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(rename = "createdBy", default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
    #[serde(rename = "createdAt", default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(rename = "deletedBy", default, skip_serializing_if = "Option::is_none")]
    pub deleted_by: Option<String>,
    #[serde(rename = "deletedAt", default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<String>,
    #[serde(
        rename = "previousAnnotationType",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub previous_annotation_type: Option<AnnotationType>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl Detection {
    /// A user-drawn contour. Label and id are assigned by the store.
    pub fn manual(class: ClassLabel, bounding_box: BoundingBox, note: Option<String>, user: &str) -> Self {
        let note = note
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| DEFAULT_MANUAL_NOTE.to_string());
        Self {
            id: String::new(),
            class,
            confidence: 1.0,
            bounding_box,
            label_number: 0,
            annotation_type: AnnotationType::Manual,
            note: Some(note),
            created_by: Some(user.to_string()),
            created_at: Some(now_timestamp()),
            deleted_by: None,
            deleted_at: None,
            previous_annotation_type: None,
            extra: BTreeMap::new(),
        }
    }

    pub fn is_deleted(&self) -> bool {
        self.annotation_type == AnnotationType::Deleted
    }

    pub fn is_manual(&self) -> bool {
        self.annotation_type == AnnotationType::Manual
    }

    /// Fill in provenance the backend may omit.
    pub fn fill_provenance(&mut self, user: &str, fallback_time: &str) {
        if self.created_by.as_deref().is_none_or(str::is_empty) {
            let who = if self.is_manual() { user } else { AI_CREATOR };
            self.created_by = Some(who.to_string());
        }
        if self.created_at.as_deref().is_none_or(str::is_empty) {
            self.created_at = Some(fallback_time.to_string());
        }
    }

    /// Stamp a fresh analysis result.
    pub fn stamp_analysis(&mut self, analysis_time: &str) {
        self.annotation_type = AnnotationType::DetectedByAI;
        self.created_by = Some(AI_CREATOR.to_string());
        self.created_at = Some(analysis_time.to_string());
    }
}

/// Accepts numbers, numeric strings, `null` or garbage; anything that is not
/// a positive integer becomes 0.
fn lenient_label_number<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    let number = match value {
        Some(serde_json::Value::Number(n)) => n.as_f64(),
        Some(serde_json::Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    Ok(match number {
        Some(n) if n.is_finite() && n >= 1.0 && n.fract() == 0.0 && n <= f64::from(u32::MAX) => n as u32,
        _ => 0,
    })
}

/// Current time as an RFC 3339 UTC timestamp with millisecond precision.
pub fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Parse a backend timestamp. Accepts RFC 3339 and naive ISO date-times
/// (the analysis service omits the offset; those are read as UTC).
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc())
}

/// `DD/MM/YYYY HH:mm` in local time; unparseable input yields an empty string.
pub fn format_timestamp(raw: &str) -> String {
    parse_timestamp(raw)
        .map(|dt| dt.with_timezone(&Local).format("%d/%m/%Y %H:%M").to_string())
        .unwrap_or_default()
}
