//! AI re-analysis of an inspection's current image.

use crate::cache::Cache;
use crate::detection::{Detection, now_timestamp};
use crate::gateway::{ApiClient, GatewayError, UploadFile};
use crate::repository::{AnnotationGateway, AnnotationRepository};
use crate::store::normalize_labels;
use chrono::{DateTime, SecondsFormat};
use std::time::Duration;

/// Parameters of one analysis request.
#[derive(Debug, Clone)]
pub struct AnalysisRequest<'a> {
    pub transformer_id: &'a str,
    pub inspection_id: &'a str,
    pub image_url: &'a str,
    /// Percent, 0..=100.
    pub confidence_threshold: f64,
    pub timeout: Duration,
}

/// Run analysis and persist the result. The cache entry is cleared before
/// the request; the new list is cached, then pushed to the backend. A failed
/// push is only logged.
pub async fn reanalyze<C: Cache>(
    repo: &AnnotationRepository<ApiClient, C>,
    request: AnalysisRequest<'_>,
) -> Result<Vec<Detection>, GatewayError> {
    let AnalysisRequest {
        transformer_id,
        inspection_id,
        image_url,
        confidence_threshold,
        timeout,
    } = request;
    repo.clear(transformer_id, inspection_id);

    let api = repo.gateway();
    let bytes = api.fetch_image(image_url).await?;
    let image = UploadFile::new(file_name_of(image_url), bytes);
    let response = api
        .analyze(
            transformer_id,
            inspection_id,
            image,
            Some(confidence_threshold),
            timeout,
        )
        .await?;

    let detections = prepare(response.detections, response.analysis_timestamp);
    repo.cache_analysis(transformer_id, inspection_id, &detections);
    if let Err(e) = api
        .store_annotations(transformer_id, inspection_id, &detections)
        .await
    {
        log::warn!("analysis result for inspection {inspection_id} not saved to backend: {e}");
    }
    Ok(detections)
}

/// Normalize labels and stamp every detection as AI output at the analysis
/// time (epoch millis), or now when the backend gave none.
pub fn prepare(detections: Vec<Detection>, analysis_millis: Option<i64>) -> Vec<Detection> {
    let stamp = analysis_millis
        .and_then(DateTime::from_timestamp_millis)
        .map(|dt| dt.to_rfc3339_opts(SecondsFormat::Millis, true))
        .unwrap_or_else(now_timestamp);
    let mut detections = normalize_labels(detections);
    for d in &mut detections {
        d.stamp_analysis(&stamp);
    }
    detections
}

fn file_name_of(url: &str) -> String {
    url.split(['?', '#'])
        .next()
        .and_then(|path| path.rsplit('/').next())
        .filter(|name| !name.is_empty())
        .unwrap_or("thermal.jpg")
        .to_string()
}
