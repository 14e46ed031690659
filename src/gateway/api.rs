//! REST client for the inspection backend.
//!
//! Wraps transformer and inspection CRUD, image uploads, AI analysis and the
//! annotation round-trip using [`reqwest`].

use super::models::{
    AnalysisResponse, AnnotationsResponse, DatasetExportResult, Inspection, InspectionImages,
    InspectionPatch, InspectionReq, InspectionRow, ListPayload, SaveRequest, SaveResponse,
    Transformer, TransformerData, Weather,
};
use crate::detection::{Detection, now_timestamp};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// Upload progress callback: `(bytes_sent, bytes_total)`.
pub type ProgressFn = Arc<dyn Fn(u64, u64) + Send + Sync>;

/// Size of the chunks an upload body is streamed in.
const UPLOAD_CHUNK: usize = 64 * 1024;

/// HTTP client for one backend instance.
#[derive(Clone)]
pub struct ApiClient {
    client: reqwest::Client,
    base_url: String,
}

/// Errors from the backend API layer.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// The HTTP request itself failed (network, DNS, TLS, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The backend returned a non-2xx status code.
    #[error("backend error ({status}): {body}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Raw response body for debugging.
        body: String,
    },

    /// The body was not the JSON we expected.
    #[error("unexpected response body: {0}")]
    Decode(String),

    #[error("request timed out")]
    Timeout,

    /// A 2xx answer carrying `success: false` (or `ok: false`).
    #[error("backend rejected the request: {0}")]
    Rejected(String),
}

impl GatewayError {
    /// True when the backend could not be reached at all.
    pub fn is_unreachable(&self) -> bool {
        match self {
            GatewayError::Request(e) => e.is_connect() || e.is_timeout(),
            GatewayError::Timeout => true,
            _ => false,
        }
    }
}

/// A file to send as a multipart part.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadFile {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl UploadFile {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes,
        }
    }

    pub fn from_path(path: &Path) -> std::io::Result<Self> {
        let bytes = std::fs::read(path)?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());
        Ok(Self { file_name, bytes })
    }

    fn into_part(self, progress: Option<ProgressFn>) -> reqwest::multipart::Part {
        let UploadFile { file_name, bytes } = self;
        match progress {
            Some(progress) => {
                let total = bytes.len() as u64;
                reqwest::multipart::Part::stream_with_length(progress_body(bytes, progress), total)
                    .file_name(file_name)
            }
            None => reqwest::multipart::Part::bytes(bytes).file_name(file_name),
        }
    }
}

impl ApiClient {
    /// Create a new client.
    ///
    /// * `base_url` - e.g. `http://localhost:8080`. A trailing `/` is dropped.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    /// Create a client reusing an existing [`reqwest::Client`].
    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client, base_url }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Absolute URLs pass through; anything else is joined onto the base URL.
    pub fn absolutize(&self, url: &str) -> String {
        absolutize(&self.base_url, url)
    }

    // ---- transformers ----

    pub async fn list_transformers(&self) -> Result<Vec<Transformer>, GatewayError> {
        let response = self.client.get(self.url("/api/transformers")).send().await?;
        let list: ListPayload<Transformer> = Self::parse_response(response).await?;
        Ok(list.into_vec())
    }

    pub async fn create_transformer(&self, transformer: &Transformer) -> Result<Transformer, GatewayError> {
        let response = self
            .client
            .post(self.url("/api/transformers"))
            .json(transformer)
            .send()
            .await?;
        Self::parse_response(response).await
    }

    /// `PUT /api/transformers/{no}` with every field of `transformer`.
    pub async fn update_transformer(
        &self,
        number: &str,
        transformer: &Transformer,
    ) -> Result<Transformer, GatewayError> {
        let response = self
            .client
            .put(self.url(&format!("/api/transformers/{number}")))
            .json(transformer)
            .send()
            .await?;
        Self::parse_response(response).await
    }

    pub async fn set_transformer_starred(&self, number: &str, starred: bool) -> Result<(), GatewayError> {
        let response = self
            .client
            .put(self.url(&format!("/api/transformers/{number}")))
            .json(&serde_json::json!({ "starred": starred }))
            .send()
            .await?;
        Self::check_status(response).await
    }

    pub async fn delete_transformer(&self, number: &str) -> Result<(), GatewayError> {
        let response = self
            .client
            .delete(self.url(&format!("/api/transformers/{number}")))
            .send()
            .await?;
        Self::check_status(response).await
    }

    /// Transformer plus its inspections; `id` may be the number or the database id.
    pub async fn transformer_data(&self, id: &str) -> Result<TransformerData, GatewayError> {
        let response = self
            .client
            .get(self.url("/api/get-transformer-data"))
            .query(&[("id", id)])
            .send()
            .await?;
        let mut data: TransformerData = Self::parse_response(response).await?;
        if let Some(url) = data.transformer.baseline_url.take() {
            data.transformer.baseline_url = Some(self.absolutize(&url));
        }
        Ok(data)
    }

    // ---- inspections ----

    pub async fn create_inspection(
        &self,
        transformer_no: &str,
        request: &InspectionReq,
    ) -> Result<Inspection, GatewayError> {
        let response = self
            .client
            .post(self.url(&format!("/api/transformers/{transformer_no}/inspections")))
            .json(request)
            .send()
            .await?;
        Self::parse_response(response).await
    }

    pub async fn list_inspections(&self, transformer_no: &str) -> Result<Vec<Inspection>, GatewayError> {
        let response = self
            .client
            .get(self.url(&format!("/api/transformers/{transformer_no}/inspections")))
            .send()
            .await?;
        let list: ListPayload<Inspection> = Self::parse_response(response).await?;
        Ok(list.into_vec())
    }

    pub async fn get_inspection(&self, id: i64) -> Result<Inspection, GatewayError> {
        let response = self
            .client
            .get(self.url(&format!("/api/inspections/{id}")))
            .send()
            .await?;
        Self::parse_response(response).await
    }

    pub async fn patch_inspection(&self, id: i64, patch: &InspectionPatch) -> Result<Inspection, GatewayError> {
        let response = self
            .client
            .patch(self.url(&format!("/api/inspections/{id}")))
            .json(patch)
            .send()
            .await?;
        Self::parse_response(response).await
    }

    /// Flip the star on a table row before the backend answers. The row keeps
    /// its previous value when the PATCH fails.
    pub async fn toggle_inspection_star(&self, row: &mut InspectionRow) -> Result<bool, GatewayError> {
        let id = row.inspection_id().ok_or_else(|| {
            GatewayError::Rejected(format!(
                "bad inspection number {:?}",
                row.inspection_no.as_deref().unwrap_or_default()
            ))
        })?;
        let previous = row.starred;
        row.starred = !previous;
        match self.patch_inspection(id, &InspectionPatch::star(row.starred)).await {
            Ok(_) => Ok(row.starred),
            Err(e) => {
                log::warn!("star toggle on inspection {id} rolled back: {e}");
                row.starred = previous;
                Err(e)
            }
        }
    }

    pub async fn delete_inspection(&self, id: i64) -> Result<(), GatewayError> {
        let response = self
            .client
            .delete(self.url(&format!("/api/inspections/{id}")))
            .send()
            .await?;
        Self::check_status(response).await
    }

    pub async fn inspection_table(&self) -> Result<Vec<InspectionRow>, GatewayError> {
        let response = self
            .client
            .get(self.url("/api/get-inspection-table"))
            .send()
            .await?;
        let list: ListPayload<InspectionRow> = Self::parse_response(response).await?;
        Ok(list.into_vec())
    }

    /// Baseline and current image locations, made absolute.
    pub async fn inspection_images(
        &self,
        inspection_id: &str,
        transformer_no: &str,
    ) -> Result<InspectionImages, GatewayError> {
        let response = self
            .client
            .get(self.url("/api/get-inspection"))
            .query(&[("inspectionId", inspection_id), ("transformerNo", transformer_no)])
            .send()
            .await?;
        let mut images: InspectionImages = Self::parse_response(response).await?;
        images.baseline_image = images.baseline_image.map(|u| self.absolutize(&u));
        images.current_image = images.current_image.map(|u| self.absolutize(&u));
        Ok(images)
    }

    // ---- images ----

    pub async fn upload_baseline(
        &self,
        transformer_no: &str,
        file: UploadFile,
        uploader: &str,
        progress: Option<ProgressFn>,
    ) -> Result<(), GatewayError> {
        let form = reqwest::multipart::Form::new()
            .part("file", file.into_part(progress))
            .text("kind", "BASELINE")
            .text("uploaderName", uploader.to_string());
        let response = self
            .client
            .post(self.url("/api/upload_baseline_transformer"))
            .query(&[("transformerNo", transformer_no)])
            .multipart(form)
            .send()
            .await?;
        Self::check_status(response).await?;
        log::info!("uploaded baseline image for transformer {transformer_no}");
        Ok(())
    }

    /// Whether a baseline image exists. Any failure reads as "no baseline".
    pub async fn has_baseline(&self, transformer_no: &str) -> bool {
        let result = self
            .client
            .get(self.url("/api/see_transformer_baseline"))
            .query(&[("transformer_no", transformer_no)])
            .send()
            .await;
        match result {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                log::debug!("baseline probe for {transformer_no} failed: {e}");
                false
            }
        }
    }

    pub async fn upload_current_image(
        &self,
        transformer_id: &str,
        inspection_no: &str,
        file: UploadFile,
        uploader: &str,
        weather: Weather,
        progress: Option<ProgressFn>,
    ) -> Result<(), GatewayError> {
        let form = reqwest::multipart::Form::new()
            .part("file", file.into_part(progress))
            .text("uploaderName", uploader.to_string())
            .text("weatherCondition", weather.as_str());
        let response = self
            .client
            .post(self.url("/api/upload-thermal-image"))
            .query(&[("transformer_id", transformer_id), ("inspection_no", inspection_no)])
            .multipart(form)
            .send()
            .await?;
        Self::check_status(response).await?;
        log::info!("uploaded current image for inspection {inspection_no}");
        Ok(())
    }

    /// Raw bytes behind an image URL (relative URLs are resolved first).
    pub async fn fetch_image(&self, url: &str) -> Result<Vec<u8>, GatewayError> {
        let response = self.client.get(self.absolutize(url)).send().await?;
        let response = Self::ensure_success(response).await?;
        Ok(response.bytes().await?.to_vec())
    }

    // ---- analysis and annotations ----

    /// Run AI analysis on `image`. Gives up with [`GatewayError::Timeout`]
    /// after `timeout`.
    pub async fn analyze(
        &self,
        transformer_id: &str,
        inspection_id: &str,
        image: UploadFile,
        confidence_threshold: Option<f64>,
        timeout: Duration,
    ) -> Result<AnalysisResponse, GatewayError> {
        let mut form = reqwest::multipart::Form::new()
            .part("thermalImage", image.into_part(None))
            .text("transformerId", transformer_id.to_string())
            .text("inspectionId", inspection_id.to_string());
        if let Some(threshold) = confidence_threshold {
            form = form.text("confidenceThreshold", threshold.to_string());
        }

        let request = async {
            let response = self
                .client
                .post(self.url("/api/analyze-thermal-image"))
                .multipart(form)
                .send()
                .await?;
            Self::parse_response::<AnalysisResponse>(response).await
        };
        let analysis = tokio::time::timeout(timeout, request)
            .await
            .map_err(|_| GatewayError::Timeout)??;
        if analysis.success == Some(false) {
            return Err(GatewayError::Rejected(
                analysis.error.unwrap_or_else(|| "analysis failed".to_string()),
            ));
        }
        log::info!(
            "analysis of inspection {inspection_id} returned {} detections",
            analysis.detections.len()
        );
        Ok(analysis)
    }

    pub async fn get_annotations(&self, inspection_id: &str) -> Result<AnnotationsResponse, GatewayError> {
        let response = self
            .client
            .get(self.url(&format!("/api/get-annotations/{inspection_id}")))
            .send()
            .await?;
        let annotations: AnnotationsResponse = Self::parse_response(response).await?;
        if annotations.success == Some(false) {
            return Err(GatewayError::Rejected(
                annotations.error.unwrap_or_else(|| "annotations unavailable".to_string()),
            ));
        }
        Ok(annotations)
    }

    pub async fn save_annotations(
        &self,
        transformer_id: &str,
        inspection_id: &str,
        annotations: &[Detection],
    ) -> Result<SaveResponse, GatewayError> {
        let body = SaveRequest {
            transformer_id,
            inspection_id,
            annotations,
            timestamp: now_timestamp(),
        };
        let response = self
            .client
            .post(self.url("/api/save-annotations"))
            .json(&body)
            .send()
            .await?;
        let saved: SaveResponse = Self::parse_response(response).await?;
        if saved.success == Some(false) {
            return Err(GatewayError::Rejected(
                saved.error.unwrap_or_else(|| "save failed".to_string()),
            ));
        }
        log::info!(
            "saved {} annotations for inspection {inspection_id}",
            saved.annotation_count
        );
        Ok(saved)
    }

    /// Ask the backend to export the annotated dataset for retraining.
    pub async fn export_dataset(&self) -> Result<DatasetExportResult, GatewayError> {
        let response = self
            .client
            .post(self.url("/api/retrain/export-dataset"))
            .send()
            .await?;
        let result: DatasetExportResult = Self::parse_response(response).await?;
        if !result.ok {
            return Err(GatewayError::Rejected(
                result.error.unwrap_or_else(|| "export failed".to_string()),
            ));
        }
        Ok(result)
    }

    // ---- private helpers ----

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Ensure the response has a success status code. Returns the response
    /// unchanged on success, or a [`GatewayError::Api`] carrying the status
    /// and body text on failure.
    async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, GatewayError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(GatewayError::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    /// Parse a successful JSON response body into the expected type.
    async fn parse_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, GatewayError> {
        let response = Self::ensure_success(response).await?;
        let text = response.text().await?;
        serde_json::from_str(&text).map_err(|e| GatewayError::Decode(e.to_string()))
    }

    /// Assert the response has a success status code, discarding the body.
    async fn check_status(response: reqwest::Response) -> Result<(), GatewayError> {
        Self::ensure_success(response).await?;
        Ok(())
    }
}

pub fn absolutize(base_url: &str, url: &str) -> String {
    let lower = url.to_ascii_lowercase();
    if lower.starts_with("http://") || lower.starts_with("https://") {
        return url.to_string();
    }
    let base = base_url.trim_end_matches('/');
    if url.starts_with('/') {
        format!("{base}{url}")
    } else {
        format!("{base}/{url}")
    }
}

/// Stream `bytes` in chunks, reporting how much has been handed to the
/// transport so far.
fn progress_body(bytes: Vec<u8>, progress: ProgressFn) -> reqwest::Body {
    let total = bytes.len() as u64;
    let chunks: Vec<Vec<u8>> = bytes.chunks(UPLOAD_CHUNK).map(<[u8]>::to_vec).collect();
    let mut sent = 0u64;
    let stream = futures::stream::iter(chunks.into_iter().map(move |chunk| {
        sent += chunk.len() as u64;
        progress(sent, total);
        Ok::<_, std::io::Error>(chunk)
    }));
    reqwest::Body::wrap_stream(stream)
}
