// Shared helpers for the integration tests: detection builders, a test
// image and an in-process fake of the inspection backend.
#![allow(dead_code)]

use axum::extract::{Multipart, Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, patch, post};
use axum::{Json, Router};
use serde_json::{Value, json};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use thermal_inspector::detection::Detection;

/// Build a detection from JSON the way the backend sends it.
pub fn detection(value: Value) -> Detection {
    serde_json::from_value(value).expect("valid detection")
}

/// AI detection with a center-based box.
pub fn ai_detection(id: &str, class: &str, confidence: f64, cx: f64, cy: f64) -> Detection {
    detection(json!({
        "detection_id": id,
        "class": class,
        "confidence": confidence,
        "bounding_box": {"x": cx, "y": cy, "width": 64.0, "height": 48.0}
    }))
}

/// PNG of the given size.
pub fn png(width: u32, height: u32) -> Vec<u8> {
    let mut bytes = Vec::new();
    image::RgbaImage::from_pixel(width, height, image::Rgba([200, 40, 40, 255]))
        .write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageFormat::Png)
        .expect("encode png");
    bytes
}

/// State of the fake backend.
#[derive(Debug, Default)]
pub struct Backend {
    pub transformers: Vec<Value>,
    /// `(transformer number, inspection id)`
    pub inspections: Vec<(String, i64)>,
    pub baselines: HashMap<String, Vec<u8>>,
    pub current_images: HashMap<String, Vec<u8>>,
    /// Text fields of the last multipart upload.
    pub last_form: HashMap<String, String>,
    /// Detections the analysis endpoint answers with.
    pub analysis_result: Vec<Value>,
    pub analysis_calls: usize,
    /// Answer analysis with a bare `{detections}` body.
    pub analysis_omits_success: bool,
    /// Starred inspection ids.
    pub starred: HashSet<i64>,
    /// Fail every inspection PATCH with a 500.
    pub reject_patches: bool,
    /// Saved annotations per inspection id.
    pub annotations: HashMap<String, Value>,
}

pub type SharedBackend = Arc<Mutex<Backend>>;

/// Serve the fake backend on an ephemeral port; returns its base URL.
pub async fn spawn_backend(backend: SharedBackend) -> String {
    let app = Router::new()
        .route("/api/transformers", get(list_transformers).post(create_transformer))
        .route("/api/transformers/{no}/inspections", post(create_inspection))
        .route("/api/upload_baseline_transformer", post(upload_baseline))
        .route("/api/see_transformer_baseline", get(see_baseline))
        .route("/api/upload-thermal-image", post(upload_current))
        .route("/api/get-inspection", get(get_inspection))
        .route("/api/get-inspection-table", get(inspection_table))
        .route("/api/inspections/{id}", patch(patch_inspection))
        .route("/files/baseline/{no}", get(baseline_file))
        .route("/files/current/{id}", get(current_file))
        .route("/api/analyze-thermal-image", post(analyze))
        .route("/api/get-annotations/{id}", get(get_annotations))
        .route("/api/save-annotations", post(save_annotations))
        .with_state(backend);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind fake backend");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("serve fake backend");
    });
    format!("http://{addr}")
}

async fn read_form(mut multipart: Multipart) -> (HashMap<String, String>, Option<Vec<u8>>) {
    let mut fields = HashMap::new();
    let mut file = None;
    while let Some(field) = multipart.next_field().await.expect("multipart field") {
        let name = field.name().unwrap_or_default().to_string();
        let is_file = field.file_name().is_some();
        let bytes = field.bytes().await.expect("field bytes");
        if is_file {
            file = Some(bytes.to_vec());
        } else {
            fields.insert(name, String::from_utf8_lossy(&bytes).into_owned());
        }
    }
    (fields, file)
}

async fn list_transformers(State(backend): State<SharedBackend>) -> Json<Value> {
    let backend = backend.lock().unwrap();
    Json(json!({ "content": backend.transformers }))
}

async fn create_transformer(State(backend): State<SharedBackend>, Json(mut body): Json<Value>) -> Json<Value> {
    let mut backend = backend.lock().unwrap();
    body["id"] = json!(backend.transformers.len() + 1);
    backend.transformers.push(body.clone());
    Json(body)
}

async fn create_inspection(State(backend): State<SharedBackend>, Path(no): Path<String>) -> Json<Value> {
    let mut backend = backend.lock().unwrap();
    let id = backend.inspections.len() as i64 + 1;
    backend.inspections.push((no, id));
    Json(json!({ "id": id, "status": "IN_PROGRESS", "starred": false }))
}

async fn inspection_table(State(backend): State<SharedBackend>) -> Json<Value> {
    let backend = backend.lock().unwrap();
    let rows: Vec<Value> = backend
        .inspections
        .iter()
        .map(|(no, id)| {
            json!({
                "transformerNo": no,
                "inspectionNo": format!("{id:09}"),
                "status": "IN_PROGRESS",
                "starred": backend.starred.contains(id)
            })
        })
        .collect();
    Json(json!(rows))
}

async fn patch_inspection(
    State(backend): State<SharedBackend>,
    Path(id): Path<i64>,
    Json(body): Json<Value>,
) -> Result<Json<Value>, StatusCode> {
    let mut backend = backend.lock().unwrap();
    if backend.reject_patches || !backend.inspections.iter().any(|(_, known)| *known == id) {
        return Err(StatusCode::INTERNAL_SERVER_ERROR);
    }
    if let Some(starred) = body["starred"].as_bool() {
        if starred {
            backend.starred.insert(id);
        } else {
            backend.starred.remove(&id);
        }
    }
    Ok(Json(json!({ "id": id, "starred": backend.starred.contains(&id) })))
}

async fn upload_baseline(
    State(backend): State<SharedBackend>,
    Query(query): Query<HashMap<String, String>>,
    multipart: Multipart,
) -> StatusCode {
    let (fields, file) = read_form(multipart).await;
    let mut backend = backend.lock().unwrap();
    let (Some(no), Some(file)) = (query.get("transformerNo"), file) else {
        return StatusCode::BAD_REQUEST;
    };
    backend.baselines.insert(no.clone(), file);
    backend.last_form = fields;
    StatusCode::OK
}

async fn see_baseline(State(backend): State<SharedBackend>, Query(query): Query<HashMap<String, String>>) -> StatusCode {
    let backend = backend.lock().unwrap();
    match query.get("transformer_no") {
        Some(no) if backend.baselines.contains_key(no) => StatusCode::OK,
        _ => StatusCode::NOT_FOUND,
    }
}

async fn upload_current(
    State(backend): State<SharedBackend>,
    Query(query): Query<HashMap<String, String>>,
    multipart: Multipart,
) -> StatusCode {
    let (fields, file) = read_form(multipart).await;
    let mut backend = backend.lock().unwrap();
    let (Some(inspection), Some(file)) = (query.get("inspection_no"), file) else {
        return StatusCode::BAD_REQUEST;
    };
    backend.current_images.insert(inspection.clone(), file);
    backend.last_form = fields;
    StatusCode::OK
}

async fn get_inspection(State(backend): State<SharedBackend>, Query(query): Query<HashMap<String, String>>) -> Json<Value> {
    let backend = backend.lock().unwrap();
    let no = query.get("transformerNo").cloned().unwrap_or_default();
    let id = query.get("inspectionId").cloned().unwrap_or_default();
    let baseline = backend
        .baselines
        .contains_key(&no)
        .then(|| format!("/files/baseline/{no}"));
    let current = backend
        .current_images
        .contains_key(&id)
        .then(|| format!("/files/current/{id}"));
    Json(json!({
        "baselineImage": baseline,
        "baselineTimestamp": "2024-05-01T09:00:00Z",
        "currentImage": current,
        "currentTimestamp": "2024-05-01T10:00:00Z",
        "inspectionNo": id.parse::<i64>().ok(),
        "status": "IN_PROGRESS"
    }))
}

async fn baseline_file(State(backend): State<SharedBackend>, Path(no): Path<String>) -> Result<Vec<u8>, StatusCode> {
    backend.lock().unwrap().baselines.get(&no).cloned().ok_or(StatusCode::NOT_FOUND)
}

async fn current_file(State(backend): State<SharedBackend>, Path(id): Path<String>) -> Result<Vec<u8>, StatusCode> {
    backend
        .lock()
        .unwrap()
        .current_images
        .get(&id)
        .cloned()
        .ok_or(StatusCode::NOT_FOUND)
}

async fn analyze(State(backend): State<SharedBackend>, multipart: Multipart) -> Json<Value> {
    let (fields, file) = read_form(multipart).await;
    let mut backend = backend.lock().unwrap();
    backend.analysis_calls += 1;
    backend.last_form = fields;
    if file.is_none() {
        return Json(json!({ "success": false, "error": "no image" }));
    }
    if backend.analysis_omits_success {
        return Json(json!({ "detections": backend.analysis_result }));
    }
    Json(json!({
        "success": true,
        "detections": backend.analysis_result,
        "analysisTimestamp": 1_714_557_600_000_i64
    }))
}

async fn get_annotations(State(backend): State<SharedBackend>, Path(id): Path<String>) -> Json<Value> {
    let backend = backend.lock().unwrap();
    let detections = backend.annotations.get(&id).cloned().unwrap_or_else(|| json!([]));
    Json(json!({ "success": true, "detections": detections }))
}

async fn save_annotations(State(backend): State<SharedBackend>, Json(body): Json<Value>) -> Json<Value> {
    let mut backend = backend.lock().unwrap();
    let id = body["inspectionId"].as_str().unwrap_or_default().to_string();
    let annotations = body["annotations"].clone();
    let count = annotations.as_array().map_or(0, Vec::len);
    backend.annotations.insert(id, annotations);
    Json(json!({ "success": true, "annotationCount": count }))
}
