//! Inspection loading, AI re-analysis and current-image upload.
//!
//! Baseline and current images load independently; each result is tagged
//! with its slot generation so a late answer for an old URL is dropped.

use super::view::{Pane, pane_size, sync_pane, sync_ui};
use super::{AppContext, SharedSession, spawn_task};
use crate::AppWindow;
use crate::utils::to_slint_image;
use slint::ComponentHandle;
use std::rc::Rc;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thermal_inspector::analysis::{AnalysisRequest, reanalyze};
use thermal_inspector::gateway::{ProgressFn, UploadFile, validate};
use thermal_inspector::state::{ImageSlot, InspectionSession, UploadProgress, decode_image};

const ANALYSIS_TICK: Duration = Duration::from_millis(250);

pub fn setup_inspection_callbacks(ui: &AppWindow, ctx: Rc<AppContext>, session: SharedSession) {
    load_inspection(ui, &ctx, &session);
    setup_refresh(ui, ctx.clone(), session.clone());
    setup_reanalyze(ui, ctx.clone(), session.clone());
    setup_upload_current(ui, ctx, session);
}

fn ids(session: &SharedSession) -> (String, String) {
    let s = session.borrow();
    (s.transformer_id().to_string(), s.inspection_id().to_string())
}

fn slot_mut(session: &mut InspectionSession, pane: Pane) -> &mut ImageSlot {
    match pane {
        Pane::Baseline => &mut session.baseline,
        Pane::Current => &mut session.current,
    }
}

/// Fetch image locations and annotations for the session's inspection.
pub fn load_inspection(ui: &AppWindow, ctx: &Rc<AppContext>, session: &SharedSession) {
    load_images(ui, ctx, session);
    load_annotations(ui, ctx, session);
}

fn load_images(ui: &AppWindow, ctx: &Rc<AppContext>, session: &SharedSession) {
    let (transformer_id, inspection_id) = ids(session);
    let api = ctx.api();
    let ui_weak = ui.as_weak();
    let ctx_then = ctx.clone();
    let session_then = session.clone();

    let handle = spawn_task(
        &ctx.runtime,
        async move { api.inspection_images(&inspection_id, &transformer_id).await },
        move |result| {
            let Some(ui) = ui_weak.upgrade() else { return };
            match result {
                Ok(images) => {
                    fetch_slot(&ui, &ctx_then, &session_then, Pane::Baseline, images.baseline_image, images.baseline_timestamp);
                    fetch_slot(&ui, &ctx_then, &session_then, Pane::Current, images.current_image, images.current_timestamp);
                }
                Err(e) => {
                    log::warn!("inspection images unavailable: {e}");
                    ui.set_status_text(format!("Could not load inspection images: {e}").into());
                    if let Ok(mut s) = session_then.try_borrow_mut() {
                        for pane in [Pane::Baseline, Pane::Current] {
                            let slot = slot_mut(&mut s, pane);
                            slot.fail(e.to_string());
                            sync_pane(&ui, pane, slot);
                        }
                    }
                }
            }
        },
    );
    ctx.tasks.borrow_mut().metadata.replace(handle);
}

fn fetch_slot(
    ui: &AppWindow,
    ctx: &Rc<AppContext>,
    session: &SharedSession,
    pane: Pane,
    url: Option<String>,
    timestamp: Option<String>,
) {
    let Ok(mut s) = session.try_borrow_mut() else { return };
    if pane == Pane::Current {
        s.image_changed();
    }
    let slot = slot_mut(&mut s, pane);
    let generation = slot.begin(url, timestamp);
    let url = slot.url().map(str::to_string);
    sync_pane(ui, pane, slot);
    if pane == Pane::Current {
        sync_ui(ui, &s);
    }
    drop(s);

    let (Some(generation), Some(url)) = (generation, url) else { return };
    let api = ctx.api();
    let ui_weak = ui.as_weak();
    let session = session.clone();

    let handle = spawn_task(
        &ctx.runtime,
        async move {
            let bytes = api.fetch_image(&url).await.map_err(|e| e.to_string())?;
            decode_image(&bytes).map_err(|e| e.to_string())
        },
        move |result| {
            let Some(ui) = ui_weak.upgrade() else { return };
            let Ok(mut s) = session.try_borrow_mut() else { return };
            let (image, natural) = match result {
                Ok((rgba, natural)) => (Some(to_slint_image(&rgba)), Ok(natural)),
                Err(e) => (None, Err(e)),
            };
            let slot = slot_mut(&mut s, pane);
            if !slot.finish(generation, natural.clone()) {
                return;
            }
            if let Some(image) = image {
                match pane {
                    Pane::Baseline => ui.set_baseline_image(image),
                    Pane::Current => ui.set_current_image(image),
                }
            }
            sync_pane(&ui, pane, slot);
            if let (Pane::Current, Ok(natural)) = (pane, natural) {
                s.image_loaded(natural, pane_size(&ui));
                sync_ui(&ui, &s);
            }
        },
    );

    let mut tasks = ctx.tasks.borrow_mut();
    match pane {
        Pane::Baseline => tasks.baseline.replace(handle),
        Pane::Current => tasks.current.replace(handle),
    }
}

fn load_annotations(ui: &AppWindow, ctx: &Rc<AppContext>, session: &SharedSession) {
    let (transformer_id, inspection_id) = ids(session);
    let repo = ctx.repo.clone();
    let ui_weak = ui.as_weak();
    let session = session.clone();

    let handle = spawn_task(
        &ctx.runtime,
        async move { repo.load(&transformer_id, &inspection_id).await },
        move |loaded| {
            let Some(ui) = ui_weak.upgrade() else { return };
            let Ok(mut s) = session.try_borrow_mut() else { return };
            let stale = loaded.is_stale();
            let count = loaded.detections.len();
            s.load_detections(loaded);
            sync_ui(&ui, &s);
            let status = if stale {
                format!("Backend unreachable; showing offline copy ({count} detections)")
            } else {
                format!("{count} detections loaded")
            };
            ui.set_status_text(status.into());
        },
    );
    ctx.tasks.borrow_mut().annotations.replace(handle);
}

fn setup_refresh(ui: &AppWindow, ctx: Rc<AppContext>, session: SharedSession) {
    let ui_weak = ui.as_weak();
    ui.on_refresh(move || {
        let Some(ui) = ui_weak.upgrade() else { return };
        if session.borrow().editor().is_editing() {
            ui.set_status_text("Confirm or cancel your edits before refreshing".into());
            return;
        }
        load_inspection(&ui, &ctx, &session);
    });
}

fn setup_reanalyze(ui: &AppWindow, ctx: Rc<AppContext>, session: SharedSession) {
    let ui_weak = ui.as_weak();
    ui.on_reanalyze(move || {
        let Some(ui) = ui_weak.upgrade() else { return };
        let (transformer_id, inspection_id, image_url) = {
            let Ok(mut s) = session.try_borrow_mut() else { return };
            if s.editor().is_editing() {
                return;
            }
            let Some(url) = s.current.url().map(str::to_string) else {
                ui.set_status_text("Upload a current image before running analysis".into());
                return;
            };
            if !s.analysis.begin() {
                return;
            }
            sync_ui(&ui, &s);
            (s.transformer_id().to_string(), s.inspection_id().to_string(), url)
        };
        ui.set_status_text("Analyzing…".into());

        let (threshold, timeout) = {
            let config = ctx.config.borrow();
            (config.detection.confidence_threshold, config.analysis_timeout())
        };

        let timer = Rc::new(slint::Timer::default());
        let tick_ui = ui.as_weak();
        let tick_session = session.clone();
        timer.start(slint::TimerMode::Repeated, ANALYSIS_TICK, move || {
            if let (Some(ui), Ok(mut s)) = (tick_ui.upgrade(), tick_session.try_borrow_mut()) {
                ui.set_analysis_progress(s.analysis.tick() as f32);
            }
        });

        let repo = ctx.repo.clone();
        let ui_weak = ui.as_weak();
        let session = session.clone();
        let handle = spawn_task(
            &ctx.runtime,
            async move {
                let request = AnalysisRequest {
                    transformer_id: &transformer_id,
                    inspection_id: &inspection_id,
                    image_url: &image_url,
                    confidence_threshold: threshold,
                    timeout,
                };
                reanalyze(&repo, request).await
            },
            move |result| {
                timer.stop();
                let Some(ui) = ui_weak.upgrade() else { return };
                let Ok(mut s) = session.try_borrow_mut() else { return };
                match result {
                    Ok(detections) => {
                        s.analysis.finish(true);
                        let count = detections.len();
                        s.apply_analysis(detections);
                        ui.set_status_text(format!("Analysis complete: {count} detections").into());
                    }
                    Err(e) => {
                        s.analysis.finish(false);
                        log::warn!("analysis failed: {e}");
                        ui.set_status_text(format!("Analysis failed: {e}").into());
                    }
                }
                sync_ui(&ui, &s);
            },
        );
        ctx.tasks.borrow_mut().analysis.replace(handle);
    });
}

fn setup_upload_current(ui: &AppWindow, ctx: Rc<AppContext>, session: SharedSession) {
    let ui_weak = ui.as_weak();
    ui.on_upload_current(move || {
        let Some(ui) = ui_weak.upgrade() else { return };
        if ctx.tasks.borrow().upload.is_running() {
            return;
        }

        let uploader = ui.get_uploader_name().to_string();
        let weather = ui.get_weather().to_string();
        let checked = validate::uploader(&uploader)
            .map(str::to_string)
            .and_then(|name| validate::weather(Some(&weather)).map(|w| (name, w)));
        let (uploader, weather) = match checked {
            Ok(v) => v,
            Err(e) => {
                ui.set_status_text(e.to_string().into());
                return;
            }
        };

        let Some(path) = rfd::FileDialog::new()
            .add_filter("Thermal image", &["png", "jpg", "jpeg"])
            .set_title("Select current thermal image")
            .pick_file()
        else {
            return;
        };
        let file = match validate::upload_file(Some(path.as_path())).map_err(|e| e.to_string()).and_then(|p| {
            UploadFile::from_path(p).map_err(|e| format!("Could not read {}: {e}", p.display()))
        }) {
            Ok(file) => file,
            Err(e) => {
                ui.set_status_text(e.into());
                return;
            }
        };

        ui.set_uploading(true);
        ui.set_upload_progress(0.0);
        ui.set_status_text(format!("Uploading {}…", file.file_name).into());

        let started = Instant::now();
        let curve = UploadProgress::default();
        let progress_ui = ui.as_weak();
        let progress: ProgressFn = Arc::new(move |sent, total| {
            let percent = curve.percent(sent, total, started.elapsed()) as f32;
            let _ = progress_ui.upgrade_in_event_loop(move |ui| ui.set_upload_progress(percent));
        });

        let (transformer_id, inspection_id) = ids(&session);
        let api = ctx.api();
        let ui_weak = ui.as_weak();
        let ctx_then = ctx.clone();
        let session_then = session.clone();
        let handle = spawn_task(
            &ctx.runtime,
            async move {
                let result = api
                    .upload_current_image(&transformer_id, &inspection_id, file, &uploader, weather, Some(progress))
                    .await;
                tokio::time::sleep(curve.remaining(started.elapsed())).await;
                result
            },
            move |result| {
                let Some(ui) = ui_weak.upgrade() else { return };
                ui.set_uploading(false);
                match result {
                    Ok(()) => {
                        ui.set_upload_progress(100.0);
                        ui.set_status_text("Image uploaded".into());
                        load_inspection(&ui, &ctx_then, &session_then);
                    }
                    Err(e) => {
                        ui.set_upload_progress(0.0);
                        log::warn!("current image upload failed: {e}");
                        ui.set_status_text(format!("Upload failed: {e}").into());
                    }
                }
            },
        );
        ctx.tasks.borrow_mut().upload.replace(handle);
    });
}
