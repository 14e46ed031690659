//! Settings panel and exports.
//!
//! Handles: confidence threshold / visibility toggles (persisted to the
//! config file), feedback report export and server-side dataset export.

use super::view::sync_ui;
use super::{AppContext, SharedSession, spawn_task};
use crate::AppWindow;
use slint::ComponentHandle;
use std::rc::Rc;
use thermal_inspector::config::save_config;
use thermal_inspector::export::{build_report, report_file_name, write_report};
use thermal_inspector::overlay::ConfidenceFilter;

pub fn setup_settings_callbacks(ui: &AppWindow, ctx: Rc<AppContext>, session: SharedSession) {
    apply_config(ui, &ctx, &session);
    setup_settings_changed(ui, ctx.clone(), session);
    setup_export_feedback(ui, ctx.clone());
    setup_export_dataset(ui, ctx);
}

/// Seed the panel and the session from the loaded configuration.
fn apply_config(ui: &AppWindow, ctx: &AppContext, session: &SharedSession) {
    let config = ctx.config.borrow();
    let detection = &config.detection;
    ui.set_confidence_threshold(detection.confidence_threshold as f32);
    ui.set_show_low_confidence(detection.show_low_confidence);
    ui.set_show_boxes(detection.show_bounding_boxes);
    ui.set_uploader_name(config.user.name.as_str().into());

    let mut s = session.borrow_mut();
    s.set_filter(ConfidenceFilter::new(detection.confidence_threshold, detection.show_low_confidence));
    s.set_show_boxes(detection.show_bounding_boxes);
    sync_ui(ui, &s);
}

fn setup_settings_changed(ui: &AppWindow, ctx: Rc<AppContext>, session: SharedSession) {
    let ui_weak = ui.as_weak();
    ui.on_settings_changed(move || {
        let Some(ui) = ui_weak.upgrade() else { return };
        let threshold = f64::from(ui.get_confidence_threshold()).round().clamp(0.0, 100.0);
        let show_low = ui.get_show_low_confidence();
        let show_boxes = ui.get_show_boxes();

        if let Ok(mut s) = session.try_borrow_mut() {
            s.set_filter(ConfidenceFilter::new(threshold, show_low));
            s.set_show_boxes(show_boxes);
            sync_ui(&ui, &s);
        }

        let mut config = ctx.config.borrow_mut();
        let detection = &mut config.detection;
        if detection.confidence_threshold == threshold
            && detection.show_low_confidence == show_low
            && detection.show_bounding_boxes == show_boxes
        {
            return;
        }
        detection.confidence_threshold = threshold;
        detection.show_low_confidence = show_low;
        detection.show_bounding_boxes = show_boxes;
        if let Err(e) = save_config(&config) {
            log::warn!("settings not saved: {e}");
        }
    });
}

fn setup_export_feedback(ui: &AppWindow, ctx: Rc<AppContext>) {
    let ui_weak = ui.as_weak();
    ui.on_export_feedback(move || {
        let Some(ui) = ui_weak.upgrade() else { return };
        let file_name = report_file_name(chrono::Local::now().date_naive());
        let Some(path) = rfd::FileDialog::new()
            .add_filter("JSON", &["json"])
            .set_title("Export annotation feedback")
            .set_file_name(&file_name)
            .save_file()
        else {
            return;
        };

        ui.set_status_text("Collecting annotations…".into());
        let api = ctx.api();
        let ui_weak = ui.as_weak();
        let handle = spawn_task(
            &ctx.runtime,
            async move {
                let rows = api.inspection_table().await.map_err(|e| e.to_string())?;
                let entries = build_report(&api, &rows).await;
                write_report(&path, &entries).map_err(|e| e.to_string())?;
                Ok::<_, String>((entries.len(), path))
            },
            move |result| {
                let Some(ui) = ui_weak.upgrade() else { return };
                let status = match result {
                    Ok((count, path)) => format!("Exported {count} inspections to {}", path.display()),
                    Err(e) => {
                        log::warn!("feedback export failed: {e}");
                        format!("Export failed: {e}")
                    }
                };
                ui.set_status_text(status.into());
            },
        );
        ctx.tasks.borrow_mut().export.replace(handle);
    });
}

fn setup_export_dataset(ui: &AppWindow, ctx: Rc<AppContext>) {
    let ui_weak = ui.as_weak();
    ui.on_export_dataset(move || {
        let Some(ui) = ui_weak.upgrade() else { return };
        ui.set_status_text("Exporting dataset…".into());
        let api = ctx.api();
        let ui_weak = ui.as_weak();
        let handle = spawn_task(
            &ctx.runtime,
            async move { api.export_dataset().await },
            move |result| {
                let Some(ui) = ui_weak.upgrade() else { return };
                let status = match result {
                    Ok(r) => format!(
                        "Dataset exported: {} images, {} labels",
                        r.images_copied, r.labels_written
                    ),
                    Err(e) => {
                        log::warn!("dataset export failed: {e}");
                        format!("Dataset export failed: {e}")
                    }
                };
                ui.set_status_text(status.into());
            },
        );
        ctx.tasks.borrow_mut().export.replace(handle);
    });
}
