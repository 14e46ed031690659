//! Rendering session state into window properties.

use super::SharedSession;
use crate::utils::{color_or_transparent, placeholder_image};
use crate::{AppWindow, DetectionCardData, OverlayBox};
use slint::{ComponentHandle, ModelRc, SharedString, VecModel};
use thermal_inspector::classes::SELECTABLE_CLASSES;
use thermal_inspector::detection::format_timestamp;
use thermal_inspector::geometry::Size;
use thermal_inspector::state::{ImageSlot, InspectionSession, SlotState};

/// Which image pane a load belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pane {
    Baseline,
    Current,
}

/// Static window content: title, class picker, placeholders.
pub fn setup_view(ui: &AppWindow, session: SharedSession) {
    let labels: Vec<SharedString> = SELECTABLE_CLASSES.iter().map(|c| c.label.into()).collect();
    ui.set_class_labels(ModelRc::new(VecModel::from(labels)));
    ui.set_baseline_image(placeholder_image());
    ui.set_current_image(placeholder_image());

    let s = session.borrow();
    ui.set_title_text(format!("Transformer {} · Inspection {}", s.transformer_id(), s.inspection_id()).into());
    sync_ui(ui, &s);
}

/// Pane size as laid out by slint.
pub fn pane_size(ui: &AppWindow) -> Size {
    Size::new(f64::from(ui.get_pane_width()), f64::from(ui.get_pane_height()))
}

/// Push everything derived from the session into the window.
pub fn sync_ui(ui: &AppWindow, session: &InspectionSession) {
    let boxes: Vec<OverlayBox> = session
        .overlay()
        .into_iter()
        .map(|item| OverlayBox {
            index: item.index as i32,
            label: item.label_number as i32,
            x: item.screen.x as f32,
            y: item.screen.y as f32,
            w: item.screen.width as f32,
            h: item.screen.height as f32,
            border: color_or_transparent(item.tone.border_color()),
            fill: color_or_transparent(item.tone.fill_color()),
            badge: color_or_transparent(item.tone.badge_color()),
            dashed: item.tone.is_dashed(),
            deleted: item.deleted,
            selected: session.editor().selected() == Some(item.index),
        })
        .collect();
    ui.set_boxes(ModelRc::new(VecModel::from(boxes)));

    let cards: Vec<DetectionCardData> = session
        .detection_cards()
        .into_iter()
        .map(|card| DetectionCardData {
            index: card.index as i32,
            label: card.label_number as i32,
            class_name: card.class_name.into(),
            confidence: card.confidence_percent as i32,
            annotation_type: card.annotation_type.wire_name().into(),
            provenance: color_or_transparent(card.provenance_color),
            note: card.note.unwrap_or_default().into(),
            created_by: card.created_by.unwrap_or_default().into(),
            created_at: card.created_at.into(),
            deleted: card.deleted,
            low_confidence: card.low_confidence,
            selected: card.selected,
        })
        .collect();
    ui.set_cards(ModelRc::new(VecModel::from(cards)));
    ui.set_active_count(session.active_count() as i32);

    let viewport = session.viewport();
    ui.set_zoom_percent(viewport.zoom_percent() as i32);
    ui.set_can_zoom_in(viewport.can_zoom_in());
    ui.set_can_zoom_out(viewport.can_zoom_out());

    match session.image_screen_rect() {
        Some(r) => {
            ui.set_image_x(r.x as f32);
            ui.set_image_y(r.y as f32);
            ui.set_image_w(r.width as f32);
            ui.set_image_h(r.height as f32);
        }
        None => {
            ui.set_image_x(0.0);
            ui.set_image_y(0.0);
            ui.set_image_w(ui.get_pane_width());
            ui.set_image_h(ui.get_pane_height());
        }
    }

    let editor = session.editor();
    ui.set_editing(editor.is_editing());
    ui.set_adding_contour(editor.is_adding_contour());
    ui.set_confirming_contour(session.pending_contour());
    match session.drawing_rect() {
        Some(r) => {
            ui.set_drawing(true);
            ui.set_draw_x(r.x as f32);
            ui.set_draw_y(r.y as f32);
            ui.set_draw_w(r.width as f32);
            ui.set_draw_h(r.height as f32);
        }
        None => ui.set_drawing(false),
    }

    ui.set_offline_copy(session.is_offline_copy());
    ui.set_analyzing(session.analysis.is_in_flight());
    ui.set_analysis_progress(session.analysis.percent() as f32);
}

/// Status line and timestamp of one image pane.
pub fn sync_pane(ui: &AppWindow, pane: Pane, slot: &ImageSlot) {
    let status: SharedString = match slot.state() {
        SlotState::Empty => "No image uploaded".into(),
        SlotState::Loading => "Loading…".into(),
        SlotState::Loaded { .. } => SharedString::default(),
        SlotState::Failed(_) => "Image unavailable".into(),
    };
    let timestamp: SharedString = slot.timestamp().map(format_timestamp).unwrap_or_default().into();
    match pane {
        Pane::Baseline => {
            ui.set_baseline_status(status);
            ui.set_baseline_timestamp(timestamp);
            if slot.natural_size().is_none() {
                ui.set_baseline_image(placeholder_image());
            }
        }
        Pane::Current => {
            ui.set_current_status(status);
            ui.set_current_timestamp(timestamp);
            if slot.natural_size().is_none() {
                ui.set_current_image(placeholder_image());
            }
        }
    }
}

/// Poll the current pane's size and re-lay the overlay out when the window
/// is resized.
pub fn watch_pane_size(ui: &AppWindow, session: SharedSession) -> slint::Timer {
    let timer = slint::Timer::default();
    let ui_weak = ui.as_weak();
    timer.start(slint::TimerMode::Repeated, std::time::Duration::from_millis(250), move || {
        let Some(ui) = ui_weak.upgrade() else { return };
        let Ok(mut s) = session.try_borrow_mut() else { return };
        let size = pane_size(&ui);
        if size.is_empty() || size == s.viewport().container() {
            return;
        }
        s.container_resized(size);
        sync_ui(&ui, &s);
    });
    timer
}
