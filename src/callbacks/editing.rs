//! Edit-mode callbacks.
//!
//! Handles: enter/confirm/cancel edit mode, the new-contour dialog,
//! selection, delete and restore from the detection list.

use super::view::sync_ui;
use super::{AppContext, SharedSession, spawn_task};
use crate::AppWindow;
use slint::ComponentHandle;
use std::rc::Rc;
use thermal_inspector::classes::{ClassLabel, SELECTABLE_CLASSES};
use thermal_inspector::repository::SaveOutcome;
use thermal_inspector::state::InspectionSession;
use thermal_inspector::store::DeleteOutcome;

pub fn setup_editing_callbacks(ui: &AppWindow, ctx: Rc<AppContext>, session: SharedSession) {
    setup_edit_mode(ui, ctx.clone(), session.clone());
    setup_new_contour(ui, ctx.clone(), session.clone());
    setup_list_actions(ui, ctx, session);
}

/// Run `f` on the session and resync the window when it reports a change.
fn update(ui: &AppWindow, session: &SharedSession, f: impl FnOnce(&mut InspectionSession) -> bool) {
    if let Ok(mut s) = session.try_borrow_mut() {
        if f(&mut s) {
            sync_ui(ui, &s);
        }
    }
}

fn setup_edit_mode(ui: &AppWindow, ctx: Rc<AppContext>, session: SharedSession) {
    let ui_weak = ui.as_weak();
    let session_enter = session.clone();
    ui.on_enter_edit(move || {
        let Some(ui) = ui_weak.upgrade() else { return };
        update(&ui, &session_enter, |s| s.enter_edit_mode());
    });

    let ui_weak = ui.as_weak();
    let session_cancel = session.clone();
    ui.on_cancel_edits(move || {
        let Some(ui) = ui_weak.upgrade() else { return };
        update(&ui, &session_cancel, |s| s.cancel_edits());
        ui.set_status_text("Edits discarded".into());
    });

    let ui_weak = ui.as_weak();
    ui.on_confirm_edits(move || {
        let Some(ui) = ui_weak.upgrade() else { return };
        let payload = match session.try_borrow_mut() {
            Ok(mut s) => {
                let payload = s.confirm_edits();
                sync_ui(&ui, &s);
                payload
            }
            Err(_) => None,
        };
        let Some(payload) = payload else { return };

        ui.set_status_text("Saving annotations…".into());
        let repo = ctx.repo.clone();
        let ui_weak = ui.as_weak();
        // The save is never aborted; a newer confirm simply saves again.
        let _ = spawn_task(
            &ctx.runtime,
            async move {
                repo.save(&payload.transformer_id, &payload.inspection_id, &payload.detections)
                    .await
            },
            move |outcome| {
                let Some(ui) = ui_weak.upgrade() else { return };
                match outcome {
                    SaveOutcome::Saved => ui.set_status_text("Annotations saved".into()),
                    SaveOutcome::LocalOnly(e) => ui.set_status_text(
                        format!("Saved locally only; backend save failed: {e}").into(),
                    ),
                }
            },
        );
    });
}

fn setup_new_contour(ui: &AppWindow, ctx: Rc<AppContext>, session: SharedSession) {
    let ui_weak = ui.as_weak();
    let session_add = session.clone();
    ui.on_add_contour(move || {
        let Some(ui) = ui_weak.upgrade() else { return };
        update(&ui, &session_add, |s| s.begin_add_contour());
        ui.set_status_text("Drag on the current image to draw a contour".into());
    });

    let ui_weak = ui.as_weak();
    let session_confirm = session.clone();
    ui.on_confirm_new_contour(move |class_index, note| {
        let Some(ui) = ui_weak.upgrade() else { return };
        let class = usize::try_from(class_index)
            .ok()
            .and_then(|i| SELECTABLE_CLASSES.get(i))
            .map(|c| ClassLabel::from(c.name))
            .unwrap_or_else(ClassLabel::default_for_new_contour);
        let note = Some(note.trim().to_string()).filter(|n| !n.is_empty());
        let user = ctx.user();
        update(&ui, &session_confirm, |s| {
            match s.confirm_new_contour(class, note, &user) {
                Some(index) => {
                    log::debug!("added contour at index {index}");
                    true
                }
                None => false,
            }
        });
    });

    let ui_weak = ui.as_weak();
    ui.on_cancel_new_contour(move || {
        let Some(ui) = ui_weak.upgrade() else { return };
        update(&ui, &session, |s| s.cancel_new_contour());
    });
}

fn setup_list_actions(ui: &AppWindow, ctx: Rc<AppContext>, session: SharedSession) {
    let ui_weak = ui.as_weak();
    let session_select = session.clone();
    ui.on_select_detection(move |index| {
        let Some(ui) = ui_weak.upgrade() else { return };
        let Ok(index) = usize::try_from(index) else { return };
        update(&ui, &session_select, |s| s.select(index));
    });

    let ui_weak = ui.as_weak();
    let session_delete = session.clone();
    ui.on_delete_detection(move |index| {
        let Some(ui) = ui_weak.upgrade() else { return };
        let Ok(index) = usize::try_from(index) else { return };
        let user = ctx.user();
        update(&ui, &session_delete, |s| match s.delete_at(index, &user) {
            Some(DeleteOutcome::Removed { index }) => {
                log::debug!("removed unsaved contour at {index}");
                true
            }
            Some(DeleteOutcome::SoftDeleted) => true,
            None => false,
        });
    });

    let ui_weak = ui.as_weak();
    ui.on_restore_detection(move |index| {
        let Some(ui) = ui_weak.upgrade() else { return };
        let Ok(index) = usize::try_from(index) else { return };
        update(&ui, &session, |s| s.restore_at(index));
    });
}
