//! Pointer routing, zoom and pan.
//!
//! The touch area covers the whole current pane, so a drag that leaves a
//! box keeps updating it until the button is released.

use super::view::{pane_size, sync_ui};
use super::{AppContext, SharedSession};
use crate::AppWindow;
use slint::ComponentHandle;
use std::rc::Rc;
use thermal_inspector::editor::DrawOutcome;
use thermal_inspector::geometry::Point;

pub fn setup_viewport_callbacks(ui: &AppWindow, ctx: Rc<AppContext>, session: SharedSession) {
    setup_pointer(ui, ctx, session.clone());
    setup_zoom(ui, session.clone());
    setup_escape(ui, session);
}

fn setup_pointer(ui: &AppWindow, ctx: Rc<AppContext>, session: SharedSession) {
    let ui_weak = ui.as_weak();
    let session_down = session.clone();
    ui.on_pointer_down(move |x, y| {
        let Some(ui) = ui_weak.upgrade() else { return };
        let Ok(mut s) = session_down.try_borrow_mut() else { return };
        s.container_resized(pane_size(&ui));
        if s.pointer_down(Point::new(f64::from(x), f64::from(y)), &ctx.user()) {
            sync_ui(&ui, &s);
        }
    });

    let ui_weak = ui.as_weak();
    let session_move = session.clone();
    ui.on_pointer_move(move |x, y| {
        let Some(ui) = ui_weak.upgrade() else { return };
        let Ok(mut s) = session_move.try_borrow_mut() else { return };
        if s.pointer_move(Point::new(f64::from(x), f64::from(y))) {
            sync_ui(&ui, &s);
        }
    });

    let ui_weak = ui.as_weak();
    ui.on_pointer_up(move |x, y| {
        let Some(ui) = ui_weak.upgrade() else { return };
        let Ok(mut s) = session.try_borrow_mut() else { return };
        match s.pointer_up(Point::new(f64::from(x), f64::from(y))) {
            Some(DrawOutcome::Pending(_)) => {
                ui.set_new_contour_class(0);
                ui.set_new_contour_note("".into());
            }
            Some(DrawOutcome::Rejected(reason)) => log::debug!("contour discarded: {reason:?}"),
            None => {}
        }
        sync_ui(&ui, &s);
    });
}

fn setup_zoom(ui: &AppWindow, session: SharedSession) {
    let ui_weak = ui.as_weak();
    let session_in = session.clone();
    ui.on_zoom_in(move || {
        if let (Some(ui), Ok(mut s)) = (ui_weak.upgrade(), session_in.try_borrow_mut()) {
            s.zoom_in();
            sync_ui(&ui, &s);
        }
    });

    let ui_weak = ui.as_weak();
    let session_out = session.clone();
    ui.on_zoom_out(move || {
        if let (Some(ui), Ok(mut s)) = (ui_weak.upgrade(), session_out.try_borrow_mut()) {
            s.zoom_out();
            sync_ui(&ui, &s);
        }
    });

    let ui_weak = ui.as_weak();
    ui.on_reset_view(move || {
        if let (Some(ui), Ok(mut s)) = (ui_weak.upgrade(), session.try_borrow_mut()) {
            s.reset_view();
            sync_ui(&ui, &s);
        }
    });
}

fn setup_escape(ui: &AppWindow, session: SharedSession) {
    let ui_weak = ui.as_weak();
    ui.on_escape_pressed(move || {
        if let (Some(ui), Ok(mut s)) = (ui_weak.upgrade(), session.try_borrow_mut()) {
            if s.escape() {
                sync_ui(&ui, &s);
            }
        }
    });
}
