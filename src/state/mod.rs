//! State of an open inspection.
//!
//! This module contains:
//! - The inspection session (detections, layout, viewport, editor)
//! - Image slots for the baseline and current panes
//! - Upload and analysis progress
//! - Background task handles

mod media;
mod session;

pub use media::*;
pub use session::*;
