// Export of annotation feedback for model retraining

pub mod feedback;

pub use feedback::{FeedbackEntry, build_report, report_file_name, write_report};

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("failed to write export: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to encode export: {0}")]
    Json(#[from] serde_json::Error),
}
