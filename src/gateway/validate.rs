//! Required-field checks run before anything is submitted.

use super::models::{Transformer, Weather};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("{0} is required")]
    Missing(&'static str),

    #[error("file not found: {0}")]
    FileNotFound(String),

    #[error("unknown weather condition '{0}' (expected sunny, cloudy, rainy or windy)")]
    UnknownWeather(String),
}

pub fn transformer(t: &Transformer) -> Result<(), ValidationError> {
    if t.transformer_no.as_deref().is_none_or(|no| no.trim().is_empty()) {
        return Err(ValidationError::Missing("transformer number"));
    }
    Ok(())
}

pub fn upload_file(path: Option<&Path>) -> Result<&Path, ValidationError> {
    let path = path.ok_or(ValidationError::Missing("image file"))?;
    if !path.is_file() {
        return Err(ValidationError::FileNotFound(path.display().to_string()));
    }
    Ok(path)
}

pub fn uploader(name: &str) -> Result<&str, ValidationError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ValidationError::Missing("uploader name"));
    }
    Ok(name)
}

pub fn weather(raw: Option<&str>) -> Result<Weather, ValidationError> {
    let raw = raw
        .map(str::trim)
        .filter(|w| !w.is_empty())
        .ok_or(ValidationError::Missing("weather condition"))?;
    Weather::parse(raw).ok_or_else(|| ValidationError::UnknownWeather(raw.to_string()))
}
