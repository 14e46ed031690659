//! Thermal inspection of distribution transformers: AI detections drawn over
//! the inspection image, edited by hand and persisted to the backend.

pub mod analysis;
pub mod cache;
pub mod classes;
pub mod config;
pub mod detection;
pub mod editor;
pub mod export;
pub mod gateway;
pub mod geometry;
pub mod overlay;
pub mod render;
pub mod repository;
pub mod state;
pub mod store;
pub mod viewport;
