//! Tile Route Planner Backend Library
//!
//! This library exposes modules for testing and external use.
//! The main binary is in `src/main.rs`.

pub mod api;
pub mod config;
pub mod error;
pub mod export;
pub mod gemini;
pub mod ocr;
pub mod routing;
/// Application state management
///
/// Handles the stop list, OCR staging, in-flight guards, and persistence.
pub mod state;
