//! Gemini module
//!
//! Direct REST access to the Gemini generative-language API plus the reply
//! cleanup shared by slip OCR and route optimization.

pub mod api_client;
pub mod config;
pub mod json;
pub mod types;

pub use api_client::{call_gemini_api, ImageInput};
pub use config::GeminiConfig;
