//! API module
//!
//! Contains HTTP request handlers for the route planner endpoints

pub mod export;
pub mod ocr;
pub mod route;
pub mod stops;
pub mod utils;
