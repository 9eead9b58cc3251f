//! API utility functions
//!
//! Shared response types and input validation used by the route handlers.

use crate::error::AppError;
use crate::state::Stop;
use serde::Serialize;

/// Maximum address length in characters
pub const MAX_ADDRESS_LENGTH: usize = 500;

/// Maximum name or note length in characters
pub const MAX_DETAIL_LENGTH: usize = 2_000;

/// Message response
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    /// Human-readable message
    pub message: String,
    /// Status indicator (e.g., "ok")
    pub status: String,
}

impl MessageResponse {
    /// An "ok" message
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status: "ok".to_string(),
        }
    }
}

/// Full route response
#[derive(Debug, Serialize)]
pub struct StopsResponse {
    /// Stops in route order, start first
    pub stops: Vec<Stop>,
    /// Total number of stops, start included
    pub count: usize,
    /// Planned departure time, `HH:MM`
    pub departure_time: String,
}

impl StopsResponse {
    /// Snapshot the route held by the state
    pub fn from_state(state: &crate::state::AppState) -> Self {
        let stops = state.route().stops().to_vec();
        Self {
            count: stops.len(),
            stops,
            departure_time: state.departure_time().to_string(),
        }
    }
}

/// Validate a new stop address
///
/// # Returns
/// * `Ok(())` - Address is valid
/// * `Err(AppError)` - Address is blank or too long
pub fn validate_address(address: &str) -> Result<(), AppError> {
    let trimmed = address.trim();
    if trimmed.is_empty() {
        return Err(AppError::Validation("Address cannot be empty".to_string()));
    }
    if trimmed.chars().count() > MAX_ADDRESS_LENGTH {
        return Err(AppError::Validation(format!(
            "Address exceeds maximum length of {} characters",
            MAX_ADDRESS_LENGTH
        )));
    }
    Ok(())
}

/// Validate a name or note field
pub fn validate_detail(field: &str, value: &str) -> Result<(), AppError> {
    if value.chars().count() > MAX_DETAIL_LENGTH {
        return Err(AppError::Validation(format!(
            "{} exceeds maximum length of {} characters",
            field, MAX_DETAIL_LENGTH
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_address() {
        assert!(validate_address("新竹縣竹北市新溪街18號").is_ok());
        assert!(matches!(
            validate_address("   "),
            Err(AppError::Validation(_))
        ));
        let long = "路".repeat(MAX_ADDRESS_LENGTH + 1);
        assert!(matches!(
            validate_address(&long),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn test_validate_detail() {
        assert!(validate_detail("note", "代收貨款 $5000").is_ok());
        let long = "x".repeat(MAX_DETAIL_LENGTH + 1);
        assert!(validate_detail("note", &long).is_err());
    }
}
