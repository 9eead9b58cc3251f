//! Route optimization
//!
//! An optimizer only proposes an order of delivery ids. Applying it always
//! goes through `StopList::reorder`, which treats the proposal as a hint and
//! keeps every delivery, so a partial or noisy proposal is harmless.

pub mod gemini;
pub mod region;

use crate::error::AppError;
use crate::state::Stop;
use async_trait::async_trait;

pub use gemini::GeminiRouteOptimizer;
pub use region::RegionBucketOptimizer;

/// Fewest deliveries worth reordering
pub const MIN_DELIVERIES_TO_OPTIMIZE: usize = 2;

/// Source of a proposed delivery order
#[async_trait]
pub trait RouteOptimizer: Send + Sync {
    /// Short name used in logs and API responses
    fn name(&self) -> &'static str;

    /// Propose an order for the deliveries as a list of stop ids
    ///
    /// The start stop is context only and must not appear in the result.
    async fn propose_order(&self, start: &Stop, deliveries: &[Stop])
        -> Result<Vec<String>, AppError>;
}

/// Ask an optimizer for a delivery order
///
/// # Errors
/// * `AppError::InsufficientStops` with fewer than two deliveries
/// * whatever the optimizer returns
pub async fn optimize_order(
    optimizer: &dyn RouteOptimizer,
    start: &Stop,
    deliveries: &[Stop],
) -> Result<Vec<String>, AppError> {
    if deliveries.len() < MIN_DELIVERIES_TO_OPTIMIZE {
        return Err(AppError::InsufficientStops {
            unit: "deliveries",
            required: MIN_DELIVERIES_TO_OPTIMIZE,
            actual: deliveries.len(),
        });
    }

    tracing::debug!(
        optimizer = optimizer.name(),
        deliveries = deliveries.len(),
        "Requesting delivery order"
    );

    optimizer.propose_order(start, deliveries).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_optimize_order_requires_two_deliveries() {
        let start = Stop::start("Depot", "HQ", "");
        let deliveries = vec![Stop::delivery("A", "a", "")];

        let result = optimize_order(&RegionBucketOptimizer, &start, &deliveries).await;

        match result {
            Err(AppError::InsufficientStops {
                unit,
                required,
                actual,
            }) => {
                assert_eq!(unit, "deliveries");
                assert_eq!(required, 2);
                assert_eq!(actual, 1);
            }
            other => panic!("Expected InsufficientStops, got: {:?}", other),
        }
    }
}
