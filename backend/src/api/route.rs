//! Route-level API handlers
//!
//! Optimization of the delivery order and the departure time setting.

use crate::error::AppError;
use crate::routing::{optimize_order, MIN_DELIVERIES_TO_OPTIMIZE};
use crate::state::{Operation, ReorderSummary, SharedState, Stop};
use axum::{extract::State, response::Json};
use serde::{Deserialize, Serialize};

/// Optimize response
#[derive(Debug, Serialize)]
pub struct OptimizeResponse {
    /// Optimizer that proposed the order
    pub optimizer: &'static str,
    /// How the proposal was merged into the route
    pub summary: ReorderSummary,
    /// Stops in their new order
    pub stops: Vec<Stop>,
}

/// Departure time body, used for both request and response
#[derive(Debug, Serialize, Deserialize)]
pub struct DepartureTime {
    /// `HH:MM`
    pub departure_time: String,
}

/// POST /api/route/optimize - Reorder deliveries with the configured optimizer
///
/// The state lock is not held while the optimizer runs. Its proposal is
/// merged into whatever the route looks like once it returns, so stops
/// added or removed in the meantime are kept or skipped accordingly.
pub async fn optimize_route(
    State(state): State<SharedState>,
) -> Result<Json<OptimizeResponse>, AppError> {
    let (optimizer, start, deliveries) = {
        let mut guard = state.write().await;
        let available = guard.route().deliveries().len();
        if available < MIN_DELIVERIES_TO_OPTIMIZE {
            return Err(AppError::InsufficientStops {
                unit: "deliveries",
                required: MIN_DELIVERIES_TO_OPTIMIZE,
                actual: available,
            });
        }
        if !guard.try_begin(Operation::Optimize) {
            return Err(AppError::Busy(format!(
                "{} is already running",
                Operation::Optimize.label()
            )));
        }
        (
            guard.optimizer.clone(),
            guard.route().start().clone(),
            guard.route().deliveries().to_vec(),
        )
    };

    // Detached so a dropped connection cannot leave the in-flight flag set
    let shared = state.clone();
    let task = tokio::spawn(async move {
        let result = optimize_order(optimizer.as_ref(), &start, &deliveries).await;

        let mut state = shared.write().await;
        state.finish(Operation::Optimize);
        let order = result?;
        let summary = state.reorder(&order);

        tracing::info!(
            optimizer = optimizer.name(),
            placed = summary.placed,
            ignored = summary.ignored,
            appended = summary.appended,
            "Applied optimized route"
        );

        Ok::<_, AppError>(OptimizeResponse {
            optimizer: optimizer.name(),
            summary,
            stops: state.route().stops().to_vec(),
        })
    });

    let response = task
        .await
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Optimize task failed: {}", e)))??;
    Ok(Json(response))
}

/// GET /api/route/departure-time - Current departure time
pub async fn get_departure_time(State(state): State<SharedState>) -> Json<DepartureTime> {
    let state = state.read().await;
    Json(DepartureTime {
        departure_time: state.departure_time().to_string(),
    })
}

/// PUT /api/route/departure-time - Change the departure time
pub async fn set_departure_time(
    State(state): State<SharedState>,
    Json(request): Json<DepartureTime>,
) -> Result<Json<DepartureTime>, AppError> {
    let mut state = state.write().await;
    let departure_time = state
        .set_departure_time(&request.departure_time)
        .map_err(AppError::Validation)?
        .to_string();
    Ok(Json(DepartureTime { departure_time }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::RouteOptimizer;
    use crate::state::AppState;
    use async_trait::async_trait;
    use std::sync::Arc;
    use tokio::sync::RwLock;

    /// Reverses the deliveries and throws in ids the route does not know
    struct ReversingOptimizer;

    #[async_trait]
    impl RouteOptimizer for ReversingOptimizer {
        fn name(&self) -> &'static str {
            "reversing"
        }

        async fn propose_order(
            &self,
            _start: &Stop,
            deliveries: &[Stop],
        ) -> Result<Vec<String>, AppError> {
            let mut ids: Vec<String> = deliveries.iter().rev().map(|s| s.id.to_string()).collect();
            ids.insert(1, "ghost".to_string());
            ids.push("start".to_string());
            // Drop the last delivery to exercise the safety-net append
            ids.remove(0);
            Ok(ids)
        }
    }

    struct FailingOptimizer;

    #[async_trait]
    impl RouteOptimizer for FailingOptimizer {
        fn name(&self) -> &'static str {
            "failing"
        }

        async fn propose_order(&self, _: &Stop, _: &[Stop]) -> Result<Vec<String>, AppError> {
            Err(AppError::MalformedResponse("not an array".to_string()))
        }
    }

    fn state_with(optimizer: Arc<dyn RouteOptimizer>, addresses: &[&str]) -> SharedState {
        let mut state = AppState::new();
        state.optimizer = optimizer;
        for address in addresses {
            state.add_delivery_stop(address);
        }
        Arc::new(RwLock::new(state))
    }

    fn addresses(stops: &[Stop]) -> Vec<&str> {
        stops.iter().map(|s| s.address.as_str()).collect()
    }

    #[tokio::test]
    async fn test_optimize_route_merges_proposal() {
        let state = state_with(Arc::new(ReversingOptimizer), &["A", "B", "C", "D"]);

        let Json(response) = optimize_route(State(state.clone())).await.unwrap();

        assert_eq!(response.optimizer, "reversing");
        assert!(response.stops[0].is_start());
        assert_eq!(addresses(&response.stops[1..]), vec!["C", "B", "A", "D"]);
        assert_eq!(response.summary.placed, 3);
        assert_eq!(response.summary.ignored, 2);
        assert_eq!(response.summary.appended, 1);
        assert!(!state.read().await.in_flight().optimize);
    }

    #[tokio::test]
    async fn test_optimize_route_needs_two_deliveries() {
        let state = state_with(Arc::new(ReversingOptimizer), &["A"]);
        let result = optimize_route(State(state)).await;
        match result {
            Err(e @ AppError::InsufficientStops { .. }) => {
                assert_eq!(e.to_string(), "At least 2 deliveries are required, found 1");
            }
            other => panic!("Expected InsufficientStops, got: {:?}", other.map(|j| j.0)),
        }
    }

    #[tokio::test]
    async fn test_optimize_route_busy() {
        let state = state_with(Arc::new(ReversingOptimizer), &["A", "B"]);
        assert!(state.write().await.try_begin(Operation::Optimize));

        let result = optimize_route(State(state)).await;

        assert!(matches!(result, Err(AppError::Busy(_))));
    }

    #[tokio::test]
    async fn test_optimize_route_failure_leaves_route_untouched() {
        let state = state_with(Arc::new(FailingOptimizer), &["A", "B", "C"]);
        let before = state.read().await.route().clone();

        let result = optimize_route(State(state.clone())).await;

        assert!(matches!(result, Err(AppError::MalformedResponse(_))));
        let guard = state.read().await;
        assert_eq!(guard.route(), &before);
        assert!(!guard.in_flight().optimize);
    }

    #[tokio::test]
    async fn test_departure_time_roundtrip() {
        let state = Arc::new(RwLock::new(AppState::new()));

        let Json(current) = get_departure_time(State(state.clone())).await;
        assert_eq!(current.departure_time, "08:30");

        let request = DepartureTime {
            departure_time: "9:05".to_string(),
        };
        let Json(updated) = set_departure_time(State(state.clone()), Json(request))
            .await
            .unwrap();
        assert_eq!(updated.departure_time, "09:05");

        let bad = DepartureTime {
            departure_time: "noon".to_string(),
        };
        let result = set_departure_time(State(state), Json(bad)).await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }
}
