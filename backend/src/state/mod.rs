// State management module
// Handles the stop list, application state, and snapshot persistence

pub mod app_state;
pub mod persistence;
pub mod stop;
pub mod stop_list;

pub use app_state::{AppState, InFlight, Operation, SharedState};
pub use persistence::{PersistenceError, RouteSnapshot, RouteStore};
pub use stop::{Stop, StopId, StopKind, START_STOP_ID};
pub use stop_list::{ReorderSummary, StopList, StopListError};
