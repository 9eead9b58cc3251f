// Application state management
// Owns the route, the OCR staging area, in-flight flags and persistence

use super::persistence::{PersistenceError, RouteStore};
use super::stop::Stop;
use super::stop_list::{ReorderSummary, StopList, StopListError};
use crate::config::{Config, OptimizerKind, RouteConfig, DEFAULT_DEPARTURE_TIME};
use crate::gemini::GeminiConfig;
use crate::ocr::OcrCandidate;
use crate::routing::{GeminiRouteOptimizer, RegionBucketOptimizer, RouteOptimizer};
use chrono::NaiveTime;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;

/// State shared between request handlers
pub type SharedState = Arc<RwLock<AppState>>;

/// Remote operations that may only run one at a time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// Slip OCR
    Ocr,
    /// Route optimization
    Optimize,
}

impl Operation {
    /// Human-readable label
    pub fn label(&self) -> &'static str {
        match self {
            Operation::Ocr => "slip OCR",
            Operation::Optimize => "route optimization",
        }
    }
}

/// Flags for remote calls currently in flight
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InFlight {
    /// A slip is being read
    pub ocr: bool,
    /// The route is being optimized
    pub optimize: bool,
}

impl InFlight {
    fn flag_mut(&mut self, operation: Operation) -> &mut bool {
        match operation {
            Operation::Ocr => &mut self.ocr,
            Operation::Optimize => &mut self.optimize,
        }
    }
}

/// Main application state
///
/// Constructed once at startup (snapshot or defaults), mutated only through
/// its methods, and written to the snapshot file after every mutation.
pub struct AppState {
    /// The delivery route
    route: StopList,
    /// Planned departure time, `HH:MM`
    departure_time: String,
    /// Candidates read off a slip, waiting for confirmation
    staged: Vec<OcrCandidate>,
    /// Remote calls in flight
    in_flight: InFlight,
    /// Snapshot file, `None` keeps the state in memory only
    snapshot_path: Option<PathBuf>,
    /// Gemini settings
    pub gemini: GeminiConfig,
    /// Shared HTTP client (connection pooling)
    pub http_client: reqwest::Client,
    /// Optimizer used by the optimize endpoint
    pub optimizer: Arc<dyn RouteOptimizer>,
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            route: StopList::new(RouteConfig::default().start_stop()),
            departure_time: DEFAULT_DEPARTURE_TIME.to_string(),
            staged: Vec::new(),
            in_flight: InFlight::default(),
            snapshot_path: None,
            gemini: GeminiConfig::default(),
            http_client: reqwest::Client::new(),
            optimizer: Arc::new(RegionBucketOptimizer),
        }
    }
}

impl AppState {
    /// Create an in-memory state holding only the default start stop
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the state from configuration
    ///
    /// Loads the snapshot from the data directory, falling back to the
    /// configured start stop. Picks the Gemini optimizer when requested and
    /// an API key is available, the local heuristic otherwise.
    pub fn from_config(config: &Config) -> Self {
        let http_client = config.gemini.build_http_client();
        let optimizer: Arc<dyn RouteOptimizer> = match config.route.optimizer {
            OptimizerKind::Gemini if config.gemini.is_configured() => Arc::new(
                GeminiRouteOptimizer::new(http_client.clone(), config.gemini.clone()),
            ),
            OptimizerKind::Gemini => {
                tracing::warn!("GEMINI_API_KEY not set, using local route optimizer");
                Arc::new(RegionBucketOptimizer)
            }
            OptimizerKind::Local => Arc::new(RegionBucketOptimizer),
        };

        let mut state = Self {
            route: StopList::new(config.route.start_stop()),
            gemini: config.gemini.clone(),
            http_client,
            optimizer,
            ..Self::default()
        };
        let path = RouteStore::path_in(&config.persistence.data_dir);
        state.attach_snapshot(path);
        state
    }

    /// Attach a snapshot file and load it
    ///
    /// A missing, empty, corrupt or invalid snapshot leaves the current
    /// (default) route in place; corrupt data is logged, never fatal.
    /// Returns the number of stops loaded from the file.
    pub fn attach_snapshot<P: AsRef<Path>>(&mut self, path: P) -> usize {
        let path = path.as_ref().to_path_buf();
        let loaded = match RouteStore::load_from_file(&path) {
            Ok(Some(snapshot)) => {
                self.route = snapshot.stops;
                if let Some(time) = snapshot.departure_time.filter(|t| parse_time(t).is_some()) {
                    self.departure_time = time;
                }
                self.route.len()
            }
            Ok(None) => 0,
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "Ignoring unusable route snapshot, starting from defaults"
                );
                0
            }
        };
        self.snapshot_path = Some(path);
        loaded
    }

    /// Write the snapshot, if a file is attached
    pub fn save(&self) -> Result<(), PersistenceError> {
        match &self.snapshot_path {
            Some(path) => {
                RouteStore::save_to_file(&self.route, Some(&self.departure_time), path)
            }
            None => Ok(()),
        }
    }

    /// Persist after a mutation; failures are logged and swallowed
    fn persist(&self) {
        if let Err(e) = self.save() {
            tracing::warn!(error = %e, "Failed to persist route snapshot");
        }
    }

    /// The current route
    pub fn route(&self) -> &StopList {
        &self.route
    }

    /// Planned departure time, `HH:MM`
    pub fn departure_time(&self) -> &str {
        &self.departure_time
    }

    /// Candidates waiting for confirmation
    pub fn staged(&self) -> &[OcrCandidate] {
        &self.staged
    }

    /// Remote calls in flight
    pub fn in_flight(&self) -> InFlight {
        self.in_flight
    }

    /// Add a delivery stop; blank addresses are a no-op
    pub fn add_delivery_stop(&mut self, address: &str) -> Option<Stop> {
        let stop = self.route.add_delivery_stop(address)?;
        self.persist();
        Some(stop)
    }

    /// Delete a stop; the start stop is protected
    pub fn delete_stop(&mut self, id: &str) -> Result<Option<Stop>, StopListError> {
        let removed = self.route.delete_stop(id)?;
        if removed.is_some() {
            self.persist();
        }
        Ok(removed)
    }

    /// Replace a stop's name and note
    /// Returns true if the stop was found and updated
    pub fn update_stop_details(&mut self, id: &str, name: &str, note: &str) -> bool {
        let updated = self.route.update_stop_details(id, name, note);
        if updated {
            self.persist();
        }
        updated
    }

    /// Flip a delivery's completed flag
    pub fn toggle_completed(&mut self, id: &str) -> Option<bool> {
        let completed = self.route.toggle_completed(id)?;
        self.persist();
        Some(completed)
    }

    /// Re-sequence deliveries, keeping every stop
    pub fn reorder<S: AsRef<str>>(&mut self, sequence: &[S]) -> ReorderSummary {
        let summary = self.route.reorder(sequence);
        self.persist();
        summary
    }

    /// Set the departure time
    ///
    /// Accepts `HH:MM` (or `HH:MM:SS`) and stores it normalised to `HH:MM`.
    pub fn set_departure_time(&mut self, value: &str) -> Result<&str, String> {
        let time = parse_time(value)
            .ok_or_else(|| format!("Invalid departure time '{}', expected HH:MM", value))?;
        self.departure_time = time.format("%H:%M").to_string();
        self.persist();
        Ok(&self.departure_time)
    }

    /// Replace the staging area with freshly extracted candidates
    pub fn stage_candidates(&mut self, candidates: Vec<OcrCandidate>) {
        self.staged = candidates;
    }

    /// Drop all staged candidates, returning how many were discarded
    pub fn discard_candidates(&mut self) -> usize {
        std::mem::take(&mut self.staged).len()
    }

    /// Commit candidates to the route in one batch
    ///
    /// `candidates` lets the caller send back edited candidates; `None`
    /// commits the staged ones as they are. The staging area is cleared
    /// either way.
    pub fn commit_candidates(&mut self, candidates: Option<Vec<OcrCandidate>>) -> Vec<Stop> {
        let staged = std::mem::take(&mut self.staged);
        let candidates = candidates.unwrap_or(staged);
        if candidates.is_empty() {
            return Vec::new();
        }

        let stops = candidates.into_iter().map(OcrCandidate::into_stop).collect();
        let added = self.route.append_deliveries(stops);
        self.persist();
        added
    }

    /// Mark an operation as started
    /// Returns false if the same operation is already in flight
    pub fn try_begin(&mut self, operation: Operation) -> bool {
        let flag = self.in_flight.flag_mut(operation);
        if *flag {
            false
        } else {
            *flag = true;
            true
        }
    }

    /// Mark an operation as finished
    pub fn finish(&mut self, operation: Operation) {
        *self.in_flight.flag_mut(operation) = false;
    }
}

fn parse_time(value: &str) -> Option<NaiveTime> {
    let value = value.trim();
    NaiveTime::parse_from_str(value, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M:%S"))
        .ok()
}
