// Route persistence module
// Handles saving and loading the stop list snapshot to/from a JSON file

use super::stop::Stop;
use super::stop_list::StopList;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// File name of the route snapshot inside the data directory
pub const SNAPSHOT_FILE_NAME: &str = "route_stops.json";

/// Current snapshot format version
const SNAPSHOT_VERSION: u32 = 1;

/// Error types for persistence operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PersistenceError {
    /// File I/O error
    IoError(String),
    /// JSON serialization/deserialization error
    JsonError(String),
    /// Invalid data format
    InvalidData(String),
}

impl std::fmt::Display for PersistenceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PersistenceError::IoError(msg) => write!(f, "IO Error: {}", msg),
            PersistenceError::JsonError(msg) => write!(f, "JSON Error: {}", msg),
            PersistenceError::InvalidData(msg) => write!(f, "Invalid Data: {}", msg),
        }
    }
}

impl std::error::Error for PersistenceError {}

/// Serializable snapshot of the route
#[derive(Debug, Clone, Serialize, Deserialize)]
struct RouteSnapshotData {
    /// Version of the snapshot format (for future migration support)
    version: u32,
    /// Planned departure time, `HH:MM`
    #[serde(default)]
    departure_time: Option<String>,
    /// Stops in route order, start first
    stops: Vec<Stop>,
}

/// Snapshot contents after loading and validation
#[derive(Debug, Clone, PartialEq)]
pub struct RouteSnapshot {
    /// The validated stop list
    pub stops: StopList,
    /// Planned departure time, if one was stored
    pub departure_time: Option<String>,
}

/// Route snapshot persistence operations
pub struct RouteStore;

impl RouteStore {
    /// Save the route to a JSON file, overwriting any previous snapshot
    ///
    /// Parent directories are created as needed.
    pub fn save_to_file<P: AsRef<Path>>(
        stops: &StopList,
        departure_time: Option<&str>,
        path: P,
    ) -> Result<(), PersistenceError> {
        let data = RouteSnapshotData {
            version: SNAPSHOT_VERSION,
            departure_time: departure_time.map(str::to_string),
            stops: stops.stops().to_vec(),
        };

        let json = serde_json::to_string_pretty(&data)
            .map_err(|e| PersistenceError::JsonError(e.to_string()))?;

        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| PersistenceError::IoError(e.to_string()))?;
            }
        }

        fs::write(path.as_ref(), json).map_err(|e| PersistenceError::IoError(e.to_string()))?;

        Ok(())
    }

    /// Load the route from a JSON file
    ///
    /// # Returns
    /// * `Ok(None)` if the file does not exist or is empty
    /// * `Ok(Some(snapshot))` for a valid snapshot
    /// * `Err(PersistenceError)` for unreadable, unparsable or invalid data
    pub fn load_from_file<P: AsRef<Path>>(
        path: P,
    ) -> Result<Option<RouteSnapshot>, PersistenceError> {
        if !path.as_ref().exists() {
            return Ok(None);
        }

        let json = fs::read_to_string(path.as_ref())
            .map_err(|e| PersistenceError::IoError(e.to_string()))?;
        if json.trim().is_empty() {
            return Ok(None);
        }

        let data: RouteSnapshotData =
            serde_json::from_str(&json).map_err(|e| PersistenceError::JsonError(e.to_string()))?;

        if data.version != SNAPSHOT_VERSION {
            return Err(PersistenceError::InvalidData(format!(
                "Unsupported snapshot version: {}",
                data.version
            )));
        }

        let stops = StopList::from_stops(data.stops)
            .map_err(|e| PersistenceError::InvalidData(e.to_string()))?;

        Ok(Some(RouteSnapshot {
            stops,
            departure_time: data.departure_time,
        }))
    }

    /// Get the snapshot path inside a data directory
    pub fn path_in(data_dir: impl AsRef<Path>) -> PathBuf {
        data_dir.as_ref().join(SNAPSHOT_FILE_NAME)
    }
}
