// Stop model
// A single point on the delivery route (the depot or a customer drop-off)

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use uuid::Uuid;

/// Fixed id of the start stop
pub const START_STOP_ID: &str = "start";

/// Display name given to manually added stops until the driver edits them
pub const NEW_CUSTOMER_PLACEHOLDER: &str = "新規客戶";

/// Unique identifier for a stop
///
/// Opaque string token. Older snapshots stored numeric ids, so deserialization
/// accepts numbers too and keeps their decimal string form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct StopId(String);

impl StopId {
    /// Generate a new unique ID for a stop
    /// Uses UUID v4 for uniqueness
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Id of the start stop
    pub fn start() -> Self {
        Self(START_STOP_ID.to_string())
    }

    /// Borrow the id as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StopId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for StopId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<String> for StopId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for StopId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl PartialEq<str> for StopId {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl<'de> Deserialize<'de> for StopId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawId {
            Text(String),
            Number(serde_json::Number),
        }

        match RawId::deserialize(deserializer)? {
            RawId::Text(text) => Ok(Self(text)),
            RawId::Number(number) => Ok(Self(number.to_string())),
        }
    }
}

/// Role of a stop in the route
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopKind {
    /// Depot the route departs from, always first
    Start,
    /// Customer drop-off
    #[serde(alias = "stop")]
    Delivery,
}

/// One point on the delivery route
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stop {
    /// Unique identifier, stable for the stop's lifetime
    pub id: StopId,
    /// Free-text postal address
    pub address: String,
    /// Start or delivery
    #[serde(rename = "type")]
    pub kind: StopKind,
    /// Customer or company name shown to the driver
    #[serde(default)]
    pub name: String,
    /// Free-text annotation (cash on delivery, contact person, ...)
    #[serde(default)]
    pub note: String,
    /// Whether the delivery has been made
    #[serde(default)]
    pub completed: bool,
}

impl Stop {
    /// Create the start stop with the fixed start id
    pub fn start(address: impl Into<String>, name: impl Into<String>, note: impl Into<String>) -> Self {
        Self {
            id: StopId::start(),
            address: address.into(),
            kind: StopKind::Start,
            name: name.into(),
            note: note.into(),
            completed: false,
        }
    }

    /// Create a delivery stop with a freshly generated id
    pub fn delivery(address: impl Into<String>, name: impl Into<String>, note: impl Into<String>) -> Self {
        Self {
            id: StopId::generate(),
            address: address.into(),
            kind: StopKind::Delivery,
            name: name.into(),
            note: note.into(),
            completed: false,
        }
    }

    /// True for the start stop
    pub fn is_start(&self) -> bool {
        self.kind == StopKind::Start
    }
}
