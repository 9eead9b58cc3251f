//! Ordered stop list
//!
//! Owns the route as an ordered sequence of stops. The start stop is a
//! sentinel that always sits at index 0; every other stop is a delivery.
//!
//! # Invariants
//! - The list is never empty and `stops[0]` is the only start stop.
//! - Stop ids are unique.
//! - Reordering permutes deliveries only and never loses one.

use super::stop::{Stop, StopId, StopKind, NEW_CUSTOMER_PLACEHOLDER};
use serde::Serialize;
use std::collections::HashSet;
use thiserror::Error;

/// Errors raised by stop list validation rules
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StopListError {
    /// The start stop cannot be removed from the route
    #[error("The start stop cannot be deleted")]
    StartStopProtected,

    /// A stop sequence violates the list invariants
    #[error("Invalid stop list: {0}")]
    InvalidStops(String),
}

/// Outcome of a reorder request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct ReorderSummary {
    /// Deliveries placed where the requested sequence put them
    pub placed: usize,
    /// Ids in the sequence that were unknown, duplicated or the start stop
    pub ignored: usize,
    /// Deliveries the sequence never mentioned, appended in original order
    pub appended: usize,
}

/// Ordered list of stops with the start stop pinned at index 0
#[derive(Debug, Clone, PartialEq)]
pub struct StopList {
    stops: Vec<Stop>,
}

impl StopList {
    /// Create a list holding only the given start stop
    ///
    /// The stop is forced to `StopKind::Start` and the fixed start id.
    pub fn new(mut start: Stop) -> Self {
        start.kind = StopKind::Start;
        start.id = StopId::start();
        start.completed = false;
        Self { stops: vec![start] }
    }

    /// Build a list from a stop sequence, validating every invariant
    pub fn from_stops(stops: Vec<Stop>) -> Result<Self, StopListError> {
        let first = stops
            .first()
            .ok_or_else(|| StopListError::InvalidStops("list is empty".to_string()))?;
        if !first.is_start() {
            return Err(StopListError::InvalidStops(
                "first stop is not the start stop".to_string(),
            ));
        }
        if stops.iter().skip(1).any(Stop::is_start) {
            return Err(StopListError::InvalidStops(
                "more than one start stop".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for stop in &stops {
            if !seen.insert(stop.id.as_str()) {
                return Err(StopListError::InvalidStops(format!(
                    "duplicate stop id: {}",
                    stop.id
                )));
            }
        }

        Ok(Self { stops })
    }

    /// All stops in route order, start first
    pub fn stops(&self) -> &[Stop] {
        &self.stops
    }

    /// The start stop
    pub fn start(&self) -> &Stop {
        &self.stops[0]
    }

    /// Delivery stops in route order
    pub fn deliveries(&self) -> &[Stop] {
        &self.stops[1..]
    }

    /// Total number of stops, start included
    pub fn len(&self) -> usize {
        self.stops.len()
    }

    /// Never true for a list built through this type
    pub fn is_empty(&self) -> bool {
        self.stops.is_empty()
    }

    /// Look up a stop by id
    pub fn get(&self, id: &str) -> Option<&Stop> {
        self.stops.iter().find(|s| s.id == *id)
    }

    /// Append a new delivery stop for the given address
    ///
    /// Returns `None` without touching the list when the address is blank.
    /// The new stop gets a fresh id and the placeholder customer name so the
    /// caller can open it for editing right away.
    pub fn add_delivery_stop(&mut self, address: &str) -> Option<Stop> {
        let address = address.trim();
        if address.is_empty() {
            return None;
        }

        let mut stop = Stop::delivery(address, NEW_CUSTOMER_PLACEHOLDER, "");
        while self.get(stop.id.as_str()).is_some() {
            stop.id = StopId::generate();
        }
        self.stops.push(stop.clone());
        Some(stop)
    }

    /// Append a batch of delivery stops in order
    ///
    /// Stops are forced to `StopKind::Delivery`; ids that collide with an
    /// existing stop are regenerated.
    pub fn append_deliveries(&mut self, stops: Vec<Stop>) -> Vec<Stop> {
        let mut added = Vec::with_capacity(stops.len());
        for mut stop in stops {
            stop.kind = StopKind::Delivery;
            while self.get(stop.id.as_str()).is_some() {
                stop.id = StopId::generate();
            }
            self.stops.push(stop.clone());
            added.push(stop);
        }
        added
    }

    /// Remove a stop by id
    ///
    /// Unknown ids are a no-op (`Ok(None)`). The start stop is protected.
    pub fn delete_stop(&mut self, id: &str) -> Result<Option<Stop>, StopListError> {
        match self.stops.iter().position(|s| s.id == *id) {
            Some(0) => Err(StopListError::StartStopProtected),
            Some(index) => Ok(Some(self.stops.remove(index))),
            None => Ok(None),
        }
    }

    /// Replace the display name and note of a stop
    /// Returns true if the stop was found and updated
    pub fn update_stop_details(&mut self, id: &str, name: &str, note: &str) -> bool {
        match self.stops.iter_mut().find(|s| s.id == *id) {
            Some(stop) => {
                stop.name = name.to_string();
                stop.note = note.to_string();
                true
            }
            None => false,
        }
    }

    /// Flip the completed flag of a delivery stop
    ///
    /// Returns the new value, or `None` for the start stop or an unknown id.
    pub fn toggle_completed(&mut self, id: &str) -> Option<bool> {
        let stop = self
            .stops
            .iter_mut()
            .find(|s| s.id == *id && s.kind == StopKind::Delivery)?;
        stop.completed = !stop.completed;
        Some(stop.completed)
    }

    /// Re-sequence the deliveries following the given id order
    ///
    /// The sequence is treated as a hint: ids are matched against the
    /// current deliveries after trimming, unknown ids, repeats and the start
    /// id are skipped, and any delivery the sequence leaves out is appended
    /// afterwards in its original relative order.
    pub fn reorder<S: AsRef<str>>(&mut self, sequence: &[S]) -> ReorderSummary {
        let mut remaining: Vec<Option<Stop>> = self.stops.drain(1..).map(Some).collect();
        let mut summary = ReorderSummary::default();

        for raw in sequence {
            let key = raw.as_ref().trim();
            let slot = remaining
                .iter_mut()
                .find(|slot| matches!(slot, Some(stop) if stop.id == *key));
            match slot.and_then(Option::take) {
                Some(stop) => {
                    self.stops.push(stop);
                    summary.placed += 1;
                }
                None => summary.ignored += 1,
            }
        }

        for stop in remaining.into_iter().flatten() {
            self.stops.push(stop);
            summary.appended += 1;
        }

        summary
    }
}
