//! Route export
//!
//! Hands the route off to the outside world: a Google Maps directions deep
//! link for turn-by-turn navigation, and a plain-text itinerary for pasting
//! into a chat or printing.

use crate::error::AppError;
use crate::state::{Stop, StopId};
use serde::Serialize;

/// Most intermediate stops a Maps directions link accepts
pub const MAX_WAYPOINTS: usize = 9;

const MAPS_DIR_URL: &str = "https://www.google.com/maps/dir/?api=1";

/// A navigation deep link
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NavigationLink {
    /// Directions URL
    pub url: String,
    /// Intermediate stops left out because of the waypoint cap, in route order
    pub excluded: Vec<StopId>,
}

/// Build a Google Maps directions link for the route
///
/// The first stop is the origin, the last the destination, and up to
/// [`MAX_WAYPOINTS`] stops in between become waypoints. Stops past the cap
/// are reported in [`NavigationLink::excluded`].
///
/// # Errors
/// `AppError::InsufficientStops` with fewer than two stops.
pub fn build_navigation_url(stops: &[Stop]) -> Result<NavigationLink, AppError> {
    let (origin, destination) = match stops {
        [origin, .., destination] => (origin, destination),
        _ => {
            return Err(AppError::InsufficientStops {
                unit: "stops",
                required: 2,
                actual: stops.len(),
            })
        }
    };

    let intermediate = &stops[1..stops.len() - 1];
    let (waypoints, overflow) = intermediate.split_at(intermediate.len().min(MAX_WAYPOINTS));

    let mut url = format!(
        "{}&origin={}&destination={}",
        MAPS_DIR_URL,
        urlencoding::encode(&origin.address),
        urlencoding::encode(&destination.address)
    );
    if !waypoints.is_empty() {
        let joined = waypoints
            .iter()
            .map(|s| urlencoding::encode(&s.address).into_owned())
            .collect::<Vec<_>>()
            .join("|");
        url.push_str("&waypoints=");
        url.push_str(&joined);
    }
    url.push_str("&travelmode=driving");

    let excluded: Vec<StopId> = overflow.iter().map(|s| s.id.clone()).collect();
    if !excluded.is_empty() {
        tracing::warn!(
            waypoints = waypoints.len(),
            excluded = excluded.len(),
            "Route exceeds the Maps waypoint cap, some stops left out of the link"
        );
    }

    Ok(NavigationLink { url, excluded })
}

/// Format the route as a plain-text itinerary
pub fn format_plain_text(stops: &[Stop], departure_time: &str) -> String {
    let mut out = format!("配送行程 出發時間 {}\n", departure_time);

    let mut delivery_no = 0;
    for stop in stops {
        let heading = if stop.is_start() {
            format!("【START】{}", stop.name)
        } else {
            delivery_no += 1;
            let check = if stop.completed { "[x]" } else { "[ ]" };
            format!("【{:02}】{} {}", delivery_no, check, stop.name)
        };
        let note = if stop.note.trim().is_empty() {
            "-"
        } else {
            stop.note.as_str()
        };
        out.push_str(&format!("\n{}\n📍 {}\n📝 {}\n", heading, stop.address, note));
    }

    out
}
