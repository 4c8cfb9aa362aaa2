use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::geo::{MINUTES_PER_SECOND, MILES_PER_METER};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteLeg {
    pub distance_meters: f64,
    pub duration_seconds: f64,
    pub end_label: Option<String>,
}

/// Reference geometry for a transport: the encoded polyline and per-leg
/// distances computed once when the route is assigned. Progress calculations
/// treat it as immutable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutePath {
    pub transport_id: Uuid,
    pub encoded_polyline: String,
    pub total_distance_meters: f64,
    pub total_duration_seconds: f64,
    pub legs: Vec<RouteLeg>,
    pub computed_at: DateTime<Utc>,
}

impl RoutePath {
    pub fn distance_miles(&self) -> f64 {
        self.total_distance_meters * MILES_PER_METER
    }

    pub fn duration_minutes(&self) -> f64 {
        self.total_duration_seconds * MINUTES_PER_SECOND
    }
}
