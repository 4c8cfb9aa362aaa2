use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::pricing::ComplexityClass;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

impl GeoPoint {
    pub fn in_bounds(&self) -> bool {
        (-90.0..=90.0).contains(&self.lat) && (-180.0..=180.0).contains(&self.lng)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum TransportStatus {
    Requested,
    RouteAssigned,
    InTransit,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnimalManifest {
    pub name: String,
    pub species: String,
    pub count: u32,
    pub complexity: ComplexityClass,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransportJob {
    pub id: Uuid,
    pub status: TransportStatus,
    pub origin: GeoPoint,
    pub destination: GeoPoint,
    pub origin_label: String,
    pub destination_label: String,
    pub animal: AnimalManifest,
    pub driver_name: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Last known driver position for a transport. Overwritten on every ping;
/// no history is kept.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LivePosition {
    pub point: GeoPoint,
    pub recorded_at: DateTime<Utc>,
}

/// Broadcast to websocket subscribers whenever a driver position lands.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PositionEvent {
    pub transport_id: Uuid,
    pub point: GeoPoint,
    pub recorded_at: DateTime<Utc>,
    pub progress_percent: Option<u8>,
}
