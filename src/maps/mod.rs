use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::config::Config;
use crate::error::AppError;
use crate::models::transport::GeoPoint;

pub mod mock;
pub mod osrm;

#[derive(Debug, Clone)]
pub struct ComputedLeg {
    pub distance_meters: f64,
    pub duration_seconds: f64,
    pub end_label: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ComputedRoute {
    pub distance_meters: f64,
    pub duration_seconds: f64,
    pub encoded_polyline: String,
    pub legs: Vec<ComputedLeg>,
}

#[derive(Debug, Clone)]
pub struct TravelEstimate {
    pub distance_meters: f64,
    pub duration_seconds: f64,
}

#[derive(Debug, Error)]
pub enum DirectionsError {
    #[error("directions request timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("no drivable route between the given points")]
    NoRoute,

    #[error("directions service error: {0}")]
    Upstream(String),
}

impl From<DirectionsError> for AppError {
    fn from(err: DirectionsError) -> Self {
        AppError::RouteUnavailable(err.to_string())
    }
}

#[async_trait]
pub trait DirectionsProvider: Send + Sync {
    fn name(&self) -> &'static str;

    async fn compute_route(
        &self,
        origin: GeoPoint,
        destination: GeoPoint,
    ) -> Result<ComputedRoute, DirectionsError>;

    async fn travel_estimate(
        &self,
        origin: GeoPoint,
        destination: GeoPoint,
    ) -> Result<TravelEstimate, DirectionsError>;

    /// Coordinate validity check. Returns `false` on any upstream error so
    /// callers never have to distinguish "invalid" from "unreachable".
    async fn locate(&self, point: GeoPoint) -> bool;
}

pub fn provider_from_config(config: &Config) -> Arc<dyn DirectionsProvider> {
    match &config.osrm_base_url {
        Some(base_url) => Arc::new(osrm::OsrmDirections::new(
            base_url.clone(),
            Duration::from_millis(config.directions_timeout_ms),
        )),
        None => {
            tracing::warn!("OSRM_BASE_URL not set; using the built-in mock directions provider");
            Arc::new(mock::MockDirections::healthy())
        }
    }
}
