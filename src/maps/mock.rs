use async_trait::async_trait;

use crate::geo::{self, polyline};
use crate::models::transport::GeoPoint;

use super::{ComputedLeg, ComputedRoute, DirectionsError, DirectionsProvider, TravelEstimate};

const AVERAGE_SPEED_MPS: f64 = 12.5;
const MOCK_TIMEOUT_MS: u64 = 5_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockBehavior {
    /// Deterministic straight-line routes at a fixed average speed.
    Healthy,
    /// Every call fails as if the upstream timed out.
    Unavailable,
    /// Points locate fine but no route connects them.
    NoRoute,
}

/// In-process directions provider for local runs and tests.
pub struct MockDirections {
    behavior: MockBehavior,
}

impl MockDirections {
    pub fn healthy() -> Self {
        Self::with_behavior(MockBehavior::Healthy)
    }

    pub fn with_behavior(behavior: MockBehavior) -> Self {
        Self { behavior }
    }

    fn fail_if_unhealthy(&self) -> Result<(), DirectionsError> {
        match self.behavior {
            MockBehavior::Healthy => Ok(()),
            MockBehavior::Unavailable => Err(DirectionsError::Timeout {
                timeout_ms: MOCK_TIMEOUT_MS,
            }),
            MockBehavior::NoRoute => Err(DirectionsError::NoRoute),
        }
    }

    fn fabricate(&self, origin: GeoPoint, destination: GeoPoint) -> ComputedRoute {
        // Quantize to polyline precision up front so the reported totals match
        // the geometry a consumer decodes back out of the encoding.
        let start = quantize(origin);
        let end = quantize(destination);
        let mid = quantize(GeoPoint {
            lat: (start.lat + end.lat) / 2.0,
            lng: (start.lng + end.lng) / 2.0,
        });

        let first_miles = geo::haversine_miles(&start, &mid);
        let second_miles = geo::haversine_miles(&mid, &end);
        let first_meters = first_miles / geo::MILES_PER_METER;
        let second_meters = second_miles / geo::MILES_PER_METER;

        let legs = vec![
            ComputedLeg {
                distance_meters: first_meters,
                duration_seconds: first_meters / AVERAGE_SPEED_MPS,
                end_label: None,
            },
            ComputedLeg {
                distance_meters: second_meters,
                duration_seconds: second_meters / AVERAGE_SPEED_MPS,
                end_label: None,
            },
        ];

        ComputedRoute {
            distance_meters: first_meters + second_meters,
            duration_seconds: (first_meters + second_meters) / AVERAGE_SPEED_MPS,
            encoded_polyline: polyline::encode(&[start, mid, end]),
            legs,
        }
    }
}

#[async_trait]
impl DirectionsProvider for MockDirections {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn compute_route(
        &self,
        origin: GeoPoint,
        destination: GeoPoint,
    ) -> Result<ComputedRoute, DirectionsError> {
        self.fail_if_unhealthy()?;
        Ok(self.fabricate(origin, destination))
    }

    async fn travel_estimate(
        &self,
        origin: GeoPoint,
        destination: GeoPoint,
    ) -> Result<TravelEstimate, DirectionsError> {
        self.fail_if_unhealthy()?;
        let route = self.fabricate(origin, destination);
        Ok(TravelEstimate {
            distance_meters: route.distance_meters,
            duration_seconds: route.duration_seconds,
        })
    }

    async fn locate(&self, point: GeoPoint) -> bool {
        match self.behavior {
            MockBehavior::Unavailable => false,
            MockBehavior::Healthy | MockBehavior::NoRoute => point.in_bounds(),
        }
    }
}

fn quantize(point: GeoPoint) -> GeoPoint {
    GeoPoint {
        lat: (point.lat * 1e5).round() / 1e5,
        lng: (point.lng * 1e5).round() / 1e5,
    }
}
