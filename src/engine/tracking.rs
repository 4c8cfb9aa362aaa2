use chrono::Utc;
use rust_decimal::prelude::ToPrimitive;
use serde::Serialize;
use tracing::warn;
use uuid::Uuid;

use crate::engine::progress::{self, Milestone};
use crate::error::AppError;
use crate::geo::polyline;
use crate::models::pricing::ComplexityClass;
use crate::models::route::RoutePath;
use crate::models::transport::{GeoPoint, LivePosition, TransportJob, TransportStatus};
use crate::state::AppState;

/// Everything a tracking page needs in one read. Progress fields are `None`
/// when no usable route geometry exists; the identity fields are always
/// populated so the page can render without it.
#[derive(Debug, Clone, Serialize)]
pub struct LiveTrackingView {
    pub transport_id: Uuid,
    pub status: TransportStatus,
    pub origin_label: String,
    pub destination_label: String,
    pub animal_name: String,
    pub animal_species: String,
    pub animal_count: u32,
    pub complexity: ComplexityClass,
    pub driver_name: Option<String>,
    pub tracking_available: bool,
    pub driver_connected: bool,
    pub position_stale: bool,
    pub last_position: Option<LivePosition>,
    pub route_polyline: Option<String>,
    pub total_distance_miles: Option<f64>,
    pub total_duration_minutes: Option<f64>,
    pub distance_traveled_miles: Option<f64>,
    pub distance_remaining_miles: Option<f64>,
    pub progress_percent: Option<u8>,
    pub eta_minutes: Option<f64>,
    pub milestones: Vec<Milestone>,
}

/// Joins transport, route, live position and cached pricing into one view.
/// Missing or corrupt geometry degrades the view instead of failing it.
pub fn assemble(state: &AppState, transport_id: Uuid) -> Result<LiveTrackingView, AppError> {
    let transport = state
        .transports
        .get(&transport_id)
        .map(|entry| entry.clone())
        .ok_or_else(|| AppError::NotFound(format!("transport {transport_id} not found")))?;

    let position = state.positions.get(&transport_id).map(|entry| entry.clone());
    let route = state.routes.get(&transport_id).map(|entry| entry.clone());

    let mut view = base_view(state, &transport, position.clone());

    let Some(route) = route else {
        return Ok(view);
    };
    let points = match polyline::decode(&route.encoded_polyline) {
        Ok(points) if points.len() >= 2 => points,
        Ok(_) => {
            warn!(transport_id = %transport_id, "route geometry has too few points; tracking degraded");
            return Ok(view);
        }
        Err(err) => {
            warn!(transport_id = %transport_id, error = %err, "route geometry failed to decode; tracking degraded");
            return Ok(view);
        }
    };

    let total_miles = route.distance_miles();
    let duration_minutes = effective_duration(state, &route);

    let prog = match &position {
        Some(live) => progress::route_progress(&points, live.point, total_miles, duration_minutes),
        None => progress::start_of_route(total_miles, duration_minutes),
    };

    view.tracking_available = true;
    view.route_polyline = Some(route.encoded_polyline.clone());
    view.total_distance_miles = Some(total_miles);
    view.total_duration_minutes = Some(duration_minutes);
    view.distance_traveled_miles = Some(prog.distance_traveled_miles);
    view.distance_remaining_miles = Some(prog.distance_remaining_miles);
    view.progress_percent = Some(prog.percent);
    view.eta_minutes = Some(prog.eta_minutes);
    view.milestones = progress::milestones(
        &route.legs,
        &transport.destination_label,
        &prog,
        total_miles,
        duration_minutes,
    );

    Ok(view)
}

/// Best-effort percentage for position broadcast events. `None` whenever the
/// route geometry is missing or unusable.
pub fn progress_percent(state: &AppState, transport_id: Uuid, point: GeoPoint) -> Option<u8> {
    let route = state.routes.get(&transport_id).map(|entry| entry.clone())?;
    let points = polyline::decode(&route.encoded_polyline).ok()?;
    if points.len() < 2 {
        return None;
    }
    let total_miles = route.distance_miles();
    if total_miles <= 0.0 {
        return None;
    }
    let prog = progress::route_progress(&points, point, total_miles, route.duration_minutes());
    Some(prog.percent)
}

fn base_view(
    state: &AppState,
    transport: &TransportJob,
    position: Option<LivePosition>,
) -> LiveTrackingView {
    let position_stale = position
        .as_ref()
        .is_some_and(|live| is_stale(state, live));

    LiveTrackingView {
        transport_id: transport.id,
        status: transport.status.clone(),
        origin_label: transport.origin_label.clone(),
        destination_label: transport.destination_label.clone(),
        animal_name: transport.animal.name.clone(),
        animal_species: transport.animal.species.clone(),
        animal_count: transport.animal.count,
        complexity: transport.animal.complexity,
        driver_name: transport.driver_name.clone(),
        tracking_available: false,
        driver_connected: position.is_some(),
        position_stale,
        last_position: position,
        route_polyline: None,
        total_distance_miles: None,
        total_duration_minutes: None,
        distance_traveled_miles: None,
        distance_remaining_miles: None,
        progress_percent: None,
        eta_minutes: None,
        milestones: Vec::new(),
    }
}

fn is_stale(state: &AppState, live: &LivePosition) -> bool {
    Utc::now().signed_duration_since(live.recorded_at) > state.stale_position_after
}

/// Route duration, falling back to the priced duration when the stored
/// geometry carries none.
fn effective_duration(state: &AppState, route: &RoutePath) -> f64 {
    if route.total_duration_seconds > 0.0 {
        return route.duration_minutes();
    }
    state
        .snapshots
        .get(&route.transport_id)
        .and_then(|snapshot| snapshot.duration_minutes.to_f64())
        .unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use chrono::Duration;

    use crate::config::Config;
    use crate::maps::mock::MockDirections;
    use crate::maps::DirectionsProvider;
    use crate::models::route::RouteLeg;
    use crate::models::transport::AnimalManifest;

    const ORIGIN: GeoPoint = GeoPoint { lat: 47.6062, lng: -122.3321 };
    const DESTINATION: GeoPoint = GeoPoint { lat: 47.2529, lng: -122.4443 };

    fn test_state() -> AppState {
        let config = Config {
            http_port: 0,
            log_level: "info".to_string(),
            event_buffer_size: 16,
            osrm_base_url: None,
            directions_timeout_ms: 5_000,
            stale_position_secs: 120,
        };
        AppState::new(&config, Arc::new(MockDirections::healthy()))
    }

    fn seed_transport(state: &AppState) -> Uuid {
        let id = Uuid::new_v4();
        state.transports.insert(
            id,
            TransportJob {
                id,
                status: TransportStatus::Requested,
                origin: ORIGIN,
                destination: DESTINATION,
                origin_label: "Seattle Shelter".to_string(),
                destination_label: "Tacoma Rescue".to_string(),
                animal: AnimalManifest {
                    name: "Biscuit".to_string(),
                    species: "dog".to_string(),
                    count: 1,
                    complexity: ComplexityClass::Standard,
                },
                driver_name: Some("Jordan".to_string()),
                created_at: Utc::now(),
            },
        );
        id
    }

    async fn seed_route(state: &AppState, transport_id: Uuid) -> Vec<GeoPoint> {
        let computed = state
            .directions
            .compute_route(ORIGIN, DESTINATION)
            .await
            .unwrap();
        let points = polyline::decode(&computed.encoded_polyline).unwrap();
        state.routes.insert(
            transport_id,
            RoutePath {
                transport_id,
                encoded_polyline: computed.encoded_polyline,
                total_distance_meters: computed.distance_meters,
                total_duration_seconds: computed.duration_seconds,
                legs: computed
                    .legs
                    .into_iter()
                    .map(|leg| RouteLeg {
                        distance_meters: leg.distance_meters,
                        duration_seconds: leg.duration_seconds,
                        end_label: leg.end_label,
                    })
                    .collect(),
                computed_at: Utc::now(),
            },
        );
        points
    }

    fn ping(state: &AppState, transport_id: Uuid, point: GeoPoint, age_secs: i64) {
        state.positions.insert(
            transport_id,
            LivePosition {
                point,
                recorded_at: Utc::now() - Duration::seconds(age_secs),
            },
        );
    }

    #[test]
    fn unknown_transport_is_not_found() {
        let state = test_state();
        let err = assemble(&state, Uuid::new_v4()).unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[test]
    fn missing_route_degrades_instead_of_failing() {
        let state = test_state();
        let id = seed_transport(&state);

        let view = assemble(&state, id).unwrap();

        assert!(!view.tracking_available);
        assert!(!view.driver_connected);
        assert_eq!(view.progress_percent, None);
        assert_eq!(view.route_polyline, None);
        assert!(view.milestones.is_empty());
        assert_eq!(view.origin_label, "Seattle Shelter");
        assert_eq!(view.animal_name, "Biscuit");
    }

    #[test]
    fn degraded_view_still_reports_last_position() {
        let state = test_state();
        let id = seed_transport(&state);
        ping(&state, id, ORIGIN, 0);

        let view = assemble(&state, id).unwrap();

        assert!(!view.tracking_available);
        assert!(view.driver_connected);
        assert!(view.last_position.is_some());
    }

    #[tokio::test]
    async fn route_without_pings_reads_zero_progress() {
        let state = test_state();
        let id = seed_transport(&state);
        seed_route(&state, id).await;

        let view = assemble(&state, id).unwrap();

        assert!(view.tracking_available);
        assert!(!view.driver_connected);
        assert_eq!(view.progress_percent, Some(0));
        assert_eq!(view.distance_traveled_miles, Some(0.0));
        assert_eq!(view.eta_minutes, view.total_duration_minutes);
        assert_eq!(view.milestones.len(), 2);
        assert_eq!(view.milestones[1].label, "Tacoma Rescue");
    }

    #[tokio::test]
    async fn ping_at_destination_completes_the_route() {
        let state = test_state();
        let id = seed_transport(&state);
        let points = seed_route(&state, id).await;
        ping(&state, id, points[points.len() - 1], 0);

        let view = assemble(&state, id).unwrap();

        assert_eq!(view.progress_percent, Some(100));
        assert_eq!(view.distance_remaining_miles, Some(0.0));
        assert_eq!(view.eta_minutes, Some(0.0));
        assert!(view.milestones.iter().all(|stop| stop.reached));
    }

    #[tokio::test]
    async fn ping_midway_reads_half_progress() {
        let state = test_state();
        let id = seed_transport(&state);
        let points = seed_route(&state, id).await;
        ping(&state, id, points[1], 0);

        let view = assemble(&state, id).unwrap();

        let percent = view.progress_percent.unwrap();
        assert!((49..=51).contains(&percent));
        assert!(view.milestones[0].reached);
        assert!(!view.milestones[1].reached);
    }

    #[tokio::test]
    async fn old_pings_are_flagged_stale() {
        let state = test_state();
        let id = seed_transport(&state);
        seed_route(&state, id).await;
        ping(&state, id, ORIGIN, 600);

        let view = assemble(&state, id).unwrap();

        assert!(view.position_stale);
        assert!(view.driver_connected);
    }

    #[tokio::test]
    async fn corrupt_geometry_degrades_the_view() {
        let state = test_state();
        let id = seed_transport(&state);
        seed_route(&state, id).await;
        if let Some(mut route) = state.routes.get_mut(&id) {
            route.encoded_polyline = "\u{1}".to_string();
        }

        let view = assemble(&state, id).unwrap();

        assert!(!view.tracking_available);
        assert_eq!(view.progress_percent, None);
    }

    #[tokio::test]
    async fn broadcast_percent_matches_the_view() {
        let state = test_state();
        let id = seed_transport(&state);
        let points = seed_route(&state, id).await;

        assert_eq!(progress_percent(&state, id, points[1]), Some(50));
        assert_eq!(progress_percent(&state, Uuid::new_v4(), points[1]), None);
    }
}
