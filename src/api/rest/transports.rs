use std::sync::Arc;
use std::time::Instant;

use axum::extract::{Path, State};
use axum::routing::{get, patch, post};
use axum::Json;
use axum::Router;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::engine::tracking::{self, LiveTrackingView};
use crate::error::AppError;
use crate::maps::DirectionsProvider;
use crate::models::route::{RouteLeg, RoutePath};
use crate::models::transport::{
    AnimalManifest, GeoPoint, LivePosition, PositionEvent, TransportJob, TransportStatus,
};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/transports", post(create_transport).get(list_transports))
        .route("/transports/:id", get(get_transport))
        .route("/transports/:id/route", post(compute_route).get(get_route))
        .route("/transports/:id/position", patch(update_position))
        .route("/transports/:id/tracking", get(get_tracking))
        .route("/transports/:id/transaction", get(get_transaction))
}

#[derive(Deserialize)]
pub struct CreateTransportRequest {
    pub origin: GeoPoint,
    pub destination: GeoPoint,
    pub origin_label: String,
    pub destination_label: String,
    pub animal: AnimalManifest,
    pub driver_name: Option<String>,
}

async fn create_transport(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateTransportRequest>,
) -> Result<Json<TransportJob>, AppError> {
    if payload.animal.count == 0 {
        return Err(AppError::BadRequest("animal count must be at least 1".to_string()));
    }
    if payload.animal.name.trim().is_empty() {
        return Err(AppError::BadRequest("animal name must not be empty".to_string()));
    }
    if payload.origin_label.trim().is_empty() || payload.destination_label.trim().is_empty() {
        return Err(AppError::BadRequest(
            "origin and destination labels must not be empty".to_string(),
        ));
    }
    if !payload.origin.in_bounds() {
        return Err(AppError::BadRequest(
            "origin is outside valid coordinate bounds".to_string(),
        ));
    }
    if !payload.destination.in_bounds() {
        return Err(AppError::BadRequest(
            "destination is outside valid coordinate bounds".to_string(),
        ));
    }

    if !checked_locate(&state, payload.origin).await {
        return Err(AppError::BadRequest(
            "origin cannot be resolved to a serviceable location".to_string(),
        ));
    }
    if !checked_locate(&state, payload.destination).await {
        return Err(AppError::BadRequest(
            "destination cannot be resolved to a serviceable location".to_string(),
        ));
    }

    let transport = TransportJob {
        id: Uuid::new_v4(),
        status: TransportStatus::Requested,
        origin: payload.origin,
        destination: payload.destination,
        origin_label: payload.origin_label,
        destination_label: payload.destination_label,
        animal: payload.animal,
        driver_name: payload.driver_name,
        created_at: Utc::now(),
    };

    state.transports.insert(transport.id, transport.clone());
    state.metrics.transports_created_total.inc();
    info!(
        transport_id = %transport.id,
        species = %transport.animal.species,
        count = transport.animal.count,
        "transport created"
    );

    Ok(Json(transport))
}

async fn list_transports(State(state): State<Arc<AppState>>) -> Json<Vec<TransportJob>> {
    let transports = state
        .transports
        .iter()
        .map(|entry| entry.value().clone())
        .collect();

    Json(transports)
}

async fn get_transport(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<TransportJob>, AppError> {
    let transport = state
        .transports
        .get(&id)
        .ok_or_else(|| AppError::NotFound(format!("transport {} not found", id)))?;

    Ok(Json(transport.value().clone()))
}

/// Computes and stores the reference route. Idempotent: a transport keeps
/// the first geometry it was ever assigned.
async fn compute_route(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<RoutePath>, AppError> {
    let transport = state
        .transports
        .get(&id)
        .map(|entry| entry.clone())
        .ok_or_else(|| AppError::NotFound(format!("transport {} not found", id)))?;

    if let Some(existing) = state.routes.get(&id) {
        return Ok(Json(existing.clone()));
    }

    let started = Instant::now();
    let result = state
        .directions
        .compute_route(transport.origin, transport.destination)
        .await;
    state
        .metrics
        .directions_latency_seconds
        .with_label_values(&["route"])
        .observe(started.elapsed().as_secs_f64());
    state
        .metrics
        .directions_requests_total
        .with_label_values(&["route", if result.is_ok() { "ok" } else { "error" }])
        .inc();

    let computed = result?;
    let path = RoutePath {
        transport_id: id,
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
    };

    // First writer wins if two requests raced past the fast path.
    let stored = state.routes.entry(id).or_insert(path).clone();

    if let Some(mut entry) = state.transports.get_mut(&id) {
        if entry.status == TransportStatus::Requested {
            entry.status = TransportStatus::RouteAssigned;
        }
    }

    info!(
        transport_id = %id,
        distance_meters = stored.total_distance_meters,
        duration_seconds = stored.total_duration_seconds,
        "route assigned"
    );

    Ok(Json(stored))
}

async fn get_route(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<RoutePath>, AppError> {
    let route = state
        .routes
        .get(&id)
        .ok_or_else(|| AppError::NotFound(format!("no route computed for transport {}", id)))?;

    Ok(Json(route.value().clone()))
}

#[derive(Deserialize)]
pub struct UpdatePositionRequest {
    pub position: GeoPoint,
}

/// Driver position ping. Last write wins; the previous position is simply
/// replaced.
async fn update_position(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdatePositionRequest>,
) -> Result<Json<LivePosition>, AppError> {
    if !state.transports.contains_key(&id) {
        return Err(AppError::NotFound(format!("transport {} not found", id)));
    }
    if !payload.position.in_bounds() {
        return Err(AppError::BadRequest(
            "position is outside valid coordinate bounds".to_string(),
        ));
    }

    let live = LivePosition {
        point: payload.position,
        recorded_at: Utc::now(),
    };
    state.positions.insert(id, live.clone());
    state.metrics.position_updates_total.inc();

    if let Some(mut entry) = state.transports.get_mut(&id) {
        if entry.status == TransportStatus::RouteAssigned {
            entry.status = TransportStatus::InTransit;
        }
    }

    let event = PositionEvent {
        transport_id: id,
        point: payload.position,
        recorded_at: live.recorded_at,
        progress_percent: tracking::progress_percent(&state, id, payload.position),
    };
    let _ = state.position_events_tx.send(event);

    Ok(Json(live))
}

async fn get_tracking(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<LiveTrackingView>, AppError> {
    let view = tracking::assemble(&state, id)?;

    let outcome = if view.tracking_available { "live" } else { "degraded" };
    state
        .metrics
        .tracking_queries_total
        .with_label_values(&[outcome])
        .inc();

    Ok(Json(view))
}

/// Financial summary of a priced transport.
#[derive(Debug, Serialize)]
pub struct TransactionView {
    pub transport_id: Uuid,
    pub status: TransportStatus,
    pub animal_name: String,
    pub driver_name: Option<String>,
    pub amount: Decimal,
    pub calculation_version: u32,
    pub base_fare: Decimal,
    pub distance_cost: Decimal,
    pub time_cost: Decimal,
    pub complexity_fee: Decimal,
    pub platform_fee: Decimal,
    pub driver_payout: Decimal,
    pub computed_at: DateTime<Utc>,
}

async fn get_transaction(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<TransactionView>, AppError> {
    let transport = state
        .transports
        .get(&id)
        .map(|entry| entry.clone())
        .ok_or_else(|| AppError::NotFound(format!("transport {} not found", id)))?;

    let snapshot = state
        .snapshots
        .get(&id)
        .ok_or_else(|| AppError::NotFound(format!("no pricing snapshot for transport {}", id)))?;

    Ok(Json(TransactionView {
        transport_id: id,
        status: transport.status,
        animal_name: transport.animal.name,
        driver_name: transport.driver_name,
        amount: snapshot.total_cost,
        calculation_version: snapshot.calculation_version,
        base_fare: snapshot.base_fare,
        distance_cost: snapshot.distance_cost,
        time_cost: snapshot.time_cost,
        complexity_fee: snapshot.complexity_fee,
        platform_fee: snapshot.platform_fee,
        driver_payout: snapshot.driver_payout,
        computed_at: snapshot.computed_at,
    }))
}

async fn checked_locate(state: &AppState, point: GeoPoint) -> bool {
    let started = Instant::now();
    let found = state.directions.locate(point).await;
    state
        .metrics
        .directions_latency_seconds
        .with_label_values(&["locate"])
        .observe(started.elapsed().as_secs_f64());
    state
        .metrics
        .directions_requests_total
        .with_label_values(&["locate", if found { "ok" } else { "error" }])
        .inc();
    found
}
