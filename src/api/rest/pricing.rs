use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::{get, post, put};
use axum::Json;
use axum::Router;
use chrono::Utc;
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use crate::engine::pricing;
use crate::error::AppError;
use crate::models::pricing::{AnimalComplexityFee, ComplexityClass, PricingRule, PricingSnapshot};
use crate::state::AppState;
use crate::store::RuleDraft;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/pricing/rules", post(create_rule).get(list_rules))
        .route("/pricing/rules/current", get(current_rule))
        .route("/pricing/fees", get(list_fees))
        .route("/pricing/fees/:class", put(upsert_fee))
        .route("/transports/:id/pricing", post(finalize_snapshot).get(get_snapshot))
        .route("/transports/:id/pricing/rebuild", post(rebuild_snapshot))
}

#[derive(Deserialize)]
pub struct CreateRuleRequest {
    pub rate_per_mile: Decimal,
    pub rate_per_minute: Decimal,
    pub base_fare: Decimal,
    pub platform_fee_percent: Decimal,
    pub min_payout: Decimal,
}

async fn create_rule(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateRuleRequest>,
) -> Result<Json<PricingRule>, AppError> {
    non_negative("rate_per_mile", payload.rate_per_mile)?;
    non_negative("rate_per_minute", payload.rate_per_minute)?;
    non_negative("base_fare", payload.base_fare)?;
    non_negative("min_payout", payload.min_payout)?;
    if payload.platform_fee_percent < Decimal::ZERO
        || payload.platform_fee_percent > Decimal::ONE_HUNDRED
    {
        return Err(AppError::BadRequest(
            "platform_fee_percent must be between 0 and 100".to_string(),
        ));
    }

    let rule = state.rules.append(RuleDraft {
        rate_per_mile: payload.rate_per_mile,
        rate_per_minute: payload.rate_per_minute,
        base_fare: payload.base_fare,
        platform_fee_percent: payload.platform_fee_percent,
        min_payout: payload.min_payout,
    });

    info!(
        calculation_version = rule.calculation_version,
        rate_per_mile = %rule.rate_per_mile,
        "pricing rule created"
    );

    Ok(Json(rule))
}

async fn list_rules(State(state): State<Arc<AppState>>) -> Json<Vec<PricingRule>> {
    Json(state.rules.history())
}

async fn current_rule(State(state): State<Arc<AppState>>) -> Result<Json<PricingRule>, AppError> {
    state.rules.latest().map(Json).ok_or(AppError::RuleNotConfigured)
}

#[derive(Deserialize)]
pub struct UpsertFeeRequest {
    pub amount: Decimal,
    pub multi_animal_fee: Decimal,
}

async fn upsert_fee(
    State(state): State<Arc<AppState>>,
    Path(class): Path<ComplexityClass>,
    Json(payload): Json<UpsertFeeRequest>,
) -> Result<Json<AnimalComplexityFee>, AppError> {
    non_negative("amount", payload.amount)?;
    non_negative("multi_animal_fee", payload.multi_animal_fee)?;

    let fee = AnimalComplexityFee {
        class,
        amount: payload.amount,
        multi_animal_fee: payload.multi_animal_fee,
        updated_at: Utc::now(),
    };
    state.fees.insert(class, fee.clone());

    info!(class = %class, amount = %fee.amount, "complexity fee upserted");

    Ok(Json(fee))
}

async fn list_fees(State(state): State<Arc<AppState>>) -> Json<Vec<AnimalComplexityFee>> {
    let fees = state.fees.iter().map(|entry| entry.value().clone()).collect();
    Json(fees)
}

/// Builds the transport's one pricing snapshot. A repeat call answers with
/// the stored snapshot unchanged.
async fn finalize_snapshot(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<PricingSnapshot>, AppError> {
    match pricing::finalize_pricing(&state, id).await {
        Ok(snapshot) => Ok(Json(snapshot)),
        Err(AppError::SnapshotAlreadyExists(transport_id)) => {
            match state.snapshots.get(&transport_id) {
                Some(existing) => Ok(Json(existing)),
                None => Err(AppError::SnapshotAlreadyExists(transport_id)),
            }
        }
        Err(err) => Err(err),
    }
}

async fn rebuild_snapshot(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<PricingSnapshot>, AppError> {
    let snapshot = pricing::rebuild_pricing(&state, id).await?;
    Ok(Json(snapshot))
}

async fn get_snapshot(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<PricingSnapshot>, AppError> {
    let snapshot = state
        .snapshots
        .get(&id)
        .ok_or_else(|| AppError::NotFound(format!("no pricing snapshot for transport {}", id)))?;

    Ok(Json(snapshot))
}

fn non_negative(field: &str, value: Decimal) -> Result<(), AppError> {
    if value < Decimal::ZERO {
        return Err(AppError::BadRequest(format!("{field} must not be negative")));
    }
    Ok(())
}
