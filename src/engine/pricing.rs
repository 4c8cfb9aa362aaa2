use std::time::Instant;

use chrono::Utc;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use tracing::info;
use uuid::Uuid;

use crate::error::AppError;
use crate::geo::{MILES_PER_METER, MINUTES_PER_SECOND};
use crate::maps::DirectionsProvider;
use crate::models::pricing::{AnimalComplexityFee, PricingRule, PricingSnapshot};
use crate::models::transport::TransportJob;
use crate::state::AppState;

/// Cost components for one transport at full `Decimal` precision, so
/// `total_cost` equals
/// `base_fare + distance_cost + time_cost + complexity_fee + platform_fee`
/// exactly. Rounding to cents happens once, when a snapshot is assembled.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceBreakdown {
    pub base_fare: Decimal,
    pub min_payout: Decimal,
    pub distance_cost: Decimal,
    pub time_cost: Decimal,
    pub complexity_fee: Decimal,
    pub subtotal: Decimal,
    pub platform_fee: Decimal,
    pub driver_payout: Decimal,
    pub total_cost: Decimal,
}

/// Deterministic cost composition in a fixed step order; each step feeds
/// the next and nothing is rounded mid-computation.
pub fn price_breakdown(
    distance_miles: Decimal,
    duration_minutes: Decimal,
    rule: &PricingRule,
    fee: &AnimalComplexityFee,
    animal_count: u32,
) -> PriceBreakdown {
    let distance_cost = distance_miles * rule.rate_per_mile;
    let time_cost = duration_minutes * rule.rate_per_minute;

    let complexity_fee = if animal_count > 1 {
        fee.amount + fee.multi_animal_fee
    } else {
        fee.amount
    };

    let subtotal = rule.base_fare + distance_cost + time_cost + complexity_fee;
    let platform_fee = subtotal * rule.platform_fee_percent / Decimal::ONE_HUNDRED;
    let driver_payout = (subtotal - platform_fee).max(rule.min_payout);
    let total_cost = subtotal + platform_fee;

    PriceBreakdown {
        base_fare: rule.base_fare,
        min_payout: rule.min_payout,
        distance_cost,
        time_cost,
        complexity_fee,
        subtotal,
        platform_fee,
        driver_payout,
        total_cost,
    }
}

fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Builds and stores the one pricing snapshot a transport gets. Returns
/// `SnapshotAlreadyExists` when a snapshot is already on record; callers
/// that want idempotent semantics read the stored one back.
pub async fn finalize_pricing(
    state: &AppState,
    transport_id: Uuid,
) -> Result<PricingSnapshot, AppError> {
    let transport = lookup_transport(state, transport_id)?;

    if state.snapshots.get(&transport_id).is_some() {
        state
            .metrics
            .pricing_snapshots_total
            .with_label_values(&["duplicate"])
            .inc();
        return Err(AppError::SnapshotAlreadyExists(transport_id));
    }

    let snapshot = build_snapshot(state, &transport).await?;

    match state.snapshots.insert_if_absent(snapshot) {
        Ok(stored) => {
            state
                .metrics
                .pricing_snapshots_total
                .with_label_values(&["created"])
                .inc();
            info!(
                transport_id = %transport_id,
                calculation_version = stored.calculation_version,
                total_cost = %stored.total_cost,
                driver_payout = %stored.driver_payout,
                "pricing snapshot created"
            );
            Ok(stored)
        }
        Err(_existing) => {
            state
                .metrics
                .pricing_snapshots_total
                .with_label_values(&["duplicate"])
                .inc();
            Err(AppError::SnapshotAlreadyExists(transport_id))
        }
    }
}

/// Explicit re-price after a rate change. Replaces the stored snapshot.
pub async fn rebuild_pricing(
    state: &AppState,
    transport_id: Uuid,
) -> Result<PricingSnapshot, AppError> {
    let transport = lookup_transport(state, transport_id)?;
    let snapshot = build_snapshot(state, &transport).await?;

    let prior = state.snapshots.replace(snapshot.clone());
    state
        .metrics
        .pricing_snapshots_total
        .with_label_values(&["rebuilt"])
        .inc();
    info!(
        transport_id = %transport_id,
        prior_version = prior.map(|p| p.calculation_version),
        calculation_version = snapshot.calculation_version,
        total_cost = %snapshot.total_cost,
        "pricing snapshot rebuilt"
    );
    Ok(snapshot)
}

fn lookup_transport(state: &AppState, transport_id: Uuid) -> Result<TransportJob, AppError> {
    state
        .transports
        .get(&transport_id)
        .map(|entry| entry.clone())
        .ok_or_else(|| AppError::NotFound(format!("transport {transport_id} not found")))
}

async fn build_snapshot(
    state: &AppState,
    transport: &TransportJob,
) -> Result<PricingSnapshot, AppError> {
    let rule = state.rules.latest().ok_or(AppError::RuleNotConfigured)?;
    let fee = state
        .fees
        .get(&transport.animal.complexity)
        .map(|entry| entry.clone())
        .ok_or_else(|| AppError::FeeNotFound(transport.animal.complexity.to_string()))?;

    let (distance_miles, duration_minutes) = measured_route(state, transport).await?;
    let breakdown = price_breakdown(
        distance_miles,
        duration_minutes,
        &rule,
        &fee,
        transport.animal.count,
    );

    Ok(assemble_snapshot(
        transport.id,
        distance_miles,
        duration_minutes,
        &rule,
        &breakdown,
    ))
}

/// Distance and duration for pricing, as cent-friendly two-decimal values.
/// Prefers the stored route geometry; falls back to a point-to-point
/// estimate from the directions provider when no route was ever computed.
async fn measured_route(
    state: &AppState,
    transport: &TransportJob,
) -> Result<(Decimal, Decimal), AppError> {
    if let Some(totals) = state
        .routes
        .get(&transport.id)
        .map(|route| (route.distance_miles(), route.duration_minutes()))
    {
        return Ok((measurement(totals.0)?, measurement(totals.1)?));
    }

    let started = Instant::now();
    let result = state
        .directions
        .travel_estimate(transport.origin, transport.destination)
        .await;
    state
        .metrics
        .directions_latency_seconds
        .with_label_values(&["estimate"])
        .observe(started.elapsed().as_secs_f64());
    state
        .metrics
        .directions_requests_total
        .with_label_values(&["estimate", if result.is_ok() { "ok" } else { "error" }])
        .inc();

    let estimate = result.map_err(|err| {
        state
            .metrics
            .pricing_snapshots_total
            .with_label_values(&["unavailable"])
            .inc();
        AppError::PricingUnavailable(err.to_string())
    })?;

    Ok((
        measurement(estimate.distance_meters * MILES_PER_METER)?,
        measurement(estimate.duration_seconds * MINUTES_PER_SECOND)?,
    ))
}

fn measurement(value: f64) -> Result<Decimal, AppError> {
    Decimal::from_f64(value)
        .map(round_money)
        .ok_or_else(|| AppError::PricingUnavailable("route measurement is not finite".to_string()))
}

/// Monetary fields are rounded to cents here, at the persistence boundary,
/// and nowhere earlier.
fn assemble_snapshot(
    transport_id: Uuid,
    distance_miles: Decimal,
    duration_minutes: Decimal,
    rule: &PricingRule,
    breakdown: &PriceBreakdown,
) -> PricingSnapshot {
    PricingSnapshot {
        id: Uuid::new_v4(),
        transport_id,
        calculation_version: rule.calculation_version,
        distance_miles,
        duration_minutes,
        rate_per_mile: rule.rate_per_mile,
        rate_per_minute: rule.rate_per_minute,
        base_fare: round_money(breakdown.base_fare),
        platform_fee_percent: rule.platform_fee_percent,
        min_payout: round_money(breakdown.min_payout),
        distance_cost: round_money(breakdown.distance_cost),
        time_cost: round_money(breakdown.time_cost),
        complexity_fee: round_money(breakdown.complexity_fee),
        platform_fee: round_money(breakdown.platform_fee),
        driver_payout: round_money(breakdown.driver_payout),
        total_cost: round_money(breakdown.total_cost),
        computed_at: Utc::now(),
    }
}
