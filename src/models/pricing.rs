use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ComplexityClass {
    Standard,
    PuppyKitten,
    Medical,
    SpecialHandling,
}

impl fmt::Display for ComplexityClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ComplexityClass::Standard => "Standard",
            ComplexityClass::PuppyKitten => "PuppyKitten",
            ComplexityClass::Medical => "Medical",
            ComplexityClass::SpecialHandling => "SpecialHandling",
        };
        f.write_str(name)
    }
}

/// One revision of the rate table. Immutable once created; a new rule
/// supersedes the prior one and `calculation_version` never repeats.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PricingRule {
    pub id: Uuid,
    pub calculation_version: u32,
    pub rate_per_mile: Decimal,
    pub rate_per_minute: Decimal,
    pub base_fare: Decimal,
    pub platform_fee_percent: Decimal,
    pub min_payout: Decimal,
    pub effective_at: DateTime<Utc>,
}

/// Surcharge for an animal handling classification. Mutable in place, unlike
/// pricing rules.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnimalComplexityFee {
    pub class: ComplexityClass,
    pub amount: Decimal,
    pub multi_animal_fee: Decimal,
    pub updated_at: DateTime<Utc>,
}

/// Point-in-time financial record for one transport. The rate values are
/// copied from the rule in effect at computation time, not referenced, so a
/// later rule revision never changes a settled transport.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PricingSnapshot {
    pub id: Uuid,
    pub transport_id: Uuid,
    pub calculation_version: u32,
    pub distance_miles: Decimal,
    pub duration_minutes: Decimal,
    pub rate_per_mile: Decimal,
    pub rate_per_minute: Decimal,
    pub base_fare: Decimal,
    pub platform_fee_percent: Decimal,
    pub min_payout: Decimal,
    pub distance_cost: Decimal,
    pub time_cost: Decimal,
    pub complexity_fee: Decimal,
    pub platform_fee: Decimal,
    pub driver_payout: Decimal,
    pub total_cost: Decimal,
    pub computed_at: DateTime<Utc>,
}
