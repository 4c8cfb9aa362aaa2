use chrono::Utc;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use rust_decimal::Decimal;
use std::sync::RwLock;
use uuid::Uuid;

use crate::models::pricing::{PricingRule, PricingSnapshot};

/// Rate fields for a new pricing rule; version and timestamps are assigned
/// by the ledger on append.
#[derive(Debug, Clone)]
pub struct RuleDraft {
    pub rate_per_mile: Decimal,
    pub rate_per_minute: Decimal,
    pub base_fare: Decimal,
    pub platform_fee_percent: Decimal,
    pub min_payout: Decimal,
}

/// Append-only ledger of pricing rules. Versions are monotonic and existing
/// entries are never mutated, so a snapshot's calculation_version always
/// resolves to the exact rates it was computed from.
#[derive(Default)]
pub struct RuleLedger {
    rules: RwLock<Vec<PricingRule>>,
}

impl RuleLedger {
    pub fn append(&self, draft: RuleDraft) -> PricingRule {
        let mut rules = self.rules.write().expect("rule ledger poisoned");
        let calculation_version = rules.last().map_or(1, |r| r.calculation_version + 1);
        let rule = PricingRule {
            id: Uuid::new_v4(),
            calculation_version,
            rate_per_mile: draft.rate_per_mile,
            rate_per_minute: draft.rate_per_minute,
            base_fare: draft.base_fare,
            platform_fee_percent: draft.platform_fee_percent,
            min_payout: draft.min_payout,
            effective_at: Utc::now(),
        };
        rules.push(rule.clone());
        rule
    }

    /// `None` until the first rule is appended. Bootstrap state, not an error.
    pub fn latest(&self) -> Option<PricingRule> {
        self.rules.read().expect("rule ledger poisoned").last().cloned()
    }

    pub fn history(&self) -> Vec<PricingRule> {
        self.rules.read().expect("rule ledger poisoned").clone()
    }

    pub fn len(&self) -> usize {
        self.rules.read().expect("rule ledger poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Write-once pricing snapshots keyed by transport id.
#[derive(Default)]
pub struct SnapshotStore {
    snapshots: DashMap<Uuid, PricingSnapshot>,
}

impl SnapshotStore {
    pub fn get(&self, transport_id: &Uuid) -> Option<PricingSnapshot> {
        self.snapshots.get(transport_id).map(|entry| entry.clone())
    }

    /// Stores the snapshot unless one already exists for the transport.
    /// The occupied arm returns the stored snapshot untouched, which keeps
    /// concurrent finalizations idempotent.
    pub fn insert_if_absent(
        &self,
        snapshot: PricingSnapshot,
    ) -> Result<PricingSnapshot, PricingSnapshot> {
        match self.snapshots.entry(snapshot.transport_id) {
            Entry::Vacant(slot) => {
                slot.insert(snapshot.clone());
                Ok(snapshot)
            }
            Entry::Occupied(existing) => Err(existing.get().clone()),
        }
    }

    /// Explicit re-price: replaces any stored snapshot and returns the prior one.
    pub fn replace(&self, snapshot: PricingSnapshot) -> Option<PricingSnapshot> {
        self.snapshots.insert(snapshot.transport_id, snapshot)
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }
}
