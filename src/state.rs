use std::sync::Arc;

use chrono::Duration;
use dashmap::DashMap;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::config::Config;
use crate::maps::DirectionsProvider;
use crate::models::pricing::{AnimalComplexityFee, ComplexityClass};
use crate::models::route::RoutePath;
use crate::models::transport::{LivePosition, PositionEvent, TransportJob};
use crate::observability::metrics::Metrics;
use crate::store::{RuleLedger, SnapshotStore};

pub struct AppState {
    pub transports: DashMap<Uuid, TransportJob>,
    pub routes: DashMap<Uuid, RoutePath>,
    pub positions: DashMap<Uuid, LivePosition>,
    pub fees: DashMap<ComplexityClass, AnimalComplexityFee>,
    pub rules: RuleLedger,
    pub snapshots: SnapshotStore,
    pub directions: Arc<dyn DirectionsProvider>,
    pub position_events_tx: broadcast::Sender<PositionEvent>,
    pub metrics: Metrics,
    pub stale_position_after: Duration,
}

impl AppState {
    pub fn new(config: &Config, directions: Arc<dyn DirectionsProvider>) -> Self {
        let (position_events_tx, _) = broadcast::channel(config.event_buffer_size);
        Self {
            transports: DashMap::new(),
            routes: DashMap::new(),
            positions: DashMap::new(),
            fees: DashMap::new(),
            rules: RuleLedger::default(),
            snapshots: SnapshotStore::default(),
            directions,
            position_events_tx,
            metrics: Metrics::new(),
            stale_position_after: Duration::seconds(config.stale_position_secs),
        }
    }
}
