use prometheus::{Encoder, HistogramVec, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};

#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    pub transports_created_total: IntCounter,
    pub position_updates_total: IntCounter,
    pub pricing_snapshots_total: IntCounterVec,
    pub tracking_queries_total: IntCounterVec,
    pub directions_requests_total: IntCounterVec,
    pub directions_latency_seconds: HistogramVec,
}

impl Metrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let transports_created_total = IntCounter::new(
            "transports_created_total",
            "Total transport jobs created",
        )
        .expect("valid transports_created_total metric");

        let position_updates_total = IntCounter::new(
            "position_updates_total",
            "Total driver position pings accepted",
        )
        .expect("valid position_updates_total metric");

        let pricing_snapshots_total = IntCounterVec::new(
            Opts::new("pricing_snapshots_total", "Pricing snapshot builds by outcome"),
            &["outcome"],
        )
        .expect("valid pricing_snapshots_total metric");

        let tracking_queries_total = IntCounterVec::new(
            Opts::new("tracking_queries_total", "Live tracking reads by outcome"),
            &["outcome"],
        )
        .expect("valid tracking_queries_total metric");

        let directions_requests_total = IntCounterVec::new(
            Opts::new(
                "directions_requests_total",
                "Directions provider calls by endpoint and outcome",
            ),
            &["endpoint", "outcome"],
        )
        .expect("valid directions_requests_total metric");

        let directions_latency_seconds = HistogramVec::new(
            prometheus::HistogramOpts::new(
                "directions_latency_seconds",
                "Latency of directions provider calls in seconds",
            ),
            &["endpoint"],
        )
        .expect("valid directions_latency_seconds metric");

        registry
            .register(Box::new(transports_created_total.clone()))
            .expect("register transports_created_total");
        registry
            .register(Box::new(position_updates_total.clone()))
            .expect("register position_updates_total");
        registry
            .register(Box::new(pricing_snapshots_total.clone()))
            .expect("register pricing_snapshots_total");
        registry
            .register(Box::new(tracking_queries_total.clone()))
            .expect("register tracking_queries_total");
        registry
            .register(Box::new(directions_requests_total.clone()))
            .expect("register directions_requests_total");
        registry
            .register(Box::new(directions_latency_seconds.clone()))
            .expect("register directions_latency_seconds");

        Self {
            registry,
            transports_created_total,
            position_updates_total,
            pricing_snapshots_total,
            tracking_queries_total,
            directions_requests_total,
            directions_latency_seconds,
        }
    }

    pub fn encode(&self) -> Result<String, String> {
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();

        TextEncoder::new()
            .encode(&metric_families, &mut buffer)
            .map_err(|err| format!("failed to encode metrics: {err}"))?;

        String::from_utf8(buffer).map_err(|err| format!("metrics are not valid utf8: {err}"))
    }
}
