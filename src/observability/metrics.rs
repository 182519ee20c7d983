use prometheus::{
    Encoder, Histogram, HistogramOpts, HistogramVec, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};

#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    pub rankings_total: IntCounterVec,
    pub ranking_latency_seconds: HistogramVec,
    pub candidates_returned: Histogram,
    pub notifications_total: IntCounterVec,
    pub notifications_in_queue: IntGauge,
}

impl Metrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let rankings_total = IntCounterVec::new(
            Opts::new("rankings_total", "Total ranking calls by outcome"),
            &["outcome"],
        )
        .expect("valid rankings_total metric");

        let ranking_latency_seconds = HistogramVec::new(
            HistogramOpts::new(
                "ranking_latency_seconds",
                "Latency of directory fetch plus scoring in seconds",
            ),
            &["outcome"],
        )
        .expect("valid ranking_latency_seconds metric");

        let candidates_returned = Histogram::with_opts(
            HistogramOpts::new(
                "candidates_returned",
                "Number of candidates returned per ranking",
            )
            .buckets(vec![0.0, 1.0, 2.0, 5.0, 10.0]),
        )
        .expect("valid candidates_returned metric");

        let notifications_total = IntCounterVec::new(
            Opts::new("notifications_total", "Notifications by delivery outcome"),
            &["outcome"],
        )
        .expect("valid notifications_total metric");

        let notifications_in_queue = IntGauge::new(
            "notifications_in_queue",
            "Current number of notifications waiting for delivery",
        )
        .expect("valid notifications_in_queue metric");

        registry
            .register(Box::new(rankings_total.clone()))
            .expect("register rankings_total");
        registry
            .register(Box::new(ranking_latency_seconds.clone()))
            .expect("register ranking_latency_seconds");
        registry
            .register(Box::new(candidates_returned.clone()))
            .expect("register candidates_returned");
        registry
            .register(Box::new(notifications_total.clone()))
            .expect("register notifications_total");
        registry
            .register(Box::new(notifications_in_queue.clone()))
            .expect("register notifications_in_queue");

        Self {
            registry,
            rankings_total,
            ranking_latency_seconds,
            candidates_returned,
            notifications_total,
            notifications_in_queue,
        }
    }

    pub fn notification_outcome(&self, outcome: &str) {
        self.notifications_total.with_label_values(&[outcome]).inc();
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

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}
