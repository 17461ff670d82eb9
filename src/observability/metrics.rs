use prometheus::{
    Encoder, GaugeVec, Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts,
    Registry, TextEncoder,
};

#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    pub region_commits_total: IntCounterVec,
    pub location_samples_total: IntCounterVec,
    pub waiting_points: GaugeVec,
    pub tracked_couriers: IntGauge,
    pub proximity_events_total: IntCounterVec,
    pub notification_failures_total: IntCounter,
    pub proximity_analysis_seconds: Histogram,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let region_commits_total = IntCounterVec::new(
            Opts::new("region_commits_total", "Region commits by kind and outcome"),
            &["kind", "outcome"],
        )
        .expect("valid region_commits_total metric");

        let location_samples_total = IntCounterVec::new(
            Opts::new("location_samples_total", "Courier location samples by outcome"),
            &["outcome"],
        )
        .expect("valid location_samples_total metric");

        let waiting_points = GaugeVec::new(
            Opts::new("waiting_points", "Waiting points in each courier's retained history"),
            &["courier_id"],
        )
        .expect("valid waiting_points metric");

        let tracked_couriers = IntGauge::new("tracked_couriers", "Couriers with an active sampling task")
            .expect("valid tracked_couriers metric");

        let proximity_events_total = IntCounterVec::new(
            Opts::new("proximity_events_total", "Proximity events emitted by kind"),
            &["kind"],
        )
        .expect("valid proximity_events_total metric");

        let notification_failures_total = IntCounter::new(
            "notification_failures_total",
            "Proximity events the notification sink failed to deliver",
        )
        .expect("valid notification_failures_total metric");

        let proximity_analysis_seconds = Histogram::with_opts(HistogramOpts::new(
            "proximity_analysis_seconds",
            "Time spent matching courier zones against stores",
        ))
        .expect("valid proximity_analysis_seconds metric");

        registry
            .register(Box::new(region_commits_total.clone()))
            .expect("register region_commits_total");
        registry
            .register(Box::new(location_samples_total.clone()))
            .expect("register location_samples_total");
        registry
            .register(Box::new(waiting_points.clone()))
            .expect("register waiting_points");
        registry
            .register(Box::new(tracked_couriers.clone()))
            .expect("register tracked_couriers");
        registry
            .register(Box::new(proximity_events_total.clone()))
            .expect("register proximity_events_total");
        registry
            .register(Box::new(notification_failures_total.clone()))
            .expect("register notification_failures_total");
        registry
            .register(Box::new(proximity_analysis_seconds.clone()))
            .expect("register proximity_analysis_seconds");

        Self {
            registry,
            region_commits_total,
            location_samples_total,
            waiting_points,
            tracked_couriers,
            proximity_events_total,
            notification_failures_total,
            proximity_analysis_seconds,
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
