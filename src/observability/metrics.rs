use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};

#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    pub matches_ranked_total: IntCounter,
    pub lifecycle_transitions_total: IntCounterVec,
    pub otp_verifications_total: IntCounterVec,
    pub cache_lookups_total: IntCounterVec,
    pub room_connections: IntGauge,
    pub match_ranking_seconds: Histogram,
}

impl Metrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let matches_ranked_total =
            IntCounter::new("matches_ranked_total", "Ranked request/traveler pairs produced")
                .expect("valid matches_ranked_total metric");

        let lifecycle_transitions_total = IntCounterVec::new(
            Opts::new(
                "lifecycle_transitions_total",
                "Request/match/delivery transitions by entity and outcome",
            ),
            &["entity", "outcome"],
        )
        .expect("valid lifecycle_transitions_total metric");

        let otp_verifications_total = IntCounterVec::new(
            Opts::new("otp_verifications_total", "One-time code checks by kind and outcome"),
            &["kind", "outcome"],
        )
        .expect("valid otp_verifications_total metric");

        let cache_lookups_total = IntCounterVec::new(
            Opts::new("cache_lookups_total", "Query cache lookups by cache and result"),
            &["cache", "result"],
        )
        .expect("valid cache_lookups_total metric");

        let room_connections =
            IntGauge::new("room_connections", "Live tracking connections")
                .expect("valid room_connections metric");

        let match_ranking_seconds = Histogram::with_opts(HistogramOpts::new(
            "match_ranking_seconds",
            "Latency of candidate ranking in seconds",
        ))
        .expect("valid match_ranking_seconds metric");

        registry
            .register(Box::new(matches_ranked_total.clone()))
            .expect("register matches_ranked_total");
        registry
            .register(Box::new(lifecycle_transitions_total.clone()))
            .expect("register lifecycle_transitions_total");
        registry
            .register(Box::new(otp_verifications_total.clone()))
            .expect("register otp_verifications_total");
        registry
            .register(Box::new(cache_lookups_total.clone()))
            .expect("register cache_lookups_total");
        registry
            .register(Box::new(room_connections.clone()))
            .expect("register room_connections");
        registry
            .register(Box::new(match_ranking_seconds.clone()))
            .expect("register match_ranking_seconds");

        Self {
            registry,
            matches_ranked_total,
            lifecycle_transitions_total,
            otp_verifications_total,
            cache_lookups_total,
            room_connections,
            match_ranking_seconds,
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

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}
