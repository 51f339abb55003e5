use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Default)]
pub struct Metrics {
    published_events: AtomicU64,
    publish_errors: AtomicU64,
    persisted_events: AtomicU64,
    duplicate_events: AtomicU64,
    poison_messages: AtomicU64,
    transient_failures: AtomicU64,
    stats_runs: AtomicU64,
    anomalies: AtomicU64,
}

impl Metrics {
    pub fn record_published(&self) {
        self.published_events.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_publish_error(&self) {
        self.publish_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_persisted(&self) {
        self.persisted_events.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_duplicate(&self) {
        self.duplicate_events.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_poison(&self) {
        self.poison_messages.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_transient_failure(&self) {
        self.transient_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_stats_run(&self) {
        self.stats_runs.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_anomalies(&self, count: usize) {
        self.anomalies.fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn persisted(&self) -> u64 {
        self.persisted_events.load(Ordering::Relaxed)
    }

    pub fn duplicates(&self) -> u64 {
        self.duplicate_events.load(Ordering::Relaxed)
    }

    pub fn poisoned(&self) -> u64 {
        self.poison_messages.load(Ordering::Relaxed)
    }

    pub fn transient_failures(&self) -> u64 {
        self.transient_failures.load(Ordering::Relaxed)
    }

    pub fn render_prometheus(&self) -> String {
        let counters = [
            ("telemetry_published_events_total", &self.published_events),
            ("telemetry_publish_errors_total", &self.publish_errors),
            ("telemetry_persisted_events_total", &self.persisted_events),
            ("telemetry_duplicate_events_total", &self.duplicate_events),
            ("telemetry_poison_messages_total", &self.poison_messages),
            ("telemetry_transient_failures_total", &self.transient_failures),
            ("telemetry_stats_runs_total", &self.stats_runs),
            ("telemetry_anomalies_total", &self.anomalies),
        ];
        let mut out = String::new();
        for (name, value) in counters {
            out.push_str(&format!(
                "# TYPE {name} counter\n{name} {}\n",
                value.load(Ordering::Relaxed)
            ));
        }
        out
    }
}
