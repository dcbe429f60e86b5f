// Copyright 2018 TiKV Project Authors. Licensed under Apache-2.0.

//! Request, backoff and lock resolution metrics.
//!
//! Exported through Prometheus when the `prometheus` feature is on; otherwise every hook is a
//! no-op.

#[cfg(feature = "prometheus")]
mod imp {
    use std::sync::OnceLock;
    use std::time::Duration;
    use std::time::Instant;

    use log::warn;
    use prometheus::register_histogram_vec;
    use prometheus::register_int_counter_vec;
    use prometheus::HistogramVec;
    use prometheus::IntCounterVec;

    use crate::Result;

    struct Metrics {
        request_duration: Option<HistogramVec>,
        requests: Option<IntCounterVec>,
        backoff_sleep: Option<HistogramVec>,
        lock_resolves: Option<IntCounterVec>,
    }

    static METRICS: OnceLock<Metrics> = OnceLock::new();

    fn metrics() -> &'static Metrics {
        METRICS.get_or_init(|| Metrics {
            request_duration: histogram(
                "tikv_region_client_request_duration_seconds",
                "Duration of single requests sent to a region leader",
                &["type", "result"],
            ),
            requests: counter(
                "tikv_region_client_requests_total",
                "Requests sent to region leaders",
                &["type", "result"],
            ),
            backoff_sleep: histogram(
                "tikv_region_client_backoff_sleep_seconds",
                "Time slept before a retry",
                &["type"],
            ),
            lock_resolves: counter(
                "tikv_region_client_lock_resolves_total",
                "Outcomes of resolving a blocking lock",
                &["type"],
            ),
        })
    }

    fn histogram(
        name: &'static str,
        help: &'static str,
        labels: &'static [&'static str],
    ) -> Option<HistogramVec> {
        register_histogram_vec!(name, help, labels)
            .map_err(|e| warn!("cannot register histogram {name}: {e:?}"))
            .ok()
    }

    fn counter(
        name: &'static str,
        help: &'static str,
        labels: &'static [&'static str],
    ) -> Option<IntCounterVec> {
        register_int_counter_vec!(name, help, labels)
            .map_err(|e| warn!("cannot register counter {name}: {e:?}"))
            .ok()
    }

    /// Times one request attempt; [`done`](RequestStats::done) records its outcome.
    pub struct RequestStats {
        start: Instant,
        cmd: &'static str,
    }

    impl RequestStats {
        pub fn done<R>(&self, r: Result<R>) -> Result<R> {
            let result = if r.is_ok() { "ok" } else { "err" };
            let metrics = metrics();
            if let Some(h) = metrics.request_duration.as_ref() {
                h.with_label_values(&[self.cmd, result])
                    .observe(self.start.elapsed().as_secs_f64());
            }
            if let Some(c) = metrics.requests.as_ref() {
                c.with_label_values(&[self.cmd, result]).inc();
            }
            r
        }
    }

    pub fn tikv_stats(cmd: &'static str) -> RequestStats {
        RequestStats {
            start: Instant::now(),
            cmd,
        }
    }

    pub(crate) fn observe_backoff_sleep(kind: &'static str, duration: Duration) {
        if let Some(h) = metrics().backoff_sleep.as_ref() {
            h.with_label_values(&[kind]).observe(duration.as_secs_f64());
        }
    }

    pub(crate) fn observe_lock_resolve(outcome: &'static str) {
        if let Some(c) = metrics().lock_resolves.as_ref() {
            c.with_label_values(&[outcome]).inc();
        }
    }
}

#[cfg(not(feature = "prometheus"))]
mod imp {
    use crate::Result;

    pub struct RequestStats;

    impl RequestStats {
        pub fn done<R>(&self, r: Result<R>) -> Result<R> {
            r
        }
    }

    pub fn tikv_stats(_cmd: &'static str) -> RequestStats {
        RequestStats
    }

    pub(crate) fn observe_backoff_sleep(_kind: &'static str, _duration: std::time::Duration) {}

    pub(crate) fn observe_lock_resolve(_outcome: &'static str) {}
}

pub use imp::*;
