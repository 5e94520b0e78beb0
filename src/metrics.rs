//! Metrics collection for the payment flow

use prometheus::{Histogram, HistogramOpts, IntCounter, IntCounterVec, Opts, Registry};
use std::time::Instant;

/// Global metrics registry
pub struct Metrics {
    registry: Registry,

    // Counters
    pub connect_attempts: IntCounter,
    pub redirects_started: IntCounter,
    pub submissions_total: IntCounter,
    pub submissions_success: IntCounter,
    pub submissions_failed: IntCounterVec,
    pub provider_disconnects: IntCounter,

    // Histograms
    pub confirmation_latency: Histogram,
    pub build_latency: Histogram,
}

impl Metrics {
    /// Create new metrics instance
    pub fn new() -> anyhow::Result<Self> {
        let registry = Registry::new();

        let connect_attempts = IntCounter::with_opts(Opts::new(
            "wallet_connect_attempts_total",
            "Wallet connect attempts (extension and mobile)",
        ))?;

        let redirects_started = IntCounter::with_opts(Opts::new(
            "wallet_redirects_total",
            "Deep-link redirects handed to the mobile wallet",
        ))?;

        let submissions_total = IntCounter::with_opts(Opts::new(
            "payment_submissions_total",
            "Payment submissions attempted",
        ))?;

        let submissions_success = IntCounter::with_opts(Opts::new(
            "payment_submissions_success_total",
            "Payments confirmed on the ledger",
        ))?;

        let submissions_failed = IntCounterVec::new(
            Opts::new(
                "payment_submissions_failed_total",
                "Failed payment submissions by error category",
            ),
            &["category"],
        )?;

        let provider_disconnects = IntCounter::with_opts(Opts::new(
            "wallet_provider_disconnects_total",
            "Disconnect events received from the wallet provider",
        ))?;

        let confirmation_latency = Histogram::with_opts(
            HistogramOpts::new(
                "payment_confirmation_latency_seconds",
                "Time from submission to ledger confirmation",
            )
            .buckets(vec![0.5, 1.0, 2.0, 5.0, 10.0, 30.0, 60.0]),
        )?;

        let build_latency = Histogram::with_opts(
            HistogramOpts::new("payment_build_latency_seconds", "Balance, plan and assembly latency")
                .buckets(vec![0.01, 0.05, 0.1, 0.5, 1.0, 2.0]),
        )?;

        registry.register(Box::new(connect_attempts.clone()))?;
        registry.register(Box::new(redirects_started.clone()))?;
        registry.register(Box::new(submissions_total.clone()))?;
        registry.register(Box::new(submissions_success.clone()))?;
        registry.register(Box::new(submissions_failed.clone()))?;
        registry.register(Box::new(provider_disconnects.clone()))?;
        registry.register(Box::new(confirmation_latency.clone()))?;
        registry.register(Box::new(build_latency.clone()))?;

        Ok(Self {
            registry,
            connect_attempts,
            redirects_started,
            submissions_total,
            submissions_success,
            submissions_failed,
            provider_disconnects,
            confirmation_latency,
            build_latency,
        })
    }

    /// Get the registry for exporting
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn record_failure(&self, category: &str) {
        self.submissions_failed.with_label_values(&[category]).inc();
    }
}

/// Global metrics instance
pub fn metrics() -> &'static Metrics {
    static METRICS: once_cell::sync::Lazy<Metrics> =
        once_cell::sync::Lazy::new(|| Metrics::new().expect("Failed to initialize metrics"));
    &METRICS
}

/// Timer helper for measuring operation duration
pub struct Timer {
    start: Instant,
}

impl Timer {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn observe_duration(&self, histogram: &Histogram) {
        histogram.observe(self.start.elapsed().as_secs_f64());
    }

    pub fn elapsed_ms(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_register() {
        let m = Metrics::new().expect("Should create metrics");
        m.submissions_total.inc();
        m.record_failure("ledger");
        m.record_failure("ledger");

        assert_eq!(m.submissions_total.get(), 1);
        assert_eq!(m.submissions_failed.with_label_values(&["ledger"]).get(), 2);
        assert!(!m.registry().gather().is_empty());
    }
}
