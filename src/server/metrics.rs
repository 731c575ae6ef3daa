//! Prometheus metrics
//!
//! A small in-process registry rendered in the Prometheus text exposition
//! format at `/metrics`. Counters and histograms are plain atomics; labeled
//! counters sit behind a `parking_lot` lock.

use axum::http::header;
use axum::response::IntoResponse;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::fmt::Write as FmtWrite;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, LazyLock};
use std::time::Instant;

/// Buckets (seconds) for provider request latency.
const LATENCY_BUCKETS: &[f64] = &[0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0];

/// Monotonic counter.
#[derive(Debug, Default)]
pub struct Counter(AtomicU64);

impl Counter {
    pub fn inc(&self) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}

/// Counter family keyed by label values.
#[derive(Debug)]
pub struct CounterVec {
    label_names: Vec<&'static str>,
    entries: RwLock<BTreeMap<Vec<String>, Arc<Counter>>>,
}

impl CounterVec {
    fn new(label_names: &[&'static str]) -> Self {
        Self {
            label_names: label_names.to_vec(),
            entries: RwLock::new(BTreeMap::new()),
        }
    }

    pub fn inc(&self, label_values: &[&str]) {
        self.with_label_values(label_values).inc();
    }

    pub fn get(&self, label_values: &[&str]) -> u64 {
        let key: Vec<String> = label_values.iter().map(|s| s.to_string()).collect();
        self.entries.read().get(&key).map(|c| c.get()).unwrap_or(0)
    }

    fn with_label_values(&self, label_values: &[&str]) -> Arc<Counter> {
        let key: Vec<String> = label_values.iter().map(|s| s.to_string()).collect();
        if let Some(counter) = self.entries.read().get(&key) {
            return Arc::clone(counter);
        }
        let mut map = self.entries.write();
        Arc::clone(map.entry(key).or_default())
    }
}

/// Cumulative histogram with fixed buckets.
#[derive(Debug)]
pub struct Histogram {
    bounds: Vec<f64>,
    /// One slot per bound plus the implicit +Inf bucket.
    counts: Vec<AtomicU64>,
    /// Sum of observations, stored as f64 bits.
    sum: AtomicU64,
}

impl Histogram {
    pub fn new(bounds: &[f64]) -> Self {
        Self {
            bounds: bounds.to_vec(),
            counts: (0..=bounds.len()).map(|_| AtomicU64::new(0)).collect(),
            sum: AtomicU64::new(0.0_f64.to_bits()),
        }
    }

    pub fn observe(&self, value: f64) {
        for (i, bound) in self.bounds.iter().enumerate() {
            if value <= *bound {
                self.counts[i].fetch_add(1, Ordering::Relaxed);
            }
        }
        self.counts[self.bounds.len()].fetch_add(1, Ordering::Relaxed);

        let mut current = self.sum.load(Ordering::Relaxed);
        loop {
            let next = (f64::from_bits(current) + value).to_bits();
            match self
                .sum
                .compare_exchange_weak(current, next, Ordering::Relaxed, Ordering::Relaxed)
            {
                Ok(_) => break,
                Err(actual) => current = actual,
            }
        }
    }

    pub fn count(&self) -> u64 {
        self.counts[self.bounds.len()].load(Ordering::Relaxed)
    }

    pub fn sum(&self) -> f64 {
        f64::from_bits(self.sum.load(Ordering::Relaxed))
    }
}

/// Application metrics.
#[derive(Debug)]
pub struct Metrics {
    started_at: Instant,
    /// Webhook invocations by route.
    pub webhooks_total: CounterVec,
    /// Calls to the Twilio REST API by operation and outcome.
    pub provider_requests_total: CounterVec,
    /// Twilio REST API latency.
    pub provider_request_seconds: Histogram,
    /// Webhooks rejected for a missing or invalid signature.
    pub signature_rejections_total: Counter,
    /// Access tokens issued.
    pub tokens_issued_total: Counter,
}

impl Default for Metrics {
    fn default() -> Self {
        Self {
            started_at: Instant::now(),
            webhooks_total: CounterVec::new(&["route"]),
            provider_requests_total: CounterVec::new(&["operation", "result"]),
            provider_request_seconds: Histogram::new(LATENCY_BUCKETS),
            signature_rejections_total: Counter::default(),
            tokens_issued_total: Counter::default(),
        }
    }
}

/// Process-wide metrics.
pub static METRICS: LazyLock<Metrics> = LazyLock::new(Metrics::default);

impl Metrics {
    pub fn uptime_secs(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }

    /// Record one provider round trip.
    pub fn observe_provider(&self, operation: &str, ok: bool, started: Instant) {
        let result = if ok { "success" } else { "error" };
        self.provider_requests_total.inc(&[operation, result]);
        self.provider_request_seconds
            .observe(started.elapsed().as_secs_f64());
    }

    /// Render in Prometheus text exposition format.
    pub fn render(&self) -> String {
        let mut out = String::with_capacity(2048);

        write_header(
            &mut out,
            "switchboard_build_info",
            "Build information",
            "gauge",
        );
        let _ = writeln!(
            out,
            "switchboard_build_info{{version=\"{}\"}} 1",
            env!("CARGO_PKG_VERSION")
        );

        write_header(
            &mut out,
            "switchboard_uptime_seconds",
            "Server uptime in seconds",
            "gauge",
        );
        let _ = writeln!(out, "switchboard_uptime_seconds {}", self.uptime_secs());

        write_counter_vec(
            &mut out,
            "switchboard_webhooks_total",
            "Webhook invocations by route",
            &self.webhooks_total,
        );
        write_counter_vec(
            &mut out,
            "switchboard_provider_requests_total",
            "Twilio REST API requests",
            &self.provider_requests_total,
        );

        write_header(
            &mut out,
            "switchboard_provider_request_seconds",
            "Twilio REST API request latency",
            "histogram",
        );
        write_histogram(
            &mut out,
            "switchboard_provider_request_seconds",
            &self.provider_request_seconds,
        );

        write_header(
            &mut out,
            "switchboard_signature_rejections_total",
            "Webhooks rejected for an invalid signature",
            "counter",
        );
        let _ = writeln!(
            out,
            "switchboard_signature_rejections_total {}",
            self.signature_rejections_total.get()
        );

        write_header(
            &mut out,
            "switchboard_tokens_issued_total",
            "Access tokens issued",
            "counter",
        );
        let _ = writeln!(
            out,
            "switchboard_tokens_issued_total {}",
            self.tokens_issued_total.get()
        );

        out
    }
}

fn write_header(out: &mut String, name: &str, help: &str, kind: &str) {
    let _ = writeln!(out, "# HELP {} {}", name, help);
    let _ = writeln!(out, "# TYPE {} {}", name, kind);
}

fn write_counter_vec(out: &mut String, name: &str, help: &str, vec: &CounterVec) {
    write_header(out, name, help, "counter");
    for (values, counter) in vec.entries.read().iter() {
        let _ = writeln!(
            out,
            "{}{} {}",
            name,
            format_labels(&vec.label_names, values),
            counter.get()
        );
    }
}

fn write_histogram(out: &mut String, name: &str, h: &Histogram) {
    for (i, bound) in h.bounds.iter().enumerate() {
        let _ = writeln!(
            out,
            "{}_bucket{{le=\"{}\"}} {}",
            name,
            bound,
            h.counts[i].load(Ordering::Relaxed)
        );
    }
    let _ = writeln!(out, "{}_bucket{{le=\"+Inf\"}} {}", name, h.count());
    let _ = writeln!(out, "{}_sum {}", name, h.sum());
    let _ = writeln!(out, "{}_count {}", name, h.count());
}

fn format_labels(names: &[&str], values: &[String]) -> String {
    let pairs: Vec<String> = names
        .iter()
        .zip(values)
        .map(|(name, value)| format!("{}=\"{}\"", name, escape_label_value(value)))
        .collect();
    format!("{{{}}}", pairs.join(","))
}

fn escape_label_value(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
}

/// `GET /metrics`
pub async fn metrics_handler() -> impl IntoResponse {
    (
        [(
            header::CONTENT_TYPE,
            "text/plain; version=0.0.4; charset=utf-8",
        )],
        METRICS.render(),
    )
}
