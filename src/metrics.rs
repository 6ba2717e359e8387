//! Prometheus metrics for the plugin: per-method request counters and
//! duration histograms, plus storage and uptime gauges.

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use tracing::info;

pub mod names {
    pub const REQUESTS_SERVED_TOTAL: &str = "csilvm_requests_served_total";
    pub const REQUESTS_SUCCESS_TOTAL: &str = "csilvm_requests_success_total";
    pub const REQUESTS_FAILURE_TOTAL: &str = "csilvm_requests_failure_total";
    pub const REQUEST_DURATION_SECONDS: &str = "csilvm_request_duration_seconds";
    pub const UPTIME_SECONDS: &str = "csilvm_uptime_seconds";
    pub const VOLUMES: &str = "csilvm_volumes";
    pub const BYTES_TOTAL: &str = "csilvm_bytes_total";
    pub const BYTES_FREE: &str = "csilvm_bytes_free";
    pub const BYTES_USED: &str = "csilvm_bytes_used";
}

pub fn init_metrics(addr: SocketAddr) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    info!(%addr, "metrics server listening");
    Ok(())
}

pub fn record_served(method: &str) {
    counter!(names::REQUESTS_SERVED_TOTAL, "method" => method.to_string()).increment(1);
}

fn record_duration(method: &str, duration_secs: f64) {
    histogram!(names::REQUEST_DURATION_SECONDS, "method" => method.to_string()).record(duration_secs);
}

fn record_success(method: &str) {
    counter!(names::REQUESTS_SUCCESS_TOTAL, "method" => method.to_string()).increment(1);
}

fn record_failure(method: &str, code: &str) {
    counter!(names::REQUESTS_FAILURE_TOTAL, "method" => method.to_string(), "code" => code.to_string())
        .increment(1);
}

pub fn set_uptime(seconds: f64) {
    gauge!(names::UPTIME_SECONDS).set(seconds);
}

pub fn set_storage_gauges(volumes: u64, bytes_total: u64, bytes_free: u64) {
    gauge!(names::VOLUMES).set(volumes as f64);
    gauge!(names::BYTES_TOTAL).set(bytes_total as f64);
    gauge!(names::BYTES_FREE).set(bytes_free as f64);
    gauge!(names::BYTES_USED).set((bytes_total.saturating_sub(bytes_free)) as f64);
}

/// One instance per served RPC: records `served` at construction and
/// `success`/`failure` plus the duration histogram when consumed.
pub struct RequestTimer {
    method: String,
    start: Instant,
}

impl RequestTimer {
    pub fn start(method: &str) -> Self {
        record_served(method);
        Self {
            method: method.to_string(),
            start: Instant::now(),
        }
    }

    pub fn success(self) {
        record_duration(&self.method, self.start.elapsed().as_secs_f64());
        record_success(&self.method);
    }

    pub fn failure(self, code: &str) {
        record_duration(&self.method, self.start.elapsed().as_secs_f64());
        record_failure(&self.method, code);
    }
}
