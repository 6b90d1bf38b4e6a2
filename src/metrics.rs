use lazy_static::lazy_static;
use prometheus::{Counter, Gauge, Histogram, register_counter, register_gauge, register_histogram};

lazy_static! {
    pub static ref REQUEST_TOTAL: Counter =
        register_counter!("edge_requests_total", "Requests entering the proxy pipeline").unwrap();
    pub static ref REJECTED_PATHS: Counter = register_counter!(
        "edge_rejected_paths_total",
        "Requests rejected by path validation"
    )
    .unwrap();
    pub static ref RATE_LIMITED: Counter = register_counter!(
        "edge_rate_limited_total",
        "Requests rejected by the rate limiter"
    )
    .unwrap();
    pub static ref UPSTREAM_ERRORS: Counter = register_counter!(
        "edge_upstream_errors_total",
        "Upstream transport failures"
    )
    .unwrap();
    pub static ref UPSTREAM_LATENCY: Histogram = register_histogram!(
        "edge_upstream_latency_seconds",
        "Upstream call latency in seconds"
    )
    .unwrap();
    pub static ref RATE_LIMIT_KEYS: Gauge = register_gauge!(
        "edge_rate_limit_keys",
        "Keys currently tracked by the rate limiter"
    )
    .unwrap();
}
