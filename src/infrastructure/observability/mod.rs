//! Observability infrastructure - Prometheus metrics

mod metrics;

pub use metrics::{
    create_metrics_router, init_metrics, record_http_request, record_login,
    record_password_reset_requested, record_registration, sanitize_path, PrometheusMetrics,
};
