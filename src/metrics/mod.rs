use crate::error::{AuthError, Result};
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
};
use metrics::{counter, describe_counter, describe_histogram, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Metrics service for collecting and exposing Prometheus metrics
#[derive(Clone)]
pub struct MetricsService {
    handle: Arc<PrometheusHandle>,
}

impl MetricsService {
    /// Install the Prometheus recorder globally
    ///
    /// Only one recorder can be installed per process.
    pub fn new() -> Result<Self> {
        let handle = PrometheusBuilder::new().install_recorder().map_err(|e| {
            AuthError::Internal(format!("Failed to install metrics recorder: {}", e))
        })?;

        Self::register_metrics();

        info!("Metrics service initialized successfully");

        Ok(Self {
            handle: Arc::new(handle),
        })
    }

    /// Serve metrics from an existing recorder handle
    ///
    /// The caller owns the recorder and decides where it is installed.
    pub fn from_handle(handle: PrometheusHandle) -> Self {
        Self {
            handle: Arc::new(handle),
        }
    }

    fn register_metrics() {
        describe_counter!(
            "authpipe_requests_total",
            "Total number of HTTP requests handled by the pipeline"
        );
        describe_histogram!(
            "authpipe_request_duration_seconds",
            "HTTP request latencies in seconds"
        );
        describe_counter!(
            "authpipe_auth_attempts_total",
            "Authentication attempts by scheme and outcome"
        );

        debug!("All metrics registered with descriptions");
    }

    /// Render metrics in Prometheus format
    pub fn render(&self) -> String {
        self.handle.render()
    }
}

/// Metrics endpoint handler
pub async fn metrics_handler(State(service): State<MetricsService>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        service.render(),
    )
}

/// Request timer; records count and latency when finished
pub struct Timer {
    start: Instant,
    method: String,
}

impl Timer {
    pub fn new(method: impl Into<String>) -> Self {
        Self {
            start: Instant::now(),
            method: method.into(),
        }
    }

    pub fn finish(self, status: u16) {
        record_request(&self.method, status, self.start.elapsed().as_secs_f64());
    }
}

/// Record a request metric
pub fn record_request(method: &str, status: u16, duration: f64) {
    let labels = [
        ("method", method.to_string()),
        ("status", status.to_string()),
    ];

    counter!("authpipe_requests_total", &labels).increment(1);
    histogram!("authpipe_request_duration_seconds", &labels).record(duration);
}

/// Middleware recording request metrics
pub async fn metrics_middleware(
    request: axum::extract::Request,
    next: axum::middleware::Next,
) -> axum::response::Response {
    let timer = Timer::new(request.method().as_str());
    let response = next.run(request).await;
    timer.finish(response.status().as_u16());
    response
}
