//! HTTP request metrics and the axum middleware that records them.

use axum::{
    extract::{MatchedPath, Request, State},
    http::StatusCode,
    middleware::Next,
    response::Response,
};

use meterline_core::{Counter, Histogram, HistogramTimer, LabelSet, Registry, Result};

use crate::app_state::AppState;

pub const REQUESTS_TOTAL: &str = "http_requests_total";
pub const REQUEST_DURATION: &str = "http_request_duration_seconds";

/// Route label for requests no route matched.
pub const UNMATCHED_ROUTE: &str = "unmatched";
/// Status label left on a request whose handler never completed.
pub const CANCELLED_STATUS: &str = "cancelled";

#[derive(Clone)]
pub struct HttpMetrics {
    requests: Counter,
    duration: Histogram,
}

impl HttpMetrics {
    /// Register both families. Called once at startup; errors abort boot.
    pub fn register(registry: &Registry, buckets: Vec<f64>) -> Result<Self> {
        let requests =
            registry.register_counter(REQUESTS_TOTAL, "Total HTTP requests handled.")?;
        let duration = registry.register_histogram(
            REQUEST_DURATION,
            "HTTP request duration in seconds.",
            buckets,
        )?;
        Ok(Self { requests, duration })
    }
}

/// `2xx`, `4xx`, ...
pub fn status_class(status: StatusCode) -> &'static str {
    match status.as_u16() {
        100..=199 => "1xx",
        200..=299 => "2xx",
        300..=399 => "3xx",
        400..=499 => "4xx",
        _ => "5xx",
    }
}

/// One request between routing and response. Whatever happens to the handler
/// future, the request is counted once and its duration observed once.
struct InFlight<'a> {
    metrics: &'a HttpMetrics,
    base: LabelSet,
    timer: HistogramTimer,
    finished: bool,
}

impl<'a> InFlight<'a> {
    fn start(metrics: &'a HttpMetrics, base: LabelSet) -> Self {
        let timer = metrics.duration.start_timer(base.clone());
        Self {
            metrics,
            base,
            timer,
            finished: false,
        }
    }

    fn finish(&mut self, status: StatusCode) {
        self.finished = true;
        match LabelSet::new().with("status", status_class(status)) {
            Ok(extra) => {
                self.timer.stop(&extra);
                self.metrics.requests.inc(&self.base.merged(&extra));
            }
            Err(e) => tracing::warn!(error = %e, "status label rejected"),
        }
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        // handler future dropped before a response existed
        tracing::debug!(labels = %self.base, "request cancelled");
        self.timer.stop(&LabelSet::new());
        self.metrics.requests.inc(&self.base);
    }
}

/// Counts every request and times it, labelled by method, matched route
/// template and status class. Requests whose handler is dropped mid-flight
/// (client gone, timeout layer) are recorded with `status="cancelled"`.
pub async fn track_requests(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let Some(metrics) = state.http_metrics() else {
        return next.run(req).await;
    };

    let route = req
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_owned())
        .unwrap_or_else(|| UNMATCHED_ROUTE.to_owned());
    let method = req.method().as_str().to_owned();

    let base = match LabelSet::from_pairs(&[
        ("method", method.as_str()),
        ("route", route.as_str()),
        ("status", CANCELLED_STATUS),
    ]) {
        Ok(l) => l,
        Err(e) => {
            tracing::warn!(error = %e, "request labels rejected; not instrumented");
            return next.run(req).await;
        }
    };

    let mut in_flight = InFlight::start(metrics, base);
    let resp = next.run(req).await;
    in_flight.finish(resp.status());
    resp
}
