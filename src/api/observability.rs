//! Request telemetry: one span per request, the Prometheus scrape endpoint
//! and the per-request counters behind it.

use axum::{
    extract::{MatchedPath, Request, State},
    http::{StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{Instrument, Span, field};

use super::AppState;

/// `GET /metrics`
pub async fn get_metrics(State(state): State<Arc<AppState>>) -> Response {
    match state.prometheus_handle.as_ref() {
        Some(handle) => (
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            handle.render(),
        )
            .into_response(),
        None => (
            StatusCode::SERVICE_UNAVAILABLE,
            "Metrics recorder is not installed",
        )
            .into_response(),
    }
}

/// Coarse result class of a request, used as a log field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Ok,
    Rejected,
    Failed,
}

impl Outcome {
    fn of(status: StatusCode) -> Self {
        if status.is_server_error() {
            Self::Failed
        } else if status.is_client_error() {
            Self::Rejected
        } else {
            Self::Ok
        }
    }

    const fn as_str(self) -> &'static str {
        match self {
            Self::Ok => "ok",
            Self::Rejected => "rejected",
            Self::Failed => "failed",
        }
    }
}

/// Route template for metric labels. Unrouted paths share one label.
fn route_label(route: Option<&MatchedPath>) -> String {
    route.map_or_else(|| "unmatched".to_string(), |r| r.as_str().to_string())
}

fn record_request_metrics(method: &str, route: &str, status: StatusCode, elapsed: Duration) {
    let labels = [
        ("method", method.to_string()),
        ("path", route.to_string()),
        ("status", status.as_u16().to_string()),
    ];
    metrics::counter!("http_requests_total", &labels).increment(1);
    metrics::histogram!("http_request_duration_seconds", &labels).record(elapsed.as_secs_f64());
}

/// Attach the authenticated member's id to the current request span.
pub fn record_user_id(user_id: i32) {
    Span::current().record("user_id", user_id);
}

/// Wraps every request in a `request` span and records its metrics.
pub async fn track_requests(req: Request, next: Next) -> Response {
    let started = Instant::now();
    let method = req.method().as_str().to_owned();
    let route = route_label(req.extensions().get::<MatchedPath>());

    let span = tracing::info_span!(
        "request",
        request_id = %uuid::Uuid::new_v4(),
        method = %method,
        path = %req.uri().path(),
        route = %route,
        user_id = field::Empty,
    );

    async move {
        let response = next.run(req).await;
        let status = response.status();
        let elapsed = started.elapsed();

        record_request_metrics(&method, &route, status, elapsed);

        let outcome = Outcome::of(status);
        let elapsed_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);
        let code = status.as_u16();
        if outcome == Outcome::Failed {
            tracing::warn!(status = code, elapsed_ms, outcome = outcome.as_str(), "request failed");
        } else {
            tracing::info!(status = code, elapsed_ms, outcome = outcome.as_str(), "request handled");
        }

        response
    }
    .instrument(span)
    .await
}
