use crate::services::metrics::{HTTP_REQUESTS_TOTAL, HTTP_REQUEST_DURATION};
use axum::extract::{MatchedPath, Request};
use axum::middleware::Next;
use axum::response::Response;

/// Count and time every request, labelled by its route template so booking
/// ids do not explode label cardinality.
pub async fn metrics_middleware(req: Request, next: Next) -> Response {
    let route = req
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string());
    let method = req.method().to_string();
    let timer = HTTP_REQUEST_DURATION
        .with_label_values(&[route.as_str()])
        .start_timer();

    let response = next.run(req).await;

    timer.observe_duration();
    HTTP_REQUESTS_TOTAL
        .with_label_values(&[route.as_str(), method.as_str(), response.status().as_str()])
        .inc();

    response
}
