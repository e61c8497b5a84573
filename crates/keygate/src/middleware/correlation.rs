//! Correlation id propagation.
//!
//! Every request carries an `X-Correlation-ID`. An inbound value is reused;
//! otherwise a UUID v4 is generated. The id is written back on the request,
//! echoed on the response, and stored as a [`CorrelationId`] extension.

use axum::{
    extract::Request,
    http::{HeaderName, HeaderValue},
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

/// Correlation id header.
pub static CORRELATION_ID_HEADER: HeaderName = HeaderName::from_static("x-correlation-id");

/// Longest inbound correlation id that is reused as-is.
const MAX_CORRELATION_ID_LEN: usize = 128;

/// The correlation id of the current request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorrelationId(pub String);

/// Reuse or generate the request's correlation id.
pub async fn propagate_correlation_id(mut req: Request, next: Next) -> Response {
    let id = req
        .headers()
        .get(&CORRELATION_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty() && v.len() <= MAX_CORRELATION_ID_LEN)
        .map(str::to_string)
        .unwrap_or_else(|| {
            let generated = Uuid::new_v4().to_string();
            tracing::trace!(target: "keygate.middleware.correlation", correlation_id = %generated, "Generated correlation id");
            generated
        });

    let header_value = HeaderValue::from_str(&id).ok();
    if let Some(value) = &header_value {
        req.headers_mut()
            .insert(CORRELATION_ID_HEADER.clone(), value.clone());
    }
    req.extensions_mut().insert(CorrelationId(id));

    let mut response = next.run(req).await;
    if let Some(value) = header_value {
        response
            .headers_mut()
            .insert(CORRELATION_ID_HEADER.clone(), value);
    }
    response
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use axum::{body::Body, routing::get, Extension, Router};
    use tower::ServiceExt;

    fn app() -> Router {
        Router::new()
            .route(
                "/",
                get(|Extension(id): Extension<CorrelationId>| async move { id.0 }),
            )
            .layer(axum::middleware::from_fn(propagate_correlation_id))
    }

    async fn body_string(response: Response) -> String {
        use http_body_util::BodyExt;
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_inbound_id_is_reused() {
        let req = axum::http::Request::builder()
            .uri("/")
            .header("X-Correlation-ID", "req-42")
            .body(Body::empty())
            .unwrap();

        let response = app().oneshot(req).await.unwrap();
        assert_eq!(
            response.headers().get("x-correlation-id").unwrap(),
            "req-42"
        );
        assert_eq!(body_string(response).await, "req-42");
    }

    #[tokio::test]
    async fn test_missing_id_is_generated() {
        let req = axum::http::Request::builder()
            .uri("/")
            .body(Body::empty())
            .unwrap();

        let response = app().oneshot(req).await.unwrap();
        let header = response
            .headers()
            .get("x-correlation-id")
            .unwrap()
            .to_str()
            .unwrap()
            .to_string();
        assert!(Uuid::parse_str(&header).is_ok());
        assert_eq!(body_string(response).await, header);
    }

    #[tokio::test]
    async fn test_oversized_id_is_replaced() {
        let long = "x".repeat(MAX_CORRELATION_ID_LEN + 1);
        let req = axum::http::Request::builder()
            .uri("/")
            .header("X-Correlation-ID", long.as_str())
            .body(Body::empty())
            .unwrap();

        let response = app().oneshot(req).await.unwrap();
        let header = response.headers().get("x-correlation-id").unwrap();
        assert_ne!(header, long.as_str());
        assert!(Uuid::parse_str(header.to_str().unwrap()).is_ok());
    }
}
