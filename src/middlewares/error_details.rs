use axum::{
    body::{to_bytes, Body},
    http::{header::CONTENT_LENGTH, Request},
    middleware::Next,
    response::Response,
};
use serde_json::Value;
use tracing::warn;

use crate::util::error::ErrorDetails;

/// Error bodies are small; anything larger is passed through untouched.
const MAX_ERROR_BODY: usize = 64 * 1024;

/// Adds `details` to JSON error bodies that carry an [`ErrorDetails`] extension.
/// Only layered onto the router in development.
pub async fn expose_error_details(req: Request<Body>, next: Next) -> Response {
    let response = next.run(req).await;
    let Some(ErrorDetails(details)) = response.extensions().get::<ErrorDetails>().cloned() else {
        return response;
    };

    let (mut parts, body) = response.into_parts();
    let bytes = match to_bytes(body, MAX_ERROR_BODY).await {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!("Could not read error body to attach details: {}", e);
            return Response::from_parts(parts, Body::empty());
        }
    };

    let mut value: Value = match serde_json::from_slice(&bytes) {
        Ok(value) => value,
        Err(_) => return Response::from_parts(parts, Body::from(bytes)),
    };
    if let Some(body) = value.as_object_mut() {
        body.insert("details".to_string(), Value::String(details));
    }

    parts.headers.remove(CONTENT_LENGTH);
    Response::from_parts(parts, Body::from(value.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::error::HandlerError;
    use axum::{http::StatusCode, routing::get, Router};
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    async fn failing() -> HandlerError {
        HandlerError::internal("pool timed out")
    }

    async fn missing() -> HandlerError {
        HandlerError::not_found("Camera not found")
    }

    fn router() -> Router {
        Router::new().route("/fail", get(failing)).route("/missing", get(missing))
    }

    async fn call(router: Router, uri: &str) -> (StatusCode, Value) {
        let response = router
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_details_hidden_without_layer() {
        let (status, body) = call(router(), "/fail").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["message"], "Internal server error");
        assert!(body.get("details").is_none());
    }

    #[tokio::test]
    async fn test_details_shown_with_layer() {
        let app = router().layer(axum::middleware::from_fn(expose_error_details));

        let (status, body) = call(app.clone(), "/fail").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["success"], false);
        assert_eq!(body["details"], "pool timed out");

        let (status, body) = call(app, "/missing").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body.get("details").is_none());
    }
}
