//! Response normalization.
//!
//! # Responsibilities
//! - Annotate successful JSON bodies with gateway metadata
//! - Map every `GatewayError` variant to exactly one HTTP status
//! - Keep error bodies valid JSON with a human-readable message
//!
//! # Design Decisions
//! - Non-JSON downstream bodies relay untouched
//! - Breaker-open and timeout responses surface `circuitBreakerState`
//! - Hop-by-hop and length headers are dropped when the body is rebuilt

use axum::{
    body::Body,
    http::{header, response::Parts, HeaderMap, StatusCode},
    response::Response,
};
use bytes::Bytes;
use chrono::Utc;
use serde_json::{json, Value};

use crate::error::GatewayError;
use crate::resilience::BreakerState;

pub const GATEWAY_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Relay a downstream success, stamping `_gateway` metadata into JSON
/// object bodies.
pub fn relay_success(service: &str, parts: Parts, body: Bytes) -> Response {
    let is_json = parts
        .headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.contains("application/json"));

    if is_json {
        if let Ok(Value::Object(mut object)) = serde_json::from_slice::<Value>(&body) {
            object.insert(
                "_gateway".to_string(),
                json!({
                    "service": service,
                    "timestamp": Utc::now().to_rfc3339(),
                    "version": GATEWAY_VERSION,
                }),
            );
            return build(parts.status, &parts.headers, Value::Object(object));
        }
    }

    let mut builder = Response::builder().status(parts.status);
    if let Some(headers) = builder.headers_mut() {
        copy_relay_headers(&parts.headers, headers);
    }
    builder
        .body(Body::from(body))
        .unwrap_or_else(|_| plain_500())
}

/// Deterministic error mapping. The caller supplies the breaker state
/// for circuit errors so the body can surface it.
pub fn error_response(err: &GatewayError, breaker_state: Option<BreakerState>) -> Response {
    let timestamp = Utc::now().to_rfc3339();
    let mut body = json!({
        "error": err.tag(),
        "message": err.to_string(),
        "timestamp": timestamp,
    });
    let fields = body.as_object_mut().expect("literal object");

    let status = match err {
        GatewayError::CircuitOpen { service } => {
            fields.insert("service".into(), json!(service));
            fields.insert(
                "circuitBreakerState".into(),
                json!(breaker_state.unwrap_or(BreakerState::Open).as_str()),
            );
            StatusCode::SERVICE_UNAVAILABLE
        }
        GatewayError::CircuitTimeout { service, .. } => {
            fields.insert("service".into(), json!(service));
            if let Some(state) = breaker_state {
                fields.insert("circuitBreakerState".into(), json!(state.as_str()));
            }
            StatusCode::GATEWAY_TIMEOUT
        }
        GatewayError::Downstream { service, status, body: downstream } => {
            fields.insert("service".into(), json!(service));
            let relayed = serde_json::from_slice::<Value>(downstream)
                .unwrap_or_else(|_| json!(String::from_utf8_lossy(downstream)));
            fields.insert("downstream".into(), relayed);
            *status
        }
        GatewayError::Connection { service, .. } => {
            fields.insert("service".into(), json!(service));
            StatusCode::SERVICE_UNAVAILABLE
        }
        GatewayError::RateLimitExceeded { retry_after_secs } => {
            fields.insert("retryAfter".into(), json!(retry_after_secs));
            StatusCode::TOO_MANY_REQUESTS
        }
        GatewayError::AuthMissing => StatusCode::UNAUTHORIZED,
        GatewayError::AuthInvalid => StatusCode::FORBIDDEN,
        GatewayError::UnknownService(service) => {
            fields.insert("service".into(), json!(service));
            StatusCode::NOT_FOUND
        }
    };

    json_response(status, body)
}

/// Build a JSON response from scratch.
pub fn json_response(status: StatusCode, body: Value) -> Response {
    Response::builder()
        .status(status)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap_or_else(|_| plain_500())
}

fn build(status: StatusCode, downstream_headers: &HeaderMap, body: Value) -> Response {
    let mut builder = Response::builder()
        .status(status)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(headers) = builder.headers_mut() {
        copy_relay_headers(downstream_headers, headers);
        headers.insert(
            header::CONTENT_TYPE,
            header::HeaderValue::from_static("application/json"),
        );
    }
    builder
        .body(Body::from(body.to_string()))
        .unwrap_or_else(|_| plain_500())
}

/// Copy relayable headers, skipping ones invalidated by re-framing.
fn copy_relay_headers(from: &HeaderMap, into: &mut HeaderMap) {
    for (name, value) in from.iter() {
        if name == header::CONTENT_LENGTH
            || name == header::TRANSFER_ENCODING
            || name == header::CONNECTION
        {
            continue;
        }
        into.insert(name.clone(), value.clone());
    }
}

fn plain_500() -> Response {
    let mut response = Response::new(Body::from("internal gateway error"));
    *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
    response
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_json(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn parts_with(content_type: &str) -> Parts {
        let (mut parts, _) = axum::http::Response::new(()).into_parts();
        parts.status = StatusCode::CREATED;
        parts.headers.insert(
            header::CONTENT_TYPE,
            header::HeaderValue::from_str(content_type).unwrap(),
        );
        parts
    }

    #[tokio::test]
    async fn stamps_gateway_metadata_into_json_objects() {
        let body = Bytes::from(r#"{"id": 7, "nombre": "Ana"}"#);
        let response = relay_success("usuarios", parts_with("application/json"), body);
        assert_eq!(response.status(), StatusCode::CREATED);

        let value = body_json(response).await;
        assert_eq!(value["id"], 7);
        assert_eq!(value["_gateway"]["service"], "usuarios");
        assert_eq!(value["_gateway"]["version"], GATEWAY_VERSION);
    }

    #[tokio::test]
    async fn non_json_bodies_relay_untouched() {
        let body = Bytes::from("plain text receipt");
        let response = relay_success("pagos", parts_with("text/plain"), body);

        let bytes = axum::body::to_bytes(response.into_body(), 1024).await.unwrap();
        assert_eq!(&bytes[..], b"plain text receipt");
    }

    #[tokio::test]
    async fn circuit_open_maps_to_503_with_state() {
        let err = GatewayError::CircuitOpen { service: "usuarios".into() };
        let response = error_response(&err, Some(BreakerState::Open));
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

        let value = body_json(response).await;
        assert_eq!(value["error"], "circuit_open");
        assert_eq!(value["service"], "usuarios");
        assert_eq!(value["circuitBreakerState"], "OPEN");
        assert!(value["message"].is_string());
        assert!(value["timestamp"].is_string());
    }

    #[tokio::test]
    async fn timeout_maps_to_504() {
        let err = GatewayError::CircuitTimeout { service: "cursos".into(), timeout_ms: 5_000 };
        let response = error_response(&err, Some(BreakerState::Closed));
        assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);

        let value = body_json(response).await;
        assert_eq!(value["circuitBreakerState"], "CLOSED");
    }

    #[tokio::test]
    async fn downstream_error_relays_status_and_wraps_body() {
        let err = GatewayError::Downstream {
            service: "pagos".into(),
            status: StatusCode::UNPROCESSABLE_ENTITY,
            body: Bytes::from(r#"{"detalle": "saldo insuficiente"}"#),
        };
        let response = error_response(&err, None);
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let value = body_json(response).await;
        assert_eq!(value["service"], "pagos");
        assert_eq!(value["downstream"]["detalle"], "saldo insuficiente");
    }

    #[tokio::test]
    async fn remaining_variants_map_deterministically() {
        let cases = [
            (GatewayError::Connection { service: "usuarios".into(), reason: "refused".into() },
             StatusCode::SERVICE_UNAVAILABLE),
            (GatewayError::RateLimitExceeded { retry_after_secs: 30 },
             StatusCode::TOO_MANY_REQUESTS),
            (GatewayError::AuthMissing, StatusCode::UNAUTHORIZED),
            (GatewayError::AuthInvalid, StatusCode::FORBIDDEN),
            (GatewayError::UnknownService("matriculas".into()), StatusCode::NOT_FOUND),
        ];
        for (err, expected) in cases {
            assert_eq!(error_response(&err, None).status(), expected, "{err}");
        }
    }
}
