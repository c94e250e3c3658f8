//! Request forwarding to downstream services.
//!
//! # Responsibilities
//! - Resolve `/api/{service}/...` to a configured downstream
//! - Rewrite the path (strip the route prefix, keep the query string)
//! - Copy the bearer credential, inject gateway and identity headers
//! - Buffer the body so retried attempts can replay it
//! - Wrap the call: breaker admission → retry loop → raw HTTP call
//!
//! # Design Decisions
//! - One breaker per service, created lazily on first forward
//! - Downstream 4xx/5xx surface as errors so the breaker and the retry
//!   classifier see them; the client still receives the relayed status

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderValue, Request, StatusCode, Uri},
    response::Response,
};
use bytes::Bytes;
use serde_json::json;

use crate::config::ServiceConfig;
use crate::error::GatewayError;
use crate::http::response::{error_response, json_response, relay_success, GATEWAY_VERSION};
use crate::http::server::AppState;
use crate::resilience::{execute_with_retry, RetryPolicy};
use crate::security::Claims;

/// Largest request/response body the gateway will buffer for replay.
const MAX_BODY_BYTES: usize = 2 * 1024 * 1024;

/// Split "/api/{service}/rest" into the service name and the downstream
/// path (leading slash preserved, empty remainder becomes "/").
pub fn split_service_path(path: &str) -> Option<(&str, &str)> {
    let after = path.strip_prefix("/api/")?;
    let (service, rest) = match after.find('/') {
        Some(idx) => (&after[..idx], &after[idx..]),
        None => (after, "/"),
    };
    if service.is_empty() {
        return None;
    }
    Some((service, rest))
}

/// Main forwarding handler for `ANY /api/{service}/*`.
pub async fn forward_handler(
    State(state): State<AppState>,
    request: Request<Body>,
) -> Response {
    let path = request.uri().path().to_string();
    let (service_name, downstream_path) = match split_service_path(&path) {
        Some(parts) => parts,
        None => {
            return error_response(&GatewayError::UnknownService(path.clone()), None);
        }
    };

    let service = match state.ctx.config.service(service_name) {
        Some(service) => service.clone(),
        None => {
            tracing::warn!(service = service_name, path = %path, "no downstream mapped");
            return error_response(&GatewayError::UnknownService(service_name.to_string()), None);
        }
    };

    let uri = match downstream_uri(&service, downstream_path, request.uri()) {
        Ok(uri) => uri,
        Err(err) => return error_response(&err, None),
    };

    let (parts, body) = request.into_parts();
    let body_bytes = match axum::body::to_bytes(body, MAX_BODY_BYTES).await {
        Ok(bytes) => bytes,
        Err(_) => {
            return json_response(
                StatusCode::PAYLOAD_TOO_LARGE,
                json!({
                    "error": "payload_too_large",
                    "message": format!("request body exceeds {MAX_BODY_BYTES} bytes"),
                    "timestamp": chrono::Utc::now().to_rfc3339(),
                }),
            );
        }
    };

    let mut headers = parts.headers.clone();
    headers.remove(header::HOST);
    headers.remove(header::CONTENT_LENGTH);
    headers.remove(header::CONNECTION);
    if let Ok(marker) = HeaderValue::from_str(&format!("campus-gateway/{GATEWAY_VERSION}")) {
        headers.insert("x-forwarded-by", marker);
    }
    if let Some(claims) = parts.extensions.get::<Claims>() {
        if let Ok(user) = HeaderValue::from_str(&claims.sub) {
            headers.insert("x-gateway-user", user);
        }
        if let Some(role) = claims.role.as_deref() {
            if let Ok(role) = HeaderValue::from_str(role) {
                headers.insert("x-gateway-role", role);
            }
        }
    }

    let breaker_config = state.ctx.config.breaker_config_for(&service);
    let breaker = state.ctx.breakers.get_or_create(&service.name, &breaker_config);
    let policy = RetryPolicy {
        max_retries: service.max_retries,
        base_delay_ms: state.ctx.config.retry.base_delay_ms,
        max_delay_ms: state.ctx.config.retry.max_delay_ms,
    };

    tracing::debug!(
        service = %service.name,
        method = %parts.method,
        uri = %uri,
        "forwarding request"
    );

    let client = state.ctx.client.clone();
    let service_name = service.name.clone();
    let result = breaker
        .execute(|| {
            execute_with_retry(&policy, || {
                raw_call(
                    client.clone(),
                    service_name.clone(),
                    parts.method.clone(),
                    uri.clone(),
                    headers.clone(),
                    body_bytes.clone(),
                )
            })
        })
        .await;

    match result {
        Ok((response_parts, response_body)) => {
            relay_success(&service.name, response_parts, response_body)
        }
        Err(err) => {
            tracing::warn!(service = %service.name, error = %err, "forward failed");
            error_response(&err, Some(breaker.state()))
        }
    }
}

/// One attempt against the downstream. Transport failures become
/// `Connection`; any 4xx/5xx response becomes `Downstream`.
async fn raw_call(
    client: crate::http::server::HttpClient,
    service: String,
    method: axum::http::Method,
    uri: Uri,
    headers: axum::http::HeaderMap,
    body: Bytes,
) -> Result<(axum::http::response::Parts, Bytes), GatewayError> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(outbound) = builder.headers_mut() {
        *outbound = headers;
    }
    let request = builder
        .body(Body::from(body))
        .map_err(|e| GatewayError::Connection {
            service: service.clone(),
            reason: format!("malformed outbound request: {e}"),
        })?;

    let response = client
        .request(request)
        .await
        .map_err(|e| GatewayError::Connection {
            service: service.clone(),
            reason: e.to_string(),
        })?;

    let (parts, body) = response.into_parts();
    let bytes = axum::body::to_bytes(Body::new(body), MAX_BODY_BYTES)
        .await
        .map_err(|e| GatewayError::Connection {
            service: service.clone(),
            reason: format!("failed reading downstream body: {e}"),
        })?;

    if parts.status.as_u16() >= 400 {
        return Err(GatewayError::Downstream {
            service,
            status: parts.status,
            body: bytes,
        });
    }
    Ok((parts, bytes))
}

/// Rebase the stripped path onto the service's base URL, preserving the
/// original query string.
fn downstream_uri(
    service: &ServiceConfig,
    downstream_path: &str,
    original: &Uri,
) -> Result<Uri, GatewayError> {
    let base = service.base_url.trim_end_matches('/');
    let target = match original.query() {
        Some(query) => format!("{base}{downstream_path}?{query}"),
        None => format!("{base}{downstream_path}"),
    };
    target.parse::<Uri>().map_err(|e| GatewayError::Connection {
        service: service.name.clone(),
        reason: format!("unusable downstream URL '{target}': {e}"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service(base_url: &str) -> ServiceConfig {
        ServiceConfig {
            name: "usuarios".into(),
            base_url: base_url.into(),
            timeout_ms: 5_000,
            max_retries: 3,
        }
    }

    #[test]
    fn splits_service_and_remainder() {
        assert_eq!(
            split_service_path("/api/usuarios/perfil/7"),
            Some(("usuarios", "/perfil/7"))
        );
        assert_eq!(split_service_path("/api/usuarios"), Some(("usuarios", "/")));
        assert_eq!(split_service_path("/api/usuarios/"), Some(("usuarios", "/")));
        assert_eq!(split_service_path("/api/"), None);
        assert_eq!(split_service_path("/health"), None);
    }

    #[test]
    fn rewrites_path_and_keeps_query() {
        let original: Uri = "/api/usuarios/buscar?nombre=ana&curso=3".parse().unwrap();
        let uri = downstream_uri(&service("http://localhost:3001"), "/buscar", &original).unwrap();
        assert_eq!(uri.to_string(), "http://localhost:3001/buscar?nombre=ana&curso=3");
    }

    #[test]
    fn trailing_slash_on_base_url_is_tolerated() {
        let original: Uri = "/api/usuarios/perfil".parse().unwrap();
        let uri = downstream_uri(&service("http://localhost:3001/"), "/perfil", &original).unwrap();
        assert_eq!(uri.to_string(), "http://localhost:3001/perfil");
    }
}
