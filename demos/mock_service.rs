//! Stub downstream service for local demos.
//!
//! Run three of these to stand in for the campus topology:
//!
//! ```text
//! cargo run --example mock-service -- 3001   # usuarios
//! cargo run --example mock-service -- 3002   # cursos
//! cargo run --example mock-service -- 3003   # pagos
//! ```
//!
//! The port-3001 instance also issues demo tokens on POST /login so the
//! gateway's auth path can be exercised end to end.

use axum::{
    extract::Path,
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use jsonwebtoken::{encode, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use serde_json::json;

const DEMO_SECRET: &str = "CHANGE_ME_IN_PRODUCTION";

#[derive(Serialize)]
struct DemoClaims {
    sub: String,
    exp: u64,
    iat: u64,
    email: String,
    role: String,
}

#[derive(Deserialize)]
struct LoginRequest {
    usuario: String,
    #[allow(dead_code)]
    password: String,
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

async fn validate(Path(id): Path<String>) -> Json<serde_json::Value> {
    Json(json!({
        "exists": true,
        "user": { "id": id, "nombre": "Ana Torres", "rol": "estudiante" },
        "expediente": uuid::Uuid::new_v4().to_string(),
    }))
}

async fn login(Json(body): Json<LoginRequest>) -> impl IntoResponse {
    let now = chrono::Utc::now().timestamp() as u64;
    let claims = DemoClaims {
        sub: body.usuario.clone(),
        exp: now + 3600,
        iat: now,
        email: format!("{}@campus.edu", body.usuario),
        role: "estudiante".to_string(),
    };
    match encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(DEMO_SECRET.as_bytes()),
    ) {
        Ok(token) => (StatusCode::OK, Json(json!({ "token": token }))),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": e.to_string() })),
        ),
    }
}

#[tokio::main]
async fn main() {
    let port: u16 = std::env::args()
        .nth(1)
        .and_then(|arg| arg.parse().ok())
        .unwrap_or(3001);

    let app = Router::new()
        .route("/health", get(health))
        .route("/validate/{id}", get(validate))
        .route("/login", post(login));

    let listener = tokio::net::TcpListener::bind(("127.0.0.1", port))
        .await
        .expect("bind mock service port");
    println!("mock service listening on http://127.0.0.1:{port}");
    axum::serve(listener, app).await.expect("serve mock service");
}
