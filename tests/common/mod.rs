//! Shared utilities for integration testing.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpListener;
use tokio::time::Duration;

use campus_gateway::{GatewayConfig, HttpServer, Shutdown};

/// Start a mock downstream that always answers with the same status and
/// JSON body. Returns the bound address.
pub async fn start_mock_backend(status: u16, body: &'static str) -> SocketAddr {
    start_programmable_backend(move || async move { (status, body.to_string()) }).await
}

/// Start a mock downstream whose response is computed per request.
pub async fn start_programmable_backend<F, Fut>(f: F) -> SocketAddr
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = (u16, String)> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let f = Arc::new(f);

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    let f = f.clone();
                    tokio::spawn(async move {
                        let (status, body) = f().await;
                        let status_text = match status {
                            200 => "200 OK",
                            404 => "404 Not Found",
                            422 => "422 Unprocessable Entity",
                            500 => "500 Internal Server Error",
                            503 => "503 Service Unavailable",
                            _ => "200 OK",
                        };
                        let response = format!(
                            "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            status_text,
                            body.len(),
                            body
                        );
                        let _ = socket.write_all(response.as_bytes()).await;
                        let _ = socket.shutdown().await;
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    addr
}

/// Spawn a gateway with the given config on an ephemeral port. The
/// returned guard keeps the server alive until dropped.
pub async fn start_gateway(config: GatewayConfig) -> (String, Arc<Shutdown>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Arc::new(Shutdown::new());
    let server = HttpServer::new(config);
    let rx = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, rx).await;
    });

    // Give the accept loop a beat to come up.
    tokio::time::sleep(Duration::from_millis(50)).await;
    (format!("http://{addr}"), shutdown)
}

/// A config pointing one service at `backend`, with auth and rate
/// limiting off so tests opt in explicitly.
pub fn single_service_config(name: &str, backend: SocketAddr, max_retries: u32) -> GatewayConfig {
    let mut config = GatewayConfig::demo();
    config.services = vec![campus_gateway::config::ServiceConfig {
        name: name.to_string(),
        base_url: format!("http://{backend}"),
        timeout_ms: 2_000,
        max_retries,
    }];
    config.auth.enabled = false;
    config.rate_limit.enabled = false;
    config.retry.base_delay_ms = 20;
    config.retry.max_delay_ms = 100;
    config
}

/// Issue an HS256 token the gateway will accept for `secret`.
#[allow(dead_code)]
pub fn issue_token(secret: &str, sub: &str) -> String {
    use jsonwebtoken::{encode, EncodingKey, Header};
    use serde::Serialize;

    #[derive(Serialize)]
    struct Claims {
        sub: String,
        exp: u64,
        iat: u64,
        role: String,
    }

    let now = chrono::Utc::now().timestamp() as u64;
    let claims = Claims {
        sub: sub.to_string(),
        exp: now + 3_600,
        iat: now,
        role: "estudiante".to_string(),
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .unwrap()
}
