//! Shared utilities for integration tests.
#![allow(dead_code)]

use std::collections::VecDeque;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::{extract::State, routing::post, Json, Router};
use provider_failover::config::{CircuitBreakerConfig, FailoverConfig, FailoverStrategy};
use provider_failover::provider::{HealthCheckResult, Provider, ProviderError, ProviderRequest, ProviderResponse};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::mpsc;

/// Outcome of one scripted call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Ok,
    Fail,
}

/// Provider whose outcomes are queued ahead of time.
///
/// Once the queue is empty every call uses the fallback outcome.
#[derive(Debug)]
pub struct ScriptedProvider {
    name: String,
    requests: Mutex<VecDeque<Outcome>>,
    fallback: Mutex<Outcome>,
    healthy: Mutex<bool>,
    delay: Duration,
    health_delay: Mutex<Duration>,
    health_in_flight: AtomicUsize,
    pub max_health_in_flight: AtomicUsize,
    pub request_calls: AtomicUsize,
    pub health_calls: AtomicUsize,
}

impl ScriptedProvider {
    pub fn new(name: &str, fallback: Outcome) -> Arc<Self> {
        Self::with_delay(name, fallback, Duration::ZERO)
    }

    pub fn with_delay(name: &str, fallback: Outcome, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            requests: Mutex::new(VecDeque::new()),
            fallback: Mutex::new(fallback),
            healthy: Mutex::new(fallback == Outcome::Ok),
            delay,
            health_delay: Mutex::new(Duration::ZERO),
            health_in_flight: AtomicUsize::new(0),
            max_health_in_flight: AtomicUsize::new(0),
            request_calls: AtomicUsize::new(0),
            health_calls: AtomicUsize::new(0),
        })
    }

    pub fn push(&self, outcomes: &[Outcome]) {
        self.requests.lock().unwrap().extend(outcomes.iter().copied());
    }

    pub fn set_fallback(&self, outcome: Outcome) {
        *self.fallback.lock().unwrap() = outcome;
    }

    pub fn set_healthy(&self, healthy: bool) {
        *self.healthy.lock().unwrap() = healthy;
    }

    pub fn set_health_delay(&self, delay: Duration) {
        *self.health_delay.lock().unwrap() = delay;
    }

    pub fn requests(&self) -> usize {
        self.request_calls.load(Ordering::SeqCst)
    }

    fn next_outcome(&self) -> Outcome {
        let queued = self.requests.lock().unwrap().pop_front();
        queued.unwrap_or_else(|| *self.fallback.lock().unwrap())
    }
}

#[async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn send_request(&self, request: &ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        self.request_calls.fetch_add(1, Ordering::SeqCst);
        let outcome = self.next_outcome();
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        match outcome {
            Outcome::Ok => Ok(serde_json::json!({ "provider": self.name, "id": request.id })),
            Outcome::Fail => Err(ProviderError::Unavailable(format!("{} scripted failure", self.name))),
        }
    }

    async fn health_check(&self) -> Result<HealthCheckResult, ProviderError> {
        let in_flight = self.health_in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_health_in_flight.fetch_max(in_flight, Ordering::SeqCst);

        let delay = *self.health_delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        self.health_calls.fetch_add(1, Ordering::SeqCst);
        self.health_in_flight.fetch_sub(1, Ordering::SeqCst);

        if *self.healthy.lock().unwrap() {
            Ok(HealthCheckResult::healthy())
        } else {
            Ok(HealthCheckResult::unhealthy(format!("{} unhealthy", self.name)))
        }
    }
}

/// Failover config with small, predictable thresholds.
pub fn failover_config(primary: &str, fallbacks: &[&str]) -> FailoverConfig {
    FailoverConfig {
        enabled: true,
        primary_provider: primary.to_string(),
        fallback_providers: fallbacks.iter().map(|s| s.to_string()).collect(),
        strategy: FailoverStrategy {
            health_threshold: 80.0,
            max_failures: 3,
            backoff_base_ms: 1_000,
            backoff_multiplier: 2.0,
            max_backoff_ms: 30_000,
            recovery_threshold: 2,
            ..Default::default()
        },
        circuit_breaker: CircuitBreakerConfig {
            enabled: true,
            failure_threshold: 5,
            reset_timeout_ms: 60_000,
        },
        recovery_sweep_interval_ms: 60_000,
    }
}

/// Start an axum receiver that forwards every posted JSON body.
pub async fn start_webhook_receiver() -> (SocketAddr, mpsc::UnboundedReceiver<serde_json::Value>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let app = Router::new()
        .route(
            "/hook",
            post(
                |State(tx): State<mpsc::UnboundedSender<serde_json::Value>>, Json(body): Json<serde_json::Value>| async move {
                    let _ = tx.send(body);
                },
            ),
        )
        .with_state(tx);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    (addr, rx)
}

/// Start a programmable raw HTTP backend on an ephemeral port.
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
                        read_request(&mut socket).await;

                        let (status, body) = f().await;
                        let status_text = match status {
                            200 => "200 OK",
                            500 => "500 Internal Server Error",
                            503 => "503 Service Unavailable",
                            _ => "200 OK",
                        };

                        let response_str = format!(
                            "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            status_text,
                            body.len(),
                            body
                        );
                        let _ = socket.write_all(response_str.as_bytes()).await;
                        let _ = socket.shutdown().await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    addr
}

/// Read one request (headers plus `Content-Length` body) so closing the
/// socket never resets unread data.
async fn read_request(socket: &mut tokio::net::TcpStream) {
    let mut data = Vec::new();
    let mut buf = [0u8; 1024];
    loop {
        let n = match socket.read(&mut buf).await {
            Ok(0) | Err(_) => return,
            Ok(n) => n,
        };
        data.extend_from_slice(&buf[..n]);

        let Some(end) = data.windows(4).position(|w| w == b"\r\n\r\n") else {
            continue;
        };
        let headers = String::from_utf8_lossy(&data[..end]).to_ascii_lowercase();
        let length = headers
            .lines()
            .find_map(|line| line.strip_prefix("content-length:"))
            .and_then(|v| v.trim().parse::<usize>().ok())
            .unwrap_or(0);
        if data.len() >= end + 4 + length {
            return;
        }
    }
}
