//! Health alerting.
//!
//! # Responsibilities
//! - Evaluate alert triggers against a provider's status and window statistics
//! - Deliver alerts: webhook POST, local notification, in-process broadcast
//!
//! # Design Decisions
//! - Triggers are independent; any one fires an alert
//! - Cooldown is enforced by the caller per provider
//! - Delivery is best-effort; failures are logged and dropped

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::broadcast;

use crate::config::AlertConfig;
use crate::health::series::{HealthStatistics, ProviderStatus};
use crate::observability::metrics;

const WEBHOOK_TIMEOUT: Duration = Duration::from_secs(10);
const ALERT_CHANNEL_CAPACITY: usize = 64;

/// Reason an alert fired.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AlertTrigger {
    ConsecutiveFailures { count: u32, threshold: u32 },
    ErrorRate { rate: f64, threshold: f64 },
    Latency { average_ms: f64, threshold_ms: f64 },
}

impl std::fmt::Display for AlertTrigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AlertTrigger::ConsecutiveFailures { count, threshold } => {
                write!(f, "{} consecutive failures (threshold {})", count, threshold)
            }
            AlertTrigger::ErrorRate { rate, threshold } => {
                write!(f, "error rate {:.1}% exceeds {:.1}%", rate, threshold)
            }
            AlertTrigger::Latency { average_ms, threshold_ms } => {
                write!(f, "average latency {:.0}ms exceeds {:.0}ms", average_ms, threshold_ms)
            }
        }
    }
}

/// A fired alert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthAlert {
    pub provider: String,
    pub message: String,
    pub timestamp: u64,
    pub status: ProviderStatus,
    pub triggers: Vec<AlertTrigger>,
}

/// Body POSTed to the webhook.
#[derive(Debug, Serialize)]
struct WebhookPayload<'a> {
    provider: &'a str,
    message: &'a str,
    timestamp: u64,
    status: &'a ProviderStatus,
}

/// Evaluate every trigger. Window triggers need at least one check in the window.
pub fn evaluate(config: &AlertConfig, status: &ProviderStatus, window: &HealthStatistics) -> Vec<AlertTrigger> {
    let mut triggers = Vec::new();

    if config.consecutive_failures > 0 && status.consecutive_failures >= config.consecutive_failures {
        triggers.push(AlertTrigger::ConsecutiveFailures {
            count: status.consecutive_failures,
            threshold: config.consecutive_failures,
        });
    }

    if window.total_checks > 0 {
        if window.error_rate > config.error_rate_threshold {
            triggers.push(AlertTrigger::ErrorRate {
                rate: window.error_rate,
                threshold: config.error_rate_threshold,
            });
        }
        if window.average_latency > config.latency_threshold_ms {
            triggers.push(AlertTrigger::Latency {
                average_ms: window.average_latency,
                threshold_ms: config.latency_threshold_ms,
            });
        }
    }

    triggers
}

/// Build the alert for a provider from its fired triggers.
pub fn build_alert(status: &ProviderStatus, triggers: Vec<AlertTrigger>, now_ms: u64) -> HealthAlert {
    let reasons: Vec<String> = triggers.iter().map(ToString::to_string).collect();
    HealthAlert {
        provider: status.provider.clone(),
        message: format!("Provider {} is degraded: {}", status.provider, reasons.join("; ")),
        timestamp: now_ms,
        status: status.clone(),
        triggers,
    }
}

/// Fan-out of alerts to every configured sink.
#[derive(Debug, Clone)]
pub struct AlertDispatcher {
    /// `None` if the HTTP client could not be built; webhooks are then skipped.
    client: Option<reqwest::Client>,
    events: broadcast::Sender<HealthAlert>,
}

impl Default for AlertDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl AlertDispatcher {
    pub fn new() -> Self {
        let client = match reqwest::Client::builder().timeout(WEBHOOK_TIMEOUT).build() {
            Ok(client) => Some(client),
            Err(e) => {
                tracing::error!(error = %e, "Failed to build webhook client; alert webhooks disabled");
                None
            }
        };
        Self::with_client(client)
    }

    fn with_client(client: Option<reqwest::Client>) -> Self {
        let (events, _) = broadcast::channel(ALERT_CHANNEL_CAPACITY);
        Self { client, events }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<HealthAlert> {
        self.events.subscribe()
    }

    /// Deliver an alert. Never fails; the webhook call runs in the background.
    pub fn dispatch(&self, alert: HealthAlert, config: &AlertConfig) {
        metrics::record_alert(&alert.provider);
        tracing::warn!(
            provider = %alert.provider,
            consecutive_failures = alert.status.consecutive_failures,
            error_rate = alert.status.error_rate,
            average_latency = alert.status.average_latency,
            "{}",
            alert.message
        );

        if config.local_notifications {
            notify_local(&alert);
        }

        match (config.webhook_url.clone(), self.client.clone()) {
            (Some(url), Some(client)) => {
                let alert = alert.clone();
                tokio::spawn(async move {
                    if let Err(e) = post_webhook(&client, &url, &alert).await {
                        tracing::warn!(provider = %alert.provider, webhook = %url, error = %e, "Failed to deliver alert webhook");
                    }
                });
            }
            (Some(url), None) => {
                tracing::warn!(provider = %alert.provider, webhook = %url, "Webhook client unavailable; alert not delivered");
            }
            (None, _) => {}
        }

        // No subscribers is not an error.
        let _ = self.events.send(alert);
    }
}

async fn post_webhook(client: &reqwest::Client, url: &str, alert: &HealthAlert) -> Result<(), reqwest::Error> {
    let payload = WebhookPayload {
        provider: &alert.provider,
        message: &alert.message,
        timestamp: alert.timestamp,
        status: &alert.status,
    };
    client
        .post(url)
        .json(&payload)
        .send()
        .await?
        .error_for_status()?;
    tracing::debug!(provider = %alert.provider, webhook = %url, "Alert webhook delivered");
    Ok(())
}

fn notify_local(alert: &HealthAlert) {
    tracing::warn!(
        target: "provider_failover::notification",
        provider = %alert.provider,
        timestamp = alert.timestamp,
        "Provider health alert: {}",
        alert.message
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(consecutive_failures: u32) -> ProviderStatus {
        ProviderStatus {
            provider: "a".into(),
            consecutive_failures,
            ..Default::default()
        }
    }

    fn window(error_rate: f64, average_latency: f64, total_checks: usize) -> HealthStatistics {
        HealthStatistics {
            uptime: 100.0 - error_rate,
            error_rate,
            average_latency,
            total_checks,
        }
    }

    #[test]
    fn test_no_triggers_when_healthy() {
        let config = AlertConfig::default();
        assert!(evaluate(&config, &status(0), &window(0.0, 100.0, 10)).is_empty());
    }

    #[test]
    fn test_each_trigger_fires_independently() {
        let config = AlertConfig {
            consecutive_failures: 3,
            error_rate_threshold: 10.0,
            latency_threshold_ms: 1_000.0,
            ..Default::default()
        };

        let t = evaluate(&config, &status(3), &window(0.0, 0.0, 5));
        assert_eq!(t, vec![AlertTrigger::ConsecutiveFailures { count: 3, threshold: 3 }]);

        let t = evaluate(&config, &status(0), &window(10.5, 0.0, 5));
        assert!(matches!(t.as_slice(), [AlertTrigger::ErrorRate { .. }]));

        let t = evaluate(&config, &status(0), &window(0.0, 1_000.1, 5));
        assert!(matches!(t.as_slice(), [AlertTrigger::Latency { .. }]));

        assert_eq!(evaluate(&config, &status(4), &window(50.0, 2_000.0, 5)).len(), 3);
    }

    #[test]
    fn test_thresholds_are_strict_for_rates() {
        let config = AlertConfig {
            error_rate_threshold: 10.0,
            latency_threshold_ms: 1_000.0,
            ..Default::default()
        };
        assert!(evaluate(&config, &status(0), &window(10.0, 1_000.0, 5)).is_empty());
    }

    #[test]
    fn test_empty_window_skips_rate_triggers() {
        let config = AlertConfig {
            error_rate_threshold: 0.0,
            latency_threshold_ms: 0.0,
            ..Default::default()
        };
        assert!(evaluate(&config, &status(0), &window(0.0, 0.0, 0)).is_empty());
    }

    #[test]
    fn test_alert_message_and_webhook_shape() {
        let alert = build_alert(
            &status(5),
            vec![AlertTrigger::ConsecutiveFailures { count: 5, threshold: 3 }],
            42,
        );
        assert_eq!(alert.message, "Provider a is degraded: 5 consecutive failures (threshold 3)");

        let payload = WebhookPayload {
            provider: &alert.provider,
            message: &alert.message,
            timestamp: alert.timestamp,
            status: &alert.status,
        };
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["provider"], "a");
        assert_eq!(json["timestamp"], 42);
        assert_eq!(json["status"]["consecutive_failures"], 5);
    }

    #[tokio::test]
    async fn test_dispatch_broadcasts_and_swallows_webhook_errors() {
        let dispatcher = AlertDispatcher::new();
        let mut rx = dispatcher.subscribe();
        let config = AlertConfig {
            webhook_url: Some("http://127.0.0.1:9/alerts".into()),
            local_notifications: true,
            ..Default::default()
        };

        dispatcher.dispatch(build_alert(&status(3), Vec::new(), 1), &config);
        let received = rx.recv().await.unwrap();
        assert_eq!(received.provider, "a");
    }

    #[tokio::test]
    async fn test_dispatch_without_client_still_broadcasts() {
        let dispatcher = AlertDispatcher::with_client(None);
        let mut rx = dispatcher.subscribe();
        let config = AlertConfig {
            webhook_url: Some("http://127.0.0.1:9/alerts".into()),
            ..Default::default()
        };

        dispatcher.dispatch(build_alert(&status(3), Vec::new(), 7), &config);
        assert_eq!(rx.try_recv().unwrap().timestamp, 7);
    }
}
