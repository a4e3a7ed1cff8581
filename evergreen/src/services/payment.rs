//! Payment confirmation boundary for premium subscriptions.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

use crate::config::{PaymentConfig, ProcessorKind};
use crate::error::{EvergreenError, Result};
use crate::models::{PaymentConfirmation, PaymentMethod, SubscriptionRequest};

/// Confirms a subscription charge. `is_premium` is only ever set after one
/// of these returns `Ok`.
#[async_trait]
pub trait PaymentProcessor: Send + Sync {
    async fn confirm(&self, request: &SubscriptionRequest) -> Result<PaymentConfirmation>;
}

pub fn processor_from_config(config: &PaymentConfig) -> Result<Arc<dyn PaymentProcessor>> {
    let processor: Arc<dyn PaymentProcessor> = match config.processor {
        ProcessorKind::Simulated => {
            tracing::warn!(
                delay_ms = config.simulated_delay_ms,
                "Using simulated payment processor; subscriptions are not charged"
            );
            Arc::new(SimulatedProcessor::new(Duration::from_millis(
                config.simulated_delay_ms,
            )))
        }
        ProcessorKind::Http => Arc::new(HttpProcessor::new(config)?),
    };
    Ok(processor)
}

/// Waits a fixed delay, then confirms every request.
#[derive(Debug, Clone)]
pub struct SimulatedProcessor {
    delay: Duration,
}

impl SimulatedProcessor {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

#[async_trait]
impl PaymentProcessor for SimulatedProcessor {
    async fn confirm(&self, request: &SubscriptionRequest) -> Result<PaymentConfirmation> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        Ok(PaymentConfirmation {
            reference: format!("sim_{}", uuid::Uuid::new_v4().simple()),
            method: request.method,
            confirmed_at: Utc::now(),
        })
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ConfirmRequest<'a> {
    memorial_id: &'a str,
    member_id: &'a str,
    method: PaymentMethod,
    #[serde(skip_serializing_if = "Option::is_none")]
    payment_token: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct ConfirmResponse {
    confirmed: bool,
    reference: Option<String>,
    reason: Option<String>,
}

/// Server-side confirmation through an external endpoint.
#[derive(Clone, Debug)]
pub struct HttpProcessor {
    client: Client,
    confirm_url: url::Url,
    api_key: Option<String>,
}

impl HttpProcessor {
    pub fn new(config: &PaymentConfig) -> Result<Self> {
        let confirm_url = config.confirm_url.as_deref().ok_or_else(|| {
            EvergreenError::Payment("PAYMENT_CONFIRM_URL is required for the http processor".to_string())
        })?;
        let confirm_url = url::Url::parse(confirm_url)?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| EvergreenError::Payment(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            confirm_url,
            api_key: config.api_key.clone(),
        })
    }
}

#[async_trait]
impl PaymentProcessor for HttpProcessor {
    async fn confirm(&self, request: &SubscriptionRequest) -> Result<PaymentConfirmation> {
        let body = ConfirmRequest {
            memorial_id: &request.memorial_id,
            member_id: &request.member_id,
            method: request.method,
            payment_token: request.payment_token.as_deref(),
        };

        let mut builder = self.client.post(self.confirm_url.clone()).json(&body);
        if let Some(api_key) = &self.api_key {
            builder = builder.bearer_auth(api_key);
        }

        let response = builder.send().await.map_err(|e| {
            tracing::error!(error = %e, "Payment confirmation request failed");
            EvergreenError::Payment(format!("Payment processor unreachable: {e}"))
        })?;

        let status = response.status();
        if status == StatusCode::PAYMENT_REQUIRED {
            let reason = response.text().await.unwrap_or_default();
            return Err(EvergreenError::PaymentDeclined(if reason.is_empty() {
                "Payment declined".to_string()
            } else {
                reason
            }));
        }
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %text, "Payment processor returned an error");
            return Err(EvergreenError::Payment(format!(
                "Payment processor returned {status}"
            )));
        }

        let parsed: ConfirmResponse = response
            .json()
            .await
            .map_err(|e| EvergreenError::Payment(format!("Failed to parse confirmation: {e}")))?;

        match parsed {
            ConfirmResponse {
                confirmed: true,
                reference: Some(reference),
                ..
            } => Ok(PaymentConfirmation {
                reference,
                method: request.method,
                confirmed_at: Utc::now(),
            }),
            ConfirmResponse {
                confirmed: true,
                reference: None,
                ..
            } => Err(EvergreenError::Payment(
                "Confirmation is missing a reference".to_string(),
            )),
            ConfirmResponse { reason, .. } => Err(EvergreenError::PaymentDeclined(
                reason.unwrap_or_else(|| "Payment declined".to_string()),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> SubscriptionRequest {
        SubscriptionRequest {
            memorial_id: "mem_1".to_string(),
            member_id: "m1".to_string(),
            method: PaymentMethod::Paypal,
            payment_token: None,
        }
    }

    #[tokio::test]
    async fn simulated_processor_confirms_with_unique_references() {
        let processor = SimulatedProcessor::new(Duration::ZERO);
        let first = processor.confirm(&request()).await.unwrap();
        let second = processor.confirm(&request()).await.unwrap();

        assert_eq!(first.method, PaymentMethod::Paypal);
        assert!(first.reference.starts_with("sim_"));
        assert_ne!(first.reference, second.reference);
    }

    #[tokio::test]
    async fn simulated_processor_waits_for_delay() {
        let processor = SimulatedProcessor::new(Duration::from_millis(30));
        let started = std::time::Instant::now();
        processor.confirm(&request()).await.unwrap();
        assert!(started.elapsed() >= Duration::from_millis(30));
    }

    #[test]
    fn http_processor_requires_confirm_url() {
        let config = PaymentConfig {
            processor: ProcessorKind::Http,
            ..Default::default()
        };
        assert!(matches!(
            HttpProcessor::new(&config),
            Err(EvergreenError::Payment(_))
        ));
        assert!(processor_from_config(&config).is_err());
    }

    #[test]
    fn default_config_builds_simulated_processor() {
        assert!(processor_from_config(&PaymentConfig::default()).is_ok());
    }
}
