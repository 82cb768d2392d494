use async_trait::async_trait;
use hmac::{Hmac, Mac};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use sha2::Sha256;

use crate::{
    app_error::{AppError, AppResult},
    application::ports::billing_provider::{BillingProvider, ProviderEvent, ProviderSubscription},
    infra::crypto::constant_time_compare,
};

const STRIPE_API_BASE: &str = "https://api.stripe.com/v1";

#[derive(Clone)]
pub struct StripeClient {
    client: Client,
    secret_key: SecretString,
    api_base: String,
}

impl StripeClient {
    pub fn new(secret_key: SecretString) -> Self {
        Self::with_api_base(secret_key, STRIPE_API_BASE)
    }

    pub fn with_api_base(secret_key: SecretString, api_base: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            secret_key,
            api_base: api_base.into(),
        }
    }

    fn auth_header(&self) -> String {
        use base64::Engine;
        let encoded = base64::engine::general_purpose::STANDARD
            .encode(format!("{}:", self.secret_key.expose_secret()));
        format!("Basic {}", encoded)
    }

    // ========================================================================
    // Subscriptions
    // ========================================================================

    pub async fn retrieve_subscription(
        &self,
        subscription_id: &str,
    ) -> AppResult<ProviderSubscription> {
        let response = self
            .client
            .get(format!("{}/subscriptions/{}", self.api_base, subscription_id))
            .header("Authorization", self.auth_header())
            .send()
            .await
            .map_err(|e| AppError::Internal(format!("Stripe request failed: {}", e)))?;

        self.handle_response(response).await
    }

    // ========================================================================
    // Webhooks
    // ========================================================================

    /// Verify the `Stripe-Signature` header against the raw body and parse the event.
    pub fn construct_event(
        payload: &[u8],
        signature_header: &str,
        webhook_secret: &SecretString,
        tolerance_secs: i64,
    ) -> AppResult<ProviderEvent> {
        verify_signature_at(
            payload,
            signature_header,
            webhook_secret.expose_secret(),
            tolerance_secs,
            chrono::Utc::now().timestamp(),
        )?;

        serde_json::from_slice(payload)
            .map_err(|e| AppError::InvalidInput(format!("Invalid webhook payload: {}", e)))
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    async fn handle_response<T: for<'de> Deserialize<'de>>(
        &self,
        response: reqwest::Response,
    ) -> AppResult<T> {
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| AppError::Internal(format!("Failed to read response: {}", e)))?;

        if !status.is_success() {
            tracing::error!(status = %status, body = %body, "Stripe API error");

            if let Ok(error) = serde_json::from_str::<StripeErrorResponse>(&body) {
                return Err(AppError::Internal(format!(
                    "Stripe error: {}",
                    error.error.message.unwrap_or(error.error.error_type)
                )));
            }

            return Err(AppError::Internal(format!(
                "Stripe API error: {}",
                status
            )));
        }

        serde_json::from_str(&body).map_err(|e| {
            tracing::error!(error = %e, body = %body, "Failed to parse Stripe response");
            AppError::Internal(format!("Failed to parse Stripe response: {}", e))
        })
    }
}

#[async_trait]
impl BillingProvider for StripeClient {
    async fn get_subscription(&self, subscription_id: &str) -> AppResult<ProviderSubscription> {
        self.retrieve_subscription(subscription_id).await
    }
}

#[derive(Debug, Deserialize)]
struct StripeErrorResponse {
    error: StripeErrorDetail,
}

#[derive(Debug, Deserialize)]
struct StripeErrorDetail {
    #[serde(rename = "type")]
    error_type: String,
    message: Option<String>,
}

// Header format: "t=timestamp,v1=signature[,v1=signature...]"
fn verify_signature_at(
    payload: &[u8],
    signature_header: &str,
    webhook_secret: &str,
    tolerance_secs: i64,
    now: i64,
) -> AppResult<()> {
    let mut timestamp: Option<&str> = None;
    let mut signatures: Vec<&str> = Vec::new();

    for part in signature_header.split(',') {
        let Some((key, value)) = part.trim().split_once('=') else {
            continue;
        };
        match key {
            "t" => timestamp = Some(value),
            "v1" => signatures.push(value),
            _ => {}
        }
    }

    let timestamp = timestamp.ok_or(AppError::SignatureInvalid)?;
    if signatures.is_empty() {
        return Err(AppError::SignatureInvalid);
    }

    let mut mac = Hmac::<Sha256>::new_from_slice(webhook_secret.as_bytes())
        .map_err(|_| AppError::Internal("HMAC error".into()))?;
    mac.update(timestamp.as_bytes());
    mac.update(b".");
    mac.update(payload);
    let expected = hex::encode(mac.finalize().into_bytes());

    if !signatures
        .iter()
        .any(|sig| constant_time_compare(sig, &expected))
    {
        return Err(AppError::SignatureInvalid);
    }

    let ts: i64 = timestamp.parse().map_err(|_| AppError::SignatureInvalid)?;
    if (now - ts).abs() > tolerance_secs {
        tracing::warn!(timestamp = ts, now, "Webhook timestamp outside tolerance");
        return Err(AppError::SignatureInvalid);
    }

    Ok(())
}

#[cfg(test)]
pub(crate) fn sign_payload(payload: &[u8], secret: &str, timestamp: i64) -> String {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).unwrap();
    mac.update(format!("{}.", timestamp).as_bytes());
    mac.update(payload);
    format!("t={},v1={}", timestamp, hex::encode(mac.finalize().into_bytes()))
}
