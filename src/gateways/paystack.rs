use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::{
    config::PaystackConfig,
    error::{AppError, Result},
    gateways::{ChargeVerification, PaymentGateway},
};

/// Paystack transaction verification. The secret key stays on this
/// side of the wire; clients only ever hand us a reference.
pub struct PaystackGateway {
    http: reqwest::Client,
    base_url: String,
    secret_key: String,
}

#[derive(Debug, Deserialize)]
struct VerifyResponse {
    status: bool,
    message: Option<String>,
    data: Option<VerifyData>,
}

#[derive(Debug, Deserialize)]
struct VerifyData {
    status: String,
    /// Minor units (kobo / cents).
    amount: i64,
    currency: String,
    paid_at: Option<DateTime<Utc>>,
}

impl PaystackGateway {
    pub fn new(config: &PaystackConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            secret_key: config.secret_key.clone(),
        })
    }

    fn map_send_error(e: reqwest::Error) -> AppError {
        if e.is_timeout() {
            AppError::ExternalTimeout("payment gateway verification timed out".to_string())
        } else {
            // Redact: reqwest errors can embed the request URL.
            AppError::External("payment gateway request failed".to_string())
        }
    }
}

#[async_trait]
impl PaymentGateway for PaystackGateway {
    async fn verify(&self, reference: &str) -> Result<ChargeVerification> {
        let url = format!("{}/transaction/verify/{}", self.base_url, reference);

        let response = self
            .http
            .get(&url)
            .bearer_auth(&self.secret_key)
            .send()
            .await
            .map_err(Self::map_send_error)?;

        let http_status = response.status();
        if !http_status.is_success() {
            tracing::warn!(reference, status = %http_status, "gateway returned non-success HTTP status");
            return Err(AppError::External(format!(
                "payment gateway returned HTTP {}",
                http_status.as_u16()
            )));
        }

        let body: VerifyResponse = response
            .json()
            .await
            .map_err(|e| AppError::External(format!("invalid gateway response: {}", e)))?;

        let Some(data) = body.data else {
            return Ok(ChargeVerification {
                reference: reference.to_string(),
                success: false,
                gateway_status: body.message.unwrap_or_else(|| "no transaction data".to_string()),
                amount: 0,
                currency: String::new(),
                paid_at: None,
            });
        };

        Ok(ChargeVerification {
            reference: reference.to_string(),
            success: body.status && data.status == "success",
            gateway_status: data.status,
            amount: data.amount,
            currency: data.currency,
            paid_at: data.paid_at,
        })
    }
}
