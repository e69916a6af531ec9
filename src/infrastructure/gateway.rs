use crate::domain::delivery::DeliveryResult;
use crate::domain::ledger::{Credits, ProviderKind};
use crate::domain::ports::{SmsGateway, SmsGatewayRef};
use crate::error::{DispatchError, Result};
use async_trait::async_trait;
use reqwest::header::ACCEPT;
use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::{debug, error, warn};

pub const BEEM_SEND_URL: &str = "https://apisms.beem.africa/v1/send";
pub const BEEM_BALANCE_URL: &str = "https://apisms.beem.africa/public/v1/vendors/balance";

/// Connection details for an upstream gateway account.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub provider: ProviderKind,
    pub send_url: String,
    pub balance_url: String,
    pub api_key: String,
    pub api_secret: String,
    pub sender_id: String,
    pub timeout: Duration,
}

/// Builds the transport for the configured provider.
pub fn build_gateway(config: GatewayConfig) -> Result<SmsGatewayRef> {
    match config.provider {
        ProviderKind::BeemAfrica => Ok(Arc::new(BeemGateway::new(config)?)),
    }
}

#[derive(Serialize)]
struct SendBody<'a> {
    source_addr: &'a str,
    encoding: u8,
    message: &'a str,
    recipients: [Recipient<'a>; 1],
}

#[derive(Serialize)]
struct Recipient<'a> {
    recipient_id: u32,
    dest_addr: &'a str,
}

/// Beem Africa SMS API over HTTPS with Basic auth.
pub struct BeemGateway {
    client: reqwest::Client,
    config: GatewayConfig,
}

impl BeemGateway {
    pub fn new(config: GatewayConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| DispatchError::InternalError(Box::new(e)))?;
        Ok(Self { client, config })
    }

    async fn read_send_response(response: reqwest::Response) -> DeliveryResult {
        let status = response.status();
        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => return DeliveryResult::unavailable(e),
        };

        if !status.is_success() {
            error!(status = status.as_u16(), body = %body, "SMS API error");
            return DeliveryResult::from_error_body(
                status.as_u16(),
                status.canonical_reason().unwrap_or("Unknown"),
                &body,
            );
        }
        if body.trim().is_empty() {
            warn!("empty response from SMS provider");
            return DeliveryResult::empty_response();
        }
        match serde_json::from_str::<Value>(&body) {
            Ok(value) => DeliveryResult::from_api_response(value),
            Err(e) => DeliveryResult::failure(format!("Malformed response from SMS provider: {}", e)),
        }
    }
}

#[async_trait]
impl SmsGateway for BeemGateway {
    async fn send(&self, phone_number: &str, message: &str) -> DeliveryResult {
        let body = SendBody {
            source_addr: &self.config.sender_id,
            encoding: 0,
            message,
            recipients: [Recipient {
                recipient_id: 1,
                dest_addr: phone_number,
            }],
        };
        debug!(destination = phone_number, "posting SMS to gateway");

        let response = self
            .client
            .post(&self.config.send_url)
            .basic_auth(&self.config.api_key, Some(&self.config.api_secret))
            .header(ACCEPT, "application/json")
            .json(&body)
            .send()
            .await;

        match response {
            Ok(response) => Self::read_send_response(response).await,
            Err(e) => {
                error!(destination = phone_number, error = %e, "SMS sending failed");
                DeliveryResult::unavailable(e)
            }
        }
    }

    async fn fetch_balance(&self) -> Result<Credits> {
        let response = self
            .client
            .get(&self.config.balance_url)
            .basic_auth(&self.config.api_key, Some(&self.config.api_secret))
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| DispatchError::BalanceCheck(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(DispatchError::BalanceCheck(format!(
                "balance endpoint returned {}",
                status
            )));
        }
        let body: Value = response
            .json()
            .await
            .map_err(|e| DispatchError::BalanceCheck(e.to_string()))?;
        parse_balance(&body)
    }
}

/// Extracts `data.credit_balance` from a balance reply.
pub fn parse_balance(body: &Value) -> Result<Credits> {
    body.pointer("/data/credit_balance")
        .and_then(Value::as_f64)
        .and_then(Decimal::from_f64)
        .map(Credits)
        .ok_or_else(|| DispatchError::BalanceCheck("invalid balance response from provider".to_string()))
}

/// Accepts every message without network traffic.
///
/// Request ids count up from 1; the balance is whatever it was built with.
pub struct DryRunGateway {
    balance: Credits,
    next_request: AtomicU64,
}

impl DryRunGateway {
    pub fn new(balance: Credits) -> Self {
        Self {
            balance,
            next_request: AtomicU64::new(1),
        }
    }
}

#[async_trait]
impl SmsGateway for DryRunGateway {
    async fn send(&self, phone_number: &str, message: &str) -> DeliveryResult {
        let request_id = self.next_request.fetch_add(1, Ordering::Relaxed);
        debug!(destination = phone_number, chars = message.chars().count(), request_id, "dry run send");
        DeliveryResult {
            success: true,
            message: Some("Dry run".to_string()),
            request_id: Some(request_id),
            valid: Some(1),
            invalid: Some(0),
            duplicates: Some(0),
            ..DeliveryResult::default()
        }
    }

    async fn fetch_balance(&self) -> Result<Credits> {
        Ok(self.balance)
    }
}
