//! Mercado Pago gateway: preference creation ahead of the hosted
//! checkout redirect, and payment lookups during webhook reconciliation.
//!
//! Webhook payloads are never trusted for payment state; the reconciler
//! always re-fetches the payment by id through this client.

use async_trait::async_trait;
use reqwest::StatusCode;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use std::time::Duration;
use tracing::instrument;

use crate::config::AppConfig;

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("payment provider transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("payment provider rejected the request ({status}): {body}")]
    Api { status: StatusCode, body: String },
}

/// Payment provider seam. Handlers and services only see this trait so
/// tests can substitute a fake without touching the network.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_preference(
        &self,
        preference: &PreferenceRequest,
    ) -> Result<PreferenceResponse, GatewayError>;

    async fn get_payment(&self, payment_id: &str) -> Result<PaymentDetails, GatewayError>;
}

/// One line of the hosted checkout session.
#[derive(Debug, Clone, Serialize)]
pub struct PreferenceItem {
    pub id: String,
    pub title: String,
    pub quantity: i32,
    #[serde(with = "decimal_as_number")]
    pub unit_price: Decimal,
    pub picture_url: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PayerAddress {
    pub zip_code: String,
    pub street_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub street_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub neighborhood: Option<String>,
    pub city: String,
    pub state: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PayerPhone {
    pub area_code: String,
    pub number: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PreferencePayer {
    pub email: String,
    pub name: String,
    pub surname: String,
    pub address: PayerAddress,
    pub phone: PayerPhone,
}

#[derive(Debug, Clone, Serialize)]
pub struct BackUrls {
    pub success: String,
    pub failure: String,
    pub pending: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PreferenceRequest {
    pub items: Vec<PreferenceItem>,
    pub payer: PreferencePayer,
    pub back_urls: BackUrls,
    pub notification_url: String,
    pub auto_return: String,
    /// Durable order id echoed back in payment records; the join key the
    /// webhook reconciler resolves against.
    pub external_reference: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PreferenceResponse {
    #[serde(deserialize_with = "lenient_id")]
    pub id: String,
    pub init_point: String,
    #[serde(default)]
    pub sandbox_init_point: Option<String>,
}

/// Authoritative payment record fetched by id.
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentDetails {
    #[serde(deserialize_with = "lenient_id")]
    pub id: String,
    pub status: String,
    #[serde(default)]
    pub external_reference: Option<String>,
    #[serde(default)]
    pub preference_id: Option<String>,
}

/// REST client for the Mercado Pago API.
#[derive(Clone)]
pub struct MercadoPagoClient {
    http: reqwest::Client,
    base_url: String,
    access_token: String,
}

impl MercadoPagoClient {
    pub fn new(
        access_token: impl Into<String>,
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            access_token: access_token.into(),
        })
    }

    pub fn from_config(cfg: &AppConfig) -> Result<Self, reqwest::Error> {
        Self::new(
            cfg.mp_access_token.clone(),
            cfg.mp_base_url.clone(),
            Duration::from_secs(cfg.mp_timeout_secs),
        )
    }

    async fn read_error(response: reqwest::Response) -> GatewayError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        GatewayError::Api { status, body }
    }
}

#[async_trait]
impl PaymentGateway for MercadoPagoClient {
    #[instrument(skip(self, preference), fields(external_reference = %preference.external_reference))]
    async fn create_preference(
        &self,
        preference: &PreferenceRequest,
    ) -> Result<PreferenceResponse, GatewayError> {
        let url = format!("{}/checkout/preferences", self.base_url);
        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.access_token)
            .json(preference)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::read_error(response).await);
        }

        Ok(response.json().await?)
    }

    #[instrument(skip(self))]
    async fn get_payment(&self, payment_id: &str) -> Result<PaymentDetails, GatewayError> {
        let url = format!("{}/v1/payments/{}", self.base_url, payment_id);
        let response = self
            .http
            .get(&url)
            .bearer_auth(&self.access_token)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::read_error(response).await);
        }

        Ok(response.json().await?)
    }
}

/// Mercado Pago emits ids as JSON numbers for payments and strings for
/// preferences; normalize both to strings.
fn lenient_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;

    let value = serde_json::Value::deserialize(deserializer)?;
    match value {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        other => Err(D::Error::custom(format!(
            "expected string or number id, got {other}"
        ))),
    }
}

/// The preference API expects unit prices as JSON numbers, not strings.
mod decimal_as_number {
    use super::*;
    use serde::Serializer;

    pub fn serialize<S>(value: &Decimal, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_f64(value.to_f64().unwrap_or_default())
    }
}
