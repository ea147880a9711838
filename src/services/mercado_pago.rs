// src/services/mercado_pago.rs

use async_trait::async_trait;
use parking_lot::Mutex;
use serde::Deserialize;
use std::collections::HashMap;
use tracing::{info, instrument};

use crate::errors::{AppError, Result};

/// Payment details fetched from the provider by id. The webhook body is never
/// trusted for monetary or status fields; this is the authoritative record.
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentDetails {
  pub id: i64,
  pub status: String,
  /// Local order id embedded in the payment at preference-creation time.
  pub external_reference: Option<String>,
}

/// Port over the payment provider's detail-fetch API.
#[async_trait]
pub trait PaymentProvider: Send + Sync {
  async fn fetch_payment(&self, payment_id: i64) -> Result<PaymentDetails>;
}

/// Mercado Pago REST client (`GET /v1/payments/{id}` with a bearer access
/// token).
pub struct MercadoPagoClient {
  http: reqwest::Client,
  base_url: String,
  access_token: String,
}

impl MercadoPagoClient {
  pub fn new(base_url: impl Into<String>, access_token: impl Into<String>) -> Self {
    Self {
      http: reqwest::Client::new(),
      base_url: base_url.into(),
      access_token: access_token.into(),
    }
  }
}

#[async_trait]
impl PaymentProvider for MercadoPagoClient {
  #[instrument(name = "mercado_pago::fetch_payment", skip(self))]
  async fn fetch_payment(&self, payment_id: i64) -> Result<PaymentDetails> {
    let url = format!("{}/v1/payments/{}", self.base_url, payment_id);
    let response = self
      .http
      .get(&url)
      .bearer_auth(&self.access_token)
      .send()
      .await
      .map_err(|e| AppError::PaymentProvider(format!("Payment detail request failed: {}", e)))?;

    if !response.status().is_success() {
      return Err(AppError::PaymentProvider(format!(
        "Payment {} detail fetch returned HTTP {}",
        payment_id,
        response.status()
      )));
    }

    let details: PaymentDetails = response
      .json()
      .await
      .map_err(|e| AppError::PaymentProvider(format!("Malformed payment detail response: {}", e)))?;
    info!(payment_id, status = %details.status, "Fetched payment details");
    Ok(details)
  }
}

/// In-memory provider preloaded with payment records, for tests and local
/// development.
#[derive(Default)]
pub struct MockPaymentProvider {
  payments: Mutex<HashMap<i64, PaymentDetails>>,
}

impl MockPaymentProvider {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn put(&self, details: PaymentDetails) {
    self.payments.lock().insert(details.id, details);
  }
}

#[async_trait]
impl PaymentProvider for MockPaymentProvider {
  async fn fetch_payment(&self, payment_id: i64) -> Result<PaymentDetails> {
    self
      .payments
      .lock()
      .get(&payment_id)
      .cloned()
      .ok_or_else(|| AppError::PaymentProvider(format!("Unknown payment id {}", payment_id)))
  }
}
