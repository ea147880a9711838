// src/services/payment_events.rs

use hmac::{Hmac, Mac};
use serde::Deserialize;
use serde_json::Value as JsonValue;
use sha2::Sha256;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::db::OrderStore;
use crate::errors::{AppError, Result};
use crate::models::OrderStatus;
use crate::services::mercado_pago::PaymentProvider;

type HmacSha256 = Hmac<Sha256>;

/// Webhook notification body: `{ "type": "payment", "data": { "id": ... } }`.
/// Only the payment id is taken from the body; monetary state always comes
/// from the provider's detail fetch.
#[derive(Debug, Deserialize)]
pub struct PaymentNotification {
  #[serde(rename = "type")]
  pub kind: String,
  pub data: NotificationData,
}

#[derive(Debug, Deserialize)]
pub struct NotificationData {
  // Mercado Pago sends the id as a number or a string depending on the
  // notification channel.
  pub id: JsonValue,
}

impl PaymentNotification {
  pub fn data_id(&self) -> Option<String> {
    match &self.data.id {
      JsonValue::String(s) => Some(s.clone()),
      JsonValue::Number(n) => Some(n.to_string()),
      _ => None,
    }
  }
}

/// Parsed `x-signature` header: `ts=<unix-ts>,v1=<hmac-hex>`.
#[derive(Debug, Clone)]
pub struct WebhookSignature {
  pub ts: String,
  pub v1: String,
}

impl WebhookSignature {
  pub fn parse(header: &str) -> Option<Self> {
    let mut ts = None;
    let mut v1 = None;
    for part in header.split(',') {
      match part.trim().split_once('=') {
        Some(("ts", value)) => ts = Some(value.trim().to_string()),
        Some(("v1", value)) => v1 = Some(value.trim().to_string()),
        _ => {}
      }
    }
    Some(Self { ts: ts?, v1: v1? })
  }
}

/// Ingests asynchronous payment-provider notifications and drives orders
/// through the state machine's payment-origin transitions. Applying a
/// notification is a pure "set status to X", so at-least-once delivery is
/// safe by construction.
pub struct PaymentEventProcessor {
  orders: Arc<dyn OrderStore>,
  provider: Arc<dyn PaymentProvider>,
  webhook_secret: Option<String>,
}

impl PaymentEventProcessor {
  pub fn new(orders: Arc<dyn OrderStore>, provider: Arc<dyn PaymentProvider>, webhook_secret: Option<String>) -> Self {
    Self {
      orders,
      provider,
      webhook_secret,
    }
  }

  /// Verifies the provider's HMAC-SHA256 signature over the manifest
  /// `id:<dataId>;request-id:<reqId>;ts:<ts>;`. When no signing secret is
  /// configured, verification is skipped (a development-mode relaxation).
  pub fn verify_signature(&self, data_id: &str, request_id: &str, signature_header: Option<&str>) -> Result<()> {
    let Some(secret) = self.webhook_secret.as_deref() else {
      warn!("Webhook signature verification skipped: no signing secret configured");
      return Ok(());
    };

    let header = signature_header
      .ok_or_else(|| AppError::Unauthorized("Missing x-signature header".to_string()))?;
    let signature = WebhookSignature::parse(header)
      .ok_or_else(|| AppError::Unauthorized("Malformed x-signature header".to_string()))?;

    let manifest = format!("id:{};request-id:{};ts:{};", data_id, request_id, signature.ts);
    let expected =
      hex::decode(&signature.v1).map_err(|_| AppError::Unauthorized("Malformed signature value".to_string()))?;

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
      .map_err(|e| AppError::Config(format!("Invalid webhook secret: {}", e)))?;
    mac.update(manifest.as_bytes());
    mac
      .verify_slice(&expected)
      .map_err(|_| AppError::Unauthorized("Webhook signature mismatch".to_string()))
  }

  /// Fetches the payment's authoritative details, resolves the order via its
  /// `external_reference`, and applies exactly one of the four outcomes:
  /// approved → `PROCESSED`; rejected/pending/cancelled → `PENDING`.
  #[instrument(name = "payment_events::process", skip(self, notification))]
  pub async fn process_notification(&self, notification: &PaymentNotification) -> Result<()> {
    if notification.kind != "payment" {
      info!(kind = %notification.kind, "Ignoring non-payment notification");
      return Ok(());
    }
    let data_id = notification
      .data_id()
      .ok_or_else(|| AppError::Validation("Notification carried no payment id".to_string()))?;
    let payment_id: i64 = data_id
      .parse()
      .map_err(|_| AppError::Validation(format!("Non-numeric payment id '{}'", data_id)))?;

    let details = self.provider.fetch_payment(payment_id).await?;
    let reference = details
      .external_reference
      .as_deref()
      .ok_or_else(|| AppError::PaymentProvider(format!("Payment {} has no external_reference", payment_id)))?;
    let order_id: Uuid = reference
      .parse()
      .map_err(|_| AppError::PaymentProvider(format!("Bad external_reference '{}'", reference)))?;

    let order = self
      .orders
      .get(order_id)
      .await?
      .ok_or_else(|| AppError::NotFound(format!("Order {} referenced by payment {}", order_id, payment_id)))?;

    let target = match details.status.as_str() {
      "approved" => OrderStatus::Processed,
      // Returned to the front of the manual queue rather than auto-cancelled:
      // a human may still want to chase the payment.
      "rejected" | "pending" | "cancelled" | "in_process" => OrderStatus::Pending,
      other => {
        warn!(payment_id, status = other, "Unknown payment status; order left unchanged");
        return Ok(());
      }
    };

    // Out-of-order guard: a stale non-approved replay must not drag an order
    // that already reached PROCESSED (or a terminal state) back to PENDING,
    // and nothing reopens DELIVERED or CANCELLED.
    let settled = order.status == OrderStatus::Processed || order.status.is_terminal();
    if settled && !(target == OrderStatus::Processed && order.status == OrderStatus::Processed) {
      warn!(
        %order_id,
        payment_id,
        current = ?order.status,
        incoming = %details.status,
        "Stale or out-of-order payment event ignored"
      );
      return Ok(());
    }

    self
      .orders
      .record_payment_result(order_id, target, &data_id, &details.status)
      .await?;
    info!(%order_id, payment_id, status = %details.status, ?target, "Payment event applied");
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn parses_signature_header() {
    let sig = WebhookSignature::parse("ts=1704908010,v1=618c85345248dd820d5fd456117c2ab2ef8eda45a0282ff693eac24131a5e839")
      .expect("header should parse");
    assert_eq!(sig.ts, "1704908010");
    assert_eq!(sig.v1.len(), 64);
  }

  #[test]
  fn rejects_header_without_v1() {
    assert!(WebhookSignature::parse("ts=1704908010").is_none());
  }

  #[test]
  fn notification_id_accepts_number_or_string() {
    let n: PaymentNotification = serde_json::from_str(r#"{"type":"payment","data":{"id":123}}"#).unwrap();
    assert_eq!(n.data_id().as_deref(), Some("123"));
    let s: PaymentNotification = serde_json::from_str(r#"{"type":"payment","data":{"id":"456"}}"#).unwrap();
    assert_eq!(s.data_id().as_deref(), Some("456"));
  }
}
