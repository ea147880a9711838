// src/web/handlers/webhook_handlers.rs

use actix_web::{web, HttpRequest, HttpResponse};
use serde_json::json;
use tracing::{error, info, instrument, warn};

use crate::services::payment_events::PaymentNotification;
use crate::state::AppState;

/// Mercado Pago payment webhook.
///
/// Always acknowledges with `200 {"received": true}`: the provider retries
/// on anything else, and an infinite retry storm would only mask the real
/// root cause. Internal failures are logged and handled by later
/// reconciliation, never surfaced to the caller.
#[instrument(
  name = "handler::mp_webhook",
  skip(app_state, req, body),
  fields(payload_bytes = body.len())
)]
pub async fn mercadopago_webhook_handler(
  app_state: web::Data<AppState>,
  req: HttpRequest,
  body: web::Bytes,
) -> HttpResponse {
  let ack = HttpResponse::Ok().json(json!({ "received": true }));

  let notification: PaymentNotification = match serde_json::from_slice(&body) {
    Ok(n) => n,
    Err(e) => {
      warn!(error = %e, "Unparseable webhook payload; acknowledged anyway");
      return ack;
    }
  };

  let signature_header = req
    .headers()
    .get("x-signature")
    .and_then(|h| h.to_str().ok())
    .map(String::from);
  let request_id = req
    .headers()
    .get("x-request-id")
    .and_then(|h| h.to_str().ok())
    .unwrap_or_default()
    .to_string();

  let data_id = notification.data_id().unwrap_or_default();
  if let Err(e) = app_state
    .payment_events
    .verify_signature(&data_id, &request_id, signature_header.as_deref())
  {
    warn!(error = %e, data_id, "Webhook signature rejected; event dropped");
    return ack;
  }

  match app_state.payment_events.process_notification(&notification).await {
    Ok(()) => info!(data_id, "Webhook processed"),
    Err(e) => error!(error = %e, data_id, "Webhook processing failed; acknowledged anyway"),
  }

  ack
}
