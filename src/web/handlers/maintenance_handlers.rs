// src/web/handlers/maintenance_handlers.rs

use actix_web::{web, HttpRequest, HttpResponse};
use tracing::instrument;

use crate::errors::AppError;
use crate::state::AppState;

/// Maintenance trigger, invoked by the external scheduler. Guarded by the
/// shared bearer secret; two overlapping invocations are safe because every
/// cancellation is conditional on the order still being held.
#[instrument(name = "handler::maintenance", skip(app_state, req))]
pub async fn maintenance_handler(
  app_state: web::Data<AppState>,
  req: HttpRequest,
) -> Result<HttpResponse, AppError> {
  let authorization = req
    .headers()
    .get("authorization")
    .and_then(|h| h.to_str().ok())
    .unwrap_or_default();
  let expected = format!("Bearer {}", app_state.config.cron_secret);
  if authorization != expected {
    return Err(AppError::Unauthorized("Invalid maintenance trigger secret".to_string()));
  }

  let summary = app_state.maintenance.run().await?;
  Ok(HttpResponse::Ok().json(summary))
}
