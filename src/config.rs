// src/config.rs

use crate::errors::{AppError, Result};
use chrono::Duration;
use dotenvy::dotenv;
use std::env;

#[derive(Debug, Clone)]
pub struct AppConfig {
  pub server_host: String,
  pub server_port: u16,
  pub database_url: String,

  // Shared secret required by the maintenance trigger endpoint.
  pub cron_secret: String,

  // Mercado Pago credentials. The access token is required; the webhook
  // signing secret is optional (unset skips signature verification, a
  // development-mode relaxation).
  pub mp_access_token: String,
  pub mp_webhook_secret: Option<String>,
  pub mp_api_base_url: String,

  // Per-payment-method expiration windows for deferred-payment orders.
  pub mp_expiration_minutes: i64,
  pub transfer_expiration_hours: i64,
  pub pickup_expiration_hours: i64,

  // TTL for checkout stock reservations.
  pub reservation_ttl_minutes: i64,

  pub email_sender: String,
}

impl AppConfig {
  pub fn from_env() -> Result<Self> {
    dotenv().ok(); // Load .env file if present

    let get_env = |var_name: &str| {
      env::var(var_name).map_err(|e| AppError::Config(format!("Missing environment variable '{}': {}", var_name, e)))
    };
    let get_env_i64 = |var_name: &str, default: i64| -> Result<i64> {
      match env::var(var_name) {
        Ok(raw) => raw
          .parse::<i64>()
          .map_err(|e| AppError::Config(format!("Invalid {}: {}", var_name, e))),
        Err(_) => Ok(default),
      }
    };

    let server_host = get_env("SERVER_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
    let server_port = get_env("SERVER_PORT")
      .unwrap_or_else(|_| "8080".to_string())
      .parse::<u16>()
      .map_err(|e| AppError::Config(format!("Invalid SERVER_PORT: {}", e)))?;
    let database_url = get_env("DATABASE_URL")?;

    // Missing secrets are fatal at startup. Failing fast beats running with
    // an unprotected maintenance endpoint or a dead payment integration.
    let cron_secret = get_env("CRON_SECRET")?;
    let mp_access_token = get_env("MP_ACCESS_TOKEN")?;
    let mp_webhook_secret = env::var("MP_WEBHOOK_SECRET").ok().filter(|s| !s.is_empty());
    let mp_api_base_url =
      get_env("MP_API_BASE_URL").unwrap_or_else(|_| "https://api.mercadopago.com".to_string());

    let mp_expiration_minutes = get_env_i64("MP_EXPIRATION_MINUTES", 60)?;
    let transfer_expiration_hours = get_env_i64("TRANSFER_EXPIRATION_HOURS", 48)?;
    let pickup_expiration_hours = get_env_i64("PICKUP_EXPIRATION_HOURS", 72)?;
    let reservation_ttl_minutes = get_env_i64("RESERVATION_TTL_MINUTES", 15)?;

    let email_sender = get_env("EMAIL_SENDER").unwrap_or_else(|_| "noreply@example.com".to_string());

    if mp_webhook_secret.is_none() {
      tracing::warn!("MP_WEBHOOK_SECRET not set; webhook signature verification is disabled.");
    }
    tracing::info!("Application configuration loaded successfully.");

    Ok(Self {
      server_host,
      server_port,
      database_url,
      cron_secret,
      mp_access_token,
      mp_webhook_secret,
      mp_api_base_url,
      mp_expiration_minutes,
      transfer_expiration_hours,
      pickup_expiration_hours,
      reservation_ttl_minutes,
      email_sender,
    })
  }

  pub fn reservation_ttl(&self) -> Duration {
    Duration::minutes(self.reservation_ttl_minutes)
  }
}
