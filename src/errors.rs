// src/errors.rs

use actix_web::{HttpResponse, ResponseError};
use serde_json::json;
use thiserror::Error;

use crate::models::OrderStatus;

#[derive(Debug, Error)]
pub enum AppError {
  #[error("Insufficient stock: only {available} available")]
  InsufficientStock { available: i32 },

  #[error("Resource Not Found: {0}")]
  NotFound(String),

  #[error("Validation Error: {0}")]
  Validation(String),

  #[error("Illegal order status transition: {from:?} -> {to:?}")]
  IllegalTransition { from: OrderStatus, to: OrderStatus },

  #[error("Unauthorized: {0}")]
  Unauthorized(String),

  #[error("Payment Provider Error: {0}")]
  PaymentProvider(String),

  #[error("Email Service Error: {0}")]
  Email(String),

  #[error("Configuration Error: {0}")]
  Config(String),

  #[error("Database Error: {0}")]
  Sqlx(#[from] sqlx::Error),

  #[error("Internal Server Error: {0}")]
  Internal(String),
}

// Allow anyhow::Error to be converted into AppError::Internal for convenience
// in handlers that use `?` on functions returning anyhow::Result.
impl From<anyhow::Error> for AppError {
  fn from(err: anyhow::Error) -> Self {
    if err.is::<sqlx::Error>() {
      // `From<sqlx::Error>` exists, but the error may arrive wrapped in anyhow.
      match err.downcast::<sqlx::Error>() {
        Ok(sqlx_err) => return AppError::Sqlx(sqlx_err),
        Err(other) => return AppError::Internal(other.to_string()),
      }
    }
    AppError::Internal(err.to_string())
  }
}

impl ResponseError for AppError {
  fn error_response(&self) -> HttpResponse {
    // Log the full error when it's turned into a response.
    tracing::error!(application_error = %self, "Responding with error");
    match self {
      AppError::InsufficientStock { available } => {
        HttpResponse::Conflict().json(json!({"error": "Insufficient stock", "available": available}))
      }
      AppError::NotFound(m) => HttpResponse::NotFound().json(json!({"error": m})),
      AppError::Validation(m) => HttpResponse::BadRequest().json(json!({"error": m})),
      AppError::IllegalTransition { from, to } => HttpResponse::UnprocessableEntity().json(json!({
        "error": "Illegal status transition",
        "from": from,
        "to": to,
      })),
      AppError::Unauthorized(m) => HttpResponse::Unauthorized().json(json!({"error": m})),
      AppError::PaymentProvider(m) => {
        HttpResponse::InternalServerError().json(json!({"error": "Payment provider error", "detail": m}))
      }
      AppError::Email(m) => {
        HttpResponse::InternalServerError().json(json!({"error": "Email service error", "detail": m}))
      }
      AppError::Config(m) => {
        HttpResponse::InternalServerError().json(json!({"error": "Configuration issue", "detail": m}))
      }
      AppError::Sqlx(_) => HttpResponse::InternalServerError().json(json!({"error": "Database operation failed"})),
      AppError::Internal(m) => {
        HttpResponse::InternalServerError().json(json!({"error": "An internal error occurred", "detail": m}))
      }
    }
  }
}

// Define a Result type alias for the application
pub type Result<T, E = AppError> = std::result::Result<T, E>;
