// src/web/handlers/reservation_handlers.rs

use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use tracing::instrument;
use uuid::Uuid;

use crate::errors::AppError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateReservationRequest {
  pub product_id: Uuid,
  pub quantity: i32,
  pub session_id: String,
}

#[derive(Debug, Deserialize)]
pub struct SessionRequest {
  pub session_id: String,
}

#[instrument(name = "handler::create_reservation", skip(app_state, payload))]
pub async fn create_reservation_handler(
  app_state: web::Data<AppState>,
  payload: web::Json<CreateReservationRequest>,
) -> Result<HttpResponse, AppError> {
  let reservation = app_state
    .reservations
    .create_reservation(payload.product_id, payload.quantity, &payload.session_id)
    .await?;
  Ok(HttpResponse::Created().json(reservation))
}

#[instrument(name = "handler::extend_reservation", skip(app_state, payload))]
pub async fn extend_reservation_handler(
  app_state: web::Data<AppState>,
  payload: web::Json<SessionRequest>,
) -> Result<HttpResponse, AppError> {
  let extended = app_state.reservations.extend_reservation(&payload.session_id).await?;
  Ok(HttpResponse::Ok().json(json!({ "extended": extended })))
}

#[instrument(name = "handler::release_reservation", skip(app_state))]
pub async fn release_reservation_handler(
  app_state: web::Data<AppState>,
  session_id: web::Path<String>,
) -> Result<HttpResponse, AppError> {
  let released = app_state.reservations.release_reservation(&session_id).await?;
  Ok(HttpResponse::Ok().json(json!({ "released": released })))
}

#[instrument(name = "handler::availability", skip(app_state))]
pub async fn availability_handler(
  app_state: web::Data<AppState>,
  product_id: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
  let product_id = product_id.into_inner();
  let available = app_state.reservations.get_available_stock(product_id).await?;
  Ok(HttpResponse::Ok().json(json!({ "productId": product_id, "available": available })))
}
