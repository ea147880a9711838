// src/web/handlers/order_handlers.rs

use actix_web::{web, HttpResponse};
use serde::Deserialize;
use tracing::instrument;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::OrderStatus;
use crate::services::orders::PlaceOrderRequest;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct StatusChangeRequest {
  pub status: OrderStatus,
}

#[instrument(name = "handler::checkout", skip(app_state, payload), fields(session_id = %payload.session_id))]
pub async fn checkout_handler(
  app_state: web::Data<AppState>,
  payload: web::Json<PlaceOrderRequest>,
) -> Result<HttpResponse, AppError> {
  let order = app_state.orders.place_order(&payload).await?;
  Ok(HttpResponse::Created().json(order))
}

#[instrument(name = "handler::get_order", skip(app_state))]
pub async fn get_order_handler(
  app_state: web::Data<AppState>,
  order_id: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
  let order_id = order_id.into_inner();
  let order = app_state
    .state_machine
    .get(order_id)
    .await?;
  Ok(HttpResponse::Ok().json(order))
}

#[instrument(name = "handler::set_order_status", skip(app_state, payload))]
pub async fn set_order_status_handler(
  app_state: web::Data<AppState>,
  order_id: web::Path<Uuid>,
  payload: web::Json<StatusChangeRequest>,
) -> Result<HttpResponse, AppError> {
  let order = app_state
    .state_machine
    .transition(order_id.into_inner(), payload.status)
    .await?;
  Ok(HttpResponse::Ok().json(order))
}
