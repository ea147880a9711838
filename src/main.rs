// src/main.rs

use actix_web::{web as actix_data, App, HttpServer};
use sqlx::PgPool;
use std::sync::Arc;
use tracing::Level;
use tracing_subscriber::fmt::format::FmtSpan;

use storefront_core::config::AppConfig;
use storefront_core::db::{PgOrderStore, PgProductStore, PgReservationStore};
use storefront_core::services::email::RecordingMailer;
use storefront_core::services::mercado_pago::MercadoPagoClient;
use storefront_core::state::AppState;
use storefront_core::web::routes::configure_app_routes;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
  tracing_subscriber::fmt()
    .with_max_level(Level::INFO)
    .with_env_filter(tracing_subscriber::EnvFilter::from_default_env()) // Allow RUST_LOG override
    .with_span_events(FmtSpan::CLOSE)
    .init();

  tracing::info!("Starting storefront order engine...");

  // Missing secrets fail fast here rather than silently disabling the
  // maintenance-endpoint protection or the payment integration.
  let config = match AppConfig::from_env() {
    Ok(cfg) => Arc::new(cfg),
    Err(e) => {
      tracing::error!(error = %e, "Failed to load application configuration.");
      return Err(std::io::Error::other(e.to_string()));
    }
  };

  let db_pool = match PgPool::connect(&config.database_url).await {
    Ok(pool) => {
      tracing::info!("Successfully connected to the database.");
      pool
    }
    Err(e) => {
      tracing::error!(error = %e, "Failed to connect to the database.");
      return Err(std::io::Error::other(e.to_string()));
    }
  };

  let products = Arc::new(PgProductStore::new(db_pool.clone()));
  let reservations = Arc::new(PgReservationStore::new(db_pool.clone()));
  let orders = Arc::new(PgOrderStore::new(db_pool));
  // Email delivery internals are out of scope; the recording mailer logs
  // sends and satisfies the Mailer port until a real transport is plugged in.
  let mailer = Arc::new(RecordingMailer::new());
  let payment_provider = Arc::new(MercadoPagoClient::new(
    config.mp_api_base_url.clone(),
    config.mp_access_token.clone(),
  ));

  let app_state = AppState::assemble(
    config.clone(),
    products,
    reservations,
    orders,
    mailer,
    payment_provider,
  );

  let server_address = format!("{}:{}", config.server_host, config.server_port);
  tracing::info!("Attempting to bind server to {}...", server_address);

  HttpServer::new(move || {
    App::new()
      .app_data(actix_data::Data::new(app_state.clone()))
      .wrap(tracing_actix_web::TracingLogger::default())
      .configure(configure_app_routes)
  })
  .bind(&server_address)?
  .run()
  .await
}
