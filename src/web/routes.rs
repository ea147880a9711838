// src/web/routes.rs

use actix_web::web;

async fn health_check_handler() -> actix_web::HttpResponse {
  actix_web::HttpResponse::Ok().json(serde_json::json!({ "status": "ok" }))
}

// Called from `main.rs` to configure services for the Actix App.
pub fn configure_app_routes(cfg: &mut web::ServiceConfig) {
  use crate::web::handlers::{maintenance_handlers, order_handlers, reservation_handlers, webhook_handlers};

  cfg.service(
    web::scope("/api/v1")
      .route("/health", web::get().to(health_check_handler))
      .service(
        web::scope("/reservations")
          .route("", web::post().to(reservation_handlers::create_reservation_handler))
          .route("/extend", web::post().to(reservation_handlers::extend_reservation_handler))
          .route(
            "/{session_id}",
            web::delete().to(reservation_handlers::release_reservation_handler),
          ),
      )
      .service(web::scope("/products").route(
        "/{product_id}/availability",
        web::get().to(reservation_handlers::availability_handler),
      ))
      .service(web::scope("/checkout").route("", web::post().to(order_handlers::checkout_handler)))
      .service(
        web::scope("/orders")
          .route("/{order_id}", web::get().to(order_handlers::get_order_handler))
          .route(
            "/{order_id}/status",
            web::patch().to(order_handlers::set_order_status_handler),
          ),
      )
      .service(web::scope("/webhooks").route(
        "/mercadopago",
        web::post().to(webhook_handlers::mercadopago_webhook_handler),
      ))
      .service(web::scope("/jobs").route(
        "/maintenance",
        web::post().to(maintenance_handlers::maintenance_handler),
      )),
  );
}
