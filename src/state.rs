// src/state.rs

use std::sync::Arc;

use crate::config::AppConfig;
use crate::db::{OrderStore, ProductStore, ReservationStore};
use crate::services::email::Mailer;
use crate::services::maintenance::MaintenanceService;
use crate::services::mercado_pago::PaymentProvider;
use crate::services::orders::OrderService;
use crate::services::payment_events::PaymentEventProcessor;
use crate::services::reservations::ReservationManager;
use crate::services::status::OrderStateMachine;

/// Explicitly constructed dependency container shared with the handlers.
/// All stores and collaborators are injected here by the process entry
/// point (or by a test harness); there is no module-level client anywhere.
#[derive(Clone)]
pub struct AppState {
  pub config: Arc<AppConfig>,
  pub reservations: Arc<ReservationManager>,
  pub orders: Arc<OrderService>,
  pub state_machine: Arc<OrderStateMachine>,
  pub payment_events: Arc<PaymentEventProcessor>,
  pub maintenance: Arc<MaintenanceService>,
}

impl AppState {
  /// Wires the full service graph from its ports.
  pub fn assemble(
    config: Arc<AppConfig>,
    products: Arc<dyn ProductStore>,
    reservation_store: Arc<dyn ReservationStore>,
    order_store: Arc<dyn OrderStore>,
    mailer: Arc<dyn Mailer>,
    payment_provider: Arc<dyn PaymentProvider>,
  ) -> Self {
    let reservations = Arc::new(ReservationManager::new(
      products.clone(),
      reservation_store,
      config.reservation_ttl(),
    ));
    let state_machine = Arc::new(OrderStateMachine::new(
      order_store.clone(),
      mailer.clone(),
      config.email_sender.clone(),
    ));
    let orders = Arc::new(OrderService::new(
      order_store.clone(),
      products,
      reservations.clone(),
      mailer.clone(),
      config.clone(),
    ));
    let payment_events = Arc::new(PaymentEventProcessor::new(
      order_store.clone(),
      payment_provider,
      config.mp_webhook_secret.clone(),
    ));
    let maintenance = Arc::new(MaintenanceService::new(
      order_store,
      state_machine.clone(),
      reservations.clone(),
      mailer,
      config.clone(),
    ));

    Self {
      config,
      reservations,
      orders,
      state_machine,
      payment_events,
      maintenance,
    }
  }
}
