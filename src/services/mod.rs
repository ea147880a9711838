// src/services/mod.rs

//! Business services. Each one is explicitly constructed with its store and
//! collaborator handles; nothing in here reaches for module-level state.

pub mod email;
pub mod maintenance;
pub mod mercado_pago;
pub mod orders;
pub mod payment_events;
pub mod reservations;
pub mod status;

pub use email::{Mailer, RecordingMailer, SentEmailInfo};
pub use maintenance::{MaintenanceService, MaintenanceSummary};
pub use mercado_pago::{MercadoPagoClient, MockPaymentProvider, PaymentDetails, PaymentProvider};
pub use orders::{OrderService, PlaceOrderItem, PlaceOrderRequest};
pub use payment_events::{PaymentEventProcessor, PaymentNotification, WebhookSignature};
pub use reservations::ReservationManager;
pub use status::{is_legal_transition, OrderStateMachine};
