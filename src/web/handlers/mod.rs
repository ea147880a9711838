// src/web/handlers/mod.rs

pub mod maintenance_handlers;
pub mod order_handlers;
pub mod reservation_handlers;
pub mod webhook_handlers;
