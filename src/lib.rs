// src/lib.rs

//! Order lifecycle and inventory reservation engine for the storefront
//! backend. The hard guarantee lives here: a product can never be oversold
//! while checkout, asynchronous payment confirmation, and time-based
//! expiration race against each other.

pub mod config;
pub mod db;
pub mod errors;
pub mod models;
pub mod services;
pub mod state;
pub mod web;
