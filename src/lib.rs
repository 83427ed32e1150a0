//! Library entrypoint for pricewatch.
//!
//! The binary only wires things together; integration tests under `tests/`
//! import the store, the monitor and the router from here.

use std::sync::Arc;

pub mod config;
pub mod error;
pub mod models;
pub mod telemetry;

pub mod services;

pub mod controllers;
pub mod routes;

#[derive(Clone)]
pub struct AppState {
    pub settings: config::Settings,
    pub store: Arc<services::watchlist_store::WatchlistStore>,
}
