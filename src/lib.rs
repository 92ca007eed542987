//! LabTrack Equipment Tracking System
//!
//! A Rust server for tracking lab equipment through a checkout/return
//! lifecycle, providing a REST JSON API over an equipment store and a
//! tamper-evident checkout ledger.

use std::sync::Arc;

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod repository;
pub mod services;

pub use config::AppConfig;
pub use error::{AppError, AppResult};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub services: Arc<services::Services>,
}
