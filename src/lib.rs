//! Elidune Circulation Desk
//!
//! Session engine behind the circulation desk screens: barcode resolution,
//! action inference, the pending action queue, batch application of desk
//! actions and request validation, served to the staff UI as a JSON API.

use std::sync::Arc;

pub mod api;
pub mod backend;
pub mod config;
pub mod error;
pub mod models;
pub mod services;

pub use config::AppConfig;
pub use error::{DeskError, DeskResult};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub services: Arc<services::Services>,
}
