//! Client for the Vibe Kanban task API.
//!
//! Every endpoint answers with an `{success, data, error_data, message}`
//! envelope; [`TaskApiClient`] unwraps it and turns failures into [`ApiError`].

mod client;
mod config;
mod error;
pub mod types;

pub use client::TaskApiClient;
pub use config::{ApiConfig, API_TIMEOUT_ENV, API_URL_ENV, DEFAULT_BASE_URL, DEFAULT_TIMEOUT};
pub use error::ApiError;
pub use types::*;
