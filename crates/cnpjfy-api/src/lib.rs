//! Client for the public CNPJ lookup API.

mod config;
pub use config::{ApiConfig, DEFAULT_BASE_URL};

mod client;
pub use client::{ApiClient, ApiError, ApiInfo};
