//! PSA API integration: HTTP client and typed resource services.

pub mod client;
pub mod services;

pub use client::{ApiError, PsaClient, PsaCredentials};
