//! PSA connection management and knowledge-base synchronization.
//!
//! This crate stores per-user PSA connections with encrypted OAuth client
//! credentials, exposes typed services over the PSA REST API, and mirrors
//! the PSA's configuration and reference data into a local knowledge base.

pub mod cache;
pub mod config;
pub mod crypto;
pub mod db;
pub mod models;
pub mod psa;
pub mod repositories;
pub mod sync;
pub mod telemetry;
