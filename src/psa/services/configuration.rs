//! Configuration lookup service
//!
//! Covers the PSA's reference collections: ticket types, statuses,
//! priorities, categories, custom fields, workflows, and templates. All of
//! these share one record shape and the configuration TTL tier.

use std::sync::Arc;

use serde_json::Value;

use crate::cache::{TTL_CONFIGURATION, TTL_SCHEMA};
use crate::psa::client::{ApiError, PsaClient};

use super::{ResourceService, wire_opt_str, wire_str};

/// One PSA reference record (ticket type, status, priority, ...).
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigurationRecord {
    pub id: Option<String>,
    pub name: String,
    pub description: String,
    pub raw: Value,
}

fn transform(record: &Value) -> ConfigurationRecord {
    ConfigurationRecord {
        id: wire_opt_str(record, "id"),
        name: wire_str(record, "name"),
        description: wire_str(record, "description"),
        raw: record.clone(),
    }
}

/// Read access to the PSA's configuration collections.
pub struct ConfigurationService {
    client: Arc<PsaClient>,
}

impl ConfigurationService {
    pub fn new(client: Arc<PsaClient>) -> Self {
        Self { client }
    }

    fn service(&self, endpoint: &'static str, ttl: u64) -> ResourceService<ConfigurationRecord> {
        ResourceService::new(self.client.clone(), endpoint, ttl, transform)
    }

    pub async fn ticket_types(&self) -> Result<Vec<ConfigurationRecord>, ApiError> {
        self.service("ticket-types", TTL_CONFIGURATION).list(&[]).await
    }

    pub async fn ticket_statuses(&self) -> Result<Vec<ConfigurationRecord>, ApiError> {
        self.service("ticket-statuses", TTL_CONFIGURATION)
            .list(&[])
            .await
    }

    pub async fn priorities(&self) -> Result<Vec<ConfigurationRecord>, ApiError> {
        self.service("priorities", TTL_CONFIGURATION).list(&[]).await
    }

    pub async fn categories(&self) -> Result<Vec<ConfigurationRecord>, ApiError> {
        self.service("categories", TTL_CONFIGURATION).list(&[]).await
    }

    /// Custom field definitions change rarely; they use the schema TTL tier.
    pub async fn custom_fields(&self) -> Result<Vec<ConfigurationRecord>, ApiError> {
        self.service("custom-fields", TTL_SCHEMA).list(&[]).await
    }

    pub async fn workflows(&self) -> Result<Vec<ConfigurationRecord>, ApiError> {
        self.service("workflows", TTL_CONFIGURATION).list(&[]).await
    }

    pub async fn email_templates(&self) -> Result<Vec<ConfigurationRecord>, ApiError> {
        self.service("email-templates", TTL_CONFIGURATION)
            .list(&[])
            .await
    }

    pub async fn ticket_templates(&self) -> Result<Vec<ConfigurationRecord>, ApiError> {
        self.service("ticket-templates", TTL_CONFIGURATION)
            .list(&[])
            .await
    }
}
