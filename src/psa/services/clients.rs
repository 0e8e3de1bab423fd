//! Client (customer account) service

use std::sync::Arc;

use serde_json::Value;

use crate::cache::TTL_LOOKUP;
use crate::psa::client::{ApiError, PsaClient};

use super::{ResourceService, wire_bool, wire_i64, wire_opt_str, wire_str};

/// A PSA client account.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientAccount {
    pub id: Option<String>,
    pub name: String,
    pub is_active: bool,
    pub open_tickets: i64,
    pub raw: Value,
}

fn transform(record: &Value) -> ClientAccount {
    ClientAccount {
        id: wire_opt_str(record, "id"),
        name: wire_str(record, "name"),
        is_active: wire_bool(record, "is_active"),
        open_tickets: wire_i64(record, "open_tickets"),
        raw: record.clone(),
    }
}

/// Read access to PSA client accounts.
pub struct ClientService {
    inner: ResourceService<ClientAccount>,
}

impl ClientService {
    pub fn new(client: Arc<PsaClient>) -> Self {
        Self {
            inner: ResourceService::new(client, "clients", TTL_LOOKUP, transform),
        }
    }

    pub async fn get(&self, id: &str) -> Result<ClientAccount, ApiError> {
        self.inner.get(id).await
    }

    pub async fn list_active(&self) -> Result<Vec<ClientAccount>, ApiError> {
        let all = self.inner.list(&[]).await?;
        Ok(all.into_iter().filter(|c| c.is_active).collect())
    }

    /// The `n` active clients with the most open tickets.
    pub async fn top_clients(&self, n: usize) -> Result<Vec<ClientAccount>, ApiError> {
        let mut active = self.list_active().await?;
        active.sort_by(|a, b| b.open_tickets.cmp(&a.open_tickets));
        active.truncate(n);
        Ok(active)
    }
}
