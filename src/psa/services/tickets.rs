//! Ticket service

use std::sync::Arc;

use serde_json::Value;

use crate::cache::TTL_TICKETS;
use crate::psa::client::{ApiError, PsaClient};

use super::{ResourceService, wire_opt_str, wire_str};

/// Tickets are listed in smaller pages than the reference collections.
const TICKET_PAGE_SIZE: u64 = 50;

/// A PSA ticket in the fields the sync and reporting paths care about.
#[derive(Debug, Clone, PartialEq)]
pub struct Ticket {
    pub id: Option<String>,
    pub subject: String,
    pub status: String,
    pub priority: String,
    pub team: String,
    pub client_id: Option<String>,
    pub raw: Value,
}

fn transform(record: &Value) -> Ticket {
    Ticket {
        id: wire_opt_str(record, "id"),
        subject: wire_str(record, "subject"),
        status: wire_str(record, "status"),
        priority: wire_str(record, "priority"),
        team: wire_str(record, "team"),
        client_id: wire_opt_str(record, "client_id"),
        raw: record.clone(),
    }
}

/// Read/write access to PSA tickets.
pub struct TicketService {
    inner: ResourceService<Ticket>,
}

impl TicketService {
    pub fn new(client: Arc<PsaClient>) -> Self {
        Self {
            inner: ResourceService::new(client, "tickets", TTL_TICKETS, transform)
                .with_page_size(TICKET_PAGE_SIZE),
        }
    }

    pub async fn list(&self, params: &[(String, String)]) -> Result<Vec<Ticket>, ApiError> {
        self.inner.list(params).await
    }

    pub async fn get(&self, id: &str) -> Result<Ticket, ApiError> {
        self.inner.get(id).await
    }

    pub async fn create_ticket(&self, record: Value) -> Result<Ticket, ApiError> {
        self.inner.create(record).await
    }

    pub async fn update_ticket(&self, record: Value) -> Result<Ticket, ApiError> {
        self.inner.update(record).await
    }

    pub async fn list_by_team(&self, team: &str) -> Result<Vec<Ticket>, ApiError> {
        self.list(&[("team".to_string(), team.to_string())]).await
    }

    pub async fn list_open(&self) -> Result<Vec<Ticket>, ApiError> {
        self.list(&[("status".to_string(), "open".to_string())])
            .await
    }
}
