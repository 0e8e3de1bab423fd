//! Report service

use std::sync::Arc;

use serde_json::Value;

use crate::cache::TTL_REPORTS;
use crate::psa::client::{ApiError, PsaClient};

use super::{ResourceService, wire_opt_str, wire_str};

/// A saved PSA report definition.
#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    pub id: Option<String>,
    pub name: String,
    pub description: String,
    pub raw: Value,
}

fn transform(record: &Value) -> Report {
    Report {
        id: wire_opt_str(record, "id"),
        name: wire_str(record, "name"),
        description: wire_str(record, "description"),
        raw: record.clone(),
    }
}

/// Read access to saved PSA reports.
pub struct ReportService {
    inner: ResourceService<Report>,
}

impl ReportService {
    pub fn new(client: Arc<PsaClient>) -> Self {
        Self {
            inner: ResourceService::new(client, "reports", TTL_REPORTS, transform),
        }
    }

    pub async fn list_reports(&self) -> Result<Vec<Report>, ApiError> {
        self.inner.list(&[]).await
    }
}
