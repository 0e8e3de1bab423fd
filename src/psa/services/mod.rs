//! Typed resource services over the raw PSA API client.
//!
//! Each concrete service wraps a [`ResourceService`] configured with an
//! endpoint, a cache TTL tier, and a pure transform from wire JSON to a
//! domain type. The transforms are total: every field they read has an
//! explicit default, so malformed wire records degrade to defaults instead
//! of failing the call.

pub mod agents;
pub mod assets;
pub mod canned_text;
pub mod clients;
pub mod configuration;
pub mod reports;
pub mod tickets;

use std::sync::Arc;

use serde_json::Value;

use crate::psa::client::{ApiError, PsaClient};

pub use agents::AgentService;
pub use assets::AssetService;
pub use canned_text::CannedTextService;
pub use clients::ClientService;
pub use configuration::ConfigurationService;
pub use reports::ReportService;
pub use tickets::TicketService;

/// Page size sent with list calls when neither the service nor the caller
/// overrides it.
const DEFAULT_PAGE_SIZE: u64 = 100;

/// Generic read/write access to one PSA collection endpoint.
///
/// Writes follow the PSA bulk-array convention: the request body is always a
/// one-element array and the first element of the response array is returned.
pub struct ResourceService<D> {
    client: Arc<PsaClient>,
    endpoint: &'static str,
    ttl_seconds: u64,
    page_size: u64,
    transform: fn(&Value) -> D,
}

impl<D> ResourceService<D> {
    pub fn new(
        client: Arc<PsaClient>,
        endpoint: &'static str,
        ttl_seconds: u64,
        transform: fn(&Value) -> D,
    ) -> Self {
        Self {
            client,
            endpoint,
            ttl_seconds,
            page_size: DEFAULT_PAGE_SIZE,
            transform,
        }
    }

    /// Overrides the page size this endpoint family lists with.
    pub fn with_page_size(mut self, page_size: u64) -> Self {
        self.page_size = page_size;
        self
    }

    /// Lists records, transforming each wire record into the domain type.
    ///
    /// The service's page size is appended to the query unless the caller
    /// already supplied one.
    pub async fn list(&self, params: &[(String, String)]) -> Result<Vec<D>, ApiError> {
        let mut query = params.to_vec();
        if !query.iter().any(|(key, _)| key == "page_size") {
            query.push(("page_size".to_string(), self.page_size.to_string()));
        }
        let payload = self
            .client
            .get_cached(self.endpoint, &query, self.ttl_seconds)
            .await?;
        Ok(extract_records(&payload)
            .iter()
            .map(|record| (self.transform)(record))
            .collect())
    }

    /// Fetches a single record by ID.
    pub async fn get(&self, id: &str) -> Result<D, ApiError> {
        let endpoint = format!("{}/{}", self.endpoint, id);
        let payload = self
            .client
            .get_cached(&endpoint, &[], self.ttl_seconds)
            .await?;

        match first_record(&payload) {
            Some(record) => Ok((self.transform)(record)),
            None => Err(ApiError::NotFound {
                resource: endpoint,
            }),
        }
    }

    /// Creates a record; the single-record body is wrapped into the bulk
    /// array on the wire.
    pub async fn create(&self, record: Value) -> Result<D, ApiError> {
        self.write(record).await
    }

    /// Updates a record using the same bulk-array write convention.
    pub async fn update(&self, record: Value) -> Result<D, ApiError> {
        self.write(record).await
    }

    async fn write(&self, record: Value) -> Result<D, ApiError> {
        let body = Value::Array(vec![record]);
        let payload = self.client.post(self.endpoint, &body).await?;

        match extract_records(&payload).first() {
            Some(record) => Ok((self.transform)(record)),
            None => Err(ApiError::WriteFailed {
                endpoint: self.endpoint.to_string(),
            }),
        }
    }
}

/// Extracts the record array from a wire payload, accepting both the bare
/// array shape and the `{"records": [...]}` envelope.
pub(crate) fn extract_records(payload: &Value) -> Vec<Value> {
    match payload {
        Value::Array(items) => items.clone(),
        Value::Object(map) => match map.get("records") {
            Some(Value::Array(items)) => items.clone(),
            _ => Vec::new(),
        },
        _ => Vec::new(),
    }
}

/// Extracts a single record from a wire payload: a bare object, the first
/// element of an array, or the first element of a `{"records": [...]}`
/// envelope.
pub(crate) fn first_record(payload: &Value) -> Option<&Value> {
    match payload {
        Value::Object(map) if !map.contains_key("records") => Some(payload),
        Value::Array(items) => items.first(),
        Value::Object(map) => match map.get("records") {
            Some(Value::Array(items)) => items.first(),
            _ => None,
        },
        _ => None,
    }
}

/// Reads a string field, defaulting to empty on absence or wrong type.
pub(crate) fn wire_str(record: &Value, key: &str) -> String {
    record
        .get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

/// Reads an optional string field, treating empty strings as absent.
pub(crate) fn wire_opt_str(record: &Value, key: &str) -> Option<String> {
    record
        .get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Reads a boolean field, defaulting to false.
pub(crate) fn wire_bool(record: &Value, key: &str) -> bool {
    record.get(key).and_then(Value::as_bool).unwrap_or(false)
}

/// Reads an integer field, defaulting to zero.
pub(crate) fn wire_i64(record: &Value, key: &str) -> i64 {
    record.get(key).and_then(Value::as_i64).unwrap_or(0)
}

/// Bundle of every resource service, built once per sync run.
pub struct PsaServiceSet {
    pub configuration: ConfigurationService,
    pub tickets: TicketService,
    pub clients: ClientService,
    pub agents: AgentService,
    pub assets: AssetService,
    pub reports: ReportService,
    pub canned_text: CannedTextService,
}

impl PsaServiceSet {
    pub fn new(client: Arc<PsaClient>) -> Self {
        Self {
            configuration: ConfigurationService::new(client.clone()),
            tickets: TicketService::new(client.clone()),
            clients: ClientService::new(client.clone()),
            agents: AgentService::new(client.clone()),
            assets: AssetService::new(client.clone()),
            reports: ReportService::new(client.clone()),
            canned_text: CannedTextService::new(client),
        }
    }
}
