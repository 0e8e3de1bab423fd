//! Asset service

use std::sync::Arc;

use serde_json::Value;

use crate::cache::TTL_LOOKUP;
use crate::psa::client::{ApiError, PsaClient};

use super::{ResourceService, wire_opt_str, wire_str};

/// A PSA tracked asset.
#[derive(Debug, Clone, PartialEq)]
pub struct Asset {
    pub id: Option<String>,
    pub name: String,
    pub asset_type: String,
    pub client_id: Option<String>,
    pub raw: Value,
}

fn transform(record: &Value) -> Asset {
    Asset {
        id: wire_opt_str(record, "id"),
        name: wire_str(record, "name"),
        asset_type: wire_str(record, "asset_type"),
        client_id: wire_opt_str(record, "client_id"),
        raw: record.clone(),
    }
}

/// Read access to PSA assets.
pub struct AssetService {
    inner: ResourceService<Asset>,
}

impl AssetService {
    pub fn new(client: Arc<PsaClient>) -> Self {
        Self {
            inner: ResourceService::new(client, "assets", TTL_LOOKUP, transform),
        }
    }

    pub async fn list(&self, params: &[(String, String)]) -> Result<Vec<Asset>, ApiError> {
        self.inner.list(params).await
    }

    pub async fn get(&self, id: &str) -> Result<Asset, ApiError> {
        self.inner.get(id).await
    }

    pub async fn list_by_client(&self, client_id: &str) -> Result<Vec<Asset>, ApiError> {
        self.list(&[("client_id".to_string(), client_id.to_string())])
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_transform_defaults() {
        let out = transform(&json!({"name": "laptop-042"}));
        assert_eq!(out.name, "laptop-042");
        assert_eq!(out.asset_type, "");
        assert_eq!(out.client_id, None);
    }
}
