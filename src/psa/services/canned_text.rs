//! Canned text service
//!
//! Canned responses exist at three visibility scopes. The merged view pulls
//! all three and de-duplicates by record ID, keeping the widest scope when
//! the same snippet appears more than once.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;

use crate::cache::TTL_LOOKUP;
use crate::psa::client::{ApiError, PsaClient};

use super::{ResourceService, wire_opt_str, wire_str};

/// Visibility scope of a canned text snippet, widest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Scope {
    Agent,
    Team,
    Global,
}

impl Scope {
    /// Parses a wire scope string. Unrecognized values degrade to the
    /// narrowest scope rather than erroring.
    pub fn parse(value: &str) -> Self {
        match value.to_ascii_lowercase().as_str() {
            "global" => Scope::Global,
            "team" => Scope::Team,
            _ => Scope::Agent,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Scope::Global => "global",
            Scope::Team => "team",
            Scope::Agent => "agent",
        }
    }
}

/// A canned text snippet.
#[derive(Debug, Clone, PartialEq)]
pub struct CannedText {
    pub id: Option<String>,
    pub title: String,
    pub content: String,
    pub scope: Scope,
    pub raw: Value,
}

fn transform(record: &Value) -> CannedText {
    CannedText {
        id: wire_opt_str(record, "id"),
        title: wire_str(record, "title"),
        content: wire_str(record, "content"),
        scope: Scope::parse(&wire_str(record, "scope")),
        raw: record.clone(),
    }
}

/// Read access to canned text snippets across scopes.
pub struct CannedTextService {
    inner: ResourceService<CannedText>,
}

impl CannedTextService {
    pub fn new(client: Arc<PsaClient>) -> Self {
        Self {
            inner: ResourceService::new(client, "canned-text", TTL_LOOKUP, transform),
        }
    }

    /// Lists snippets visible at one scope.
    pub async fn list_for_scope(
        &self,
        scope: Scope,
        owner: Option<&str>,
    ) -> Result<Vec<CannedText>, ApiError> {
        let mut params = vec![("scope".to_string(), scope.as_str().to_string())];
        if let Some(owner) = owner {
            params.push(("owner".to_string(), owner.to_string()));
        }
        self.inner.list(&params).await
    }

    /// The full snippet set visible to one agent: global, the agent's team,
    /// and the agent's own snippets, de-duplicated by ID with the widest
    /// scope winning.
    pub async fn merged(&self, agent_id: &str, team: &str) -> Result<Vec<CannedText>, ApiError> {
        let global = self.list_for_scope(Scope::Global, None).await?;
        let team_scoped = self.list_for_scope(Scope::Team, Some(team)).await?;
        let agent_scoped = self.list_for_scope(Scope::Agent, Some(agent_id)).await?;

        let mut combined = agent_scoped;
        combined.extend(team_scoped);
        combined.extend(global);
        Ok(merge_by_precedence(combined))
    }
}

/// De-duplicates snippets by ID, keeping the entry with the widest scope.
/// Snippets without an ID cannot collide and are kept as-is.
fn merge_by_precedence(snippets: Vec<CannedText>) -> Vec<CannedText> {
    let mut by_id: HashMap<String, usize> = HashMap::new();
    let mut merged: Vec<CannedText> = Vec::new();

    for snippet in snippets {
        match snippet.id.clone() {
            Some(id) => match by_id.get(&id) {
                Some(&index) => {
                    if snippet.scope > merged[index].scope {
                        merged[index] = snippet;
                    }
                }
                None => {
                    by_id.insert(id, merged.len());
                    merged.push(snippet);
                }
            },
            None => merged.push(snippet),
        }
    }

    merged
}
