//! Agent and team service

use std::sync::Arc;

use serde_json::Value;

use crate::cache::TTL_LOOKUP;
use crate::psa::client::{ApiError, PsaClient};

use super::{ResourceService, wire_bool, wire_opt_str, wire_str};

/// A PSA support agent.
#[derive(Debug, Clone, PartialEq)]
pub struct Agent {
    pub id: Option<String>,
    pub name: String,
    pub email: String,
    pub team: String,
    pub is_active: bool,
    pub raw: Value,
}

/// A PSA support team.
#[derive(Debug, Clone, PartialEq)]
pub struct Team {
    pub id: Option<String>,
    pub name: String,
    pub description: String,
    pub raw: Value,
}

fn transform_agent(record: &Value) -> Agent {
    Agent {
        id: wire_opt_str(record, "id"),
        name: wire_str(record, "name"),
        email: wire_str(record, "email"),
        team: wire_str(record, "team"),
        is_active: wire_bool(record, "is_active"),
        raw: record.clone(),
    }
}

fn transform_team(record: &Value) -> Team {
    Team {
        id: wire_opt_str(record, "id"),
        name: wire_str(record, "name"),
        description: wire_str(record, "description"),
        raw: record.clone(),
    }
}

/// Read access to PSA agents and teams.
pub struct AgentService {
    agents: ResourceService<Agent>,
    teams: ResourceService<Team>,
}

impl AgentService {
    pub fn new(client: Arc<PsaClient>) -> Self {
        Self {
            agents: ResourceService::new(client.clone(), "agents", TTL_LOOKUP, transform_agent),
            teams: ResourceService::new(client, "teams", TTL_LOOKUP, transform_team),
        }
    }

    pub async fn list_agents(&self) -> Result<Vec<Agent>, ApiError> {
        self.agents.list(&[]).await
    }

    pub async fn active_agents(&self) -> Result<Vec<Agent>, ApiError> {
        let all = self.list_agents().await?;
        Ok(all.into_iter().filter(|a| a.is_active).collect())
    }

    pub async fn list_teams(&self) -> Result<Vec<Team>, ApiError> {
        self.teams.list(&[]).await
    }
}
