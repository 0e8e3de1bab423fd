//! Knowledge-base synchronization orchestrator.
//!
//! One run mirrors a user's PSA configuration and reference data into the
//! local knowledge_items table. Each phase runs inside its own failure
//! boundary: a failing phase is recorded on the sync record and the run
//! continues with the remaining phases.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use metrics::counter;
use sea_orm::DatabaseConnection;
use serde_json::{Value, json};
use thiserror::Error;
use uuid::Uuid;

use crate::cache::ResponseCache;
use crate::crypto::CipherKey;
use crate::models::knowledge_item::KnowledgeCategory;
use crate::models::sync_record::SyncStatus;
use crate::psa::client::{ApiError, PsaClient};
use crate::psa::services::PsaServiceSet;
use crate::repositories::knowledge_item::{KnowledgeItemUpdate, NewKnowledgeItem};
use crate::repositories::sync_record::SyncOutcome;
use crate::repositories::{ConnectionRepository, KnowledgeItemRepository, SyncRecordRepository};

/// Source system name stamped on every mirrored knowledge item.
const SOURCE_NAME: &str = "psa";

/// Tunables for a sync run.
#[derive(Debug, Clone)]
pub struct SyncSettings {
    pub http_timeout: Duration,
    /// How many individual client records to mirror beyond the summary.
    pub client_detail_limit: usize,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            http_timeout: Duration::from_secs(30),
            client_detail_limit: 25,
        }
    }
}

/// Fatal errors that abort a sync run as a whole. Per-phase failures are
/// not represented here; they land in the sync record's error list.
#[derive(Debug, Error)]
pub enum SyncRunError {
    #[error("no active PSA connection for user {user_id}")]
    NoActiveConnection { user_id: Uuid },
    #[error("failed to prepare PSA client: {0}")]
    Credential(String),
    #[error("storage error: {0}")]
    Storage(#[from] anyhow::Error),
}

/// Result of a completed sync run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncSummary {
    pub sync_id: Uuid,
    pub status: SyncStatus,
    pub items_added: i32,
    pub items_updated: i32,
    pub items_removed: i32,
    pub error_count: i32,
}

#[derive(Default)]
struct RunCounters {
    added: i32,
    updated: i32,
    errors: Vec<String>,
}

/// One knowledge item produced by a phase, before upsert.
struct ItemSpec {
    category: KnowledgeCategory,
    subcategory: &'static str,
    title: String,
    summary: String,
    source_id: Option<String>,
    content: Value,
}

/// Orchestrates knowledge-base synchronization runs for users.
pub struct KnowledgeSync {
    connections: ConnectionRepository,
    items: KnowledgeItemRepository,
    records: SyncRecordRepository,
    cache: Arc<ResponseCache>,
    settings: SyncSettings,
}

impl KnowledgeSync {
    pub fn new(
        db: Arc<DatabaseConnection>,
        cipher_key: CipherKey,
        cache: Arc<ResponseCache>,
        settings: SyncSettings,
    ) -> Self {
        Self {
            connections: ConnectionRepository::new(db.clone(), cipher_key),
            items: KnowledgeItemRepository::new(db.clone()),
            records: SyncRecordRepository::new(db),
            cache,
            settings,
        }
    }

    /// Runs a full synchronization for one user.
    #[tracing::instrument(skip(self), fields(user_id = %user_id))]
    pub async fn run(&self, user_id: Uuid) -> Result<SyncSummary, SyncRunError> {
        // Resolve the connection before any record is written; a user with
        // no usable connection gets no audit row.
        let connection = self
            .connections
            .find_for_sync(user_id)
            .await?
            .ok_or(SyncRunError::NoActiveConnection { user_id })?;

        let record = self.records.start(user_id).await?;
        tracing::info!(
            sync_id = %record.id,
            connection_id = %connection.id,
            "Starting knowledge sync"
        );

        let client = match self.build_client(&connection) {
            Ok(client) => Arc::new(client),
            Err(err) => {
                let message = err.to_string();
                self.records
                    .finalize(
                        record.id,
                        SyncOutcome {
                            status: SyncStatus::Failed,
                            items_added: 0,
                            items_updated: 0,
                            items_removed: 0,
                            errors: vec![message.clone()],
                        },
                    )
                    .await?;
                return Err(SyncRunError::Credential(message));
            }
        };
        let services = PsaServiceSet::new(client);

        let mut counters = RunCounters::default();

        self.phase_ticket_types(user_id, &services, &mut counters)
            .await;
        self.phase_ticket_statuses(user_id, &services, &mut counters)
            .await;
        self.phase_priorities(user_id, &services, &mut counters)
            .await;
        self.phase_categories(user_id, &services, &mut counters)
            .await;
        self.phase_custom_fields(user_id, &services, &mut counters)
            .await;
        self.phase_workflows(user_id, &services, &mut counters).await;
        self.phase_email_templates(user_id, &services, &mut counters)
            .await;
        self.phase_ticket_templates(user_id, &services, &mut counters)
            .await;
        self.phase_clients(user_id, &services, &mut counters).await;
        self.phase_agents(user_id, &services, &mut counters).await;
        self.phase_teams(user_id, &services, &mut counters).await;

        let status = if counters.errors.is_empty() {
            SyncStatus::Completed
        } else if counters.added + counters.updated > 0 {
            SyncStatus::Partial
        } else {
            SyncStatus::Failed
        };

        let error_count = counters.errors.len() as i32;
        let finalized = self
            .records
            .finalize(
                record.id,
                SyncOutcome {
                    status: status.clone(),
                    items_added: counters.added,
                    items_updated: counters.updated,
                    items_removed: 0,
                    errors: counters.errors,
                },
            )
            .await?;
        self.connections.touch_last_used(connection.id).await?;

        counter!("psa_sync_items_added_total").increment(counters.added as u64);
        counter!("psa_sync_items_updated_total").increment(counters.updated as u64);
        counter!("psa_sync_runs_total").increment(1);

        tracing::info!(
            sync_id = %finalized.id,
            status = ?finalized.status,
            items_added = counters.added,
            items_updated = counters.updated,
            error_count,
            "Knowledge sync finished"
        );

        Ok(SyncSummary {
            sync_id: finalized.id,
            status,
            items_added: counters.added,
            items_updated: counters.updated,
            items_removed: 0,
            error_count,
        })
    }

    fn build_client(
        &self,
        connection: &crate::models::connection::Model,
    ) -> Result<PsaClient, SyncRunError> {
        let credentials = self
            .connections
            .decrypt_credentials(connection)
            .map_err(|e| SyncRunError::Credential(e.to_string()))?;

        PsaClient::new(
            connection.id,
            &connection.base_url,
            credentials,
            self.cache.clone(),
            self.settings.http_timeout,
        )
        .map_err(|e| SyncRunError::Credential(e.to_string()))
    }

    /// Applies one phase's fetch result: upserts on success, records the
    /// error and moves on otherwise.
    async fn apply_phase(
        &self,
        user_id: Uuid,
        phase: &'static str,
        fetched: Result<Vec<ItemSpec>, ApiError>,
        counters: &mut RunCounters,
    ) {
        let items = match fetched {
            Ok(items) => items,
            Err(err) => {
                self.record_phase_error(phase, &err.to_string(), counters);
                return;
            }
        };

        for item in items {
            if let Err(err) = self.upsert(user_id, item, counters).await {
                self.record_phase_error(phase, &err.to_string(), counters);
                return;
            }
        }

        tracing::debug!(phase, "Sync phase completed");
    }

    fn record_phase_error(&self, phase: &'static str, message: &str, counters: &mut RunCounters) {
        tracing::warn!(phase, error = message, "Sync phase failed");
        counter!("psa_sync_phase_errors_total", "phase" => phase).increment(1);
        counters.errors.push(format!("{phase}: {message}"));
    }

    /// Idempotent upsert. Items carrying a source ID are matched on
    /// (user, category, source_id); aggregate items without one are matched
    /// on title within their category.
    async fn upsert(&self, user_id: Uuid, item: ItemSpec, counters: &mut RunCounters) -> Result<()> {
        let existing = match item.source_id {
            Some(ref source_id) => {
                self.items
                    .find_by_source(user_id, item.category.clone(), source_id)
                    .await?
            }
            None => {
                self.items
                    .find_by_title(user_id, item.category.clone(), &item.title)
                    .await?
            }
        };

        match existing {
            Some(model) => {
                self.items
                    .update_content(
                        model.id,
                        KnowledgeItemUpdate {
                            title: item.title,
                            subcategory: item.subcategory.to_string(),
                            content: item.content,
                            summary: item.summary,
                            source_name: Some(SOURCE_NAME.to_string()),
                        },
                    )
                    .await?;
                counters.updated += 1;
            }
            None => {
                self.items
                    .insert(NewKnowledgeItem {
                        user_id,
                        category: item.category,
                        subcategory: item.subcategory.to_string(),
                        title: item.title,
                        content: item.content,
                        summary: item.summary,
                        source_id: item.source_id,
                        source_name: Some(SOURCE_NAME.to_string()),
                    })
                    .await?;
                counters.added += 1;
            }
        }

        Ok(())
    }

    async fn phase_ticket_types(
        &self,
        user_id: Uuid,
        services: &PsaServiceSet,
        counters: &mut RunCounters,
    ) {
        let fetched = services.configuration.ticket_types().await.map(|records| {
            records
                .into_iter()
                .map(|r| configuration_item(r, KnowledgeCategory::Configuration, "ticket_types"))
                .collect()
        });
        self.apply_phase(user_id, "ticket_types", fetched, counters)
            .await;
    }

    async fn phase_ticket_statuses(
        &self,
        user_id: Uuid,
        services: &PsaServiceSet,
        counters: &mut RunCounters,
    ) {
        let fetched = services
            .configuration
            .ticket_statuses()
            .await
            .map(|records| {
                records
                    .into_iter()
                    .map(|r| {
                        configuration_item(r, KnowledgeCategory::Configuration, "ticket_statuses")
                    })
                    .collect()
            });
        self.apply_phase(user_id, "ticket_statuses", fetched, counters)
            .await;
    }

    async fn phase_priorities(
        &self,
        user_id: Uuid,
        services: &PsaServiceSet,
        counters: &mut RunCounters,
    ) {
        let fetched = services.configuration.priorities().await.map(|records| {
            records
                .into_iter()
                .map(|r| configuration_item(r, KnowledgeCategory::Configuration, "priorities"))
                .collect()
        });
        self.apply_phase(user_id, "priorities", fetched, counters)
            .await;
    }

    async fn phase_categories(
        &self,
        user_id: Uuid,
        services: &PsaServiceSet,
        counters: &mut RunCounters,
    ) {
        let fetched = services.configuration.categories().await.map(|records| {
            records
                .into_iter()
                .map(|r| configuration_item(r, KnowledgeCategory::Configuration, "categories"))
                .collect()
        });
        self.apply_phase(user_id, "categories", fetched, counters)
            .await;
    }

    async fn phase_custom_fields(
        &self,
        user_id: Uuid,
        services: &PsaServiceSet,
        counters: &mut RunCounters,
    ) {
        let fetched = services.configuration.custom_fields().await.map(|records| {
            records
                .into_iter()
                .map(|r| configuration_item(r, KnowledgeCategory::CustomFields, "custom_fields"))
                .collect()
        });
        self.apply_phase(user_id, "custom_fields", fetched, counters)
            .await;
    }

    async fn phase_workflows(
        &self,
        user_id: Uuid,
        services: &PsaServiceSet,
        counters: &mut RunCounters,
    ) {
        let fetched = services.configuration.workflows().await.map(|records| {
            records
                .into_iter()
                .map(|r| configuration_item(r, KnowledgeCategory::Workflows, "workflows"))
                .collect()
        });
        self.apply_phase(user_id, "workflows", fetched, counters)
            .await;
    }

    async fn phase_email_templates(
        &self,
        user_id: Uuid,
        services: &PsaServiceSet,
        counters: &mut RunCounters,
    ) {
        let fetched = services
            .configuration
            .email_templates()
            .await
            .map(|records| {
                records
                    .into_iter()
                    .map(|r| configuration_item(r, KnowledgeCategory::Templates, "email_templates"))
                    .collect()
            });
        self.apply_phase(user_id, "email_templates", fetched, counters)
            .await;
    }

    async fn phase_ticket_templates(
        &self,
        user_id: Uuid,
        services: &PsaServiceSet,
        counters: &mut RunCounters,
    ) {
        let fetched = services
            .configuration
            .ticket_templates()
            .await
            .map(|records| {
                records
                    .into_iter()
                    .map(|r| {
                        configuration_item(r, KnowledgeCategory::Templates, "ticket_templates")
                    })
                    .collect()
            });
        self.apply_phase(user_id, "ticket_templates", fetched, counters)
            .await;
    }

    /// Clients phase: an aggregate summary item (no source ID) plus the
    /// top-N individual client records.
    async fn phase_clients(
        &self,
        user_id: Uuid,
        services: &PsaServiceSet,
        counters: &mut RunCounters,
    ) {
        let limit = self.settings.client_detail_limit;
        let fetched = match services.clients.list_active().await {
            // The list call is cached, so the top-N call costs no extra trip.
            Ok(active) => match services.clients.top_clients(limit).await {
                Ok(top) => {
                    let mut items = vec![ItemSpec {
                        category: KnowledgeCategory::Clients,
                        subcategory: "summary",
                        title: "Client Overview".to_string(),
                        summary: format!("{} active clients", active.len()),
                        source_id: None,
                        content: json!({
                            "active_count": active.len(),
                            "top_clients": top
                                .iter()
                                .map(|c| json!({"id": c.id, "name": c.name}))
                                .collect::<Vec<_>>(),
                        }),
                    }];

                    items.extend(top.into_iter().map(|c| ItemSpec {
                        category: KnowledgeCategory::Clients,
                        subcategory: "clients",
                        summary: format!(
                            "Client {} ({} open tickets)",
                            c.name, c.open_tickets
                        ),
                        title: c.name,
                        source_id: c.id,
                        content: c.raw,
                    }));
                    Ok(items)
                }
                Err(err) => Err(err),
            },
            Err(err) => Err(err),
        };
        self.apply_phase(user_id, "clients", fetched, counters)
            .await;
    }

    async fn phase_agents(
        &self,
        user_id: Uuid,
        services: &PsaServiceSet,
        counters: &mut RunCounters,
    ) {
        let fetched = services.agents.list_agents().await.map(|agents| {
            agents
                .into_iter()
                .map(|a| ItemSpec {
                    category: KnowledgeCategory::Agents,
                    subcategory: "agents",
                    summary: if a.team.is_empty() {
                        format!("Agent {}", a.name)
                    } else {
                        format!("Agent {} ({})", a.name, a.team)
                    },
                    title: a.name,
                    source_id: a.id,
                    content: a.raw,
                })
                .collect()
        });
        self.apply_phase(user_id, "agents", fetched, counters).await;
    }

    async fn phase_teams(
        &self,
        user_id: Uuid,
        services: &PsaServiceSet,
        counters: &mut RunCounters,
    ) {
        let fetched = services.agents.list_teams().await.map(|teams| {
            teams
                .into_iter()
                .map(|t| ItemSpec {
                    category: KnowledgeCategory::Agents,
                    subcategory: "teams",
                    summary: if t.description.is_empty() {
                        format!("Team {}", t.name)
                    } else {
                        t.description.clone()
                    },
                    title: t.name,
                    source_id: t.id,
                    content: t.raw,
                })
                .collect()
        });
        self.apply_phase(user_id, "teams", fetched, counters).await;
    }
}

fn configuration_item(
    record: crate::psa::services::configuration::ConfigurationRecord,
    category: KnowledgeCategory,
    subcategory: &'static str,
) -> ItemSpec {
    ItemSpec {
        category,
        subcategory,
        summary: if record.description.is_empty() {
            record.name.clone()
        } else {
            record.description.clone()
        },
        title: record.name,
        source_id: record.id,
        content: record.raw,
    }
}

/// Outcome of a connection test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestOutcome {
    pub success: bool,
    pub message: String,
}

/// Verifies that a connection's stored credentials can authenticate, and
/// persists the outcome on the connection.
pub struct ConnectionTester {
    connections: ConnectionRepository,
    cache: Arc<ResponseCache>,
    settings: SyncSettings,
}

impl ConnectionTester {
    pub fn new(
        db: Arc<DatabaseConnection>,
        cipher_key: CipherKey,
        cache: Arc<ResponseCache>,
        settings: SyncSettings,
    ) -> Self {
        Self {
            connections: ConnectionRepository::new(db, cipher_key),
            cache,
            settings,
        }
    }

    #[tracing::instrument(skip(self), fields(connection_id = %connection_id))]
    pub async fn test(&self, connection_id: Uuid) -> Result<TestOutcome> {
        let connection = self
            .connections
            .get_by_id(connection_id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Connection '{}' not found", connection_id))?;

        let outcome = match self.attempt(&connection).await {
            Ok(()) => TestOutcome {
                success: true,
                message: "Authentication succeeded".to_string(),
            },
            Err(message) => TestOutcome {
                success: false,
                message,
            },
        };

        self.connections
            .record_test_result(connection_id, outcome.success, &outcome.message)
            .await?;

        Ok(outcome)
    }

    async fn attempt(&self, connection: &crate::models::connection::Model) -> Result<(), String> {
        let credentials = self
            .connections
            .decrypt_credentials(connection)
            .map_err(|e| e.to_string())?;

        let client = PsaClient::new(
            connection.id,
            &connection.base_url,
            credentials,
            self.cache.clone(),
            self.settings.http_timeout,
        )
        .map_err(|e| e.to_string())?;

        client.verify_credentials().await.map_err(|e| e.to_string())
    }
}
