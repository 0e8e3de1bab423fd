//! Sync record repository for database operations

use anyhow::{Result, anyhow};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::models::sync_record::{self, Entity as SyncRecord, SyncStatus};

/// Final counters and errors for a completed sync run.
#[derive(Debug, Clone)]
pub struct SyncOutcome {
    pub status: SyncStatus,
    pub items_added: i32,
    pub items_updated: i32,
    pub items_removed: i32,
    pub errors: Vec<String>,
}

/// Repository for sync record database operations
#[derive(Debug, Clone)]
pub struct SyncRecordRepository {
    /// Database connection pool
    pub db: Arc<DatabaseConnection>,
}

impl SyncRecordRepository {
    /// Creates a new SyncRecordRepository instance
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Creates an in-progress sync record for a new run
    pub async fn start(&self, user_id: Uuid) -> Result<sync_record::Model> {
        let id = Uuid::new_v4();
        let active = sync_record::ActiveModel {
            id: Set(id),
            user_id: Set(user_id),
            status: Set(SyncStatus::InProgress),
            items_added: Set(0),
            items_updated: Set(0),
            items_removed: Set(0),
            error_count: Set(0),
            errors: Set(None),
            started_at: Set(Utc::now().into()),
            completed_at: Set(None),
        };
        active.insert(&*self.db).await?;

        let fetched = SyncRecord::find_by_id(id).one(&*self.db).await?;
        fetched.ok_or_else(|| anyhow!("sync record not persisted"))
    }

    /// Writes the final status and counters for a run.
    ///
    /// A record is finalized at most once; a second call for the same run
    /// is rejected.
    pub async fn finalize(&self, id: Uuid, outcome: SyncOutcome) -> Result<sync_record::Model> {
        let existing = SyncRecord::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| anyhow!("Sync record '{}' not found", id))?;

        if existing.completed_at.is_some() {
            return Err(anyhow!("Sync record '{}' is already finalized", id));
        }

        let mut model: sync_record::ActiveModel = existing.into();
        model.status = Set(outcome.status);
        model.items_added = Set(outcome.items_added);
        model.items_updated = Set(outcome.items_updated);
        model.items_removed = Set(outcome.items_removed);
        model.error_count = Set(outcome.errors.len() as i32);
        model.errors = Set(if outcome.errors.is_empty() {
            None
        } else {
            Some(serde_json::json!(outcome.errors))
        });
        model.completed_at = Set(Some(Utc::now().into()));

        Ok(model.update(&*self.db).await?)
    }

    /// Finds a sync record by ID
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<sync_record::Model>> {
        Ok(SyncRecord::find_by_id(id).one(&*self.db).await?)
    }

    /// Lists a user's sync records, most recent first
    pub async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<sync_record::Model>> {
        Ok(SyncRecord::find()
            .filter(sync_record::Column::UserId.eq(user_id))
            .order_by_desc(sync_record::Column::StartedAt)
            .all(&*self.db)
            .await?)
    }
}
