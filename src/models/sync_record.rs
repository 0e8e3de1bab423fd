//! Sync record entity model
//!
//! This module contains the SeaORM entity model for the sync_records table,
//! which tracks one row per knowledge synchronization run.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;
use serde_json::Value as JsonValue;
use uuid::Uuid;

/// Lifecycle status of a synchronization run
#[derive(Clone, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "Text")]
pub enum SyncStatus {
    #[sea_orm(string_value = "in_progress")]
    InProgress,
    #[sea_orm(string_value = "completed")]
    Completed,
    #[sea_orm(string_value = "partial")]
    Partial,
    #[sea_orm(string_value = "failed")]
    Failed,
}

/// Sync record entity representing one synchronization run
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "sync_records")]
pub struct Model {
    /// Unique identifier for the sync run (primary key)
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// User the run was executed for
    pub user_id: Uuid,

    /// Current lifecycle status of the run
    pub status: SyncStatus,

    /// Number of knowledge items inserted by this run
    pub items_added: i32,

    /// Number of knowledge items updated by this run
    pub items_updated: i32,

    /// Number of knowledge items removed by this run
    pub items_removed: i32,

    /// Number of phases that failed during this run
    pub error_count: i32,

    /// Phase error messages accumulated while the run was in flight
    #[sea_orm(column_type = "JsonBinary")]
    pub errors: Option<JsonValue>,

    /// Timestamp when the run started
    pub started_at: DateTimeWithTimeZone,

    /// Timestamp when the run finished (None while in progress)
    pub completed_at: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
