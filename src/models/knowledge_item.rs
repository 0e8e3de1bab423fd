//! Knowledge item entity model
//!
//! This module contains the SeaORM entity model for the knowledge_items
//! table, a locally mirrored copy of PSA configuration and reference data.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;
use serde_json::Value as JsonValue;
use uuid::Uuid;

/// High-level grouping of mirrored knowledge items
#[derive(Clone, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "Text")]
pub enum KnowledgeCategory {
    #[sea_orm(string_value = "configuration")]
    Configuration,
    #[sea_orm(string_value = "custom_fields")]
    CustomFields,
    #[sea_orm(string_value = "workflows")]
    Workflows,
    #[sea_orm(string_value = "templates")]
    Templates,
    #[sea_orm(string_value = "clients")]
    Clients,
    #[sea_orm(string_value = "agents")]
    Agents,
}

/// Knowledge item entity representing one mirrored PSA record
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "knowledge_items")]
pub struct Model {
    /// Unique identifier for the knowledge item (primary key)
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Owning user
    pub user_id: Uuid,

    /// High-level category the item belongs to
    pub category: KnowledgeCategory,

    /// Finer-grained grouping within the category (e.g. "ticket_types")
    pub subcategory: String,

    /// Display title, typically the PSA record's name
    pub title: String,

    /// Full mirrored record as structured JSON
    #[sea_orm(column_type = "JsonBinary")]
    pub content: JsonValue,

    /// Short human-readable summary of the record
    pub summary: String,

    /// Identifier of the record in the PSA, when one exists
    pub source_id: Option<String>,

    /// Name of the source system the record came from
    pub source_name: Option<String>,

    /// Timestamp when the knowledge item was created
    pub created_at: DateTimeWithTimeZone,

    /// Timestamp when the knowledge item was last updated
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
