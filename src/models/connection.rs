//! PSA connection entity model
//!
//! This module contains the SeaORM entity model for the psa_connections
//! table, which stores per-user PSA tenants with encrypted OAuth client
//! credentials.

use sea_orm::ActiveModelBehavior;
use sea_orm::entity::prelude::*;
use sea_orm::prelude::DateTimeWithTimeZone;
use uuid::Uuid;

/// PSA connection entity representing a configured PSA tenant for one user
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "psa_connections")]
pub struct Model {
    /// Unique identifier for the connection (primary key)
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Owning user
    pub user_id: Uuid,

    /// Display name for the connection
    pub name: String,

    /// Base URL of the PSA API for this tenant
    pub base_url: String,

    /// Encrypted OAuth client ID (base64 blob)
    pub client_id_ciphertext: String,

    /// Encrypted OAuth client secret (base64 blob)
    pub client_secret_ciphertext: String,

    /// Optional PSA tenant identifier sent with token requests
    pub tenant: Option<String>,

    /// Whether the connection may be used at all
    pub is_active: bool,

    /// Whether this is the user's default connection
    pub is_default: bool,

    /// Outcome of the most recent connectivity test (success|failure)
    pub last_test_status: Option<String>,

    /// Human-readable message from the most recent connectivity test
    pub last_test_message: Option<String>,

    /// Timestamp of the most recent connectivity test
    pub last_test_at: Option<DateTimeWithTimeZone>,

    /// Timestamp of the most recent sync that used this connection
    pub last_used_at: Option<DateTimeWithTimeZone>,

    /// Timestamp when the connection was created
    pub created_at: DateTimeWithTimeZone,

    /// Timestamp when the connection was last updated
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
