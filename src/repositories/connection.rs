//! Connection repository for database operations
//!
//! This module provides the ConnectionRepository struct which encapsulates
//! SeaORM operations for the psa_connections table, including credential
//! encryption and the default-connection bookkeeping.

use anyhow::{Result, anyhow};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::crypto::{self, CipherKey};
use crate::models::connection::{self, Entity as PsaConnection};
use crate::psa::client::PsaCredentials;

/// Input for creating a new PSA connection.
#[derive(Debug, Clone)]
pub struct NewConnection {
    pub name: String,
    pub base_url: String,
    pub client_id: String,
    pub client_secret: String,
    pub tenant: Option<String>,
}

/// Partial update for an existing PSA connection. `None` fields are left
/// unchanged; credentials are re-encrypted only when both halves are given.
#[derive(Debug, Clone, Default)]
pub struct ConnectionUpdate {
    pub name: Option<String>,
    pub base_url: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub tenant: Option<Option<String>>,
    pub is_active: Option<bool>,
}

/// Repository for PSA connection database operations
#[derive(Debug, Clone)]
pub struct ConnectionRepository {
    /// Database connection pool
    pub db: Arc<DatabaseConnection>,
    /// Key for credential encryption
    pub cipher_key: CipherKey,
}

impl ConnectionRepository {
    /// Creates a new ConnectionRepository instance
    pub fn new(db: Arc<DatabaseConnection>, cipher_key: CipherKey) -> Self {
        Self { db, cipher_key }
    }

    /// Creates a connection with encrypted credentials.
    ///
    /// The user's first connection is marked as the default.
    pub async fn create(&self, user_id: Uuid, input: NewConnection) -> Result<connection::Model> {
        let client_id_ciphertext = crypto::encrypt(&self.cipher_key, &input.client_id)
            .map_err(|e| anyhow!("Credential encryption failed: {}", e))?;
        let client_secret_ciphertext = crypto::encrypt(&self.cipher_key, &input.client_secret)
            .map_err(|e| anyhow!("Credential encryption failed: {}", e))?;

        let has_existing = PsaConnection::find()
            .filter(connection::Column::UserId.eq(user_id))
            .one(&*self.db)
            .await?
            .is_some();

        let id = Uuid::new_v4();
        let now = Utc::now();
        let active = connection::ActiveModel {
            id: Set(id),
            user_id: Set(user_id),
            name: Set(input.name),
            base_url: Set(input.base_url.trim_end_matches('/').to_string()),
            client_id_ciphertext: Set(client_id_ciphertext),
            client_secret_ciphertext: Set(client_secret_ciphertext),
            tenant: Set(input.tenant),
            is_active: Set(true),
            is_default: Set(!has_existing),
            last_test_status: Set(None),
            last_test_message: Set(None),
            last_test_at: Set(None),
            last_used_at: Set(None),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        };
        active.insert(&*self.db).await?;

        // For SQLite, query the record directly since we already know the ID
        let fetched = PsaConnection::find_by_id(id).one(&*self.db).await?;
        fetched.ok_or_else(|| anyhow!("connection not persisted"))
    }

    /// Finds a connection by its ID within a user scope
    pub async fn find_by_id(&self, user_id: Uuid, id: Uuid) -> Result<Option<connection::Model>> {
        Ok(PsaConnection::find_by_id(id)
            .filter(connection::Column::UserId.eq(user_id))
            .one(&*self.db)
            .await?)
    }

    /// Retrieves a connection by its ID without user scoping
    pub async fn get_by_id(&self, id: Uuid) -> Result<Option<connection::Model>> {
        Ok(PsaConnection::find_by_id(id).one(&*self.db).await?)
    }

    /// Lists all connections for a user ordered by creation time then ID
    pub async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<connection::Model>> {
        Ok(PsaConnection::find()
            .filter(connection::Column::UserId.eq(user_id))
            .order_by_asc(connection::Column::CreatedAt)
            .order_by_asc(connection::Column::Id)
            .all(&*self.db)
            .await?)
    }

    /// Updates mutable fields on a connection within a user scope
    pub async fn update(
        &self,
        user_id: Uuid,
        id: Uuid,
        update: ConnectionUpdate,
    ) -> Result<connection::Model> {
        let existing = self
            .find_by_id(user_id, id)
            .await?
            .ok_or_else(|| anyhow!("Connection with ID '{}' not found for user", id))?;

        let mut model: connection::ActiveModel = existing.into();

        if let Some(name) = update.name {
            model.name = Set(name);
        }
        if let Some(base_url) = update.base_url {
            model.base_url = Set(base_url.trim_end_matches('/').to_string());
        }
        match (update.client_id, update.client_secret) {
            (Some(client_id), Some(client_secret)) => {
                let id_cipher = crypto::encrypt(&self.cipher_key, &client_id)
                    .map_err(|e| anyhow!("Credential encryption failed: {}", e))?;
                let secret_cipher = crypto::encrypt(&self.cipher_key, &client_secret)
                    .map_err(|e| anyhow!("Credential encryption failed: {}", e))?;
                model.client_id_ciphertext = Set(id_cipher);
                model.client_secret_ciphertext = Set(secret_cipher);
            }
            (None, None) => {}
            _ => {
                return Err(anyhow!(
                    "client_id and client_secret must be updated together"
                ));
            }
        }
        if let Some(tenant) = update.tenant {
            model.tenant = Set(tenant);
        }
        if let Some(is_active) = update.is_active {
            model.is_active = Set(is_active);
        }
        model.updated_at = Set(Utc::now().into());

        Ok(model.update(&*self.db).await?)
    }

    /// Marks the given connection as the user's default, clearing the flag
    /// on every other connection the user owns.
    pub async fn set_default(&self, user_id: Uuid, id: Uuid) -> Result<connection::Model> {
        let target = self
            .find_by_id(user_id, id)
            .await?
            .ok_or_else(|| anyhow!("Connection with ID '{}' not found for user", id))?;

        let others = PsaConnection::find()
            .filter(connection::Column::UserId.eq(user_id))
            .filter(connection::Column::IsDefault.eq(true))
            .filter(connection::Column::Id.ne(id))
            .all(&*self.db)
            .await?;
        for other in others {
            let mut model: connection::ActiveModel = other.into();
            model.is_default = Set(false);
            model.updated_at = Set(Utc::now().into());
            model.update(&*self.db).await?;
        }

        let mut model: connection::ActiveModel = target.into();
        model.is_default = Set(true);
        model.updated_at = Set(Utc::now().into());
        Ok(model.update(&*self.db).await?)
    }

    /// Deletes a connection within a user scope.
    ///
    /// If the deleted connection was the default, the user's oldest
    /// remaining connection is promoted to default.
    pub async fn delete(&self, user_id: Uuid, id: Uuid) -> Result<()> {
        let existing = self
            .find_by_id(user_id, id)
            .await?
            .ok_or_else(|| anyhow!("Connection with ID '{}' not found for user", id))?;
        let was_default = existing.is_default;

        PsaConnection::delete_by_id(id).exec(&*self.db).await?;

        if was_default {
            let next = PsaConnection::find()
                .filter(connection::Column::UserId.eq(user_id))
                .order_by_asc(connection::Column::CreatedAt)
                .order_by_asc(connection::Column::Id)
                .one(&*self.db)
                .await?;
            if let Some(next) = next {
                let mut model: connection::ActiveModel = next.into();
                model.is_default = Set(true);
                model.updated_at = Set(Utc::now().into());
                model.update(&*self.db).await?;
            }
        }

        Ok(())
    }

    /// Resolves the connection a sync run should use: the active default if
    /// one exists, otherwise the earliest-created active connection.
    pub async fn find_for_sync(&self, user_id: Uuid) -> Result<Option<connection::Model>> {
        let default = PsaConnection::find()
            .filter(connection::Column::UserId.eq(user_id))
            .filter(connection::Column::IsActive.eq(true))
            .filter(connection::Column::IsDefault.eq(true))
            .one(&*self.db)
            .await?;
        if default.is_some() {
            return Ok(default);
        }

        Ok(PsaConnection::find()
            .filter(connection::Column::UserId.eq(user_id))
            .filter(connection::Column::IsActive.eq(true))
            .order_by_asc(connection::Column::CreatedAt)
            .order_by_asc(connection::Column::Id)
            .one(&*self.db)
            .await?)
    }

    /// Decrypts the OAuth client credentials stored on a connection
    pub fn decrypt_credentials(&self, connection: &connection::Model) -> Result<PsaCredentials> {
        let client_id = crypto::decrypt(&self.cipher_key, &connection.client_id_ciphertext)
            .map_err(|e| {
                tracing::error!(
                    connection_id = %connection.id,
                    user_id = %connection.user_id,
                    "Credential decryption failed"
                );
                anyhow!("Credential decryption failed: {}", e)
            })?;
        let client_secret = crypto::decrypt(&self.cipher_key, &connection.client_secret_ciphertext)
            .map_err(|e| {
                tracing::error!(
                    connection_id = %connection.id,
                    user_id = %connection.user_id,
                    "Credential decryption failed"
                );
                anyhow!("Credential decryption failed: {}", e)
            })?;

        Ok(PsaCredentials {
            client_id,
            client_secret,
            tenant: connection.tenant.clone(),
        })
    }

    /// Records the outcome of a connectivity test on the connection
    pub async fn record_test_result(
        &self,
        id: Uuid,
        success: bool,
        message: &str,
    ) -> Result<connection::Model> {
        let existing = PsaConnection::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| anyhow!("Connection '{}' not found", id))?;

        let mut model: connection::ActiveModel = existing.into();
        model.last_test_status = Set(Some(
            if success { "success" } else { "failure" }.to_string(),
        ));
        model.last_test_message = Set(Some(message.to_string()));
        model.last_test_at = Set(Some(Utc::now().into()));
        model.updated_at = Set(Utc::now().into());

        Ok(model.update(&*self.db).await?)
    }

    /// Stamps the connection as used by a sync run
    pub async fn touch_last_used(&self, id: Uuid) -> Result<()> {
        let existing = PsaConnection::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| anyhow!("Connection '{}' not found", id))?;

        let mut model: connection::ActiveModel = existing.into();
        model.last_used_at = Set(Some(Utc::now().into()));
        model.update(&*self.db).await?;

        Ok(())
    }
}
