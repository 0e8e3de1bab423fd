//! Test utilities for database testing.
//!
//! This module provides utilities for setting up in-memory SQLite databases
//! with migrations for testing purposes.

use anyhow::Result;
use migration::{Migrator, MigratorTrait};
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, Statement};
use std::sync::Arc;
use uuid::Uuid;

use psa_sync::crypto::CipherKey;
use psa_sync::models::connection;
use psa_sync::repositories::connection::{ConnectionRepository, NewConnection};

/// Sets up an in-memory SQLite database with all migrations applied.
pub async fn setup_test_db() -> Result<DatabaseConnection> {
    let db = Database::connect("sqlite::memory:").await?;

    Migrator::up(&db, None).await?;

    // SQLite does not enforce our Postgres foreign key semantics; disable FK
    // checks so fixture data can be inserted freely.
    db.execute(Statement::from_string(
        db.get_database_backend(),
        "PRAGMA foreign_keys = OFF".to_string(),
    ))
    .await?;

    Ok(db)
}

/// Sets up an in-memory SQLite database and returns it Arc-wrapped.
pub async fn setup_test_db_arc() -> Result<Arc<DatabaseConnection>> {
    let db = setup_test_db().await?;
    Ok(Arc::new(db))
}

/// Fixed cipher key shared by tests.
#[allow(dead_code)]
pub fn test_cipher_key() -> CipherKey {
    CipherKey::new(vec![7u8; 32]).expect("valid test key")
}

/// Creates a connection through the repository with plausible defaults.
#[allow(dead_code)]
pub async fn create_test_connection(
    repo: &ConnectionRepository,
    user_id: Uuid,
    name: &str,
    base_url: &str,
) -> Result<connection::Model> {
    repo.create(
        user_id,
        NewConnection {
            name: name.to_string(),
            base_url: base_url.to_string(),
            client_id: format!("client-id-{name}"),
            client_secret: format!("client-secret-{name}"),
            tenant: None,
        },
    )
    .await
}
