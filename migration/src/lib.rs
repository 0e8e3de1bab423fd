//! Database migrations for the PSA sync service.
//!
//! This module contains all database migrations using SeaORM Migration.

pub use sea_orm_migration::prelude::*;

mod m2025_01_10_000100_create_psa_connections;
mod m2025_01_10_000200_create_knowledge_items;
mod m2025_01_10_000300_create_sync_records;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m2025_01_10_000100_create_psa_connections::Migration),
            Box::new(m2025_01_10_000200_create_knowledge_items::Migration),
            Box::new(m2025_01_10_000300_create_sync_records::Migration),
        ]
    }
}
