//! CLI entry point for the PSA sync service.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use migration::{Migrator, MigratorTrait};
use uuid::Uuid;

use psa_sync::cache::ResponseCache;
use psa_sync::config::ConfigLoader;
use psa_sync::crypto::CipherKey;
use psa_sync::db;
use psa_sync::models::sync_record::SyncStatus;
use psa_sync::sync::{ConnectionTester, KnowledgeSync, SyncSettings};
use psa_sync::telemetry;

#[derive(Parser)]
#[command(name = "psa-sync", version, about = "PSA connection and knowledge sync service")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Apply pending database migrations
    Migrate,
    /// Run a knowledge sync for one user
    Sync {
        /// User to sync
        #[arg(long)]
        user: Uuid,
    },
    /// Verify a stored connection's credentials against the PSA
    TestConnection {
        /// Connection to test
        #[arg(long)]
        id: Uuid,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = ConfigLoader::new()
        .load()
        .context("failed to load configuration")?;
    telemetry::init_tracing(&config)?;
    tracing::info!(
        profile = %config.profile,
        "Configuration loaded: {}",
        config.redacted_json()?
    );

    let db = Arc::new(db::init_pool(&config).await?);
    db::health_check(&db).await?;

    match cli.command {
        Command::Migrate => {
            Migrator::up(&*db, None).await?;
            tracing::info!("Migrations applied");
        }
        Command::Sync { user } => {
            let secret = config
                .encryption_secret
                .as_deref()
                .context("encryption secret missing after validation")?;
            let cipher_key = CipherKey::resolve(secret)?;
            let cache = Arc::new(ResponseCache::new(config.cache_max_entries));
            let settings = SyncSettings {
                http_timeout: Duration::from_secs(config.http_timeout_seconds),
                client_detail_limit: config.client_detail_limit,
            };

            let sync = KnowledgeSync::new(db, cipher_key, cache, settings);
            let summary = sync.run(user).await?;
            println!(
                "sync {}: {:?} (added {}, updated {}, errors {})",
                summary.sync_id,
                summary.status,
                summary.items_added,
                summary.items_updated,
                summary.error_count
            );
            if summary.status == SyncStatus::Failed {
                bail!("sync completed with status FAILED");
            }
        }
        Command::TestConnection { id } => {
            let secret = config
                .encryption_secret
                .as_deref()
                .context("encryption secret missing after validation")?;
            let cipher_key = CipherKey::resolve(secret)?;
            let cache = Arc::new(ResponseCache::new(config.cache_max_entries));
            let settings = SyncSettings {
                http_timeout: Duration::from_secs(config.http_timeout_seconds),
                client_detail_limit: config.client_detail_limit,
            };

            let tester = ConnectionTester::new(db, cipher_key, cache, settings);
            let outcome = tester.test(id).await?;
            println!(
                "connection {}: {} ({})",
                id,
                if outcome.success { "OK" } else { "FAILED" },
                outcome.message
            );
            if !outcome.success {
                bail!("connection test failed");
            }
        }
    }

    Ok(())
}
