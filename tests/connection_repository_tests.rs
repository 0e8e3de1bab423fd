//! Integration tests for the connection repository's default-flag
//! bookkeeping and credential handling.

mod test_utils;

use anyhow::Result;
use uuid::Uuid;

use psa_sync::repositories::connection::{ConnectionRepository, ConnectionUpdate};
use test_utils::{create_test_connection, setup_test_db_arc, test_cipher_key};

async fn repo() -> Result<ConnectionRepository> {
    let db = setup_test_db_arc().await?;
    Ok(ConnectionRepository::new(db, test_cipher_key()))
}

#[tokio::test]
async fn first_connection_becomes_default() -> Result<()> {
    let repo = repo().await?;
    let user = Uuid::new_v4();

    let first = create_test_connection(&repo, user, "first", "https://a.example.com").await?;
    assert!(first.is_default);
    assert!(first.is_active);

    Ok(())
}

#[tokio::test]
async fn later_connections_do_not_steal_default() -> Result<()> {
    let repo = repo().await?;
    let user = Uuid::new_v4();

    let first = create_test_connection(&repo, user, "first", "https://a.example.com").await?;
    let second = create_test_connection(&repo, user, "second", "https://b.example.com").await?;

    assert!(!second.is_default);
    let first = repo.find_by_id(user, first.id).await?.unwrap();
    assert!(first.is_default);

    Ok(())
}

#[tokio::test]
async fn first_connection_per_user_is_independent() -> Result<()> {
    let repo = repo().await?;
    let user_a = Uuid::new_v4();
    let user_b = Uuid::new_v4();

    create_test_connection(&repo, user_a, "a", "https://a.example.com").await?;
    let b = create_test_connection(&repo, user_b, "b", "https://b.example.com").await?;

    assert!(b.is_default);

    Ok(())
}

#[tokio::test]
async fn set_default_switches_the_flag_atomically() -> Result<()> {
    let repo = repo().await?;
    let user = Uuid::new_v4();

    let first = create_test_connection(&repo, user, "first", "https://a.example.com").await?;
    let second = create_test_connection(&repo, user, "second", "https://b.example.com").await?;

    repo.set_default(user, second.id).await?;

    let connections = repo.list_for_user(user).await?;
    let defaults: Vec<_> = connections.iter().filter(|c| c.is_default).collect();
    assert_eq!(defaults.len(), 1);
    assert_eq!(defaults[0].id, second.id);
    assert!(!repo.find_by_id(user, first.id).await?.unwrap().is_default);

    Ok(())
}

#[tokio::test]
async fn deleting_default_promotes_next_oldest() -> Result<()> {
    let repo = repo().await?;
    let user = Uuid::new_v4();

    let first = create_test_connection(&repo, user, "first", "https://a.example.com").await?;
    let second = create_test_connection(&repo, user, "second", "https://b.example.com").await?;
    let third = create_test_connection(&repo, user, "third", "https://c.example.com").await?;

    repo.delete(user, first.id).await?;

    let promoted = repo.find_by_id(user, second.id).await?.unwrap();
    assert!(promoted.is_default);
    assert!(!repo.find_by_id(user, third.id).await?.unwrap().is_default);

    Ok(())
}

#[tokio::test]
async fn deleting_non_default_leaves_default_alone() -> Result<()> {
    let repo = repo().await?;
    let user = Uuid::new_v4();

    let first = create_test_connection(&repo, user, "first", "https://a.example.com").await?;
    let second = create_test_connection(&repo, user, "second", "https://b.example.com").await?;

    repo.delete(user, second.id).await?;

    assert!(repo.find_by_id(user, first.id).await?.unwrap().is_default);

    Ok(())
}

#[tokio::test]
async fn find_for_sync_prefers_active_default() -> Result<()> {
    let repo = repo().await?;
    let user = Uuid::new_v4();

    create_test_connection(&repo, user, "first", "https://a.example.com").await?;
    let second = create_test_connection(&repo, user, "second", "https://b.example.com").await?;
    repo.set_default(user, second.id).await?;

    let resolved = repo.find_for_sync(user).await?.unwrap();
    assert_eq!(resolved.id, second.id);

    Ok(())
}

#[tokio::test]
async fn find_for_sync_falls_back_to_earliest_active() -> Result<()> {
    let repo = repo().await?;
    let user = Uuid::new_v4();

    let first = create_test_connection(&repo, user, "first", "https://a.example.com").await?;
    let second = create_test_connection(&repo, user, "second", "https://b.example.com").await?;
    let third = create_test_connection(&repo, user, "third", "https://c.example.com").await?;

    // Default deactivated: resolution must skip it.
    repo.update(
        user,
        first.id,
        ConnectionUpdate {
            is_active: Some(false),
            ..ConnectionUpdate::default()
        },
    )
    .await?;

    let resolved = repo.find_for_sync(user).await?.unwrap();
    assert_eq!(resolved.id, second.id);
    assert_ne!(resolved.id, third.id);

    Ok(())
}

#[tokio::test]
async fn find_for_sync_returns_none_without_active_connections() -> Result<()> {
    let repo = repo().await?;
    let user = Uuid::new_v4();

    assert!(repo.find_for_sync(user).await?.is_none());

    let only = create_test_connection(&repo, user, "only", "https://a.example.com").await?;
    repo.update(
        user,
        only.id,
        ConnectionUpdate {
            is_active: Some(false),
            ..ConnectionUpdate::default()
        },
    )
    .await?;

    assert!(repo.find_for_sync(user).await?.is_none());

    Ok(())
}

#[tokio::test]
async fn credentials_roundtrip_through_encryption() -> Result<()> {
    let repo = repo().await?;
    let user = Uuid::new_v4();

    let connection = create_test_connection(&repo, user, "main", "https://a.example.com").await?;

    // Ciphertext blobs never contain the plaintext.
    assert!(!connection.client_id_ciphertext.contains("client-id-main"));
    assert!(
        !connection
            .client_secret_ciphertext
            .contains("client-secret-main")
    );

    let credentials = repo.decrypt_credentials(&connection)?;
    assert_eq!(credentials.client_id, "client-id-main");
    assert_eq!(credentials.client_secret, "client-secret-main");

    Ok(())
}

#[tokio::test]
async fn decrypt_with_wrong_key_fails() -> Result<()> {
    let db = setup_test_db_arc().await?;
    let repo = ConnectionRepository::new(db.clone(), test_cipher_key());
    let user = Uuid::new_v4();

    let connection = create_test_connection(&repo, user, "main", "https://a.example.com").await?;

    let other_key = psa_sync::crypto::CipherKey::new(vec![9u8; 32])?;
    let wrong_repo = ConnectionRepository::new(db, other_key);
    assert!(wrong_repo.decrypt_credentials(&connection).is_err());

    Ok(())
}

#[tokio::test]
async fn record_test_result_persists_outcome() -> Result<()> {
    let repo = repo().await?;
    let user = Uuid::new_v4();

    let connection = create_test_connection(&repo, user, "main", "https://a.example.com").await?;
    assert!(connection.last_test_status.is_none());

    let updated = repo
        .record_test_result(connection.id, false, "401 from token endpoint")
        .await?;
    assert_eq!(updated.last_test_status.as_deref(), Some("failure"));
    assert_eq!(
        updated.last_test_message.as_deref(),
        Some("401 from token endpoint")
    );
    assert!(updated.last_test_at.is_some());

    Ok(())
}

#[tokio::test]
async fn update_reencrypts_credentials_together() -> Result<()> {
    let repo = repo().await?;
    let user = Uuid::new_v4();

    let connection = create_test_connection(&repo, user, "main", "https://a.example.com").await?;

    // Half an update is rejected.
    let result = repo
        .update(
            user,
            connection.id,
            ConnectionUpdate {
                client_id: Some("new-id".to_string()),
                ..ConnectionUpdate::default()
            },
        )
        .await;
    assert!(result.is_err());

    let updated = repo
        .update(
            user,
            connection.id,
            ConnectionUpdate {
                client_id: Some("new-id".to_string()),
                client_secret: Some("new-secret".to_string()),
                ..ConnectionUpdate::default()
            },
        )
        .await?;

    let credentials = repo.decrypt_credentials(&updated)?;
    assert_eq!(credentials.client_id, "new-id");
    assert_eq!(credentials.client_secret, "new-secret");

    Ok(())
}
