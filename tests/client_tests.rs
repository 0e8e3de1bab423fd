//! Integration tests for the PSA API client: token lifecycle, error
//! classification, and response caching.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use uuid::Uuid;
use wiremock::matchers::{body_string_contains, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use psa_sync::cache::ResponseCache;
use psa_sync::psa::client::{ApiError, PsaClient, PsaCredentials};
use psa_sync::psa::services::{ConfigurationService, TicketService};

fn credentials(tenant: Option<&str>) -> PsaCredentials {
    PsaCredentials {
        client_id: "test-client".to_string(),
        client_secret: "test-secret".to_string(),
        tenant: tenant.map(str::to_string),
    }
}

fn client(server: &MockServer, tenant: Option<&str>) -> PsaClient {
    PsaClient::new(
        Uuid::new_v4(),
        &server.uri(),
        credentials(tenant),
        Arc::new(ResponseCache::default()),
        Duration::from_secs(5),
    )
    .expect("valid client")
}

async fn mount_token_endpoint(server: &MockServer, expected_calls: u64) {
    Mock::given(method("POST"))
        .and(path("/auth/token"))
        .and(body_string_contains("grant_type=client_credentials"))
        .and(body_string_contains("client_id=test-client"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "tok-1",
            "token_type": "bearer",
            "expires_in": 3600
        })))
        .expect(expected_calls)
        .mount(server)
        .await;
}

#[tokio::test]
async fn token_is_acquired_once_and_reused() {
    let server = MockServer::start().await;
    mount_token_endpoint(&server, 1).await;

    Mock::given(method("GET"))
        .and(path("/tickets"))
        .and(header("authorization", "Bearer tok-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(2)
        .mount(&server)
        .await;

    let client = client(&server, None);
    client.get("tickets", &[]).await.expect("first call");
    client.get("tickets", &[]).await.expect("second call");
}

#[tokio::test]
async fn tenant_is_sent_as_query_parameter() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/auth/token"))
        .and(query_param("tenant", "acme"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "tok-1",
            "token_type": "bearer",
            "expires_in": 3600
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/tickets"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let client = client(&server, Some("acme"));
    client.get("tickets", &[]).await.expect("call succeeds");
}

#[tokio::test]
async fn token_rejection_maps_to_authentication_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/auth/token"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(json!({"error": "invalid_client"})),
        )
        .mount(&server)
        .await;

    let client = client(&server, None);
    let err = client.get("tickets", &[]).await.unwrap_err();
    assert!(matches!(err, ApiError::Authentication { status: 401, .. }));
    assert!(!err.is_transient());
}

#[tokio::test]
async fn token_endpoint_outage_is_transient() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/auth/token"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let client = client(&server, None);
    let err = client.get("tickets", &[]).await.unwrap_err();
    assert!(err.is_transient());
}

#[tokio::test]
async fn missing_resource_maps_to_not_found() {
    let server = MockServer::start().await;
    mount_token_endpoint(&server, 1).await;

    Mock::given(method("GET"))
        .and(path("/tickets/999"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let client = client(&server, None);
    let err = client.get("tickets/999", &[]).await.unwrap_err();
    assert!(matches!(err, ApiError::NotFound { .. }));
}

#[tokio::test]
async fn server_errors_are_transient_and_client_errors_are_not() {
    let server = MockServer::start().await;
    mount_token_endpoint(&server, 1).await;

    Mock::given(method("GET"))
        .and(path("/tickets"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/reports"))
        .respond_with(ResponseTemplate::new(422).set_body_string("bad params"))
        .mount(&server)
        .await;

    let client = client(&server, None);

    let err = client.get("tickets", &[]).await.unwrap_err();
    assert!(err.is_transient());

    let err = client.get("reports", &[]).await.unwrap_err();
    assert!(matches!(err, ApiError::Http { status: 422, .. }));
    assert!(!err.is_transient());
}

#[tokio::test]
async fn rejected_bearer_token_triggers_one_reauthentication() {
    let server = MockServer::start().await;
    // Two token acquisitions: the initial one and the retry after the 401.
    mount_token_endpoint(&server, 2).await;

    Mock::given(method("GET"))
        .and(path("/tickets"))
        .respond_with(ResponseTemplate::new(401))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/tickets"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"id": "1"}])))
        .mount(&server)
        .await;

    let client = client(&server, None);
    let value = client.get("tickets", &[]).await.expect("retry succeeds");
    assert_eq!(value, json!([{"id": "1"}]));
}

#[tokio::test]
async fn get_cached_hits_upstream_once() {
    let server = MockServer::start().await;
    mount_token_endpoint(&server, 1).await;

    Mock::given(method("GET"))
        .and(path("/priorities"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"name": "High"}])))
        .expect(1)
        .mount(&server)
        .await;

    let client = client(&server, None);
    let first = client.get_cached("priorities", &[], 60).await.expect("ok");
    let second = client.get_cached("priorities", &[], 60).await.expect("ok");
    assert_eq!(first, second);
}

#[tokio::test]
async fn create_follows_bulk_array_convention() {
    let server = MockServer::start().await;
    mount_token_endpoint(&server, 1).await;

    // Request body must be a one-element array; response comes back as an
    // array whose first element is the created record.
    Mock::given(method("POST"))
        .and(path("/tickets"))
        .and(body_string_contains("[{"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            {"id": "t-1", "subject": "printer on fire", "status": "open"}
        ])))
        .mount(&server)
        .await;

    let service = TicketService::new(Arc::new(client(&server, None)));
    let ticket = service
        .create_ticket(json!({"subject": "printer on fire"}))
        .await
        .expect("create succeeds");
    assert_eq!(ticket.id.as_deref(), Some("t-1"));
    assert_eq!(ticket.status, "open");
}

#[tokio::test]
async fn empty_write_response_is_a_write_failure() {
    let server = MockServer::start().await;
    mount_token_endpoint(&server, 1).await;

    Mock::given(method("POST"))
        .and(path("/tickets"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let service = TicketService::new(Arc::new(client(&server, None)));
    let err = service
        .create_ticket(json!({"subject": "lost"}))
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::WriteFailed { .. }));
}

#[tokio::test]
async fn delete_returns_null_on_no_content() {
    let server = MockServer::start().await;
    mount_token_endpoint(&server, 1).await;

    Mock::given(method("DELETE"))
        .and(path("/tickets/t-1"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let client = client(&server, None);
    let value = client.delete("tickets/t-1").await.expect("delete succeeds");
    assert_eq!(value, serde_json::Value::Null);
}

#[tokio::test]
async fn list_applies_default_page_size() {
    let server = MockServer::start().await;
    mount_token_endpoint(&server, 1).await;

    Mock::given(method("GET"))
        .and(path("/priorities"))
        .and(query_param("page_size", "100"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"name": "High"}])))
        .expect(1)
        .mount(&server)
        .await;

    let service = ConfigurationService::new(Arc::new(client(&server, None)));
    let priorities = service.priorities().await.expect("list succeeds");
    assert_eq!(priorities.len(), 1);
}

#[tokio::test]
async fn explicit_page_size_overrides_service_default() {
    let server = MockServer::start().await;
    mount_token_endpoint(&server, 1).await;

    Mock::given(method("GET"))
        .and(path("/tickets"))
        .and(query_param("page_size", "50"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{"id": "1"}])))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/tickets"))
        .and(query_param("page_size", "9"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let service = TicketService::new(Arc::new(client(&server, None)));

    // Service default for tickets.
    let defaulted = service.list(&[]).await.expect("list succeeds");
    assert_eq!(defaulted.len(), 1);

    // Caller-supplied page size wins; nothing else is appended.
    let explicit = service
        .list(&[("page_size".to_string(), "9".to_string())])
        .await
        .expect("list succeeds");
    assert!(explicit.is_empty());
}

#[tokio::test]
async fn list_accepts_envelope_shape() {
    let server = MockServer::start().await;
    mount_token_endpoint(&server, 1).await;

    Mock::given(method("GET"))
        .and(path("/tickets"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "records": [{"id": "1", "subject": "a"}, {"id": "2", "subject": "b"}],
            "total": 2
        })))
        .mount(&server)
        .await;

    let service = TicketService::new(Arc::new(client(&server, None)));
    let tickets = service.list(&[]).await.expect("list succeeds");
    assert_eq!(tickets.len(), 2);
    assert_eq!(tickets[1].subject, "b");
}
