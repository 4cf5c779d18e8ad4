use std::sync::Arc;

use bank_link_api::config::{AppwriteConfig, DwollaConfig};
use bank_link_api::services::{http_client, AppwriteClient, DwollaClient, SignUpParams};
use bank_link_api::{ApiError, IdentityGateway, MemoryStore};
use secrecy::SecretString;
use serde_json::json;
use tokio_test::assert_ok;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn gateway(base_url: &str, store: Arc<MemoryStore>) -> IdentityGateway {
    let http = http_client().unwrap();
    let appwrite = AppwriteClient::new(
        http.clone(),
        &AppwriteConfig {
            endpoint: base_url.to_string(),
            project: "project-1".to_string(),
            api_key: SecretString::new("appwrite-key".to_string()),
        },
    );
    let dwolla = DwollaClient::new(
        http,
        &DwollaConfig {
            base_url: base_url.to_string(),
            key: "dwolla-key".to_string(),
            secret: SecretString::new("dwolla-secret".to_string()),
        },
    );

    IdentityGateway::new(appwrite, Arc::new(dwolla), store)
}

fn sign_up_params() -> SignUpParams {
    serde_json::from_value(json!({
        "email": "jane@example.com",
        "password": "password123",
        "firstName": "Jane",
        "lastName": "Doe",
        "address1": "1 Main St",
        "city": "New York",
        "state": "NY",
        "postalCode": "10001",
        "dateOfBirth": "1990-01-01",
        "ssn": "1234"
    }))
    .unwrap()
}

async fn mount_appwrite(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/users"))
        .and(header("X-Appwrite-Project", "project-1"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "$id": "acct-1",
            "email": "jane@example.com",
            "name": "Jane Doe"
        })))
        .mount(server)
        .await;

    Mock::given(method("POST"))
        .and(path("/account/sessions/email"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "$id": "session-1",
            "userId": "acct-1",
            "secret": "session-secret"
        })))
        .mount(server)
        .await;
}

async fn mount_dwolla_token(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "dwolla-app-token",
            "expires_in": 3600
        })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_sign_up_creates_user_with_customer_id() {
    let mock_server = MockServer::start().await;
    mount_appwrite(&mock_server).await;
    mount_dwolla_token(&mock_server).await;

    let customer_url = format!("{}/customers/cust-42", mock_server.uri());
    Mock::given(method("POST"))
        .and(path("/customers"))
        .and(body_partial_json(json!({ "firstName": "Jane", "type": "personal" })))
        .respond_with(ResponseTemplate::new(201).insert_header("Location", customer_url.as_str()))
        .expect(1)
        .mount(&mock_server)
        .await;

    let store = Arc::new(MemoryStore::new());
    let gateway = gateway(&mock_server.uri(), store.clone());

    let signed_in = assert_ok!(gateway.sign_up(sign_up_params()).await);

    assert_eq!(signed_in.session_secret, "session-secret");
    assert_eq!(signed_in.user.user_id, "acct-1");
    assert_eq!(signed_in.user.dwolla_customer_id, "cust-42");
    assert_eq!(signed_in.user.dwolla_customer_url, customer_url);
    assert_eq!(store.user_count().await, 1);

    // 세션 소유자와 레코드 매칭
    let found = gateway.user_info("acct-1").await.unwrap();
    assert_eq!(found.id, signed_in.user.id);
}

#[tokio::test]
async fn test_sign_up_customer_failure_creates_no_user() {
    let mock_server = MockServer::start().await;
    mount_appwrite(&mock_server).await;
    mount_dwolla_token(&mock_server).await;

    Mock::given(method("POST"))
        .and(path("/customers"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "code": "ValidationError",
            "message": "Validation error(s) present."
        })))
        .mount(&mock_server)
        .await;

    let store = Arc::new(MemoryStore::new());
    let gateway = gateway(&mock_server.uri(), store.clone());

    let err = gateway.sign_up(sign_up_params()).await.unwrap_err();

    assert!(matches!(err, ApiError::Upstream { service: "dwolla", .. }));
    assert_eq!(store.user_count().await, 0);

    // 세션은 생성되지 않음
    let requests = mock_server.received_requests().await.unwrap();
    assert!(requests
        .iter()
        .all(|r| r.url.path() != "/account/sessions/email"));
}

#[tokio::test]
async fn test_logged_in_user_expired_session() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/account"))
        .and(header("X-Appwrite-Session", "stale-secret"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "message": "User (role: guests) missing scope (account)",
            "type": "general_unauthorized_scope"
        })))
        .mount(&mock_server)
        .await;

    let gateway = gateway(&mock_server.uri(), Arc::new(MemoryStore::new()));
    let err = gateway.logged_in_user("stale-secret").await.unwrap_err();

    assert!(matches!(err, ApiError::Unauthorized));
}

#[tokio::test]
async fn test_sign_in_without_user_record() {
    let mock_server = MockServer::start().await;
    mount_appwrite(&mock_server).await;

    let gateway = gateway(&mock_server.uri(), Arc::new(MemoryStore::new()));
    let err = gateway
        .sign_in("jane@example.com", "password123")
        .await
        .unwrap_err();

    assert!(matches!(err, ApiError::NotFound(_)));
}

#[tokio::test]
async fn test_sign_in_loads_user_record() {
    let mock_server = MockServer::start().await;
    mount_appwrite(&mock_server).await;
    mount_dwolla_token(&mock_server).await;

    let customer_url = format!("{}/customers/cust-42", mock_server.uri());
    Mock::given(method("POST"))
        .and(path("/customers"))
        .respond_with(ResponseTemplate::new(201).insert_header("Location", customer_url.as_str()))
        .mount(&mock_server)
        .await;

    let store = Arc::new(MemoryStore::new());
    let gateway = gateway(&mock_server.uri(), store);
    let signed_up = assert_ok!(gateway.sign_up(sign_up_params()).await);

    let signed_in = assert_ok!(gateway.sign_in("jane@example.com", "password123").await);

    assert_eq!(signed_in.session_secret, "session-secret");
    assert_eq!(signed_in.user.id, signed_up.user.id);
    assert_eq!(signed_in.user.user_id, "acct-1");
}

#[tokio::test]
async fn test_sign_in_session_without_secret() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/account/sessions/email"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "$id": "session-1",
            "userId": "acct-1"
        })))
        .mount(&mock_server)
        .await;

    let gateway = gateway(&mock_server.uri(), Arc::new(MemoryStore::new()));
    let err = gateway
        .sign_in("jane@example.com", "password123")
        .await
        .unwrap_err();

    match err {
        ApiError::Upstream { service, message } => {
            assert_eq!(service, "appwrite");
            assert!(message.contains("session without secret"));
        }
        other => panic!("Expected Upstream, got {:?}", other),
    }
}
