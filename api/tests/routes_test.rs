use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use bank_link_api::config::{AppwriteConfig, DwollaConfig, Environment, PlaidConfig};
use bank_link_api::db::{NewBankAccount, NewUser, User};
use bank_link_api::types::encode_shareable_id;
use bank_link_api::{routes, AppState, Config, MemoryStore, RecordStore};
use secrecy::SecretString;
use serde_json::{json, Value};
use tower::ServiceExt;
use wiremock::matchers::{header as header_eq, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const SESSION: &str = "appwrite-session=session-secret";
const OFFLINE: &str = "http://127.0.0.1:1";

fn test_config(base_url: &str) -> Config {
    Config {
        port: 0,
        database_url: String::new(),
        appwrite: AppwriteConfig {
            endpoint: base_url.to_string(),
            project: "project-1".to_string(),
            api_key: SecretString::new("appwrite-key".to_string()),
        },
        plaid: PlaidConfig {
            base_url: base_url.to_string(),
            client_id: "client-id".to_string(),
            secret: SecretString::new("plaid-secret".to_string()),
        },
        dwolla: DwollaConfig {
            base_url: base_url.to_string(),
            key: "dwolla-key".to_string(),
            secret: SecretString::new("dwolla-secret".to_string()),
        },
        ethereum_rpc_url: "http://127.0.0.1:8545".to_string(),
        wallet_provider_url: None,
        allowed_origins: vec![],
        environment: Environment::Development,
    }
}

fn app(base_url: &str, store: Arc<MemoryStore>) -> axum::Router {
    let state = AppState::build(test_config(base_url), store).unwrap();
    routes::router(state)
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn set_cookie(response: &axum::response::Response) -> String {
    response
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

async fn seed_user(store: &MemoryStore, user_id: &str) -> User {
    store
        .create_user(NewUser {
            user_id: user_id.to_string(),
            email: "jane@example.com".to_string(),
            first_name: "Jane".to_string(),
            last_name: "Doe".to_string(),
            address1: "1 Main St".to_string(),
            city: "New York".to_string(),
            state: "NY".to_string(),
            postal_code: "10001".to_string(),
            date_of_birth: "1990-01-01".to_string(),
            ssn: "1234".to_string(),
            dwolla_customer_id: "cust-1".to_string(),
            dwolla_customer_url: "https://api-sandbox.dwolla.com/customers/cust-1".to_string(),
        })
        .await
        .unwrap()
}

async fn seed_bank(store: &MemoryStore, user_id: &str, account_id: &str) -> String {
    store
        .create_bank_account(NewBankAccount {
            user_id: user_id.to_string(),
            bank_id: "item-1".to_string(),
            account_id: account_id.to_string(),
            access_token: "access-sandbox-1".to_string(),
            funding_source_url: "https://api-sandbox.dwolla.com/funding-sources/fs-1".to_string(),
            shareable_id: encode_shareable_id(account_id),
        })
        .await
        .unwrap()
        .id
}

/// `session-secret` 세션 → Appwrite 계정 acct-1
async fn mount_session(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/account"))
        .and(header_eq("X-Appwrite-Session", "session-secret"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "$id": "acct-1",
            "email": "jane@example.com",
            "name": "Jane Doe"
        })))
        .mount(server)
        .await;
}

fn get(uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::get(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::empty()).unwrap()
}

fn post_json(uri: &str, cookie: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::post(uri).header(header::CONTENT_TYPE, "application/json");
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

#[tokio::test]
async fn test_health() {
    let app = app(OFFLINE, Arc::new(MemoryStore::new()));

    let response = app.oneshot(get("/health", None)).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["environment"], "development");
    assert_eq!(body["store"]["reachable"], true);
    assert_eq!(body["wallet_provider"], false);
    assert_eq!(body["websocket_connections"], 0);
}

#[tokio::test]
async fn test_user_scoped_routes_require_session() {
    let store = Arc::new(MemoryStore::new());
    let user = seed_user(&store, "acct-1").await;
    let bank_id = seed_bank(&store, &user.id, "acc-123").await;

    let requests = vec![
        get("/users/acct-1", None),
        get(&format!("/banks?user_id={}", user.id), None),
        get(&format!("/banks/{}", bank_id), None),
        get(&format!("/wallet/accounts/{}", user.id), None),
        post_json("/wallet/connect", None, json!({ "userId": user.id })),
        post_json("/link/exchange", None, json!({ "publicToken": "public-sandbox-1" })),
        Request::post("/link/token").body(Body::empty()).unwrap(),
    ];

    for request in requests {
        let uri = request.uri().to_string();
        let response = app(OFFLINE, store.clone()).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{}", uri);
    }
}

#[tokio::test]
async fn test_other_users_records_are_hidden() {
    let mock_server = MockServer::start().await;
    mount_session(&mock_server).await;

    let store = Arc::new(MemoryStore::new());
    seed_user(&store, "acct-1").await;
    let other = seed_user(&store, "acct-9").await;
    let other_bank = seed_bank(&store, &other.id, "acc-999").await;

    let requests = vec![
        get("/users/acct-9", Some(SESSION)),
        get(&format!("/banks?user_id={}", other.id), Some(SESSION)),
        get(&format!("/banks/{}", other_bank), Some(SESSION)),
        get(&format!("/wallet/accounts/{}", other.id), Some(SESSION)),
        post_json("/wallet/connect", Some(SESSION), json!({ "userId": other.id })),
    ];

    for request in requests {
        let uri = request.uri().to_string();
        let response = app(&mock_server.uri(), store.clone())
            .oneshot(request)
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND, "{}", uri);
    }
}

#[tokio::test]
async fn test_own_records_with_session() {
    let mock_server = MockServer::start().await;
    mount_session(&mock_server).await;

    let store = Arc::new(MemoryStore::new());
    let user = seed_user(&store, "acct-1").await;
    let bank_id = seed_bank(&store, &user.id, "acc-123").await;
    let other = seed_user(&store, "acct-9").await;
    seed_bank(&store, &other.id, "acc-999").await;

    let response = app(&mock_server.uri(), store.clone())
        .oneshot(get("/users/acct-1", Some(SESSION)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["$id"], user.id);
    assert!(body.get("ssn").is_none());

    let response = app(&mock_server.uri(), store.clone())
        .oneshot(get("/banks", Some(SESSION)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    let banks = body.as_array().unwrap();
    assert_eq!(banks.len(), 1);
    assert_eq!(banks[0]["accountId"], "acc-123");

    let response = app(&mock_server.uri(), store)
        .oneshot(get(&format!("/banks/{}", bank_id), Some(SESSION)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_bank_by_shareable_id() {
    let store = Arc::new(MemoryStore::new());
    seed_bank(&store, "user-doc-1", "acc-123").await;
    let app = app(OFFLINE, store);

    let uri = format!("/banks/shared/{}", encode_shareable_id("acc-123"));
    let response = app.oneshot(get(&uri, None)).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["accountId"], "acc-123");
    // access token은 응답에 포함되지 않음
    assert!(body.get("accessToken").is_none());
}

#[tokio::test]
async fn test_bank_by_invalid_shareable_id() {
    let app = app(OFFLINE, Arc::new(MemoryStore::new()));

    let response = app.oneshot(get("/banks/shared/%25%25%25", None)).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response).await;
    assert_eq!(body["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn test_bank_by_duplicated_account_id_not_found() {
    let store = Arc::new(MemoryStore::new());
    seed_bank(&store, "user-doc-1", "acc-dup").await;
    seed_bank(&store, "user-doc-2", "acc-dup").await;
    let app = app(OFFLINE, store);

    let response = app.oneshot(get("/banks/account/acc-dup", None)).await.unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_sign_in_sets_session_cookie() {
    let mock_server = MockServer::start().await;
    let store = Arc::new(MemoryStore::new());
    seed_user(&store, "acct-1").await;

    Mock::given(method("POST"))
        .and(path("/account/sessions/email"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({
            "$id": "session-1",
            "userId": "acct-1",
            "secret": "session-secret"
        })))
        .mount(&mock_server)
        .await;

    let response = app(&mock_server.uri(), store)
        .oneshot(post_json(
            "/auth/sign-in",
            None,
            json!({ "email": "jane@example.com", "password": "password123" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let cookie = set_cookie(&response);
    assert!(cookie.starts_with("appwrite-session=session-secret"));
    assert!(cookie.contains("HttpOnly"));
    assert!(cookie.contains("SameSite=Strict"));
    assert!(cookie.contains("Path=/"));
    // 개발 환경에서는 Secure 없음
    assert!(!cookie.contains("Secure"));

    let body = json_body(response).await;
    assert_eq!(body["userId"], "acct-1");
}

#[tokio::test]
async fn test_logout_clears_session_cookie() {
    let mock_server = MockServer::start().await;

    Mock::given(method("DELETE"))
        .and(path("/account/sessions/current"))
        .and(header_eq("X-Appwrite-Session", "session-secret"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&mock_server)
        .await;

    let response = app(&mock_server.uri(), Arc::new(MemoryStore::new()))
        .oneshot(
            Request::post("/auth/logout")
                .header(header::COOKIE, SESSION)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    let cookie = set_cookie(&response);
    assert!(cookie.starts_with("appwrite-session=;"));
    assert!(cookie.contains("Max-Age=0"));
}

#[tokio::test]
async fn test_link_token_with_session_cookie() {
    let mock_server = MockServer::start().await;
    mount_session(&mock_server).await;

    Mock::given(method("POST"))
        .and(path("/link/token/create"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "link_token": "link-sandbox-xyz"
        })))
        .mount(&mock_server)
        .await;

    let store = Arc::new(MemoryStore::new());
    seed_user(&store, "acct-1").await;

    let response = app(&mock_server.uri(), store)
        .oneshot(
            Request::post("/link/token")
                .header(header::COOKIE, "theme=dark; appwrite-session=session-secret")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["linkToken"], "link-sandbox-xyz");
}

#[tokio::test]
async fn test_link_exchange_with_session_cookie() {
    let mock_server = MockServer::start().await;
    mount_session(&mock_server).await;

    Mock::given(method("POST"))
        .and(path("/item/public_token/exchange"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "access-sandbox-1",
            "item_id": "item-1"
        })))
        .mount(&mock_server)
        .await;
    Mock::given(method("POST"))
        .and(path("/accounts/get"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "accounts": [{ "account_id": "acc-123", "name": "Plaid Checking" }]
        })))
        .mount(&mock_server)
        .await;
    Mock::given(method("POST"))
        .and(path("/processor/token/create"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "processor_token": "processor-sandbox-1"
        })))
        .mount(&mock_server)
        .await;
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": "dwolla-app-token",
            "expires_in": 3600
        })))
        .mount(&mock_server)
        .await;
    Mock::given(method("POST"))
        .and(path("/on-demand-authorizations"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "_links": { "self": { "href": "https://api-sandbox.dwolla.com/on-demand-authorizations/oda-1" } }
        })))
        .mount(&mock_server)
        .await;
    let funding_source = format!("{}/funding-sources/fs-1", mock_server.uri());
    Mock::given(method("POST"))
        .and(path("/customers/cust-1/funding-sources"))
        .respond_with(ResponseTemplate::new(201).insert_header("Location", funding_source.as_str()))
        .mount(&mock_server)
        .await;

    let store = Arc::new(MemoryStore::new());
    let user = seed_user(&store, "acct-1").await;

    let response = app(&mock_server.uri(), store.clone())
        .oneshot(post_json(
            "/link/exchange",
            Some(SESSION),
            json!({ "publicToken": "public-sandbox-1" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["publicTokenExchange"], "complete");
    assert_eq!(body["bank"]["accountId"], "acc-123");
    assert_eq!(body["bank"]["userId"], user.id);
    assert_eq!(body["bank"]["fundingSourceUrl"], funding_source);
    assert!(body["bank"].get("accessToken").is_none());
    assert_eq!(store.bank_account_count().await, 1);
}

#[tokio::test]
async fn test_wallet_connect_without_provider() {
    let mock_server = MockServer::start().await;
    mount_session(&mock_server).await;

    let store = Arc::new(MemoryStore::new());
    let user = seed_user(&store, "acct-1").await;

    let response = app(&mock_server.uri(), store)
        .oneshot(post_json("/wallet/connect", Some(SESSION), json!({ "userId": user.id })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "MetaMask not detected");
}

#[tokio::test]
async fn test_wallet_transactions_invalid_address() {
    let app = app(OFFLINE, Arc::new(MemoryStore::new()));

    let response = app
        .oneshot(get("/wallet/transactions/0x1234", None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["success"], false);
    assert!(body.get("transactions").is_none());
}
