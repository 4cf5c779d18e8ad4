//! Plaid Client
//!
//! 은행 계좌 연결 (aggregator) REST API 래퍼.
//!
//! # Endpoints
//! - `POST /link/token/create`
//! - `POST /item/public_token/exchange`
//! - `POST /accounts/get`
//! - `POST /processor/token/create`
//!
//! 모든 요청 body에 `client_id`, `secret` 포함. 재시도 없음.

use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{json, Value};

use crate::config::PlaidConfig;
use crate::error::ApiError;

const SERVICE: &str = "plaid";

/// Link token 요청 파라미터
#[derive(Debug, Clone, Serialize)]
pub struct LinkTokenRequest {
    pub client_user_id: String,
    pub client_name: String,
    pub products: Vec<String>,
    pub language: String,
    pub country_codes: Vec<String>,
}

/// public token 교환 결과
#[derive(Debug, Clone, Deserialize)]
pub struct TokenExchange {
    pub access_token: String,
    pub item_id: String,
}

/// Plaid 계좌 메타데이터
#[derive(Debug, Clone, Deserialize)]
pub struct PlaidAccount {
    pub account_id: String,
    pub name: String,
    #[serde(default)]
    pub official_name: Option<String>,
    #[serde(default)]
    pub mask: Option<String>,
    #[serde(rename = "type", default)]
    pub account_type: Option<String>,
    #[serde(default)]
    pub subtype: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LinkTokenResponse {
    link_token: String,
}

#[derive(Debug, Deserialize)]
struct AccountsResponse {
    accounts: Vec<PlaidAccount>,
}

#[derive(Debug, Deserialize)]
struct ProcessorTokenResponse {
    processor_token: String,
}

/// Plaid 에러 응답
#[derive(Debug, Deserialize)]
struct PlaidErrorBody {
    #[serde(default)]
    error_code: Option<String>,
    #[serde(default)]
    error_message: Option<String>,
}

pub struct PlaidClient {
    http: Client,
    base_url: String,
    client_id: String,
    secret: SecretString,
}

impl PlaidClient {
    pub fn new(http: Client, config: &PlaidConfig) -> Self {
        Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            client_id: config.client_id.clone(),
            secret: config.secret.clone(),
        }
    }

    /// link token 생성
    pub async fn link_token_create(&self, request: &LinkTokenRequest) -> Result<String, ApiError> {
        let body = json!({
            "user": { "client_user_id": request.client_user_id },
            "client_name": request.client_name,
            "products": request.products,
            "language": request.language,
            "country_codes": request.country_codes,
        });

        let response: LinkTokenResponse = self.post("/link/token/create", body).await?;
        Ok(response.link_token)
    }

    /// public token → access token + item id
    pub async fn item_public_token_exchange(&self, public_token: &str) -> Result<TokenExchange, ApiError> {
        self.post("/item/public_token/exchange", json!({ "public_token": public_token }))
            .await
    }

    /// item에 연결된 계좌 목록
    pub async fn accounts_get(&self, access_token: &str) -> Result<Vec<PlaidAccount>, ApiError> {
        let response: AccountsResponse = self
            .post("/accounts/get", json!({ "access_token": access_token }))
            .await?;
        Ok(response.accounts)
    }

    /// 결제 processor 전용 토큰 생성
    pub async fn processor_token_create(
        &self,
        access_token: &str,
        account_id: &str,
        processor: &str,
    ) -> Result<String, ApiError> {
        let body = json!({
            "access_token": access_token,
            "account_id": account_id,
            "processor": processor,
        });

        let response: ProcessorTokenResponse = self.post("/processor/token/create", body).await?;
        Ok(response.processor_token)
    }

    async fn post<T: DeserializeOwned>(&self, path: &str, mut body: Value) -> Result<T, ApiError> {
        if let Value::Object(map) = &mut body {
            map.insert("client_id".into(), Value::String(self.client_id.clone()));
            map.insert(
                "secret".into(),
                Value::String(self.secret.expose_secret().clone()),
            );
        }

        let url = format!("{}{}", self.base_url, path);
        tracing::debug!("Plaid request: POST {}", path);

        let resp = self
            .http
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| ApiError::upstream(SERVICE, format!("{} unreachable: {}", path, e)))?;

        let status = resp.status();
        if !status.is_success() {
            let message = match resp.json::<PlaidErrorBody>().await {
                Ok(err) => format!(
                    "{} ({})",
                    err.error_message.unwrap_or_else(|| "unknown error".into()),
                    err.error_code.unwrap_or_else(|| status.to_string()),
                ),
                Err(_) => format!("{} returned {}", path, status),
            };
            return Err(ApiError::upstream(SERVICE, message));
        }

        resp.json::<T>()
            .await
            .map_err(|e| ApiError::upstream(SERVICE, format!("invalid {} response: {}", path, e)))
    }
}
