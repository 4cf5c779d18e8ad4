//! Dwolla Client (payment rail provisioner)
//!
//! - customer 생성 (회원가입 시)
//! - funding source 등록 (Plaid processor token 사용)
//!
//! Dwolla는 생성된 리소스의 URL을 `Location` 헤더로 반환함.
//! 앱 토큰은 client credentials로 발급받아 만료 직전까지 캐시.

use std::time::{Duration, Instant};

use reqwest::{header, Client, RequestBuilder, Response, Url};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::sync::RwLock;

use crate::config::DwollaConfig;
use crate::error::ApiError;

const SERVICE: &str = "dwolla";
const HAL_JSON: &str = "application/vnd.dwolla.v1.hal+json";

/// Dwolla customer 생성 파라미터
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewDwollaCustomer {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    #[serde(rename = "type")]
    pub customer_type: String,
    pub address1: String,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub date_of_birth: String,
    pub ssn: String,
}

/// funding source 등록 파라미터
#[derive(Debug, Clone)]
pub struct AddFundingSourceParams {
    pub dwolla_customer_id: String,
    pub processor_token: String,
    pub bank_name: String,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

#[derive(Debug, Deserialize)]
struct OnDemandAuthorization {
    #[serde(rename = "_links")]
    links: Value,
}

/// Dwolla 에러 응답 (HAL)
#[derive(Debug, Deserialize)]
struct DwollaErrorBody {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

struct CachedToken {
    token: String,
    expires_at: Instant,
}

pub struct DwollaClient {
    http: Client,
    base_url: String,
    key: String,
    secret: SecretString,
    /// 앱 토큰 캐시
    token: RwLock<Option<CachedToken>>,
}

impl DwollaClient {
    /// 만료 전 여유 시간
    const TOKEN_REFRESH_MARGIN: Duration = Duration::from_secs(60);

    pub fn new(http: Client, config: &DwollaConfig) -> Self {
        Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            key: config.key.clone(),
            secret: config.secret.clone(),
            token: RwLock::new(None),
        }
    }

    /// customer 생성 → customer URL
    pub async fn create_customer(&self, customer: &NewDwollaCustomer) -> Result<String, ApiError> {
        let request = self
            .http
            .post(format!("{}/customers", self.base_url))
            .json(customer);

        let resp = self.send(request, "/customers").await?;
        let url = location(&resp)?;
        tracing::info!("Dwolla customer created: {}", url);
        Ok(url)
    }

    /// funding source 등록 → funding source URL
    ///
    /// # Flow
    ///
    /// 1. on-demand authorization 생성 (`_links` 획득)
    /// 2. `customers/{id}/funding-sources`에 processor token 등록
    /// 3. `Location` 헤더 검증 후 반환
    pub async fn add_funding_source(&self, params: &AddFundingSourceParams) -> Result<String, ApiError> {
        let links = self.create_on_demand_authorization().await?;

        let path = format!("/customers/{}/funding-sources", params.dwolla_customer_id);
        let request = self
            .http
            .post(format!("{}{}", self.base_url, path))
            .json(&json!({
                "name": params.bank_name,
                "plaidToken": params.processor_token,
                "_links": links,
            }));

        let resp = self.send(request, &path).await?;
        let url = location(&resp)?;
        tracing::info!("Dwolla funding source created: {}", url);
        Ok(url)
    }

    async fn create_on_demand_authorization(&self) -> Result<Value, ApiError> {
        let request = self
            .http
            .post(format!("{}/on-demand-authorizations", self.base_url));

        let resp = self.send(request, "/on-demand-authorizations").await?;
        let auth: OnDemandAuthorization = resp.json().await.map_err(|e| {
            ApiError::upstream(SERVICE, format!("invalid on-demand authorization: {}", e))
        })?;

        Ok(auth.links)
    }

    /// 인증 헤더를 붙여 요청 전송, 2xx가 아니면 에러
    async fn send(&self, request: RequestBuilder, path: &str) -> Result<Response, ApiError> {
        let token = self.access_token().await?;

        let resp = request
            .bearer_auth(token)
            .header(header::ACCEPT, HAL_JSON)
            .header(header::CONTENT_TYPE, HAL_JSON)
            .send()
            .await
            .map_err(|e| ApiError::upstream(SERVICE, format!("{} unreachable: {}", path, e)))?;

        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }

        let message = match resp.json::<DwollaErrorBody>().await {
            Ok(err) => format!(
                "{} ({})",
                err.message.unwrap_or_else(|| "unknown error".into()),
                err.code.unwrap_or_else(|| status.to_string()),
            ),
            Err(_) => format!("{} returned {}", path, status),
        };
        Err(ApiError::upstream(SERVICE, message))
    }

    /// 앱 토큰 조회 (캐시 우선)
    async fn access_token(&self) -> Result<String, ApiError> {
        {
            let cache = self.token.read().await;
            if let Some(cached) = cache.as_ref() {
                if Instant::now() < cached.expires_at {
                    return Ok(cached.token.clone());
                }
            }
        }

        let resp = self
            .http
            .post(format!("{}/token", self.base_url))
            .basic_auth(&self.key, Some(self.secret.expose_secret()))
            .form(&[("grant_type", "client_credentials")])
            .send()
            .await
            .map_err(|e| ApiError::upstream(SERVICE, format!("/token unreachable: {}", e)))?;

        if !resp.status().is_success() {
            return Err(ApiError::upstream(
                SERVICE,
                format!("/token returned {}", resp.status()),
            ));
        }

        let token: TokenResponse = resp
            .json()
            .await
            .map_err(|e| ApiError::upstream(SERVICE, format!("invalid token response: {}", e)))?;

        let lifetime = Duration::from_secs(token.expires_in).saturating_sub(Self::TOKEN_REFRESH_MARGIN);

        let mut cache = self.token.write().await;
        *cache = Some(CachedToken {
            token: token.access_token.clone(),
            expires_at: Instant::now() + lifetime,
        });

        Ok(token.access_token)
    }
}

/// `Location` 헤더를 절대 URL로 검증
fn location(resp: &Response) -> Result<String, ApiError> {
    let value = resp
        .headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::upstream(SERVICE, "missing Location header"))?;

    let url = Url::parse(value)
        .map_err(|e| ApiError::upstream(SERVICE, format!("invalid Location header: {}", e)))?;

    Ok(url.to_string())
}

/// customer URL의 마지막 path segment = customer ID
pub fn extract_customer_id_from_url(url: &str) -> Option<String> {
    url.trim_end_matches('/')
        .rsplit('/')
        .next()
        .filter(|id| !id.is_empty() && !id.contains(':'))
        .map(String::from)
}
