//! Identity Gateway
//!
//! Appwrite 계정 / 세션 API와 사용자 레코드 조회를 묶음.
//!
//! # Sign-up Flow
//!
//! ```text
//! Appwrite 계정 생성 → Dwolla customer 생성 → users 레코드 저장 → 세션 생성
//! ```
//!
//! 중간 단계 실패 시 이후 단계는 실행되지 않음 (보상 트랜잭션 없음).

use std::sync::Arc;

use reqwest::{Client, Method, RequestBuilder};
use secrecy::{ExposeSecret, SecretString};
use serde::{de::DeserializeOwned, Deserialize};
use serde_json::json;

use crate::config::AppwriteConfig;
use crate::db::{NewUser, RecordStore, User};
use crate::error::ApiError;
use crate::services::dwolla::{extract_customer_id_from_url, DwollaClient, NewDwollaCustomer};

const SERVICE: &str = "appwrite";

/// Appwrite 계정
#[derive(Debug, Clone, Deserialize)]
pub struct IdentityAccount {
    #[serde(rename = "$id")]
    pub id: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub name: String,
}

/// Appwrite 세션
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    #[serde(rename = "$id")]
    pub id: String,
    pub user_id: String,
    /// admin 키로 생성한 세션에서만 채워짐. 비어 있으면 에러 처리
    #[serde(default)]
    pub secret: String,
}

/// 회원가입 입력
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignUpParams {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub address1: String,
    pub city: String,
    pub state: String,
    pub postal_code: String,
    pub date_of_birth: String,
    pub ssn: String,
}

/// 로그인 결과
#[derive(Debug, Clone)]
pub struct SignedIn {
    pub user: User,
    pub session_secret: String,
}

#[derive(Debug, Deserialize)]
struct AppwriteErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(rename = "type", default)]
    error_type: Option<String>,
}

/// Appwrite REST 클라이언트
pub struct AppwriteClient {
    http: Client,
    endpoint: String,
    project: String,
    api_key: SecretString,
}

impl AppwriteClient {
    pub fn new(http: Client, config: &AppwriteConfig) -> Self {
        Self {
            http,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            project: config.project.clone(),
            api_key: config.api_key.clone(),
        }
    }

    /// 계정 생성 (admin)
    pub async fn create_account(
        &self,
        email: &str,
        password: &str,
        name: &str,
    ) -> Result<IdentityAccount, ApiError> {
        let body = json!({
            "userId": "unique()",
            "email": email,
            "password": password,
            "name": name,
        });
        self.call(self.admin(Method::POST, "/users").json(&body), "/users").await
    }

    /// 이메일/비밀번호 세션 생성
    pub async fn create_email_session(&self, email: &str, password: &str) -> Result<Session, ApiError> {
        let body = json!({ "email": email, "password": password });
        let path = "/account/sessions/email";
        let session: Session = self.call(self.admin(Method::POST, path).json(&body), path).await?;

        // secret 없는 세션은 쿠키로 쓸 수 없음
        if session.secret.is_empty() {
            return Err(ApiError::upstream(SERVICE, "session without secret"));
        }
        Ok(session)
    }

    /// 세션 소유 계정 조회
    pub async fn get_account(&self, session_secret: &str) -> Result<IdentityAccount, ApiError> {
        self.call(self.session(Method::GET, "/account", session_secret), "/account")
            .await
    }

    /// 현재 세션 삭제
    pub async fn delete_current_session(&self, session_secret: &str) -> Result<(), ApiError> {
        let path = "/account/sessions/current";
        let resp = self
            .session(Method::DELETE, path, session_secret)
            .send()
            .await
            .map_err(|e| ApiError::upstream(SERVICE, format!("{} unreachable: {}", path, e)))?;

        if !resp.status().is_success() {
            return Err(error_from(resp, path).await);
        }
        Ok(())
    }

    fn admin(&self, method: Method, path: &str) -> RequestBuilder {
        self.http
            .request(method, format!("{}{}", self.endpoint, path))
            .header("X-Appwrite-Project", &self.project)
            .header("X-Appwrite-Key", self.api_key.expose_secret())
    }

    fn session(&self, method: Method, path: &str, secret: &str) -> RequestBuilder {
        self.http
            .request(method, format!("{}{}", self.endpoint, path))
            .header("X-Appwrite-Project", &self.project)
            .header("X-Appwrite-Session", secret)
    }

    async fn call<T: DeserializeOwned>(&self, request: RequestBuilder, path: &str) -> Result<T, ApiError> {
        let resp = request
            .send()
            .await
            .map_err(|e| ApiError::upstream(SERVICE, format!("{} unreachable: {}", path, e)))?;

        if !resp.status().is_success() {
            return Err(error_from(resp, path).await);
        }

        resp.json::<T>()
            .await
            .map_err(|e| ApiError::upstream(SERVICE, format!("invalid {} response: {}", path, e)))
    }
}

async fn error_from(resp: reqwest::Response, path: &str) -> ApiError {
    let status = resp.status();

    // 세션 만료 / 잘못된 자격 증명
    if status == reqwest::StatusCode::UNAUTHORIZED {
        return ApiError::Unauthorized;
    }

    match resp.json::<AppwriteErrorBody>().await {
        Ok(body) => ApiError::upstream(
            SERVICE,
            format!(
                "{} ({})",
                body.message.unwrap_or_else(|| "unknown error".into()),
                body.error_type.unwrap_or_else(|| status.to_string()),
            ),
        ),
        Err(_) => ApiError::upstream(SERVICE, format!("{} returned {}", path, status)),
    }
}

/// 인증 + 사용자 조회 게이트웨이
pub struct IdentityGateway {
    appwrite: AppwriteClient,
    dwolla: Arc<DwollaClient>,
    store: Arc<dyn RecordStore>,
}

impl IdentityGateway {
    pub fn new(appwrite: AppwriteClient, dwolla: Arc<DwollaClient>, store: Arc<dyn RecordStore>) -> Self {
        Self { appwrite, dwolla, store }
    }

    /// 회원가입
    pub async fn sign_up(&self, params: SignUpParams) -> Result<SignedIn, ApiError> {
        tracing::info!("Creating new user account for: {}", params.email);

        let name = format!("{} {}", params.first_name, params.last_name);
        let account = self
            .appwrite
            .create_account(&params.email, &params.password, &name)
            .await?;
        tracing::info!("Identity account created: {}", account.id);

        let customer_url = self
            .dwolla
            .create_customer(&NewDwollaCustomer {
                first_name: params.first_name.clone(),
                last_name: params.last_name.clone(),
                email: params.email.clone(),
                customer_type: "personal".to_string(),
                address1: params.address1.clone(),
                city: params.city.clone(),
                state: params.state.clone(),
                postal_code: params.postal_code.clone(),
                date_of_birth: params.date_of_birth.clone(),
                ssn: params.ssn.clone(),
            })
            .await?;

        let customer_id = extract_customer_id_from_url(&customer_url).ok_or_else(|| {
            ApiError::upstream("dwolla", format!("customer URL without id: {}", customer_url))
        })?;

        let user = self
            .store
            .create_user(NewUser {
                user_id: account.id,
                email: params.email.clone(),
                first_name: params.first_name,
                last_name: params.last_name,
                address1: params.address1,
                city: params.city,
                state: params.state,
                postal_code: params.postal_code,
                date_of_birth: params.date_of_birth,
                ssn: params.ssn,
                dwolla_customer_id: customer_id,
                dwolla_customer_url: customer_url,
            })
            .await
            .map_err(ApiError::store)?;

        let session = self
            .appwrite
            .create_email_session(&params.email, &params.password)
            .await?;

        tracing::info!("User signed up and session created: {}", user.id);
        Ok(SignedIn {
            user,
            session_secret: session.secret,
        })
    }

    /// 로그인
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<SignedIn, ApiError> {
        tracing::info!("Signing in user: {}", email);

        let session = self.appwrite.create_email_session(email, password).await?;
        tracing::debug!("Session created for user: {}", session.user_id);

        let user = self.user_info(&session.user_id).await?;
        Ok(SignedIn {
            user,
            session_secret: session.secret,
        })
    }

    /// 세션 → 사용자 레코드
    pub async fn logged_in_user(&self, session_secret: &str) -> Result<User, ApiError> {
        let account = self.appwrite.get_account(session_secret).await?;
        self.user_info(&account.id).await
    }

    /// 로그아웃
    pub async fn logout(&self, session_secret: &str) -> Result<(), ApiError> {
        self.appwrite.delete_current_session(session_secret).await?;
        tracing::info!("User logged out");
        Ok(())
    }

    /// userId로 사용자 레코드 조회
    pub async fn user_info(&self, user_id: &str) -> Result<User, ApiError> {
        self.store
            .find_user_by_user_id(user_id)
            .await
            .map_err(ApiError::store)?
            .ok_or_else(|| ApiError::NotFound(format!("User {}", user_id)))
    }
}
