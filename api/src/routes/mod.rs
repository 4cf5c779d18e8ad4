//! API Routes Module
//!
//! 모든 HTTP 엔드포인트 정의
//!
//! # Routes
//! - `/health` - 헬스 체크
//! - `/auth/*`, `/users/*` - 회원가입 / 로그인 / 세션
//! - `/link/*` - Plaid 계좌 연결
//! - `/banks/*` - 연결된 계좌 조회
//! - `/wallet/*` - 지갑 연결 (실험적)
//! - `/ws` - 무효화 신호 WebSocket

pub mod health;
pub mod auth;
pub mod link;
pub mod banks;
pub mod wallet;
pub mod ws;

use axum::{
    http::{header, HeaderValue, Method},
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::AppState;

/// 라우터 생성
///
/// # Route Structure
///
/// ```text
/// GET  /health                          - 서버 상태 확인
///
/// POST /auth/sign-up                    - 회원가입 (세션 쿠키 발급)
/// POST /auth/sign-in                    - 로그인 (세션 쿠키 발급)
/// GET  /auth/me                         - 로그인 사용자
/// POST /auth/logout                     - 로그아웃
/// GET  /users/:user_id                  - 사용자 조회 (본인)
///
/// POST /link/token                      - Plaid link token 생성
/// POST /link/exchange                   - public token 교환 + 계좌 등록
///
/// GET  /banks?user_id=                  - 사용자 계좌 목록 (본인)
/// GET  /banks/:document_id              - 계좌 조회 (본인)
/// GET  /banks/account/:account_id       - Plaid account id로 조회
/// GET  /banks/shared/:shareable_id      - 공유 ID로 조회
///
/// POST /wallet/connect                  - 지갑 연결 (본인)
/// GET  /wallet/accounts/:user_id        - 지갑 목록 (본인)
/// GET  /wallet/transactions/:address    - 최근 100 블록 트랜잭션
///
/// GET  /ws                              - 무효화 신호 WebSocket
/// ```
///
/// (본인) 표시 경로와 `/link/*`, `/auth/me`는 세션 쿠키 필수.
/// 다른 사용자 ID를 지정하면 404.
pub fn router(state: AppState) -> Router {
    // 쿠키 세션 사용 → credentials 허용, origin은 명시적으로 지정
    let origins: Vec<HeaderValue> = if state.config.is_production() {
        state
            .config
            .allowed_origins
            .iter()
            .filter_map(|s| s.parse().ok())
            .collect()
    } else {
        // 개발: localhost 허용
        ["http://localhost:3000", "http://localhost:5173", "http://127.0.0.1:3000"]
            .into_iter()
            .map(HeaderValue::from_static)
            .collect()
    };

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE])
        .allow_credentials(true);

    Router::new()
        // Health check
        .route("/health", get(health::health_check))

        // Auth
        .route("/auth/sign-up", post(auth::sign_up))
        .route("/auth/sign-in", post(auth::sign_in))
        .route("/auth/me", get(auth::me))
        .route("/auth/logout", post(auth::logout))
        .route("/users/:user_id", get(auth::get_user))

        // Bank linking
        .route("/link/token", post(link::create_link_token))
        .route("/link/exchange", post(link::exchange_public_token))

        // Banks
        .route("/banks", get(banks::list_banks))
        .route("/banks/:document_id", get(banks::get_bank))
        .route("/banks/account/:account_id", get(banks::get_bank_by_account_id))
        .route("/banks/shared/:shareable_id", get(banks::get_bank_by_shareable_id))

        // Wallet
        .route("/wallet/connect", post(wallet::connect_wallet))
        .route("/wallet/accounts/:user_id", get(wallet::list_wallet_accounts))
        .route("/wallet/transactions/:address", get(wallet::list_transactions))

        // WebSocket
        .route("/ws", get(ws::ws_handler))

        // 미들웨어
        .layer(TraceLayer::new_for_http())
        .layer(cors)

        // 상태 주입
        .with_state(state)
}
