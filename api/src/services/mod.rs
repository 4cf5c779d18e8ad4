//! Services Module
//!
//! 비즈니스 로직을 담당하는 서비스 레이어
//!
//! # Services
//! - `IdentityGateway`: Appwrite 계정 / 세션 + 사용자 조회
//! - `LinkWorkflow`: Plaid 계좌 연결 → Dwolla funding source 등록
//! - `PlaidClient` / `DwollaClient`: 외부 REST API 클라이언트
//! - `WalletBridge`: 지갑 연결 및 블록 스캔
//! - `InvalidationHub`: 대시보드 무효화 신호

use std::time::Duration;

use anyhow::{Context, Result};

pub mod dwolla;
pub mod identity;
pub mod invalidation;
pub mod link_workflow;
pub mod plaid;
pub mod wallet;

pub use dwolla::{AddFundingSourceParams, DwollaClient};
pub use identity::{AppwriteClient, IdentityGateway, SignUpParams, SignedIn};
pub use invalidation::{InvalidationHub, WsMessage};
pub use link_workflow::{ExchangeOutcome, LinkWorkflow};
pub use plaid::PlaidClient;
pub use wallet::{ChainNode, RpcChainNode, RpcWalletProvider, WalletBridge, WalletProvider};

/// 외부 API 공용 HTTP 클라이언트 (10초 타임아웃)
pub fn http_client() -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(10))
        .build()
        .context("Failed to build HTTP client")
}
