//! Bank Link API Library
//!
//! # Overview
//!
//! 뱅킹 대시보드 백엔드: 인증, Plaid 계좌 연결, Dwolla funding source 등록,
//! 실험적 지갑 연결.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                         API                              │
//! │                                                          │
//! │  ┌─────────┐  ┌──────────────────────────┐  ┌────────┐  │
//! │  │ Routes  │─▶│ Services                 │─▶│   DB   │  │
//! │  └─────────┘  │ Identity  Link  Wallet   │  └────────┘  │
//! │               └──────────────────────────┘              │
//! └───────────────────────┬─────────────────────────────────┘
//!                         │
//!          ┌──────────────┼──────────────┬──────────────┐
//!          ▼              ▼              ▼              ▼
//!     Appwrite         Plaid          Dwolla      Ethereum RPC
//! ```
//!
//! ## Modules
//!
//! - `config`: 환경 설정 관리
//! - `error`: 에러 타입 및 처리
//! - `routes`: HTTP 엔드포인트 핸들러
//! - `services`: 비즈니스 로직 및 외부 API 클라이언트
//! - `db`: 레코드 저장소
//! - `types`: 공통 타입 정의

use std::sync::Arc;

use anyhow::Result;

pub mod config;
pub mod error;
pub mod routes;
pub mod services;
pub mod db;
pub mod types;

// Re-exports for convenience
pub use config::Config;
pub use error::ApiError;
pub use db::{Database, MemoryStore, RecordStore};
pub use services::{IdentityGateway, InvalidationHub, LinkWorkflow, WalletBridge};

use services::{
    http_client, AppwriteClient, ChainNode, DwollaClient, PlaidClient, RpcChainNode,
    RpcWalletProvider, WalletProvider,
};

/// 애플리케이션 전역 상태
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn RecordStore>,
    pub identity: Arc<IdentityGateway>,
    pub link: Arc<LinkWorkflow>,
    pub wallet: Arc<WalletBridge>,
    pub hub: Arc<InvalidationHub>,
    pub config: Arc<Config>,
}

impl AppState {
    /// 설정과 레코드 저장소로 모든 서비스 구성
    pub fn build(config: Config, store: Arc<dyn RecordStore>) -> Result<Self> {
        let http = http_client()?;

        let plaid = Arc::new(PlaidClient::new(http.clone(), &config.plaid));
        let dwolla = Arc::new(DwollaClient::new(http.clone(), &config.dwolla));
        let appwrite = AppwriteClient::new(http, &config.appwrite);
        let hub = Arc::new(InvalidationHub::new());

        let chain: Arc<dyn ChainNode> = Arc::new(RpcChainNode::new(&config.ethereum_rpc_url)?);
        let wallet_provider = match &config.wallet_provider_url {
            Some(url) => Some(Arc::new(RpcWalletProvider::new(url)?) as Arc<dyn WalletProvider>),
            None => None,
        };

        Ok(Self {
            identity: Arc::new(IdentityGateway::new(appwrite, dwolla.clone(), store.clone())),
            link: Arc::new(LinkWorkflow::new(plaid, dwolla, store.clone(), hub.clone())),
            wallet: Arc::new(WalletBridge::new(chain, wallet_provider, store.clone())),
            store,
            hub,
            config: Arc::new(config),
        })
    }
}
