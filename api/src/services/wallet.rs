//! Wallet Bridge (experimental)
//!
//! 외부 지갑 연결과 최근 블록 트랜잭션 조회.
//!
//! # Features
//! - `eth_requestAccounts`로 지갑 주소 획득 후 저장
//! - 최근 100 블록에서 주소 관련 트랜잭션 스캔
//!
//! 모든 public 작업은 에러 대신 `WalletResponse { success: false, error }`를 반환.

use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use ethers::providers::{Http, Middleware, Provider};
use ethers::types::{Address, Block, Transaction, H256, U256};
use ethers::utils::{format_ether, to_checksum};
use serde::Serialize;

use crate::db::{RecordStore, WalletAccount};
use crate::types::{EthAddress, WalletResponse};

/// 스캔할 최근 블록 수
pub const SCAN_DEPTH: u64 = 100;

/// 지갑 provider가 없을 때 에러 메시지
pub const PROVIDER_MISSING: &str = "MetaMask not detected";

/// 체인 노드 인터페이스
#[async_trait]
pub trait ChainNode: Send + Sync {
    async fn block_number(&self) -> Result<u64>;
    async fn block_with_transactions(&self, number: u64) -> Result<Option<Block<Transaction>>>;
    async fn block_timestamp(&self, block_hash: H256) -> Result<u64>;
}

/// 지갑 provider 인터페이스 (EIP-1193 `eth_requestAccounts`)
#[async_trait]
pub trait WalletProvider: Send + Sync {
    async fn request_accounts(&self) -> Result<Vec<Address>>;
}

/// JSON-RPC 체인 노드
pub struct RpcChainNode {
    provider: Provider<Http>,
}

impl RpcChainNode {
    pub fn new(rpc_url: &str) -> Result<Self> {
        let provider = Provider::<Http>::try_from(rpc_url)
            .with_context(|| format!("Invalid ETHEREUM_RPC_URL: {}", rpc_url))?;
        Ok(Self { provider })
    }
}

#[async_trait]
impl ChainNode for RpcChainNode {
    async fn block_number(&self) -> Result<u64> {
        Ok(self.provider.get_block_number().await?.as_u64())
    }

    async fn block_with_transactions(&self, number: u64) -> Result<Option<Block<Transaction>>> {
        Ok(self.provider.get_block_with_txs(number).await?)
    }

    async fn block_timestamp(&self, block_hash: H256) -> Result<u64> {
        let block = self
            .provider
            .get_block(block_hash)
            .await?
            .ok_or_else(|| anyhow!("Block {:?} not found", block_hash))?;
        block_seconds(block.timestamp)
    }
}

/// JSON-RPC 지갑 provider
pub struct RpcWalletProvider {
    provider: Provider<Http>,
}

impl RpcWalletProvider {
    pub fn new(rpc_url: &str) -> Result<Self> {
        let provider = Provider::<Http>::try_from(rpc_url)
            .with_context(|| format!("Invalid WALLET_PROVIDER_URL: {}", rpc_url))?;
        Ok(Self { provider })
    }
}

#[async_trait]
impl WalletProvider for RpcWalletProvider {
    async fn request_accounts(&self) -> Result<Vec<Address>> {
        let accounts: Vec<Address> = self
            .provider
            .request("eth_requestAccounts", serde_json::json!([]))
            .await?;
        Ok(accounts)
    }
}

/// 트랜잭션 방향
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Sent,
    Received,
}

/// 대시보드 표시용 트랜잭션
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Web3Transaction {
    pub id: String,
    pub name: String,
    pub payment_channel: &'static str,
    #[serde(rename = "type")]
    pub direction: Direction,
    pub account_id: String,
    /// ether 단위 문자열
    pub amount: String,
    pub pending: bool,
    pub category: &'static str,
    pub date: String,
    pub image: &'static str,
}

#[derive(Debug, Serialize)]
pub struct ConnectedWallet {
    pub address: String,
}

#[derive(Debug, Serialize)]
pub struct WalletAccounts {
    pub accounts: Vec<WalletAccount>,
}

#[derive(Debug, Serialize)]
pub struct WalletTransactions {
    pub transactions: Vec<Web3Transaction>,
}

pub struct WalletBridge {
    chain: Arc<dyn ChainNode>,
    provider: Option<Arc<dyn WalletProvider>>,
    store: Arc<dyn RecordStore>,
}

impl WalletBridge {
    pub fn new(
        chain: Arc<dyn ChainNode>,
        provider: Option<Arc<dyn WalletProvider>>,
        store: Arc<dyn RecordStore>,
    ) -> Self {
        Self { chain, provider, store }
    }

    /// 지갑 연결
    pub async fn connect_wallet(&self, user_id: &str) -> WalletResponse<ConnectedWallet> {
        match self.try_connect(user_id).await {
            Ok(address) => WalletResponse::success(ConnectedWallet { address }),
            Err(e) => {
                tracing::error!("An error occurred while connecting wallet: {:#}", e);
                WalletResponse::error(e.to_string())
            }
        }
    }

    /// 사용자 지갑 목록
    pub async fn list_wallet_accounts(&self, user_id: &str) -> WalletResponse<WalletAccounts> {
        match self.store.list_wallet_accounts(user_id).await {
            Ok(accounts) => WalletResponse::success(WalletAccounts { accounts }),
            Err(e) => {
                tracing::error!("An error occurred while getting wallet accounts: {:#}", e);
                WalletResponse::error(e.to_string())
            }
        }
    }

    /// 최근 블록의 주소 관련 트랜잭션
    pub async fn list_transactions(&self, address: &str) -> WalletResponse<WalletTransactions> {
        match self.scan_transactions(address).await {
            Ok(transactions) => WalletResponse::success(WalletTransactions { transactions }),
            Err(e) => {
                tracing::error!("An error occurred while getting wallet transactions: {:#}", e);
                WalletResponse::error(e.to_string())
            }
        }
    }

    async fn try_connect(&self, user_id: &str) -> Result<String> {
        let provider = self.provider.as_ref().ok_or_else(|| anyhow!(PROVIDER_MISSING))?;

        let first = provider
            .request_accounts()
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("Wallet returned no authorized accounts"))?;
        let address = to_checksum(&first, None);

        // 연결할 때마다 새 레코드 (중복 확인 없음)
        let wallet = self.store.create_wallet_account(user_id, &address).await?;
        tracing::info!("Wallet {} connected for user {} ({})", address, user_id, wallet.id);

        Ok(address)
    }

    /// 블록 범위는 시작 시점의 블록 번호로 고정: [head - 99, head]
    async fn scan_transactions(&self, address: &str) -> Result<Vec<Web3Transaction>> {
        let target = EthAddress::new(address.trim()).map_err(|e| anyhow!(e))?;
        let head = self.chain.block_number().await?;

        let mut matched = Vec::new();
        for offset in 0..SCAN_DEPTH {
            let Some(number) = head.checked_sub(offset) else {
                break;
            };

            let Some(block) = self.chain.block_with_transactions(number).await? else {
                tracing::warn!("Block {} not returned by node, skipping", number);
                continue;
            };

            let block_hash = block.hash;
            matched.extend(
                block
                    .transactions
                    .into_iter()
                    .filter(|tx| touches(tx, target.as_str()))
                    .map(|tx| (tx, block_hash)),
            );
        }

        let mut transactions = Vec::with_capacity(matched.len());
        for (tx, scanned_hash) in matched {
            let block_hash = tx
                .block_hash
                .or(scanned_hash)
                .ok_or_else(|| anyhow!("Transaction {:?} has no block hash", tx.hash))?;
            let timestamp = self.chain.block_timestamp(block_hash).await?;
            transactions.push(to_display(&tx, target.as_str(), timestamp)?);
        }

        Ok(transactions)
    }
}

/// 블록 timestamp (U256) → 초 단위 u64
fn block_seconds(timestamp: U256) -> Result<u64> {
    u64::try_from(timestamp).map_err(|_| anyhow!("Block timestamp out of range: {}", timestamp))
}

fn hex(addr: &Address) -> String {
    format!("{:?}", addr)
}

/// from 또는 to가 주소와 같은지 (대소문자 무시)
fn touches(tx: &Transaction, address: &str) -> bool {
    hex(&tx.from).eq_ignore_ascii_case(address)
        || tx.to.map_or(false, |to| hex(&to).eq_ignore_ascii_case(address))
}

fn to_display(tx: &Transaction, address: &str, timestamp: u64) -> Result<Web3Transaction> {
    let hash = format!("{:?}", tx.hash);
    let direction = if hex(&tx.from).eq_ignore_ascii_case(address) {
        Direction::Sent
    } else {
        Direction::Received
    };

    let seconds = i64::try_from(timestamp)
        .map_err(|_| anyhow!("Invalid block timestamp {}", timestamp))?;
    let date = DateTime::<Utc>::from_timestamp(seconds, 0)
        .ok_or_else(|| anyhow!("Invalid block timestamp {}", timestamp))?
        .to_rfc3339_opts(SecondsFormat::Millis, true);

    Ok(Web3Transaction {
        name: short_name(&hash),
        id: hash,
        payment_channel: "web3",
        direction,
        account_id: address.to_string(),
        amount: format_ether(tx.value),
        pending: false,
        category: "Transfer",
        date,
        image: "/ethereum-logo.png",
    })
}

/// "Transaction 0x1234...abcd"
fn short_name(hash: &str) -> String {
    if hash.len() <= 10 {
        return format!("Transaction {}", hash);
    }
    format!("Transaction {}...{}", &hash[..6], &hash[hash.len() - 4..])
}
