//! Invalidation Hub
//!
//! 대시보드 뷰에 "다시 불러오기" 신호를 WebSocket으로 전달.
//!
//! # Features
//! - 경로 단위 캐시 무효화 브로드캐스트 (예: 계좌 연결 후 `/`)
//! - 연결 수 추적 (health 응답용)

use std::collections::HashSet;
use std::sync::Arc;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, RwLock};

/// WebSocket 메시지 타입
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum WsMessage {
    /// 경로 캐시 무효화
    Invalidate(Invalidation),
    /// Heartbeat
    Ping,
    Pong,
}

/// 무효화 이벤트
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Invalidation {
    /// 다시 렌더링할 경로
    pub path: String,
    /// 원인 (로그 / 디버깅용)
    pub reason: String,
    pub timestamp: u64,
}

/// Invalidation Hub
///
/// ```text
/// LinkWorkflow ──revalidate("/")──▶ InvalidationHub ──▶ WebSocket clients
/// ```
pub struct InvalidationHub {
    tx: broadcast::Sender<WsMessage>,
    connections: Arc<RwLock<HashSet<String>>>,
}

impl InvalidationHub {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(256);

        Self {
            tx,
            connections: Arc::new(RwLock::new(HashSet::new())),
        }
    }

    /// 경로 무효화 신호 전송
    ///
    /// 구독자가 없어도 실패하지 않음
    pub fn revalidate(&self, path: &str, reason: &str) {
        let event = Invalidation {
            path: path.to_string(),
            reason: reason.to_string(),
            timestamp: unix_now(),
        };
        let receivers = self.tx.send(WsMessage::Invalidate(event)).unwrap_or(0);
        tracing::debug!("Revalidate {} ({}) → {} receivers", path, reason, receivers);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<WsMessage> {
        self.tx.subscribe()
    }

    /// 연결 등록
    pub async fn register_connection(&self, id: &str) {
        let mut conns = self.connections.write().await;
        conns.insert(id.to_string());
    }

    /// 연결 해제
    pub async fn unregister_connection(&self, id: &str) {
        let mut conns = self.connections.write().await;
        conns.remove(id);
    }

    /// 활성 연결 수
    pub async fn active_connections(&self) -> usize {
        let conns = self.connections.read().await;
        conns.len()
    }
}

impl Default for InvalidationHub {
    fn default() -> Self {
        Self::new()
    }
}

/// 서버 메시지 직렬화
pub fn serialize_message(msg: &WsMessage) -> Result<String> {
    serde_json::to_string(msg).map_err(Into::into)
}

fn unix_now() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
