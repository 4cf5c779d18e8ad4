//! WebSocket Routes
//!
//! 대시보드 무효화 신호 스트리밍
//!
//! # Endpoints
//! - `GET /ws` - WebSocket 연결

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
};
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};

use crate::services::invalidation::serialize_message;
use crate::services::{InvalidationHub, WsMessage};
use crate::AppState;

/// WebSocket 업그레이드 핸들러
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
) -> impl IntoResponse {
    let hub = state.hub.clone();
    ws.on_upgrade(move |socket| handle_socket(socket, hub))
}

/// WebSocket 연결 처리
async fn handle_socket(socket: WebSocket, hub: Arc<InvalidationHub>) {
    let (mut sender, mut receiver) = socket.split();
    let mut events = hub.subscribe();

    let conn_id = uuid::Uuid::new_v4().to_string();
    hub.register_connection(&conn_id).await;
    tracing::debug!("WebSocket connection {} opened", conn_id);

    // 수신 태스크 → 송신 태스크로 Pong 전달
    let (pong_tx, mut pong_rx) = mpsc::channel::<WsMessage>(8);

    let recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            match msg {
                Message::Text(text) => {
                    if let Ok(WsMessage::Ping) = serde_json::from_str::<WsMessage>(&text) {
                        if pong_tx.send(WsMessage::Pong).await.is_err() {
                            break;
                        }
                    }
                }
                Message::Close(_) => break,
                _ => {}
            }
        }
    });

    // 송신 태스크
    let send_task = tokio::spawn(async move {
        loop {
            let msg = tokio::select! {
                event = events.recv() => match event {
                    Ok(msg) => msg,
                    // 느린 클라이언트: 밀린 이벤트는 건너뜀
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!("WebSocket client lagged, skipped {} events", skipped);
                        continue;
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                },
                Some(pong) = pong_rx.recv() => pong,
            };

            let Ok(json) = serialize_message(&msg) else {
                continue;
            };
            if sender.send(Message::Text(json)).await.is_err() {
                break;
            }
        }
    });

    // 연결이 종료될 때까지 대기
    tokio::select! {
        _ = recv_task => {}
        _ = send_task => {}
    }

    hub.unregister_connection(&conn_id).await;
    tracing::debug!("WebSocket connection {} closed", conn_id);
}
