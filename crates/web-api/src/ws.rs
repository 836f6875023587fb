//! 房间级 WebSocket 聊天通道。
//!
//! 每个 (用户, 房间) 一条逻辑连接。连接建立前完成认证和房间
//! 归属检查，任一失败直接拒绝升级，不发送任何帧。入站只接受
//! `{ "message": "..." }`；出站帧见 [`application::ChatFrame`]。

use axum::{
    extract::{
        ws::{Message as WsMessage, WebSocket},
        Path, Query, State, WebSocketUpgrade,
    },
    response::Response,
};
use futures_util::{Sink, SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::broadcast::error::RecvError;
use uuid::Uuid;

use application::{services::SendMessageRequest, ChatFrame};
use domain::RoomId;

use crate::{error::ApiError, state::AppState};

#[derive(Debug, Deserialize)]
pub struct WsQuery {
    /// JWT access token；长连接无法带请求头，走查询参数
    token: String,
}

#[derive(Debug, Deserialize)]
struct InboundFrame {
    message: String,
}

pub async fn websocket_upgrade(
    State(state): State<AppState>,
    Path(room_id): Path<Uuid>,
    Query(query): Query<WsQuery>,
    ws: WebSocketUpgrade,
) -> Result<Response, ApiError> {
    // 认证失败或不是房间参与者：连接直接被拒，无任何帧
    let claims = state.jwt_service.verify_token(&query.token)?;
    let user_id = claims.user_id;
    state.chat_service.check_access(room_id, user_id).await?;

    tracing::debug!(%user_id, %room_id, "websocket connection accepted");
    Ok(ws.on_upgrade(move |socket| handle_socket(socket, state, room_id, user_id)))
}

async fn handle_socket(socket: WebSocket, state: AppState, room_id: Uuid, user_id: Uuid) {
    let (mut sink, mut stream) = socket.split();

    // 加入房间的扇出组；接收端 drop 即离开
    let mut room_rx = state.broadcaster.subscribe(RoomId::from(room_id));

    loop {
        tokio::select! {
            event = room_rx.recv() => match event {
                Ok(frame) => {
                    if forward(&mut sink, &frame).await.is_err() {
                        break;
                    }
                }
                // 落后的订阅者丢帧即可，历史接口负责补齐
                Err(RecvError::Lagged(skipped)) => {
                    tracing::debug!(%user_id, %room_id, skipped, "subscriber lagged");
                }
                Err(RecvError::Closed) => break,
            },
            incoming = stream.next() => match incoming {
                Some(Ok(WsMessage::Text(text))) => {
                    handle_inbound(&state, &mut sink, room_id, user_id, text.as_str()).await;
                }
                Some(Ok(WsMessage::Close(_))) | None => break,
                // Ping/Pong 由协议层处理，二进制帧忽略
                Some(Ok(_)) => {}
                Some(Err(err)) => {
                    tracing::debug!(%user_id, %room_id, error = %err, "websocket read failed");
                    break;
                }
            },
        }
    }

    tracing::debug!(%user_id, %room_id, "websocket connection closed");
}

/// 处理一条入站消息。配额或权限失败时，错误帧只发回本连接。
async fn handle_inbound(
    state: &AppState,
    sink: &mut (impl Sink<WsMessage> + Unpin),
    room_id: Uuid,
    user_id: Uuid,
    text: &str,
) {
    let frame = match serde_json::from_str::<InboundFrame>(text) {
        Ok(frame) => frame,
        Err(_) => {
            let _ = forward(sink, &ChatFrame::error("invalid frame")).await;
            return;
        }
    };

    let result = state
        .chat_service
        .send_message(SendMessageRequest {
            room_id,
            sender_id: user_id,
            content: frame.message,
        })
        .await;

    // 成功路径不直接回包：广播回路会把 message 帧发给包括
    // 发送者在内的所有订阅者
    if let Err(err) = result {
        let reason = ApiError::from(err);
        let _ = forward(sink, &ChatFrame::error(reason.message())).await;
    }
}

async fn forward(
    sink: &mut (impl Sink<WsMessage> + Unpin),
    frame: &ChatFrame,
) -> Result<(), ()> {
    let payload = match serde_json::to_string(frame) {
        Ok(json) => json,
        Err(err) => {
            tracing::warn!(error = %err, "failed to serialize websocket payload");
            return Ok(());
        }
    };
    sink.send(WsMessage::Text(payload.into()))
        .await
        .map_err(|_| ())
}
