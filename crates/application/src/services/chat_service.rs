use std::sync::Arc;

use domain::{
    ChatRoom, DomainError, Message, MessageContent, MessageId, RoomId, UserId,
};
use serde_json::json;
use uuid::Uuid;

use crate::{
    broadcaster::{ChatFrame, MessageBroadcaster},
    clock::Clock,
    error::ApplicationError,
    notifier::{notify_best_effort, NotificationDispatcher, NotificationKind, PushNotification},
    repository::{ChatRoomRepository, MessageRepository, UserRepository},
    services::QuotaService,
};

#[derive(Debug, Clone)]
pub struct SendMessageRequest {
    pub room_id: Uuid,
    pub sender_id: Uuid,
    pub content: String,
}

pub struct ChatServiceDependencies {
    pub room_repository: Arc<dyn ChatRoomRepository>,
    pub message_repository: Arc<dyn MessageRepository>,
    pub user_repository: Arc<dyn UserRepository>,
    pub quota_service: Arc<QuotaService>,
    pub broadcaster: Arc<dyn MessageBroadcaster>,
    pub notifier: Arc<dyn NotificationDispatcher>,
    pub clock: Arc<dyn Clock>,
}

/// 聊天室登记处：房间归属检查、消息追加与历史读取。
///
/// 房间只会由配对路径创建，这里从不新建房间。
pub struct ChatService {
    deps: ChatServiceDependencies,
}

impl ChatService {
    pub fn new(deps: ChatServiceDependencies) -> Self {
        Self { deps }
    }

    /// 房间存在且 `user_id` 是参与者之一时返回房间。
    pub async fn check_access(
        &self,
        room_id: Uuid,
        user_id: Uuid,
    ) -> Result<ChatRoom, ApplicationError> {
        let room = self
            .deps
            .room_repository
            .find_by_id(RoomId::from(room_id))
            .await?
            .ok_or(DomainError::RoomNotFound)?;

        if !room.has_participant(UserId::from(user_id)) {
            return Err(DomainError::NotRoomParticipant.into());
        }

        Ok(room)
    }

    /// 配额扣减成功后持久化消息，然后才向房间订阅者广播。
    ///
    /// 广播失败不回滚也不报错：消息已落库，掉线方重连后用
    /// `list_messages` 补齐。推送通知同样尽力而为。
    pub async fn send_message(
        &self,
        request: SendMessageRequest,
    ) -> Result<Message, ApplicationError> {
        let room = self.check_access(request.room_id, request.sender_id).await?;

        let sender = self
            .deps
            .user_repository
            .find_by_id(UserId::from(request.sender_id))
            .await?
            .ok_or(DomainError::UserNotFound)?;

        self.deps.quota_service.try_consume(&sender).await?;

        let content = MessageContent::new(request.content)?;
        let now = self.deps.clock.now();
        let message = Message::new(
            MessageId::from(Uuid::new_v4()),
            room.id,
            sender.id,
            content,
            now,
        );

        let stored = self.deps.message_repository.create(message).await?;
        self.deps.room_repository.touch(room.id, now).await?;

        let frame = ChatFrame::message(&stored, sender.username.as_str());
        if let Err(err) = self.deps.broadcaster.broadcast(room.id, frame).await {
            tracing::warn!(room_id = %room.id, message_id = %stored.id, error = %err,
                "message persisted but broadcast failed");
        }

        if let Some(peer) = room.peer_of(sender.id) {
            notify_best_effort(
                self.deps.notifier.as_ref(),
                PushNotification {
                    user_id: peer,
                    kind: NotificationKind::Message,
                    title: format!("Message from {}", sender.username),
                    body: stored.content.preview(100),
                    payload: json!({
                        "room_id": Uuid::from(room.id),
                        "sender_id": Uuid::from(sender.id),
                    }),
                },
            )
            .await;
        }

        Ok(stored)
    }

    /// 全量历史，创建时间升序。仅参与者可读。
    pub async fn list_messages(
        &self,
        room_id: Uuid,
        user_id: Uuid,
    ) -> Result<Vec<Message>, ApplicationError> {
        let room = self.check_access(room_id, user_id).await?;
        let messages = self.deps.message_repository.list_for_room(room.id).await?;
        Ok(messages)
    }

    pub async fn list_rooms(&self, user_id: Uuid) -> Result<Vec<ChatRoom>, ApplicationError> {
        let rooms = self
            .deps
            .room_repository
            .list_for_user(UserId::from(user_id))
            .await?;
        Ok(rooms)
    }
}
