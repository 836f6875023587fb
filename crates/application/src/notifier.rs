use async_trait::async_trait;
use domain::UserId;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Match,
    Message,
}

/// 一条待派发的推送通知。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PushNotification {
    pub user_id: UserId,
    pub kind: NotificationKind,
    pub title: String,
    pub body: String,
    pub payload: serde_json::Value,
}

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("dispatch failed: {0}")]
    Dispatch(String),
}

impl NotifyError {
    pub fn dispatch(message: impl Into<String>) -> Self {
        Self::Dispatch(message.into())
    }
}

/// 推送通知端口（外部协作方）。
#[async_trait]
pub trait NotificationDispatcher: Send + Sync {
    async fn notify(&self, notification: PushNotification) -> Result<(), NotifyError>;
}

/// 尽力而为的派发：失败只记日志，绝不向调用方传播。
pub async fn notify_best_effort(
    dispatcher: &dyn NotificationDispatcher,
    notification: PushNotification,
) {
    let user_id = notification.user_id;
    let kind = notification.kind;
    if let Err(err) = dispatcher.notify(notification).await {
        tracing::warn!(%user_id, ?kind, error = %err, "push notification dropped");
    }
}
