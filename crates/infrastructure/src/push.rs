use std::sync::Arc;

use application::{NotificationDispatcher, NotifyError, PushNotification, UserRepository};
use async_trait::async_trait;
use once_cell::sync::OnceCell;
use serde_json::json;

/// 推送服务配置。`server_key` 缺省时推送整体关闭。
#[derive(Debug, Clone)]
pub struct PushConfig {
    pub endpoint: String,
    pub server_key: Option<String>,
}

impl PushConfig {
    pub fn disabled() -> Self {
        Self {
            endpoint: String::new(),
            server_key: None,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.server_key.is_some() && !self.endpoint.is_empty()
    }
}

/// FCM 风格的推送派发器（外部协作方）。
///
/// HTTP 客户端是进程级一次性初始化的状态：首次真正需要发送时创建，
/// 之后复用同一会话；未配置凭据时保持未初始化，notify 退化为空操作。
pub struct FcmNotificationDispatcher {
    config: PushConfig,
    client: OnceCell<reqwest::Client>,
    user_repository: Arc<dyn UserRepository>,
}

impl FcmNotificationDispatcher {
    pub fn new(config: PushConfig, user_repository: Arc<dyn UserRepository>) -> Self {
        Self {
            config,
            client: OnceCell::new(),
            user_repository,
        }
    }

    fn client(&self) -> &reqwest::Client {
        self.client.get_or_init(reqwest::Client::new)
    }
}

#[async_trait]
impl NotificationDispatcher for FcmNotificationDispatcher {
    async fn notify(&self, notification: PushNotification) -> Result<(), NotifyError> {
        if !self.config.is_enabled() {
            tracing::debug!(user_id = %notification.user_id, "push disabled, notification skipped");
            return Ok(());
        }

        let user = self
            .user_repository
            .find_by_id(notification.user_id)
            .await
            .map_err(|err| NotifyError::dispatch(err.to_string()))?;

        let Some(token) = user.and_then(|user| user.push_token) else {
            tracing::debug!(user_id = %notification.user_id, "no push token registered");
            return Ok(());
        };

        let server_key = self.config.server_key.as_deref().unwrap_or_default();
        let body = json!({
            "to": token,
            "notification": {
                "title": notification.title,
                "body": notification.body,
            },
            "data": {
                "kind": notification.kind,
                "payload": notification.payload,
            },
        });

        let response = self
            .client()
            .post(&self.config.endpoint)
            .bearer_auth(server_key)
            .json(&body)
            .send()
            .await
            .map_err(|err| NotifyError::dispatch(err.to_string()))?;

        if !response.status().is_success() {
            return Err(NotifyError::dispatch(format!(
                "push endpoint returned {}",
                response.status()
            )));
        }

        Ok(())
    }
}
