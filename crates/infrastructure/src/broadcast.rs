use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use application::{BroadcastError, ChatFrame, MessageBroadcaster};
use async_trait::async_trait;
use domain::RoomId;
use tokio::sync::broadcast;

/// 房间键到广播通道的注册表。
///
/// 每个房间一条 tokio broadcast 通道，连接加入即订阅、断开即丢弃
/// 接收端。发送永不阻塞：落后的订阅者丢帧（重连后走历史补齐），
/// 没有订阅者的房间发送直接空转。
pub struct RoomChannelRegistry {
    capacity: usize,
    channels: Mutex<HashMap<RoomId, broadcast::Sender<ChatFrame>>>,
}

impl RoomChannelRegistry {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            channels: Mutex::new(HashMap::new()),
        }
    }

    /// 加入房间的扇出组。通道不存在时创建。
    pub fn subscribe(&self, room_id: RoomId) -> broadcast::Receiver<ChatFrame> {
        let mut channels = self
            .channels
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        channels
            .entry(room_id)
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .subscribe()
    }

    /// 当前房间的订阅连接数。
    pub fn subscriber_count(&self, room_id: RoomId) -> usize {
        self.channels
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&room_id)
            .map(|sender| sender.receiver_count())
            .unwrap_or(0)
    }
}

#[async_trait]
impl MessageBroadcaster for RoomChannelRegistry {
    async fn broadcast(&self, room_id: RoomId, frame: ChatFrame) -> Result<(), BroadcastError> {
        let mut channels = self
            .channels
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        let Some(sender) = channels.get(&room_id) else {
            return Ok(());
        };

        // 全员掉线的房间顺手从注册表清掉，防止无限增长
        if sender.receiver_count() == 0 {
            channels.remove(&room_id);
            return Ok(());
        }

        // send 只会因没有接收者失败，上面刚检查过，竞态下丢一帧也无妨
        let _ = sender.send(frame);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn frame(text: &str) -> ChatFrame {
        ChatFrame::error(text)
    }

    #[tokio::test]
    async fn broadcast_reaches_all_room_subscribers() {
        let registry = RoomChannelRegistry::new(16);
        let room = RoomId::from(Uuid::new_v4());

        let mut first = registry.subscribe(room);
        let mut second = registry.subscribe(room);

        registry.broadcast(room, frame("hello")).await.unwrap();

        assert_eq!(first.recv().await.unwrap(), frame("hello"));
        assert_eq!(second.recv().await.unwrap(), frame("hello"));
    }

    #[tokio::test]
    async fn rooms_are_isolated() {
        let registry = RoomChannelRegistry::new(16);
        let room_a = RoomId::from(Uuid::new_v4());
        let room_b = RoomId::from(Uuid::new_v4());

        let mut a = registry.subscribe(room_a);
        let mut b = registry.subscribe(room_b);

        registry.broadcast(room_a, frame("only-a")).await.unwrap();

        assert_eq!(a.recv().await.unwrap(), frame("only-a"));
        assert!(b.try_recv().is_err());
    }

    #[tokio::test]
    async fn broadcast_without_subscribers_is_a_noop() {
        let registry = RoomChannelRegistry::new(16);
        let room = RoomId::from(Uuid::new_v4());

        // 从未订阅过
        registry.broadcast(room, frame("void")).await.unwrap();

        // 订阅后全部掉线，通道被清理
        let receiver = registry.subscribe(room);
        drop(receiver);
        registry.broadcast(room, frame("void")).await.unwrap();
        assert_eq!(registry.subscriber_count(room), 0);
    }
}
