use std::collections::HashMap;
use std::sync::Mutex;

use log::debug;
use serde_json::Value;
use tokio::sync::broadcast;

use crate::utils::config::CONFIG;

#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error("チャンネル {0} への送信に失敗しました")]
    SendFailed(String),
}

/// 外部 pub/sub への出口。配信の実体は差し替えられるようにしておく。
pub trait GamePublisher: Send + Sync {
    fn publish(&self, channel: &str, message: Value) -> Result<(), PublishError>;
}

/// tokio broadcast ベースの配信。トピック名ごとにチャンネルを遅延生成する。
#[derive(Default)]
pub struct BroadcastPublisher {
    channels: Mutex<HashMap<String, broadcast::Sender<Value>>>,
}

impl BroadcastPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, channel: &str) -> broadcast::Receiver<Value> {
        self.sender_for(channel).subscribe()
    }

    fn sender_for(&self, channel: &str) -> broadcast::Sender<Value> {
        let mut channels = self.channels.lock().unwrap();
        channels
            .entry(channel.to_string())
            .or_insert_with(|| broadcast::channel(CONFIG.channel_capacity).0)
            .clone()
    }
}

impl GamePublisher for BroadcastPublisher {
    fn publish(&self, channel: &str, message: Value) -> Result<(), PublishError> {
        debug!("publish {}: {}", channel, message);
        // 購読者がいないチャンネルへの送信は破棄するだけで失敗にしない
        let _ = self.sender_for(channel).send(message);
        Ok(())
    }
}
