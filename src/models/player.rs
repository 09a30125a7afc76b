use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use super::role::Role;

/// ロビーから引き渡されるロースター情報
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Participant {
    pub member_id: u64,
    pub nickname: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Player {
    pub member_id: u64,
    pub nickname: String,
    pub role: Option<Role>, // 役職配布まで None
    pub is_dead: bool,
    pub enable_vote: bool,
    pub mute_mic: bool,
    pub mute_audio: bool,
    pub subscriptions: BTreeSet<String>,
}

impl Player {
    pub fn new(participant: &Participant) -> Self {
        Player {
            member_id: participant.member_id,
            nickname: participant.nickname.clone(),
            role: None,
            is_dead: false,
            enable_vote: true,
            mute_mic: false,
            mute_audio: false,
            subscriptions: BTreeSet::new(),
        }
    }

    pub fn subscribe(&mut self, channel: impl Into<String>) {
        self.subscriptions.insert(channel.into());
    }

    pub fn unsubscribe(&mut self, channel: &str) {
        self.subscriptions.remove(channel);
    }

    /// 死亡時の購読切り替え。陣営限定チャンネルを外し、
    /// 観戦用に昼チャットとシステムは読めるままにする。
    pub fn update_subscriptions_on_death(&mut self, game_id: u64) {
        self.unsubscribe(&format!("game-{}-night-chat", game_id));
        self.unsubscribe(&format!("game-{}-zombie-system", game_id));
        self.subscribe(format!("game-{}-system", game_id));
        self.subscribe(format!("game-{}-day-chat", game_id));
    }
}
