use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::models::game::{Game, GamePhase};

/// インメモリのゲームスナップショットストア。
/// save は単純な上書き（last-writer-wins）で楽観ロック等は持たないため、
/// 呼び出し側が RoomLocks で load-mutate-save 全体を直列化すること。
#[derive(Clone, Default)]
pub struct GameRepository {
    games: Arc<Mutex<HashMap<u64, Game>>>,
}

impl GameRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn load(&self, room_id: u64) -> Option<Game> {
        self.games.lock().await.get(&room_id).cloned()
    }

    pub async fn save(&self, game: Game) {
        self.games.lock().await.insert(game.game_id, game);
    }

    pub async fn delete(&self, room_id: u64) -> bool {
        self.games.lock().await.remove(&room_id).is_some()
    }
}

/// 外部のフェーズクロックが書き込むフェーズと残り時間の置き場。
/// コアは読むだけで、自発的にフェーズを進めることはない。
#[derive(Clone, Default)]
pub struct PhaseRepository {
    phases: Arc<Mutex<HashMap<u64, GamePhase>>>,
    timers: Arc<Mutex<HashMap<u64, i64>>>,
}

impl PhaseRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn save_phase(&self, room_id: u64, phase: GamePhase) {
        self.phases.lock().await.insert(room_id, phase);
    }

    pub async fn get_phase(&self, room_id: u64) -> Option<GamePhase> {
        self.phases.lock().await.get(&room_id).copied()
    }

    pub async fn save_timer(&self, room_id: u64, sec: i64) {
        self.timers.lock().await.insert(room_id, sec);
    }

    pub async fn get_timer(&self, room_id: u64) -> Option<i64> {
        self.timers.lock().await.get(&room_id).copied()
    }

    pub async fn decrement_timer(&self, room_id: u64, sec: i64) -> Option<i64> {
        let mut timers = self.timers.lock().await;
        let timer = timers.get_mut(&room_id)?;
        *timer -= sec;
        Some(*timer)
    }

    pub async fn delete(&self, room_id: u64) {
        self.phases.lock().await.remove(&room_id);
        self.timers.lock().await.remove(&room_id);
    }
}

/// 部屋単位の排他。別の部屋同士は並行に進む。
#[derive(Clone, Default)]
pub struct RoomLocks {
    locks: Arc<std::sync::Mutex<HashMap<u64, Arc<Mutex<()>>>>>,
}

impl RoomLocks {
    pub fn lock_for(&self, room_id: u64) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().unwrap();
        locks
            .entry(room_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}
