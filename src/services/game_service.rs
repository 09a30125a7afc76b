use std::sync::{Arc, Mutex};

use chrono::Utc;
use log::info;
use rand::{rngs::StdRng, SeedableRng};
use serde_json::{json, Value};

use crate::{
    models::{
        config::{ConfigError, GameOption},
        game::{Game, GamePhase, GameStatus},
        player::{Participant, Player},
        role::Role,
        round::{KillSource, ABSTAIN},
    },
    services::publisher::{GamePublisher, PublishError},
    state::{GameRepository, PhaseRepository, RoomLocks},
};

/// 議論スキップ後に最低限残す秒数
const MIN_DISCUSSION_SEC: i64 = 15;

#[derive(Debug, thiserror::Error)]
pub enum GameError {
    #[error("ゲームが見つかりません")]
    GameNotFound,
    #[error("フェーズ情報が見つかりません")]
    PhaseNotFound,
    #[error("ゲームは既に開始されています")]
    GameAlreadyStarted,
    #[error("ゲームは既に終了しています")]
    GameAlreadyEnded,
    #[error("ゲームはまだ終了していません")]
    GameNotEnded,
    #[error("現在のフェーズでは実行できない操作です")]
    InvalidPhase,
    #[error("死亡したプレイヤーは投票できません")]
    DeadCannotVote,
    #[error("ミュータントは投票できません")]
    MutantCannotVote,
    #[error("その役職では実行できないアクションです")]
    NotYourAction,
    #[error("対象のプレイヤーが見つかりません")]
    PlayerNotFound,
    #[error("残りのワクチンがありません")]
    NoVaccineLeft,
    #[error("残り時間が少ないためスキップできません")]
    GameTimeOver,
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("通知の送信に失敗しました: {0}")]
    PublishFailed(#[from] PublishError),
}

/// ラウンド進行のオーケストレータ。
/// すべての変更系操作は部屋単位のロックを load-mutate-save の間
/// 保持し、先頭で現在フェーズを検証する。
pub struct GameService {
    pub games: GameRepository,
    pub phases: PhaseRepository,
    pub publisher: Arc<dyn GamePublisher>,
    locks: RoomLocks,
    rng: Mutex<StdRng>,
}

impl GameService {
    pub fn new(publisher: Arc<dyn GamePublisher>) -> Self {
        Self::with_rng(publisher, StdRng::from_entropy())
    }

    /// テストから seed 固定の乱数を注入するためのコンストラクタ
    pub fn with_rng(publisher: Arc<dyn GamePublisher>, rng: StdRng) -> Self {
        GameService {
            games: GameRepository::new(),
            phases: PhaseRepository::new(),
            publisher,
            locks: RoomLocks::default(),
            rng: Mutex::new(rng),
        }
    }

    fn system_channel(room_id: u64) -> String {
        format!("game-{}-system", room_id)
    }

    fn zombie_channel(room_id: u64) -> String {
        format!("game-{}-zombie-system", room_id)
    }

    pub async fn find_by_id(&self, room_id: u64) -> Result<Game, GameError> {
        self.games.load(room_id).await.ok_or(GameError::GameNotFound)
    }

    /// フェーズ別の呼び出し制限。ずれていたら呼び出し側の誤りとして拒否する。
    pub async fn validate_phase(
        &self,
        room_id: u64,
        expected: GamePhase,
    ) -> Result<(), GameError> {
        let current = self
            .phases
            .get_phase(room_id)
            .await
            .ok_or(GameError::PhaseNotFound)?;
        if current != expected {
            return Err(GameError::InvalidPhase);
        }
        Ok(())
    }

    /// ゲーム開始。ロースター登録、役職配布、昼フェーズとタイマーの設定まで。
    pub async fn start_game(
        &self,
        room_id: u64,
        participants: &[Participant],
        setting: GameOption,
    ) -> Result<(), GameError> {
        let lock = self.locks.lock_for(room_id);
        let _guard = lock.lock().await;

        if self.games.load(room_id).await.is_some() {
            return Err(GameError::GameAlreadyStarted);
        }

        let mut game = Game::new(room_id, setting);
        for participant in participants {
            game.add_player(participant);
        }
        {
            let mut rng = self.rng.lock().unwrap();
            game.start_game(&mut *rng)?;
        }

        let day_sec = game.setting.day_dis_time_sec;
        self.phases.save_phase(room_id, GamePhase::DayDiscussion).await;
        self.phases.save_timer(room_id, day_sec).await;
        self.games.save(game).await;
        info!(
            "Game started in Room {}: phase set to {:?}, timer set to {} seconds",
            room_id,
            GamePhase::DayDiscussion,
            day_sec
        );
        Ok(())
    }

    /// 終了シーン用のプレイヤー一覧。勝敗が付くまでは見せない。
    pub async fn end_game_players(&self, room_id: u64) -> Result<Vec<Player>, GameError> {
        let game = self.find_by_id(room_id).await?;
        if game.status == GameStatus::Playing {
            return Err(GameError::GameNotEnded);
        }
        Ok(game.players.into_values().collect())
    }

    /// ロビーへ戻るときの後片付け
    pub async fn delete_game(&self, room_id: u64) -> Result<(), GameError> {
        let lock = self.locks.lock_for(room_id);
        let _guard = lock.lock().await;

        let game = self.games.load(room_id).await.ok_or(GameError::GameNotFound)?;
        self.phases
            .get_phase(room_id)
            .await
            .ok_or(GameError::PhaseNotFound)?;
        self.phases
            .get_timer(room_id)
            .await
            .ok_or(GameError::PhaseNotFound)?;

        self.publisher
            .publish(&Self::system_channel(room_id), json!({"backroom": true}))?;

        self.phases.delete(room_id).await;
        self.games.delete(room_id).await;
        info!("Room {} deleted ({} players).", room_id, game.players.len());
        Ok(())
    }

    /// 外部のフェーズクロックから呼ばれる。フェーズ保存・ラウンド初期化・
    /// ボイス権限の再計算をまとめて行い、フェーズ通知を流す。
    pub async fn change_phase(&self, room_id: u64, phase: GamePhase) -> Result<(), GameError> {
        let lock = self.locks.lock_for(room_id);
        let _guard = lock.lock().await;

        let mut game = self.games.load(room_id).await.ok_or(GameError::GameNotFound)?;
        if phase == GamePhase::DayDiscussion {
            game.round_init();
            self.phases.save_timer(room_id, game.setting.day_dis_time_sec).await;
        }
        game.update_voice_permissions(phase);
        self.phases.save_phase(room_id, phase).await;
        self.games.save(game).await;

        self.publisher.publish(
            &Self::system_channel(room_id),
            json!({
                "phase": format!("{:?}", phase),
                "timestamp": Utc::now().to_rfc3339(),
            }),
        )?;
        Ok(())
    }

    /// 昼の処刑投票（DayVote 限定）
    pub async fn vote(
        &self,
        room_id: u64,
        member_id: u64,
        target_seat: i32,
    ) -> Result<(), GameError> {
        let lock = self.locks.lock_for(room_id);
        let _guard = lock.lock().await;
        self.validate_phase(room_id, GamePhase::DayVote).await?;

        let mut game = self.games.load(room_id).await.ok_or(GameError::GameNotFound)?;
        if game.status != GameStatus::Playing {
            return Err(GameError::GameAlreadyEnded);
        }
        let voter = game
            .players
            .get(&member_id)
            .ok_or(GameError::PlayerNotFound)?;
        if voter.is_dead {
            return Err(GameError::DeadCannotVote);
        }
        if !voter.enable_vote {
            return Err(GameError::MutantCannotVote);
        }

        if target_seat == ABSTAIN {
            info!("[Game{}] member {} abstained", room_id, member_id);
        }
        game.vote(member_id, target_seat);
        self.games.save(game).await;
        info!(
            "Member {} voted for seat {} in Room {}.",
            member_id, target_seat, room_id
        );
        Ok(())
    }

    /// 最終投票。送ること自体が賛成（DayFinalVote 限定）
    pub async fn final_vote(&self, room_id: u64, member_id: u64) -> Result<(), GameError> {
        let lock = self.locks.lock_for(room_id);
        let _guard = lock.lock().await;
        self.validate_phase(room_id, GamePhase::DayFinalVote).await?;

        let mut game = self.games.load(room_id).await.ok_or(GameError::GameNotFound)?;
        if game.status != GameStatus::Playing {
            return Err(GameError::GameAlreadyEnded);
        }
        let voter = game
            .players
            .get(&member_id)
            .ok_or(GameError::PlayerNotFound)?;
        if voter.is_dead {
            return Err(GameError::DeadCannotVote);
        }
        if !voter.enable_vote {
            return Err(GameError::MutantCannotVote);
        }

        game.final_vote();
        self.games.save(game).await;
        Ok(())
    }

    /// 最終投票の結果確定。処刑成立なら VOTE 枠を積んで保存し、
    /// 成否を votekill としてシステムチャンネルへ流す。
    pub async fn final_vote_result(&self, room_id: u64) -> Result<bool, GameError> {
        let lock = self.locks.lock_for(room_id);
        let _guard = lock.lock().await;
        self.validate_phase(room_id, GamePhase::DayFinalVote).await?;

        let mut game = self.games.load(room_id).await.ok_or(GameError::GameNotFound)?;
        if game.status != GameStatus::Playing {
            return Err(GameError::GameAlreadyEnded);
        }
        let executed = game.final_vote_result();
        if executed {
            info!("[Game{}] execution target confirmed", room_id);
            self.games.save(game).await;
        }
        // 保存済みの状態は publish が失敗しても巻き戻さない
        self.publisher
            .publish(&Self::system_channel(room_id), json!({"votekill": executed}))?;
        Ok(executed)
    }

    /// 夜の役職アクション（NightAction 限定）。
    /// 役職ごとに分岐し、本人にだけ返す結果テキストを作る。
    pub async fn set_target(
        &self,
        room_id: u64,
        member_id: u64,
        target_seat: i32,
    ) -> Result<String, GameError> {
        let lock = self.locks.lock_for(room_id);
        let _guard = lock.lock().await;
        self.validate_phase(room_id, GamePhase::NightAction).await?;

        let mut game = self.games.load(room_id).await.ok_or(GameError::GameNotFound)?;
        if game.status != GameStatus::Playing {
            return Err(GameError::GameAlreadyEnded);
        }
        let actor = game
            .players
            .get(&member_id)
            .ok_or(GameError::PlayerNotFound)?;
        if actor.is_dead {
            return Err(GameError::NotYourAction);
        }
        let role = actor.role.ok_or(GameError::NotYourAction)?;

        let result = match role {
            Role::Zombie => {
                game.specify_target(KillSource::Zombie, target_seat);
                self.games.save(game).await;
                self.publisher.publish(
                    &Self::zombie_channel(room_id),
                    json!({"zombiepick": target_seat}),
                )?;
                format!("{}番は感染ターゲットになりました", target_seat)
            }
            Role::Mutant => {
                game.specify_target(KillSource::Mutant, target_seat);
                self.games.save(game).await;
                format!("{}番はミュータントのターゲットになりました", target_seat)
            }
            Role::Police => {
                // 調査は状態を変えない。結果は依頼者にだけ返す。
                let faction = game
                    .investigate(target_seat)
                    .ok_or(GameError::PlayerNotFound)?;
                format!("{}番の役職は{}です", target_seat, faction)
            }
            Role::PlagueDoctor => {
                if game.vaccine_left == 0 {
                    return Err(GameError::NoVaccineLeft);
                }
                let left = game.heal(target_seat);
                self.games.save(game).await;
                format!(
                    "{}番を治療対象にしました。残りワクチンは{}個です",
                    target_seat, left
                )
            }
            Role::Citizen => return Err(GameError::NotYourAction),
        };

        info!(
            "[Game{}] member {} ({:?}) set the target of seat {}",
            room_id, member_id, role, target_seat
        );
        Ok(result)
    }

    /// 夜の解決。死亡処理と勝敗判定を行い、治療・死亡の通知を流す。
    pub async fn night_result(&self, room_id: u64) -> Result<Vec<i32>, GameError> {
        let lock = self.locks.lock_for(room_id);
        let _guard = lock.lock().await;
        self.validate_phase(room_id, GamePhase::NightAction).await?;

        let mut game = self.games.load(room_id).await.ok_or(GameError::GameNotFound)?;
        if game.status != GameStatus::Playing {
            return Err(GameError::GameAlreadyEnded);
        }
        let heal_target = game.round.heal_target;
        let death_list = game.kill_process();

        let mut message = serde_json::Map::new();
        if let Some(deaths) = &death_list {
            if let Some(healed) = heal_target {
                message.insert("heal".into(), json!(healed.to_string()));
                info!("[Game{}] seat {} was saved by the doctor", room_id, healed);
            }
            if !deaths.is_empty() {
                let joined = deaths
                    .iter()
                    .map(|s| s.to_string())
                    .collect::<Vec<_>>()
                    .join(", ");
                message.insert("death".into(), json!(joined));
            }
        }

        let deaths = death_list.unwrap_or_default();
        self.games.save(game).await;
        if !message.is_empty() {
            self.publisher
                .publish(&Self::system_channel(room_id), Value::Object(message))?;
        }
        Ok(deaths)
    }

    /// 議論時間の短縮。残りを 15 秒未満にする短縮は拒否する。
    pub async fn skip_discussion(&self, room_id: u64, sec: i64) -> Result<i64, GameError> {
        let lock = self.locks.lock_for(room_id);
        let _guard = lock.lock().await;
        self.validate_phase(room_id, GamePhase::DayDiscussion).await?;

        let now = self
            .phases
            .get_timer(room_id)
            .await
            .ok_or(GameError::PhaseNotFound)?;
        // 負のスキップで時間を延ばすことはできない
        if sec <= 0 || now - sec < MIN_DISCUSSION_SEC {
            return Err(GameError::GameTimeOver);
        }
        self.phases
            .decrement_timer(room_id, sec)
            .await
            .ok_or(GameError::PhaseNotFound)
    }
}
