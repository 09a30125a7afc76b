use std::collections::{BTreeMap, BTreeSet};

use log::{info, warn};
use rand::{seq::SliceRandom, Rng};
use serde::{Deserialize, Serialize};

use super::{
    config::{ConfigError, GameOption},
    player::{Participant, Player},
    role::{Faction, Role},
    round::{KillSource, RoundState, ABSTAIN},
};

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum GameStatus {
    Playing,
    CitizenWin,
    ZombieWin,
    MutantWin,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum GamePhase {
    DayDiscussion,
    DayVote,
    DayFinalVote,
    NightAction,
}

impl GamePhase {
    pub fn is_day(&self) -> bool {
        !matches!(self, GamePhase::NightAction)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Game {
    pub game_id: u64,
    pub status: GameStatus,
    pub setting: GameOption,
    pub players: BTreeMap<u64, Player>, // メンバーID -> プレイヤー
    pub seat_map: BTreeMap<i32, u64>,   // 座席番号 -> メンバーID
    pub vaccine_left: u32,
    pub round: RoundState,
}

impl Game {
    pub fn new(room_id: u64, setting: GameOption) -> Self {
        let vaccine_left = setting.doctor_skill_usage;
        Game {
            game_id: room_id,
            status: GameStatus::Playing,
            setting,
            players: BTreeMap::new(),
            seat_map: BTreeMap::new(),
            vaccine_left,
            round: RoundState::default(),
        }
    }

    /// 座席番号は参加順に 1 から振り、ゲーム中は再利用しない。
    pub fn add_player(&mut self, participant: &Participant) {
        if self.players.contains_key(&participant.member_id) {
            info!(
                "[Game{}] member {} is already in the game",
                self.game_id, participant.member_id
            );
            return;
        }
        let seat = self.seat_map.len() as i32 + 1;
        self.seat_map.insert(seat, participant.member_id);
        self.players
            .insert(participant.member_id, Player::new(participant));
    }

    pub fn seat_of(&self, member_id: u64) -> Option<i32> {
        self.seat_map
            .iter()
            .find(|(_, id)| **id == member_id)
            .map(|(seat, _)| *seat)
    }

    pub fn member_at(&self, seat: i32) -> Option<u64> {
        self.seat_map.get(&seat).copied()
    }

    pub fn live_count(&self) -> usize {
        self.players.values().filter(|p| !p.is_dead).count()
    }

    /// 昼フェーズ開始時のラウンド初期化
    pub fn round_init(&mut self) {
        self.round.clear();
        info!("[Game{}] round state cleared", self.game_id);
    }

    // ---- 役職配布 ----

    pub fn start_game(&mut self, rng: &mut impl Rng) -> Result<(), ConfigError> {
        let deck = self.build_role_deck(rng)?;
        self.status = GameStatus::Playing;

        let game_id = self.game_id;
        for (player, role) in self.players.values_mut().zip(deck) {
            player.role = Some(role);
            player.enable_vote = role.can_vote();
            player.subscribe(format!("game-{}-system", game_id));
            player.subscribe(format!("game-{}-day-chat", game_id));

            if role == Role::Zombie {
                player.subscribe(format!("game-{}-night-chat", game_id));
                player.subscribe(format!("game-{}-zombie-system", game_id));
            }
        }
        info!("[Game{}] role distribution is completed", game_id);
        Ok(())
    }

    fn build_role_deck(&self, rng: &mut impl Rng) -> Result<Vec<Role>, ConfigError> {
        let mut deck = vec![Role::Zombie; self.setting.zombie];
        // ミュータント枠が有効でも実際に入るのは 1/2 の確率。
        // 外れた場合その席はそのまま市民になる。
        if self.setting.mutant && rng.gen_bool(0.5) {
            deck.push(Role::Mutant);
        }
        deck.push(Role::Police);
        deck.push(Role::PlagueDoctor);

        if deck.len() > self.players.len() {
            return Err(ConfigError::TooManyRoles {
                required: deck.len(),
                players: self.players.len(),
            });
        }
        deck.resize(self.players.len(), Role::Citizen);
        deck.shuffle(rng);
        Ok(deck)
    }

    // ---- 投票 ----

    /// 投票の記録。同じ投票者の再投票は上書き。
    pub fn vote(&mut self, member_id: u64, target_seat: i32) {
        self.round.votes.insert(member_id, target_seat);
    }

    /// 処刑対象の集計。棄権(-1)はどの候補の票にも数えない。
    /// 最多得票が一意ならその座席、同数または票なしなら ABSTAIN。
    pub fn vote_result(&self) -> i32 {
        let mut counts: BTreeMap<i32, usize> = BTreeMap::new();
        for target in self.round.votes.values().filter(|t| **t != ABSTAIN) {
            *counts.entry(*target).or_insert(0) += 1;
        }

        let max = match counts.values().copied().max() {
            Some(max) => max,
            None => return ABSTAIN,
        };
        let top: Vec<i32> = counts
            .iter()
            .filter(|(_, count)| **count == max)
            .map(|(seat, _)| *seat)
            .collect();

        if top.len() > 1 {
            ABSTAIN
        } else {
            top[0]
        }
    }

    /// 最終投票は送ること自体が賛成。反対票は存在しない。
    pub fn final_vote(&mut self) {
        self.round.final_votes += 1;
    }

    /// 賛成が生存者の過半（整数除算: 生存5なら3票で成立）で、
    /// かつ処刑対象が確定している場合のみ VOTE 枠に積んで true。
    pub fn final_vote_result(&mut self) -> bool {
        let live = self.live_count() as u32;
        let target = self.vote_result();

        if self.round.final_votes > live / 2 && target != ABSTAIN {
            self.round.kill_targets.insert(KillSource::Vote, target);
            return true;
        }
        false
    }

    // ---- 夜アクション ----

    /// 襲撃指定。同一ソースの再指定は上書き（ラウンド内で一枠のみ）。
    pub fn specify_target(&mut self, source: KillSource, target_seat: i32) {
        self.round.kill_targets.insert(source, target_seat);
    }

    /// 治療対象の指定。残数があれば 1 消費し、残数を返す。
    pub fn heal(&mut self, target_seat: i32) -> u32 {
        self.round.heal_target = Some(target_seat);
        if self.vaccine_left > 0 {
            self.vaccine_left -= 1;
        }
        self.vaccine_left
    }

    /// 警察の調査。ゾンビかどうかだけを返し、
    /// ミュータントは意図的に市民側として報告する。
    pub fn investigate(&self, target_seat: i32) -> Option<Faction> {
        let member_id = self.member_at(target_seat)?;
        let player = self.players.get(&member_id)?;
        match player.role? {
            Role::Zombie => Some(Faction::Zombie),
            _ => Some(Faction::Citizen),
        }
    }

    fn kill(&mut self, member_id: u64) {
        let game_id = self.game_id;
        if let Some(player) = self.players.get_mut(&member_id) {
            player.is_dead = true;
            player.update_subscriptions_on_death(game_id);
            // 死亡者は観戦扱い: 発言のみ禁止
            player.mute_mic = true;
            player.mute_audio = false;
            info!("[Game{}] member {} is dead", game_id, member_id);
        }
    }

    /// 夜の解決。襲撃指定がなければ None（何も変更しない）。
    /// 指定座席を集約し、治療対象はすべての襲撃指定を打ち消す。
    /// 残った対象を死亡処理し、勝敗判定まで行って死亡リストを返す。
    pub fn kill_process(&mut self) -> Option<Vec<i32>> {
        if self.round.kill_targets.is_empty() {
            return None;
        }

        let mut candidates: BTreeSet<i32> =
            self.round.kill_targets.values().copied().collect();
        if let Some(healed) = self.round.heal_target {
            candidates.remove(&healed);
        }

        let death_list: Vec<i32> = candidates.into_iter().collect();
        for seat in &death_list {
            if let Some(member_id) = self.member_at(*seat) {
                self.kill(member_id);
            }
        }
        warn!("[Game{}] final kill list: {:?}", self.game_id, death_list);

        // 勝敗が付いた後の状態は上書きしない
        if self.status == GameStatus::Playing {
            self.status = self.judge_winner();
            if self.status != GameStatus::Playing {
                info!("[Game{}] game over with status: {:?}", self.game_id, self.status);
            }
        }
        Some(death_list)
    }

    // ---- 勝敗判定 ----

    /// ロースターの生存数だけで決まる純粋な判定。
    /// 先に一致した条件が勝ち、どれも満たさなければ Playing。
    pub fn judge_winner(&self) -> GameStatus {
        let citizen = self
            .players
            .values()
            .filter(|p| !p.is_dead && p.role.map_or(true, |r| r.faction() == Faction::Citizen))
            .count();
        let zombie = self
            .players
            .values()
            .filter(|p| !p.is_dead && p.role == Some(Role::Zombie))
            .count();
        let mutant = self
            .players
            .values()
            .filter(|p| !p.is_dead && p.role == Some(Role::Mutant))
            .count();

        if zombie == 0 && mutant == 0 {
            GameStatus::CitizenWin
        } else if mutant == 0 && zombie >= citizen {
            GameStatus::ZombieWin
        } else if mutant > 0 && citizen + zombie <= mutant {
            GameStatus::MutantWin
        } else {
            GameStatus::Playing
        }
    }

    // ---- ボイス権限 ----

    /// フェーズ遷移と死亡処理のたびに全員分を再計算する。
    pub fn update_voice_permissions(&mut self, phase: GamePhase) {
        let day = phase.is_day();
        for player in self.players.values_mut() {
            if player.is_dead {
                player.mute_mic = true;
                player.mute_audio = false;
            } else if day {
                player.mute_mic = false;
                player.mute_audio = false;
            } else {
                // 夜はゾンビだけ会話できる
                let zombie = player.role == Some(Role::Zombie);
                player.mute_mic = !zombie;
                player.mute_audio = !zombie;
            }
        }
    }
}
