use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// 棄権票。集計時の「処刑なし」の返り値としても使う。
pub const ABSTAIN: i32 = -1;

/// 襲撃指定の出どころ。各ソースにつきラウンド内で一枠のみ。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum KillSource {
    Zombie,
    Mutant,
    Vote, // 昼の最終投票で確定した処刑対象
}

/// ラウンドごとに使い捨てる投票・夜アクションの記録。
/// 昼フェーズ開始時の round_init で丸ごとリセットされる。
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RoundState {
    pub votes: BTreeMap<u64, i32>, // 投票者メンバーID -> 対象座席（上書きあり）
    pub final_votes: u32,
    pub heal_target: Option<i32>,
    pub kill_targets: BTreeMap<KillSource, i32>,
}

impl RoundState {
    pub fn clear(&mut self) {
        *self = RoundState::default();
    }
}
