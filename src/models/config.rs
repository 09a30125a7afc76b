use serde::{Deserialize, Serialize};

use crate::utils::config::CONFIG;

/// ゲーム作成時に確定するルール設定。以後は変更しない。
/// 可変な派生値（残りワクチン数など）は Game 側で持つ。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameOption {
    pub zombie: usize,           // ゾンビの人数
    pub mutant: bool,            // ミュータント枠を有効にするか
    pub doctor_skill_usage: u32, // 医者の治療回数の初期値
    pub day_dis_time_sec: i64,   // 昼の議論時間（秒）
}

impl Default for GameOption {
    fn default() -> Self {
        GameOption {
            zombie: 2,
            mutant: true,
            doctor_skill_usage: 1,
            day_dis_time_sec: CONFIG.default_day_dis_time_sec,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("役職の数がプレイヤー数を超えています（必要 {required} / 参加 {players}）")]
    TooManyRoles { required: usize, players: usize },
}
