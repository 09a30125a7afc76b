pub mod models;
pub mod services;
pub mod state;
pub mod utils;

pub use models::config::{ConfigError, GameOption};
pub use models::game::{Game, GamePhase, GameStatus};
pub use models::player::{Participant, Player};
pub use models::role::{Faction, Role};
pub use models::round::{KillSource, RoundState, ABSTAIN};
pub use services::game_service::{GameError, GameService};
pub use services::publisher::{BroadcastPublisher, GamePublisher, PublishError};
