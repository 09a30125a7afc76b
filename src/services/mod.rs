pub mod game_service;
pub mod publisher;
