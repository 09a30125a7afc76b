pub mod config;
pub mod game;
pub mod player;
pub mod role;
pub mod round;
