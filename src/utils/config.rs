use dotenvy::dotenv;
use once_cell::sync::Lazy;
use std::env;

pub static CONFIG: Lazy<Config> = Lazy::new(Config::new);

pub struct Config {
    pub channel_capacity: usize,
    pub default_day_dis_time_sec: i64,
}

impl Config {
    fn new() -> Self {
        dotenv().ok();
        Self {
            channel_capacity: env_or("CHANNEL_CAPACITY", 1000),
            default_day_dis_time_sec: env_or("DAY_DIS_TIME_SEC", 120),
        }
    }
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
