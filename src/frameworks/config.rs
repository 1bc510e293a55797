use std::{env, time::Duration};

// Runtime/server constants (not physical tuning).

pub fn http_port() -> u16 {
    env::var("MARKLIN_SERVER_PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(3100)
}

pub fn tick_interval() -> Duration {
    let millis = env::var("TICK_INTERVAL_MS")
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .unwrap_or(50);
    Duration::from_millis(millis)
}

pub const COMMAND_CHANNEL_CAPACITY: usize = 1024;
pub const TICK_BROADCAST_CAPACITY: usize = 128;
