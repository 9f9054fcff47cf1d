use std::{env, time::Duration};

// Runtime/server constants (not gameplay tuning).

pub fn http_port() -> u16 {
    env::var("ARENA_SERVER_PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(5000)
}

pub fn round_duration() -> Duration {
    let seconds = env::var("ROUND_DURATION_SECS")
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .unwrap_or(30);
    Duration::from_secs(seconds)
}

pub fn raid_interval() -> Duration {
    let seconds = env::var("RAID_INTERVAL_SECS")
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .unwrap_or(600);
    Duration::from_secs(seconds)
}

pub fn lobby_grace() -> Duration {
    let seconds = env::var("LOBBY_GRACE_SECS")
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .unwrap_or(600);
    Duration::from_secs(seconds)
}

// How often the deadline sweeper wakes up.
pub const SWEEP_INTERVAL: Duration = Duration::from_millis(500);
