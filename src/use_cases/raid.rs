// Process-wide raid timetable.

use std::time::Duration;

use crate::domain::ports::RaidSchedule;

/// Boss fights start on fixed interval boundaries measured from the epoch,
/// so every process and every poll agrees on the same timetable.
#[derive(Debug, Clone, Copy)]
pub struct FixedIntervalSchedule {
    interval_ms: u64,
}

impl FixedIntervalSchedule {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval_ms: interval.as_millis().max(1) as u64,
        }
    }
}

impl RaidSchedule for FixedIntervalSchedule {
    fn next_start_time(&self, now_ms: u64) -> u64 {
        (now_ms / self.interval_ms + 1) * self.interval_ms
    }
}
