use async_trait::async_trait;

use crate::domain::relics::Relic;

// Port for the persistent relic ledger used by the lifecycle use cases.
#[async_trait]
pub trait RelicStore: Send + Sync {
    /// Upsert: increments the count for `(player, relic)`, creating the row
    /// when absent. Never duplicates rows.
    async fn award(&self, player: &str, relic_id: &str, relic_name: &str) -> Result<(), String>;

    /// Read-only; an unknown player yields an empty list, not an error.
    async fn relics_for(&self, player: &str) -> Result<Vec<Relic>, String>;
}

// Port for player profile persistence (name -> email association).
#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn upsert_profile(&self, name: &str, email: &str) -> Result<(), String>;
}

// Port for retrieving the current time.
pub trait Clock: Send + Sync {
    fn now_epoch_millis(&self) -> u64;
}

// Port for the process-wide raid timetable. Injected rather than hidden in a
// singleton so tests can pin the schedule.
pub trait RaidSchedule: Send + Sync {
    /// The next scheduled boss-fight start strictly after `now_ms`, in epoch
    /// milliseconds. Monotonic and shared process-wide.
    fn next_start_time(&self, now_ms: u64) -> u64;
}
