use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::domain::ports::{Clock, ProfileStore, RaidSchedule, RelicStore};
use crate::domain::relics::Relic;

// Shared adjustable time source for deterministic use-case tests.
pub(crate) struct FixedClock(AtomicU64);

impl FixedClock {
    pub(crate) fn at(now_ms: u64) -> Self {
        Self(AtomicU64::new(now_ms))
    }

    pub(crate) fn advance(&self, delta_ms: u64) {
        self.0.fetch_add(delta_ms, Ordering::SeqCst);
    }
}

impl Clock for FixedClock {
    fn now_epoch_millis(&self) -> u64 {
        self.0.load(Ordering::SeqCst)
    }
}

// Recording relic ledger that tests can inspect directly.
#[derive(Default)]
pub(crate) struct RecordingRelicStore {
    relics: Mutex<HashMap<String, Vec<Relic>>>,
}

impl RecordingRelicStore {
    pub(crate) fn relics_snapshot(&self, player: &str) -> Vec<Relic> {
        let guard = self.relics.lock().expect("relics mutex poisoned");
        guard.get(player).cloned().unwrap_or_default()
    }
}

#[async_trait]
impl RelicStore for RecordingRelicStore {
    async fn award(&self, player: &str, relic_id: &str, relic_name: &str) -> Result<(), String> {
        let mut guard = self.relics.lock().expect("relics mutex poisoned");
        let owned = guard.entry(player.to_string()).or_default();
        match owned.iter_mut().find(|r| r.id == relic_id) {
            Some(relic) => relic.count += 1,
            None => owned.push(Relic {
                id: relic_id.to_string(),
                name: relic_name.to_string(),
                count: 1,
            }),
        }
        Ok(())
    }

    async fn relics_for(&self, player: &str) -> Result<Vec<Relic>, String> {
        Ok(self.relics_snapshot(player))
    }
}

// Profile sink; tests only care that upserts do not fail.
#[derive(Default)]
pub(crate) struct RecordingProfileStore {
    profiles: Mutex<HashMap<String, String>>,
}

impl RecordingProfileStore {
    pub(crate) fn email_of(&self, name: &str) -> Option<String> {
        let guard = self.profiles.lock().expect("profiles mutex poisoned");
        guard.get(name).cloned()
    }
}

#[async_trait]
impl ProfileStore for RecordingProfileStore {
    async fn upsert_profile(&self, name: &str, email: &str) -> Result<(), String> {
        let mut guard = self.profiles.lock().expect("profiles mutex poisoned");
        guard.insert(name.to_string(), email.to_string());
        Ok(())
    }
}

// Pinned raid timetable for schedule-sensitive tests.
pub(crate) struct FixedRaidSchedule(pub(crate) u64);

impl RaidSchedule for FixedRaidSchedule {
    fn next_start_time(&self, _now_ms: u64) -> u64 {
        self.0
    }
}
