use std::collections::HashMap;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::ports::{Clock, ProfileStore, RelicStore};
use crate::domain::relics::Relic;
use crate::use_cases::LobbyRegistry;

// Shared application state for the HTTP handlers.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<LobbyRegistry>,
}

// System clock adapter used outside tests.
#[derive(Clone)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_epoch_millis(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64
    }
}

// In-memory relic ledger. Relics persist across lobbies for the process
// lifetime; a database-backed adapter would implement the same port.
#[derive(Default)]
pub struct InMemoryRelicStore {
    relics: Mutex<HashMap<String, Vec<Relic>>>,
}

#[async_trait]
impl RelicStore for InMemoryRelicStore {
    async fn award(&self, player: &str, relic_id: &str, relic_name: &str) -> Result<(), String> {
        let mut relics = self.relics.lock().await;
        let owned = relics.entry(player.to_string()).or_default();
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
        let relics = self.relics.lock().await;
        Ok(relics.get(player).cloned().unwrap_or_default())
    }
}

// In-memory player profile store keyed by name.
#[derive(Default)]
pub struct InMemoryProfileStore {
    profiles: Mutex<HashMap<String, String>>,
}

#[async_trait]
impl ProfileStore for InMemoryProfileStore {
    async fn upsert_profile(&self, name: &str, email: &str) -> Result<(), String> {
        let mut profiles = self.profiles.lock().await;
        profiles.insert(name.to_string(), email.to_string());
        Ok(())
    }
}
