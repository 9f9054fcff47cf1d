// Lobby registry: owns every lobby behind its own mutex and carries all
// player-facing operations. Different lobbies never contend with each other.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use tokio::sync::{Mutex, RwLock};
use tracing::{info, warn};

use crate::domain::choices::{ActionKind, Resource};
use crate::domain::errors::GameError;
use crate::domain::lobby::{Controller, Inbox, Lobby, LobbyKind, Player};
use crate::domain::ports::{Clock, ProfileStore, RaidSchedule, RelicStore};
use crate::domain::relics::Relic;
use crate::domain::tuning::GameTuning;
use crate::use_cases::lifecycle::MatchEnd;
use crate::use_cases::{bots, rounds};

const GREMLIN_NAME: &str = "Forest Gremlin";
const GREMLIN_TITLE: &str = "Hoarder of Shiny Things";
const RAID_BOSS_NAME: &str = "Gremlin King";
const RAID_BOSS_TITLE: &str = "Lord of the Hoard";

/// Runtime settings for the registry; gameplay numbers live in `GameTuning`.
#[derive(Debug, Clone)]
pub struct RegistrySettings {
    /// Fixed Collecting-phase length per round.
    pub round_duration: Duration,
    /// How long a finished lobby lingers before it is archived.
    pub lobby_grace: Duration,
}

/// Thread-safe registry for active lobbies.
///
/// Lock order: `current_raid`, then the lobby map, then a single lobby mutex.
/// Nothing may take the map or `current_raid` while holding a lobby mutex.
pub struct LobbyRegistry {
    settings: RegistrySettings,
    tuning: GameTuning,
    clock: Arc<dyn Clock>,
    raid_schedule: Arc<dyn RaidSchedule>,
    relics: Arc<dyn RelicStore>,
    profiles: Arc<dyn ProfileStore>,
    lobbies: RwLock<HashMap<String, Arc<Mutex<Lobby>>>>,
    current_raid: Mutex<Option<String>>,
}

impl LobbyRegistry {
    pub fn new(
        settings: RegistrySettings,
        tuning: GameTuning,
        clock: Arc<dyn Clock>,
        raid_schedule: Arc<dyn RaidSchedule>,
        relics: Arc<dyn RelicStore>,
        profiles: Arc<dyn ProfileStore>,
    ) -> Self {
        Self {
            settings,
            tuning,
            clock,
            raid_schedule,
            relics,
            profiles,
            lobbies: RwLock::new(HashMap::new()),
            current_raid: Mutex::new(None),
        }
    }

    pub async fn create_lobby(&self, name: &str, email: &str) -> Result<String, GameError> {
        let name = validate_name(name)?;
        self.upsert_profile(&name, email).await;

        let now = self.clock.now_epoch_millis();
        let mut lobby = Lobby::new(generate_join_code(), LobbyKind::Standard, now);
        lobby.seat(Player::seated(name, true, &self.tuning));

        let id = self.insert_lobby(lobby).await;
        info!(lobby_id = %id, "lobby created");
        Ok(id)
    }

    pub async fn join_lobby(&self, code: &str, name: &str, email: &str) -> Result<(), GameError> {
        let name = validate_name(name)?;
        let handle = self.handle(code).await?;
        self.upsert_profile(&name, email).await;

        let mut lobby = handle.lock().await;
        seat_in(&mut lobby, name, &self.tuning)
    }

    pub async fn log_in(&self, name: &str, email: &str) -> Result<(), GameError> {
        let name = validate_name(name)?;
        if email.trim().is_empty() {
            return Err(GameError::InvalidEmail);
        }
        self.profiles
            .upsert_profile(&name, email.trim())
            .await
            .map_err(|_| GameError::StorageFailure)
    }

    pub async fn kick_player(
        &self,
        lobby_id: &str,
        admin: &str,
        target: &str,
    ) -> Result<(), GameError> {
        let handle = self.handle(lobby_id).await?;
        let mut lobby = handle.lock().await;

        if !lobby.player(admin).is_some_and(|p| p.admin) {
            return Err(GameError::NotAdmin);
        }
        if lobby.round > 0 {
            return Err(GameError::GameAlreadyStarted);
        }
        if lobby.player(target).is_none() {
            return Err(GameError::PlayerNotFound);
        }
        if target == admin {
            return Err(GameError::InvalidTarget);
        }

        lobby.unseat(target);
        info!(lobby_id = %lobby.id, target, "player kicked");
        Ok(())
    }

    pub async fn add_bot(&self, lobby_id: &str, admin: &str) -> Result<(), GameError> {
        let handle = self.handle(lobby_id).await?;
        let mut lobby = handle.lock().await;

        if !lobby.player(admin).is_some_and(|p| p.admin) {
            return Err(GameError::NotAdmin);
        }
        if lobby.round > 0 {
            return Err(GameError::GameAlreadyStarted);
        }
        if lobby.players.len() >= self.tuning.max_players {
            return Err(GameError::LobbyFull);
        }

        let name = bots::bot_name(&lobby);
        lobby.seat(Player::bot(name, &self.tuning));
        Ok(())
    }

    pub async fn start_game(&self, lobby_id: &str, admin: &str) -> Result<(), GameError> {
        let handle = self.handle(lobby_id).await?;
        let mut lobby = handle.lock().await;

        if lobby.kind == LobbyKind::Raid {
            return Err(GameError::RaidScheduled);
        }
        if !lobby.player(admin).is_some_and(|p| p.admin) {
            return Err(GameError::NotAdmin);
        }
        if lobby.round > 0 || lobby.gameover {
            return Err(GameError::GameAlreadyStarted);
        }
        if lobby.players.len() < self.tuning.min_players {
            return Err(GameError::NotEnoughPlayers);
        }

        rounds::open_round(
            &mut lobby,
            self.clock.now_epoch_millis(),
            self.settings.round_duration,
        );
        info!(lobby_id = %lobby.id, "game started");
        Ok(())
    }

    /// Records (or patches) a player's choice for the current round; empty
    /// fields leave the previous submission alone. Triggers resolution when
    /// the last awaited seat comes in.
    pub async fn submit_choice(
        &self,
        lobby_id: &str,
        player: &str,
        resource: Option<&str>,
        action: Option<&str>,
        target: Option<&str>,
    ) -> Result<(), GameError> {
        let handle = self.handle(lobby_id).await?;
        let end = {
            let mut lobby = handle.lock().await;

            let seat = lobby.player(player).ok_or(GameError::PlayerNotFound)?;
            if seat.spectator {
                return Err(GameError::Spectator);
            }
            if !lobby.round_active() {
                return Err(GameError::RoundNotActive);
            }
            if !seat.is_alive() {
                return Err(GameError::PlayerDown);
            }

            let resource = match resource.filter(|v| !v.is_empty()) {
                Some(value) => Some(Resource::parse(value).ok_or(GameError::UnknownChoice)?),
                None => None,
            };
            let action = match action.filter(|v| !v.is_empty()) {
                Some(value) => Some(ActionKind::parse(value).ok_or(GameError::UnknownChoice)?),
                None => None,
            };
            let target = match action {
                Some(ActionKind::Attack) => {
                    let target = target
                        .filter(|v| !v.is_empty())
                        .ok_or(GameError::InvalidTarget)?;
                    if !lobby.is_valid_target(player, target) {
                        return Err(GameError::InvalidTarget);
                    }
                    Some(target.to_string())
                }
                _ => None,
            };

            let seat = lobby
                .player_mut(player)
                .ok_or(GameError::PlayerNotFound)?;
            if let Some(resource) = resource {
                seat.choice.resource = Some(resource);
            }
            if let Some(action) = action {
                seat.choice.action = Some(action);
                seat.choice.target = target;
            }

            let now = self.clock.now_epoch_millis();
            rounds::drain_resolvable(&mut lobby, now, self.settings.round_duration, &self.tuning)
        };
        self.settle(end).await;
        Ok(())
    }

    /// The deferred deny pick: only the player selected at the previous
    /// resolution may call this, and only for the round in flight.
    pub async fn submit_deny_target(
        &self,
        lobby_id: &str,
        player: &str,
        target: &str,
    ) -> Result<(), GameError> {
        let handle = self.handle(lobby_id).await?;
        let end = {
            let mut lobby = handle.lock().await;

            if lobby.player(player).is_none() {
                return Err(GameError::PlayerNotFound);
            }
            if !lobby.round_active() {
                return Err(GameError::RoundNotActive);
            }
            if lobby.pending_deny.as_deref() != Some(player) {
                return Err(GameError::NotPendingDeny);
            }
            if !lobby.is_valid_target(player, target) {
                return Err(GameError::InvalidTarget);
            }

            lobby.pending_deny = None;
            lobby.deny_target = Some(target.to_string());
            lobby.push_message(target, "You have been denied for this round.".to_string());

            // The denied seat no longer counts toward the round, which may
            // make it resolvable right now.
            let now = self.clock.now_epoch_millis();
            rounds::drain_resolvable(&mut lobby, now, self.settings.round_duration, &self.tuning)
        };
        self.settle(end).await;
        Ok(())
    }

    /// Registers a replay vote; once the threshold is met a fresh lobby with
    /// the same roster is created exactly once and published on the finished
    /// lobby. Returns the chained lobby id when known.
    pub async fn request_replay(
        &self,
        lobby_id: &str,
        player: &str,
    ) -> Result<Option<String>, GameError> {
        let handle = self.handle(lobby_id).await?;

        // Phase one under the lobby lock: vote and, at the threshold, reserve
        // the chained id. Lobby creation happens after the lock is dropped so
        // the map write never nests inside a lobby mutex.
        let reserved = {
            let mut lobby = handle.lock().await;

            let seat = lobby.player(player).ok_or(GameError::PlayerNotFound)?;
            if seat.spectator {
                return Err(GameError::Spectator);
            }
            if !lobby.gameover || lobby.replay_votes_needed == 0 {
                return Err(GameError::ReplayNotOpen);
            }

            lobby.replay_votes.insert(player.to_string());
            // A live vote keeps the finished lobby out of the archiver.
            lobby.ended_at = None;
            if let Some(next) = &lobby.next_lobby_id {
                return Ok(Some(next.clone()));
            }
            if (lobby.replay_votes.len() as u32) < lobby.replay_votes_needed {
                return Ok(None);
            }

            let candidate = generate_join_code();
            lobby.next_lobby_id = Some(candidate.clone());
            let roster: Vec<(String, bool, Controller)> = lobby
                .players
                .iter()
                .filter(|p| !p.spectator && !p.is_boss())
                .map(|p| (p.name.clone(), p.admin, p.controller))
                .collect();
            (candidate, lobby.kind, roster)
        };

        let (candidate, kind, roster) = reserved;
        let now = self.clock.now_epoch_millis();
        let mut fresh = Lobby::new(candidate.clone(), kind, now);
        for (name, admin, controller) in roster {
            match controller {
                Controller::Bot => fresh.seat(Player::bot(name, &self.tuning)),
                _ => fresh.seat(Player::seated(name, admin, &self.tuning)),
            }
        }
        if kind == LobbyKind::Gremlin {
            fresh.seat(Player::boss(
                GREMLIN_NAME.to_string(),
                GREMLIN_TITLE.to_string(),
                self.tuning.gremlin_hp,
                self.tuning.boss_attack,
            ));
            rounds::open_round(&mut fresh, now, self.settings.round_duration);
        }

        let final_id = self.insert_lobby(fresh).await;
        if final_id != candidate {
            // The reserved code collided; fix the published pointer.
            let mut lobby = handle.lock().await;
            lobby.next_lobby_id = Some(final_id.clone());
        }
        info!(lobby_id, next_lobby_id = %final_id, "replay lobby created");
        Ok(Some(final_id))
    }

    /// One human versus the gremlin; no waiting room, the fight starts now.
    pub async fn create_gremlin_lobby(&self, name: &str) -> Result<String, GameError> {
        let name = validate_name(name)?;
        let now = self.clock.now_epoch_millis();

        let mut lobby = Lobby::new(generate_join_code(), LobbyKind::Gremlin, now);
        lobby.seat(Player::seated(name, true, &self.tuning));
        lobby.seat(Player::boss(
            GREMLIN_NAME.to_string(),
            GREMLIN_TITLE.to_string(),
            self.tuning.gremlin_hp,
            self.tuning.boss_attack,
        ));
        rounds::open_round(&mut lobby, now, self.settings.round_duration);

        let id = self.insert_lobby(lobby).await;
        info!(lobby_id = %id, "gremlin lobby created");
        Ok(id)
    }

    /// Returns the raid lobby for the current scheduling window, creating the
    /// next one when none is open, and seats the requester in it.
    pub async fn get_raid_lobby(&self, name: &str) -> Result<String, GameError> {
        let name = validate_name(name)?;
        let mut current = self.current_raid.lock().await;

        let mut open_id = None;
        if let Some(id) = current.clone() {
            if let Ok(handle) = self.handle(&id).await {
                if !handle.lock().await.gameover {
                    open_id = Some(id);
                }
            }
        }

        let id = match open_id {
            Some(id) => id,
            None => {
                let now = self.clock.now_epoch_millis();
                let start_time = self.raid_schedule.next_start_time(now);
                let mut lobby =
                    Lobby::new(generate_join_code(), LobbyKind::Raid, start_time);
                lobby.seat(Player::boss(
                    RAID_BOSS_NAME.to_string(),
                    RAID_BOSS_TITLE.to_string(),
                    self.tuning.raid_boss_hp,
                    self.tuning.boss_attack,
                ));
                let id = self.insert_lobby(lobby).await;
                info!(lobby_id = %id, start_time, "raid lobby opened");
                *current = Some(id.clone());
                id
            }
        };

        let handle = self.handle(&id).await?;
        let mut lobby = handle.lock().await;
        seat_in(&mut lobby, name, &self.tuning)?;
        Ok(id)
    }

    pub async fn next_raid_time(&self) -> u64 {
        self.raid_schedule
            .next_start_time(self.clock.now_epoch_millis())
    }

    pub async fn relics_for(&self, name: &str) -> Result<Vec<Relic>, GameError> {
        self.relics
            .relics_for(name)
            .await
            .map_err(|_| GameError::StorageFailure)
    }

    /// Latest committed snapshot for the polling endpoints; never waits on a
    /// resolution in progress beyond the lobby lock itself.
    pub async fn lobby_snapshot(&self, lobby_id: &str) -> Result<Lobby, GameError> {
        let handle = self.handle(lobby_id).await?;
        let lobby = handle.lock().await;
        Ok(lobby.clone())
    }

    pub async fn player_messages(
        &self,
        lobby_id: &str,
        player: &str,
    ) -> Result<Inbox, GameError> {
        let handle = self.handle(lobby_id).await?;
        let lobby = handle.lock().await;
        Ok(lobby.inboxes.get(player).cloned().unwrap_or_default())
    }

    /// Time-triggered pass over every lobby: auto-starts raid fights, resolves
    /// expired rounds and archives finished lobbies after the grace window.
    /// Resolution is idempotent and deadline checks live behind the same lock
    /// as submissions, so at-least-once sweeping is safe.
    pub async fn sweep(&self) {
        let handles: Vec<Arc<Mutex<Lobby>>> = {
            let lobbies = self.lobbies.read().await;
            lobbies.values().cloned().collect()
        };
        let now = self.clock.now_epoch_millis();
        let grace_ms = self.settings.lobby_grace.as_millis() as u64;

        let mut expired: Vec<String> = Vec::new();
        for handle in handles {
            let end = {
                let mut lobby = handle.lock().await;
                if lobby.gameover {
                    match lobby.ended_at {
                        Some(ended) if now >= ended.saturating_add(grace_ms) => {
                            expired.push(lobby.id.clone());
                        }
                        Some(_) => {}
                        None => lobby.ended_at = Some(now),
                    }
                    continue;
                }

                if lobby.kind == LobbyKind::Raid
                    && lobby.round == 0
                    && now >= lobby.start_time
                    && lobby.human_count() >= 1
                {
                    rounds::open_round(&mut lobby, now, self.settings.round_duration);
                    info!(lobby_id = %lobby.id, "raid fight started");
                }

                rounds::drain_resolvable(
                    &mut lobby,
                    now,
                    self.settings.round_duration,
                    &self.tuning,
                )
            };
            self.settle(end).await;
        }

        if !expired.is_empty() {
            let mut lobbies = self.lobbies.write().await;
            for id in &expired {
                lobbies.remove(id);
                info!(lobby_id = %id, "lobby archived");
            }
        }
    }

    async fn handle(&self, lobby_id: &str) -> Result<Arc<Mutex<Lobby>>, GameError> {
        let lobbies = self.lobbies.read().await;
        lobbies
            .get(lobby_id)
            .cloned()
            .ok_or(GameError::LobbyNotFound)
    }

    async fn insert_lobby(&self, mut lobby: Lobby) -> String {
        let mut lobbies = self.lobbies.write().await;
        while lobbies.contains_key(&lobby.id) {
            lobby.id = generate_join_code();
        }
        let id = lobby.id.clone();
        lobbies.insert(id.clone(), Arc::new(Mutex::new(lobby)));
        id
    }

    /// Applies end-of-match side effects that live behind async ports.
    async fn settle(&self, end: Option<MatchEnd>) {
        let Some(end) = end else { return };
        if let Some((player, relic)) = end.relic_award {
            if let Err(error) = self.relics.award(&player, relic.id, relic.name).await {
                warn!(%player, relic_id = relic.id, %error, "failed to award relic");
            }
        }
    }

    /// Best-effort persistence of the player profile for later lookups.
    async fn upsert_profile(&self, name: &str, email: &str) {
        let email = email.trim();
        if email.is_empty() {
            return;
        }
        if let Err(error) = self.profiles.upsert_profile(name, email).await {
            warn!(%name, %error, "failed to upsert player profile");
        }
    }
}

/// Seats a joiner by match phase: a regular seat before the first round, an
/// observer afterwards. Re-joining under a seated name is a no-op.
fn seat_in(lobby: &mut Lobby, name: String, tuning: &GameTuning) -> Result<(), GameError> {
    if lobby.player(&name).is_some() {
        return Ok(());
    }
    if lobby.round == 0 && !lobby.gameover {
        if lobby.players.len() >= tuning.max_players {
            return Err(GameError::LobbyFull);
        }
        lobby.seat(Player::seated(name, false, tuning));
    } else {
        lobby.seat(Player::observer(name));
    }
    Ok(())
}

fn validate_name(value: &str) -> Result<String, GameError> {
    const MAX_LEN: usize = 32;

    let len = value.chars().count();
    if len == 0 || len > MAX_LEN || value.trim() != value {
        return Err(GameError::InvalidName);
    }
    // Keep names compact and readable for game UI and logs.
    if !value
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, ' ' | '_' | '-'))
    {
        return Err(GameError::InvalidName);
    }

    Ok(value.to_string())
}

fn generate_join_code() -> String {
    // No 0/O/1/I: these codes get typed from a friend's screen.
    const ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";
    let mut rng = rand::thread_rng();
    (0..6)
        .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::relics::VICTORS_LAUREL;
    use crate::use_cases::test_support::{
        FixedClock, FixedRaidSchedule, RecordingProfileStore, RecordingRelicStore,
    };

    const NOW: u64 = 1_000_000;
    const RAID_START: u64 = 2_000_000;

    struct Harness {
        registry: LobbyRegistry,
        clock: Arc<FixedClock>,
        relics: Arc<RecordingRelicStore>,
        profiles: Arc<RecordingProfileStore>,
    }

    fn harness() -> Harness {
        harness_with_tuning(GameTuning::default())
    }

    fn harness_with_tuning(tuning: GameTuning) -> Harness {
        let clock = Arc::new(FixedClock::at(NOW));
        let relics = Arc::new(RecordingRelicStore::default());
        let profiles = Arc::new(RecordingProfileStore::default());
        let registry = LobbyRegistry::new(
            RegistrySettings {
                round_duration: Duration::from_secs(30),
                lobby_grace: Duration::from_secs(600),
            },
            tuning,
            clock.clone(),
            Arc::new(FixedRaidSchedule(RAID_START)),
            relics.clone(),
            profiles.clone(),
        );
        Harness {
            registry,
            clock,
            relics,
            profiles,
        }
    }

    /// Create + join + start with two seated humans, returns the lobby id.
    async fn started_duel(h: &Harness) -> String {
        let id = h
            .registry
            .create_lobby("ann", "ann@example.com")
            .await
            .expect("create");
        h.registry
            .join_lobby(&id, "ben", "ben@example.com")
            .await
            .expect("join");
        h.registry.start_game(&id, "ann").await.expect("start");
        id
    }

    async fn snapshot(h: &Harness, id: &str) -> Lobby {
        h.registry.lobby_snapshot(id).await.expect("snapshot")
    }

    #[tokio::test]
    async fn when_a_lobby_is_created_then_the_creator_is_the_seated_admin() {
        let h = harness();

        let id = h
            .registry
            .create_lobby("ann", "ann@example.com")
            .await
            .expect("create");

        let lobby = snapshot(&h, &id).await;
        assert_eq!(lobby.round, 0);
        assert_eq!(lobby.players.len(), 1);
        assert!(lobby.players[0].admin);
        assert_eq!(lobby.players[0].name, "ann");
        assert!(lobby.holds_time_invariant());
        assert_eq!(
            h.profiles.email_of("ann").as_deref(),
            Some("ann@example.com")
        );
    }

    #[tokio::test]
    async fn when_the_name_is_invalid_then_creation_is_rejected() {
        let h = harness();

        assert_eq!(
            h.registry.create_lobby("", "a@b.c").await,
            Err(GameError::InvalidName)
        );
        assert_eq!(
            h.registry.create_lobby(" ann", "a@b.c").await,
            Err(GameError::InvalidName)
        );
        assert_eq!(
            h.registry.create_lobby("ann!", "a@b.c").await,
            Err(GameError::InvalidName)
        );
    }

    #[tokio::test]
    async fn when_joining_an_unknown_code_then_lobby_not_found() {
        let h = harness();

        let result = h.registry.join_lobby("NOPE42", "ben", "").await;

        assert_eq!(result, Err(GameError::LobbyNotFound));
    }

    #[tokio::test]
    async fn when_the_lobby_is_full_then_joining_fails() {
        let mut tuning = GameTuning::default();
        tuning.max_players = 2;
        let h = harness_with_tuning(tuning);
        let id = h.registry.create_lobby("ann", "").await.expect("create");
        h.registry.join_lobby(&id, "ben", "").await.expect("join");

        let result = h.registry.join_lobby(&id, "cid", "").await;

        assert_eq!(result, Err(GameError::LobbyFull));
    }

    #[tokio::test]
    async fn when_joining_twice_with_the_same_name_then_the_second_join_is_a_no_op() {
        let h = harness();
        let id = h.registry.create_lobby("ann", "").await.expect("create");
        h.registry.join_lobby(&id, "ben", "").await.expect("join");

        h.registry.join_lobby(&id, "ben", "").await.expect("rejoin");

        assert_eq!(snapshot(&h, &id).await.players.len(), 2);
    }

    #[tokio::test]
    async fn when_joining_after_the_first_round_then_the_seat_is_a_zeroed_spectator() {
        let h = harness();
        let id = started_duel(&h).await;

        h.registry.join_lobby(&id, "eve", "").await.expect("join");

        let lobby = snapshot(&h, &id).await;
        let eve = lobby.player("eve").expect("seated");
        assert!(eve.spectator);
        assert_eq!(eve.hp, 0);
        assert_eq!(eve.attack_damage, 0);
        // Never a target, never a denier.
        assert!(!lobby.is_valid_target("ann", "eve"));
        assert_ne!(lobby.pending_deny.as_deref(), Some("eve"));
    }

    #[tokio::test]
    async fn when_a_non_admin_kicks_or_adds_bots_then_forbidden() {
        let h = harness();
        let id = h.registry.create_lobby("ann", "").await.expect("create");
        h.registry.join_lobby(&id, "ben", "").await.expect("join");

        assert_eq!(
            h.registry.kick_player(&id, "ben", "ann").await,
            Err(GameError::NotAdmin)
        );
        assert_eq!(
            h.registry.add_bot(&id, "ben").await,
            Err(GameError::NotAdmin)
        );
    }

    #[tokio::test]
    async fn when_the_admin_kicks_before_the_start_then_the_seat_is_gone() {
        let h = harness();
        let id = h.registry.create_lobby("ann", "").await.expect("create");
        h.registry.join_lobby(&id, "ben", "").await.expect("join");

        h.registry.kick_player(&id, "ann", "ben").await.expect("kick");

        assert!(snapshot(&h, &id).await.player("ben").is_none());
    }

    #[tokio::test]
    async fn when_the_game_has_started_then_kicking_is_rejected() {
        let h = harness();
        let id = started_duel(&h).await;

        let result = h.registry.kick_player(&id, "ann", "ben").await;

        assert_eq!(result, Err(GameError::GameAlreadyStarted));
    }

    #[tokio::test]
    async fn when_the_admin_adds_a_bot_then_it_is_seated_without_admin_rights() {
        let h = harness();
        let id = h.registry.create_lobby("ann", "").await.expect("create");

        h.registry.add_bot(&id, "ann").await.expect("add bot");

        let lobby = snapshot(&h, &id).await;
        assert_eq!(lobby.players.len(), 2);
        let bot = &lobby.players[1];
        assert!(!bot.admin);
        assert_eq!(bot.controller, Controller::Bot);
    }

    #[tokio::test]
    async fn when_starting_alone_then_not_enough_players() {
        let h = harness();
        let id = h.registry.create_lobby("ann", "").await.expect("create");

        let result = h.registry.start_game(&id, "ann").await;

        assert_eq!(result, Err(GameError::NotEnoughPlayers));
    }

    #[tokio::test]
    async fn when_the_game_starts_then_round_one_opens_with_a_deadline() {
        let h = harness();
        let id = started_duel(&h).await;

        let lobby = snapshot(&h, &id).await;
        assert_eq!(lobby.round, 1);
        assert_eq!(lobby.round_end_time, Some(NOW + 30_000));
        assert!(lobby.holds_time_invariant());
    }

    #[tokio::test]
    async fn when_starting_twice_then_the_second_start_is_rejected() {
        let h = harness();
        let id = started_duel(&h).await;

        let result = h.registry.start_game(&id, "ann").await;

        assert_eq!(result, Err(GameError::GameAlreadyStarted));
    }

    #[tokio::test]
    async fn when_submitting_before_the_start_then_round_not_active() {
        let h = harness();
        let id = h.registry.create_lobby("ann", "").await.expect("create");

        let result = h
            .registry
            .submit_choice(&id, "ann", Some("gain_coin"), Some(""), None)
            .await;

        assert_eq!(result, Err(GameError::RoundNotActive));
    }

    #[tokio::test]
    async fn when_an_unknown_player_submits_then_not_found() {
        let h = harness();
        let id = started_duel(&h).await;

        let result = h
            .registry
            .submit_choice(&id, "ghost", None, Some("defend"), None)
            .await;

        assert_eq!(result, Err(GameError::PlayerNotFound));
    }

    #[tokio::test]
    async fn when_a_spectator_submits_then_it_is_rejected() {
        let h = harness();
        let id = started_duel(&h).await;
        h.registry.join_lobby(&id, "eve", "").await.expect("join");

        let result = h
            .registry
            .submit_choice(&id, "eve", None, Some("defend"), None)
            .await;

        assert_eq!(result, Err(GameError::Spectator));
    }

    #[tokio::test]
    async fn when_the_action_string_is_unknown_then_it_is_rejected() {
        let h = harness();
        let id = started_duel(&h).await;

        let result = h
            .registry
            .submit_choice(&id, "ann", None, Some("flee"), None)
            .await;

        assert_eq!(result, Err(GameError::UnknownChoice));
    }

    #[tokio::test]
    async fn when_attacking_without_a_live_other_target_then_invalid_target() {
        let h = harness();
        let id = started_duel(&h).await;

        for target in [None, Some(""), Some("ann"), Some("ghost")] {
            let result = h
                .registry
                .submit_choice(&id, "ann", None, Some("attack"), target)
                .await;
            assert_eq!(result, Err(GameError::InvalidTarget));
        }
    }

    #[tokio::test]
    async fn when_fields_arrive_in_separate_patches_then_they_merge() {
        let h = harness();
        let id = started_duel(&h).await;

        // The client patches resource and action independently, with the
        // other field sent as the empty string.
        h.registry
            .submit_choice(&id, "ann", Some("gain_coin"), Some(""), None)
            .await
            .expect("resource patch");
        let lobby = snapshot(&h, &id).await;
        assert!(!lobby.ready_players().contains(&"ann".to_string()));

        h.registry
            .submit_choice(&id, "ann", Some(""), Some("defend"), None)
            .await
            .expect("action patch");
        let lobby = snapshot(&h, &id).await;
        let ann = lobby.player("ann").unwrap();
        assert_eq!(ann.choice.resource, Some(Resource::GainCoin));
        assert_eq!(ann.choice.action, Some(ActionKind::Defend));
        assert!(lobby.ready_players().contains(&"ann".to_string()));
    }

    #[tokio::test]
    async fn when_a_field_is_submitted_twice_then_the_later_value_wins() {
        let h = harness();
        let id = started_duel(&h).await;

        h.registry
            .submit_choice(&id, "ann", Some("gain_hp"), Some(""), None)
            .await
            .expect("first resource");
        h.registry
            .submit_choice(&id, "ann", Some("gain_coin"), Some(""), None)
            .await
            .expect("second resource");
        h.registry
            .submit_choice(&id, "ann", Some(""), Some("defend"), None)
            .await
            .expect("action");
        h.registry
            .submit_choice(&id, "ben", Some(""), Some("defend"), None)
            .await
            .expect("ben acts; round resolves");

        // Only the latest resource took effect: a coin, no heal past cap.
        let lobby = snapshot(&h, &id).await;
        assert_eq!(lobby.round, 2);
        let ann = lobby.player("ann").unwrap();
        assert_eq!(ann.coins, 1);
        assert_eq!(ann.hp, 5);
    }

    #[tokio::test]
    async fn when_everyone_has_chosen_then_the_round_resolves_without_the_timer() {
        let h = harness();
        let id = started_duel(&h).await;

        h.registry
            .submit_choice(&id, "ann", None, Some("attack"), Some("ben"))
            .await
            .expect("ann");
        assert_eq!(snapshot(&h, &id).await.round, 1);

        h.registry
            .submit_choice(&id, "ben", None, Some("defend"), None)
            .await
            .expect("ben");

        let lobby = snapshot(&h, &id).await;
        assert_eq!(lobby.round, 2);
        assert_eq!(lobby.player("ben").unwrap().hp, 4);
        // Choices are wiped for the new round.
        assert!(lobby.ready_players().is_empty());
        assert!(lobby.holds_time_invariant());
    }

    #[tokio::test]
    async fn when_the_deadline_passes_then_the_sweep_resolves_with_idle_defaults() {
        let h = harness();
        let id = started_duel(&h).await;
        h.registry
            .submit_choice(&id, "ann", None, Some("attack"), Some("ben"))
            .await
            .expect("ann");

        h.clock.advance(30_001);
        h.registry.sweep().await;

        let lobby = snapshot(&h, &id).await;
        assert_eq!(lobby.round, 2);
        let ben = lobby.player("ben").unwrap();
        assert_eq!(ben.idle_rounds, 1);
        // Defaulted defend halved ann's blow: 5 - ceil(1/2) = 4.
        assert_eq!(ben.hp, 4);
        assert_eq!(lobby.round_end_time, Some(NOW + 30_001 + 30_000));
    }

    #[tokio::test]
    async fn when_a_sweep_finds_nothing_due_then_it_changes_nothing() {
        let h = harness();
        let id = started_duel(&h).await;

        h.registry.sweep().await;

        let lobby = snapshot(&h, &id).await;
        assert_eq!(lobby.round, 1);
        assert_eq!(lobby.round_end_time, Some(NOW + 30_000));
    }

    #[tokio::test]
    async fn when_the_deny_pick_is_made_then_the_victim_is_nullified_that_round() {
        let h = harness();
        let id = h.registry.create_lobby("ann", "").await.expect("create");
        h.registry.join_lobby(&id, "ben", "").await.expect("join");
        h.registry.join_lobby(&id, "cid", "").await.expect("join");
        h.registry.start_game(&id, "ann").await.expect("start");

        // Round 1: cid soaks a hit and survives, earning the deny pick.
        h.registry
            .submit_choice(&id, "ann", None, Some("attack"), Some("cid"))
            .await
            .expect("ann");
        h.registry
            .submit_choice(&id, "ben", None, Some("defend"), None)
            .await
            .expect("ben");
        h.registry
            .submit_choice(&id, "cid", None, Some("defend"), None)
            .await
            .expect("cid");
        let lobby = snapshot(&h, &id).await;
        assert_eq!(lobby.round, 2);
        assert_eq!(lobby.pending_deny.as_deref(), Some("cid"));

        // Round 2: cid denies ann; ann's attack must not land.
        h.registry
            .submit_deny_target(&id, "cid", "ann")
            .await
            .expect("deny");
        let lobby = snapshot(&h, &id).await;
        assert_eq!(lobby.pending_deny, None);
        assert_eq!(lobby.deny_target.as_deref(), Some("ann"));

        h.registry
            .submit_choice(&id, "ann", Some("gain_coin"), Some("attack"), Some("ben"))
            .await
            .expect("ann, to be ignored");
        h.registry
            .submit_choice(&id, "ben", None, Some("defend"), None)
            .await
            .expect("ben");
        h.registry
            .submit_choice(&id, "cid", None, Some("defend"), None)
            .await
            .expect("cid");

        let lobby = snapshot(&h, &id).await;
        assert_eq!(lobby.round, 3);
        assert_eq!(lobby.player("ben").unwrap().hp, 5);
        assert_eq!(lobby.player("ann").unwrap().coins, 0);
        assert_eq!(lobby.deny_target, None);
    }

    #[tokio::test]
    async fn when_the_denied_player_never_submits_then_the_round_still_completes() {
        let h = harness();
        let id = h.registry.create_lobby("ann", "").await.expect("create");
        h.registry.join_lobby(&id, "ben", "").await.expect("join");
        h.registry.join_lobby(&id, "cid", "").await.expect("join");
        h.registry.start_game(&id, "ann").await.expect("start");
        h.registry
            .submit_choice(&id, "ann", None, Some("attack"), Some("cid"))
            .await
            .expect("ann");
        h.registry
            .submit_choice(&id, "ben", None, Some("defend"), None)
            .await
            .expect("ben");
        h.registry
            .submit_choice(&id, "cid", None, Some("defend"), None)
            .await
            .expect("cid");
        h.registry
            .submit_deny_target(&id, "cid", "ann")
            .await
            .expect("deny ann");

        // ann is denied and silent; the other two finish the round.
        h.registry
            .submit_choice(&id, "ben", None, Some("raid"), None)
            .await
            .expect("ben");
        h.registry
            .submit_choice(&id, "cid", None, Some("raid"), None)
            .await
            .expect("cid; round resolves without ann");

        assert_eq!(snapshot(&h, &id).await.round, 3);
    }

    #[tokio::test]
    async fn when_someone_else_tries_the_deny_pick_then_forbidden() {
        let h = harness();
        let id = started_duel(&h).await;

        let result = h.registry.submit_deny_target(&id, "ann", "ben").await;

        assert_eq!(result, Err(GameError::NotPendingDeny));
    }

    #[tokio::test]
    async fn when_the_match_ends_then_the_winner_is_set_and_a_relic_is_awarded() {
        let h = harness();
        let id = started_duel(&h).await;

        // Five rounds of undefended hits at the base damage of 1.
        for round in 0..5 {
            h.registry
                .submit_choice(&id, "ann", None, Some("attack"), Some("ben"))
                .await
                .expect("ann");
            if round < 4 {
                h.registry
                    .submit_choice(&id, "ben", None, Some("raid"), None)
                    .await
                    .expect("ben");
            } else {
                h.clock.advance(31_000);
                h.registry.sweep().await;
            }
        }

        let lobby = snapshot(&h, &id).await;
        assert!(lobby.gameover);
        assert_eq!(lobby.winner.as_deref(), Some("ann"));
        assert_eq!(lobby.raidwinner, None);
        assert_eq!(lobby.round_end_time, None);
        assert!(lobby.holds_time_invariant());
        assert_eq!(lobby.replay_votes_needed, 2);

        let relics = h.relics.relics_snapshot("ann");
        assert_eq!(relics.len(), 1);
        assert_eq!(relics[0].id, VICTORS_LAUREL.id);
        assert_eq!(relics[0].count, 1);
    }

    #[tokio::test]
    async fn when_replay_votes_reach_the_threshold_then_a_fresh_lobby_is_chained() {
        let h = harness();
        let id = started_duel(&h).await;
        // ben idles to death across rounds; ann keeps attacking.
        for _ in 0..5 {
            h.registry
                .submit_choice(&id, "ann", None, Some("attack"), Some("ben"))
                .await
                .expect("ann");
            h.clock.advance(31_000);
            h.registry.sweep().await;
        }
        assert!(snapshot(&h, &id).await.gameover);

        let first = h
            .registry
            .request_replay(&id, "ann")
            .await
            .expect("vote one");
        assert_eq!(first, None);
        let lobby = snapshot(&h, &id).await;
        assert_eq!(lobby.replay_votes.len(), 1);
        assert_eq!(lobby.next_lobby_id, None);

        let second = h
            .registry
            .request_replay(&id, "ben")
            .await
            .expect("vote two");
        let next_id = second.expect("threshold met");

        let old = snapshot(&h, &id).await;
        assert_eq!(old.next_lobby_id.as_deref(), Some(next_id.as_str()));

        let fresh = snapshot(&h, &next_id).await;
        assert_eq!(fresh.round, 0);
        assert!(!fresh.gameover);
        let names: Vec<&str> = fresh.players.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["ann", "ben"]);
        for player in &fresh.players {
            assert_eq!(player.hp, 5);
            assert_eq!(player.coins, 0);
            assert_eq!(player.attack_damage, 1);
        }

        // A straggler vote just returns the same chained id.
        let third = h
            .registry
            .request_replay(&id, "ann")
            .await
            .expect("vote three");
        assert_eq!(third.as_deref(), Some(next_id.as_str()));
    }

    #[tokio::test]
    async fn when_the_game_is_not_over_then_replay_votes_are_rejected() {
        let h = harness();
        let id = started_duel(&h).await;

        let result = h.registry.request_replay(&id, "ann").await;

        assert_eq!(result, Err(GameError::ReplayNotOpen));
    }

    #[tokio::test]
    async fn when_a_gremlin_lobby_is_created_then_the_duel_starts_immediately() {
        let h = harness();

        let id = h
            .registry
            .create_gremlin_lobby("ann")
            .await
            .expect("create");

        let lobby = snapshot(&h, &id).await;
        assert_eq!(lobby.kind, LobbyKind::Gremlin);
        assert!(lobby.boss_fight());
        assert_eq!(lobby.round, 1);
        let boss = lobby.players.iter().find(|p| p.is_boss()).expect("boss");
        assert_eq!(boss.hp, 5);
        assert!(boss.title.is_some());
        // The boss has already picked its move.
        assert!(boss.choice.is_ready());
    }

    #[tokio::test]
    async fn when_the_gremlin_falls_then_the_slayer_is_the_raidwinner() {
        let mut tuning = GameTuning::default();
        tuning.gremlin_hp = 1;
        let h = harness_with_tuning(tuning);
        let id = h
            .registry
            .create_gremlin_lobby("ann")
            .await
            .expect("create");

        h.registry
            .submit_choice(&id, "ann", None, Some("attack"), Some(GREMLIN_NAME))
            .await
            .expect("ann swings");

        let lobby = snapshot(&h, &id).await;
        assert!(lobby.gameover);
        assert_eq!(lobby.raidwinner.as_deref(), Some("ann"));
        assert_eq!(lobby.winner, None);
        assert_eq!(h.relics.relics_snapshot("ann").len(), 1);
    }

    #[tokio::test]
    async fn when_two_players_ask_for_the_raid_then_they_share_one_lobby() {
        let h = harness();

        let first = h.registry.get_raid_lobby("ann").await.expect("ann");
        let second = h.registry.get_raid_lobby("ben").await.expect("ben");

        assert_eq!(first, second);
        let lobby = snapshot(&h, &first).await;
        assert_eq!(lobby.kind, LobbyKind::Raid);
        assert_eq!(lobby.round, 0);
        assert_eq!(lobby.start_time, RAID_START);
        assert!(lobby.players.iter().any(|p| p.is_boss()));
        assert_eq!(lobby.human_count(), 2);
    }

    #[tokio::test]
    async fn when_the_start_time_arrives_then_the_sweep_opens_the_raid() {
        let h = harness();
        let id = h.registry.get_raid_lobby("ann").await.expect("ann");

        h.registry.sweep().await;
        assert_eq!(snapshot(&h, &id).await.round, 0);

        h.clock.advance(RAID_START - NOW);
        h.registry.sweep().await;

        let lobby = snapshot(&h, &id).await;
        assert_eq!(lobby.round, 1);
        assert!(lobby.holds_time_invariant());
    }

    #[tokio::test]
    async fn when_manually_starting_a_raid_then_it_is_rejected() {
        let h = harness();
        let id = h.registry.get_raid_lobby("ann").await.expect("ann");

        let result = h.registry.start_game(&id, "ann").await;

        assert_eq!(result, Err(GameError::RaidScheduled));
    }

    #[tokio::test]
    async fn when_the_raid_is_over_then_the_next_request_opens_a_new_window() {
        let mut tuning = GameTuning::default();
        tuning.raid_boss_hp = 1;
        let h = harness_with_tuning(tuning);
        let id = h.registry.get_raid_lobby("ann").await.expect("ann");
        h.clock.advance(RAID_START - NOW);
        h.registry.sweep().await;
        h.registry
            .submit_choice(&id, "ann", None, Some("attack"), Some(RAID_BOSS_NAME))
            .await
            .expect("ann fells the boss");
        assert!(snapshot(&h, &id).await.gameover);

        let next = h.registry.get_raid_lobby("ben").await.expect("ben");

        assert_ne!(next, id);
        assert!(!snapshot(&h, &next).await.gameover);
    }

    #[tokio::test]
    async fn when_a_finished_lobby_outlives_the_grace_then_it_is_archived() {
        let h = harness();
        let id = started_duel(&h).await;
        for _ in 0..5 {
            h.registry
                .submit_choice(&id, "ann", None, Some("attack"), Some("ben"))
                .await
                .expect("ann");
            h.clock.advance(31_000);
            h.registry.sweep().await;
        }
        assert!(snapshot(&h, &id).await.gameover);

        // First sweep after the end stamps the clock; the grace then runs.
        h.registry.sweep().await;
        h.clock.advance(599_000);
        h.registry.sweep().await;
        assert!(h.registry.lobby_snapshot(&id).await.is_ok());

        h.clock.advance(2_000);
        h.registry.sweep().await;

        assert_eq!(
            h.registry.lobby_snapshot(&id).await.err(),
            Some(GameError::LobbyNotFound)
        );
    }

    #[tokio::test]
    async fn when_logging_in_then_the_profile_is_upserted() {
        let h = harness();

        h.registry
            .log_in("ann", "ann@example.com")
            .await
            .expect("log in");
        h.registry
            .log_in("ann", "new@example.com")
            .await
            .expect("log in again");

        assert_eq!(
            h.profiles.email_of("ann").as_deref(),
            Some("new@example.com")
        );
        assert_eq!(
            h.registry.log_in("ann", " ").await,
            Err(GameError::InvalidEmail)
        );
    }

    #[tokio::test]
    async fn when_asking_for_relics_of_an_unknown_player_then_the_list_is_empty() {
        let h = harness();

        let relics = h.registry.relics_for("nobody").await.expect("query");

        assert!(relics.is_empty());
    }

    #[tokio::test]
    async fn when_polling_messages_then_each_player_sees_only_their_own() {
        let h = harness();
        let id = started_duel(&h).await;
        h.registry
            .submit_choice(&id, "ann", None, Some("attack"), Some("ben"))
            .await
            .expect("ann");
        h.registry
            .submit_choice(&id, "ben", None, Some("defend"), None)
            .await
            .expect("ben");

        let ann_mail = h
            .registry
            .player_messages(&id, "ann")
            .await
            .expect("ann mail");
        let ben_mail = h
            .registry
            .player_messages(&id, "ben")
            .await
            .expect("ben mail");
        assert!(ann_mail.iter().any(|m| m.concat().contains("You hit ben")));
        assert!(ben_mail.iter().any(|m| m.concat().contains("ann hit you")));
        assert!(!ann_mail.iter().any(|m| m.concat().contains("hit you")));

        let ghost_mail = h
            .registry
            .player_messages(&id, "ghost")
            .await
            .expect("unknown player is fine");
        assert!(ghost_mail.is_empty());
    }
}
