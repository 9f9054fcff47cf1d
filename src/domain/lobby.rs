// Lobby and player entities plus the roster rules the use cases rely on.

use std::collections::{HashMap, HashSet};

use crate::domain::choices::Choice;
use crate::domain::tuning::GameTuning;

/// Who drives a seat. One entity, branched on capability where auto-play
/// or AI targeting is needed; never subclassed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Controller {
    Human,
    Bot,
    Boss,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LobbyKind {
    Standard,
    Raid,
    Gremlin,
}

/// Ordered message log delivered privately per player, one entry per event.
pub type Inbox = Vec<Vec<String>>;

#[derive(Debug, Clone)]
pub struct Player {
    pub name: String,
    pub admin: bool,
    pub hp: i32,
    pub coins: i32,
    pub attack_damage: i32,
    pub spectator: bool,
    pub idle_rounds: u32,
    pub controller: Controller,
    pub title: Option<String>,
    pub choice: Choice,
}

impl Player {
    /// A regular seat taken before the match starts.
    pub fn seated(name: String, admin: bool, tuning: &GameTuning) -> Self {
        Self {
            name,
            admin,
            hp: tuning.start_hp,
            coins: tuning.start_coins,
            attack_damage: tuning.start_attack,
            spectator: false,
            idle_rounds: 0,
            controller: Controller::Human,
            title: None,
            choice: Choice::default(),
        }
    }

    /// A late joiner who only observes. Zeroed stats keep spectators out of
    /// every hp>0 target filter on the client.
    pub fn observer(name: String) -> Self {
        Self {
            name,
            admin: false,
            hp: 0,
            coins: 0,
            attack_damage: 0,
            spectator: true,
            idle_rounds: 0,
            controller: Controller::Human,
            title: None,
            choice: Choice::default(),
        }
    }

    pub fn bot(name: String, tuning: &GameTuning) -> Self {
        Self {
            controller: Controller::Bot,
            ..Self::seated(name, false, tuning)
        }
    }

    pub fn boss(name: String, title: String, hp: i32, attack_damage: i32) -> Self {
        Self {
            name,
            admin: false,
            hp,
            coins: 0,
            attack_damage,
            spectator: false,
            idle_rounds: 0,
            controller: Controller::Boss,
            title: Some(title),
            choice: Choice::default(),
        }
    }

    pub fn is_alive(&self) -> bool {
        self.hp > 0
    }

    pub fn is_boss(&self) -> bool {
        self.controller == Controller::Boss
    }

    pub fn is_human(&self) -> bool {
        self.controller == Controller::Human
    }

    /// Alive, seated, and taking part in rounds.
    pub fn is_combatant(&self) -> bool {
        !self.spectator && self.is_alive()
    }
}

#[derive(Debug, Clone)]
pub struct Lobby {
    pub id: String,
    pub kind: LobbyKind,
    /// Seat order is insertion order; seats are never removed once the
    /// match has started.
    pub players: Vec<Player>,
    pub round: u32,
    /// Epoch milliseconds; set iff `round > 0 && !gameover`.
    pub round_end_time: Option<u64>,
    pub pending_deny: Option<String>,
    pub deny_target: Option<String>,
    pub winner: Option<String>,
    pub raidwinner: Option<String>,
    pub gameover: bool,
    /// Creation time, or the scheduled boss-fight start for raid lobbies
    /// (epoch milliseconds).
    pub start_time: u64,
    /// When the match ended (epoch ms); archival grace is measured from here.
    pub ended_at: Option<u64>,
    pub next_lobby_id: Option<String>,
    pub replay_votes: HashSet<String>,
    pub replay_votes_needed: u32,
    pub inboxes: HashMap<String, Inbox>,
}

impl Lobby {
    pub fn new(id: String, kind: LobbyKind, start_time: u64) -> Self {
        Self {
            id,
            kind,
            players: Vec::new(),
            round: 0,
            round_end_time: None,
            pending_deny: None,
            deny_target: None,
            winner: None,
            raidwinner: None,
            gameover: false,
            start_time,
            ended_at: None,
            next_lobby_id: None,
            replay_votes: HashSet::new(),
            replay_votes_needed: 0,
            inboxes: HashMap::new(),
        }
    }

    pub fn boss_fight(&self) -> bool {
        self.kind != LobbyKind::Standard
    }

    pub fn player(&self, name: &str) -> Option<&Player> {
        self.players.iter().find(|p| p.name == name)
    }

    pub fn player_mut(&mut self, name: &str) -> Option<&mut Player> {
        self.players.iter_mut().find(|p| p.name == name)
    }

    pub fn seat(&mut self, player: Player) {
        self.inboxes.entry(player.name.clone()).or_default();
        self.players.push(player);
    }

    /// Drops a seat entirely; only legal before the match starts.
    pub fn unseat(&mut self, name: &str) {
        self.players.retain(|p| p.name != name);
        self.inboxes.remove(name);
        self.replay_votes.remove(name);
    }

    pub fn combatants(&self) -> impl Iterator<Item = &Player> {
        self.players.iter().filter(|p| !p.spectator)
    }

    pub fn live_combatants(&self) -> impl Iterator<Item = &Player> {
        self.players.iter().filter(|p| p.is_combatant())
    }

    pub fn human_count(&self) -> usize {
        self.combatants().filter(|p| p.is_human()).count()
    }

    /// The round is collecting choices.
    pub fn round_active(&self) -> bool {
        self.round > 0 && !self.gameover
    }

    /// True once every live combatant who is allowed to act has an action.
    /// The denied seat is excluded; the client hides its controls.
    pub fn all_choices_in(&self) -> bool {
        self.live_combatants()
            .filter(|p| self.deny_target.as_deref() != Some(p.name.as_str()))
            .all(|p| p.choice.is_ready())
    }

    /// Names with a submitted action, in seat order (the `readyPlayers` list).
    pub fn ready_players(&self) -> Vec<String> {
        self.live_combatants()
            .filter(|p| p.choice.is_ready())
            .map(|p| p.name.clone())
            .collect()
    }

    /// A legal attack or deny target: another seat that is still standing.
    pub fn is_valid_target(&self, actor: &str, target: &str) -> bool {
        target != actor
            && self
                .player(target)
                .is_some_and(|p| p.is_combatant())
    }

    pub fn clear_choices(&mut self) {
        for player in &mut self.players {
            player.choice.clear();
        }
    }

    pub fn push_message(&mut self, name: &str, message: String) {
        self.inboxes
            .entry(name.to_string())
            .or_default()
            .push(vec![message]);
    }

    /// The timing invariant every transition must preserve.
    pub fn holds_time_invariant(&self) -> bool {
        self.round_end_time.is_some() == (self.round > 0 && !self.gameover)
    }
}
